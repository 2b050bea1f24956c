// Control loop: strictly sequential cycles, randomized sleep, best-effort shutdown

use crate::clients::MarketCollaborator;
use crate::config::ScheduleConfig;
use crate::core::engine::{CancelSummary, GridEngine};
use crate::core::profit::ProfitLedger;
use crate::core::types::GridState;
use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct LoopSummary {
    pub cycles: usize,
    pub failed_cycles: usize,
    pub final_state: GridState,
    pub profit: ProfitLedger,
    pub shutdown: CancelSummary,
}

pub struct ControlLoop<M> {
    engine: GridEngine<M>,
    schedule: ScheduleConfig,
    max_cycles: Option<usize>,
}

impl<M: MarketCollaborator> ControlLoop<M> {
    pub fn new(engine: GridEngine<M>) -> Self {
        let schedule = engine.config().schedule.clone();
        Self {
            engine,
            schedule,
            max_cycles: None,
        }
    }

    /// Stop after this many cycles instead of running until interrupted
    pub fn with_max_cycles(mut self, max_cycles: Option<usize>) -> Self {
        self.max_cycles = max_cycles;
        self
    }

    pub fn engine(&self) -> &GridEngine<M> {
        &self.engine
    }

    /// Run until Ctrl-C (or `max_cycles`)
    pub async fn run(self) -> LoopSummary {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("❌ Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("🛑 Shutdown requested");
        })
        .await
    }

    pub async fn run_until<S: Future<Output = ()>>(self, shutdown: S) -> LoopSummary {
        info!("🚀 Starting grid trading loop...");
        tokio::pin!(shutdown);

        let mut state = GridState::new(Utc::now());
        let mut profit = ProfitLedger::default();
        let mut cycles = 0;
        let mut failed_cycles = 0;
        let mut stopping = false;

        loop {
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            // A started cycle always runs to completion; shutdown waits for it
            let cycle = self.engine.run_cycle(state.clone());
            tokio::pin!(cycle);
            let outcome = loop {
                tokio::select! {
                    biased;
                    _ = &mut shutdown, if !stopping => {
                        info!("🛑 Finishing current cycle before shutdown...");
                        stopping = true;
                    }
                    outcome = &mut cycle => break outcome,
                }
            };
            cycles += 1;

            let delay = match outcome {
                Ok(report) => {
                    state = report.state;
                    if let Some(ledger) = report.profit {
                        profit = ledger;
                    }
                    self.next_sleep()
                }
                Err(e) => {
                    failed_cycles += 1;
                    error!("❌ Loop error ({}): {}", e.category(), e);
                    Duration::from_secs(self.schedule.error_backoff_secs)
                }
            };

            if stopping || self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            info!("💤 Sleeping for {} seconds...", delay.as_secs());
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = sleep(delay) => {}
            }
        }

        let shutdown = self.shutdown(&profit).await;
        LoopSummary {
            cycles,
            failed_cycles,
            final_state: state,
            profit,
            shutdown,
        }
    }

    /// Random whole-second pause within the configured bounds. An inverted
    /// range (unvalidated config) collapses to `min_sleep_secs`.
    pub fn next_sleep(&self) -> Duration {
        let min = self.schedule.min_sleep_secs;
        let max = self.schedule.max_sleep_secs.max(min);
        Duration::from_secs(rand::thread_rng().gen_range(min..=max))
    }

    async fn shutdown(&self, profit: &ProfitLedger) -> CancelSummary {
        info!("🛑 Shutting down bot. Final profit: {:.2}", profit.total_profit);
        let summary = match self.engine.cancel_all().await {
            Ok(summary) => summary,
            Err(e) => {
                error!("❌ Cancel-all during shutdown failed: {}", e);
                CancelSummary::default()
            }
        };
        info!("✅ Bot shut down complete.");
        summary
    }
}
