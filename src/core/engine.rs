// Grid engine: one decision cycle from snapshot to executed order intents

use crate::clients::MarketCollaborator;
use crate::config::Config;
use crate::core::grid_policy::GridPolicy;
use crate::core::profit::{ProfitAccountant, ProfitLedger};
use crate::core::reconciler::{OrderReconciler, Reconciliation, Withheld};
use crate::core::trend::TrendClassifier;
use crate::core::types::{Balances, GridAction, GridState, Order, OrderIntent, Snapshot};
use crate::error::{TradingError, TradingResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// What one call to `run_cycle` did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub state: GridState,
    pub action: GridAction,
    pub placed: usize,
    pub canceled: usize,
    pub failed: usize,
    /// `None` when closed orders could not be fetched this tick
    pub profit: Option<ProfitLedger>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelSummary {
    pub canceled: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Execution {
    placed: usize,
    canceled: usize,
    failed: usize,
}

pub struct GridEngine<M> {
    market: M,
    config: Config,
    classifier: TrendClassifier,
    policy: GridPolicy,
    reconciler: OrderReconciler,
    accountant: ProfitAccountant,
    bot_start_time: DateTime<Utc>,
}

impl<M: MarketCollaborator> GridEngine<M> {
    pub fn new(market: M, config: Config) -> Self {
        Self::with_start_time(market, config, Utc::now())
    }

    pub fn with_start_time(market: M, config: Config, bot_start_time: DateTime<Utc>) -> Self {
        Self {
            classifier: TrendClassifier::from_config(&config.market),
            policy: GridPolicy::from_config(&config),
            reconciler: OrderReconciler::from_config(&config.trading),
            accountant: ProfitAccountant::new(config.trading.grid_spacing, config.trading.trading_fee),
            market,
            config,
            bot_start_time,
        }
    }

    pub fn market(&self) -> &M {
        &self.market
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bot_start_time(&self) -> DateTime<Utc> {
        self.bot_start_time
    }

    fn pair(&self) -> &str {
        &self.config.trading.pair
    }

    /// Read everything a tick needs. Each call degrades to "absent" on failure.
    pub async fn snapshot(&self) -> Snapshot {
        let pair = self.pair();

        let current_price = match self.market.get_price(pair).await {
            Ok(price) => price,
            Err(e) => {
                error!("❌ Failed to fetch price: {}", e);
                None
            }
        };

        let market = &self.config.market;
        let candles = match self
            .market
            .get_candles(pair, &market.candle_timeframe, market.candle_limit)
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                error!("❌ Failed to fetch candlestick data: {}", e);
                Vec::new()
            }
        };

        let balances = self.fetch_balances().await;
        let open_orders = self.fetch_open_orders().await;

        let closed_orders = match self.market.get_closed_orders(pair, self.bot_start_time).await {
            Ok(orders) => Some(orders),
            Err(e) => {
                error!("❌ Failed to fetch closed orders: {}", e);
                None
            }
        };

        Snapshot {
            current_price,
            candles,
            balances,
            open_orders,
            closed_orders,
        }
    }

    async fn fetch_balances(&self) -> Option<Balances> {
        match self.market.get_balances().await {
            Ok(balances) => {
                info!("💰 Balance: quote = {:.8}, base = {:.8}", balances.quote, balances.base);
                Some(balances)
            }
            Err(e) => {
                error!("❌ Failed to fetch balance: {}", e);
                None
            }
        }
    }

    async fn fetch_open_orders(&self) -> Option<Vec<Order>> {
        match self.market.get_open_orders(self.pair()).await {
            Ok(orders) => Some(orders),
            Err(e) => {
                error!("❌ Failed to fetch open orders: {}", e);
                None
            }
        }
    }

    pub async fn run_cycle(&self, state: GridState) -> TradingResult<CycleReport> {
        self.run_cycle_at(state, Utc::now()).await
    }

    /// One tick. An `Err` means the cycle was abandoned before any state
    /// change; the caller keeps its previous state and tries again later.
    pub async fn run_cycle_at(&self, state: GridState, now: DateTime<Utc>) -> TradingResult<CycleReport> {
        let snapshot = self.snapshot().await;

        let trend = self.classifier.classify(&snapshot.candles);
        info!("📈 Detected trend: {}", trend);

        let decision = self.policy.decide(&state, &snapshot, trend, now);
        let action = decision.action.clone();

        let (execution, rungs_open) = match &action {
            GridAction::Hold => {
                warn!("⚠️  No current price, holding grid as is");
                (Execution::default(), false)
            }
            GridAction::InitialPlacement { center } => {
                self.place_initial(*center, snapshot.balances, snapshot.open_orders.as_deref())
                    .await
            }
            GridAction::Recenter { from, to, reason } => {
                info!("🔄 {} detected. Shifting grid from {} to {}...", reason, from, to);
                let canceled = self.cancel_all().await?;
                let balances = self.fetch_balances().await;
                let open_orders = self.fetch_open_orders().await;
                let (mut execution, rungs_open) =
                    self.place_initial(*to, balances, open_orders.as_deref()).await;
                execution.canceled += canceled.canceled;
                execution.failed += canceled.failed;
                (execution, rungs_open)
            }
            GridAction::Reconcile { center } => {
                self.reconcile(*center, snapshot.balances, snapshot.open_orders.as_deref())
                    .await
            }
        };

        let state = self
            .policy
            .after_execution(decision.state, &action, rungs_open, execution.placed, now);

        let profit = snapshot
            .closed_orders
            .as_deref()
            .map(|orders| self.accountant.ledger(orders, self.bot_start_time));
        if let Some(ledger) = profit {
            info!("💵 Total profit so far: {:.2} ({} sells)", ledger.total_profit, ledger.sell_count);
        }

        info!(
            "📊 Monitoring: Center={}, Current={}, Grid active={}",
            state.center_price.map_or("-".to_string(), |c| c.to_string()),
            snapshot.current_price.map_or("-".to_string(), |p| p.to_string()),
            state.active
        );

        Ok(CycleReport {
            state,
            action,
            placed: execution.placed,
            canceled: execution.canceled,
            failed: execution.failed,
            profit,
        })
    }

    /// Returns the execution tally and whether any rung is open afterwards
    async fn place_initial(
        &self,
        center: Decimal,
        balances: Option<Balances>,
        open_orders: Option<&[Order]>,
    ) -> (Execution, bool) {
        let (Some(balances), Some(open_orders)) = (balances, open_orders) else {
            warn!("⚠️  Cannot place grid around {}: balances or open orders unavailable", center);
            return (Execution::default(), false);
        };

        let plan = self.reconciler.initial_placement(center, &balances, open_orders);
        for side in &plan.existing {
            info!("ℹ️  {} order already exists. Skipping placement.", side);
        }

        let execution = self.execute(&plan).await;
        let rungs_open = execution.placed > 0 || !plan.existing.is_empty();
        if rungs_open {
            let rungs = self.reconciler.rung_prices(center);
            info!(
                "🎯 Grid initialized with center price {} (buy {}, sell {})",
                center, rungs.buy, rungs.sell
            );
        }
        (execution, rungs_open)
    }

    async fn reconcile(
        &self,
        center: Decimal,
        balances: Option<Balances>,
        open_orders: Option<&[Order]>,
    ) -> (Execution, bool) {
        let (Some(balances), Some(open_orders)) = (balances, open_orders) else {
            warn!("⚠️  Skipping reconciliation: balances or open orders unavailable");
            return (Execution::default(), true);
        };

        let plan = self.reconciler.reconcile(center, &balances, open_orders);
        (self.execute(&plan).await, true)
    }

    async fn execute(&self, plan: &Reconciliation) -> Execution {
        for withheld in &plan.withheld {
            match withheld {
                Withheld::InsufficientFunds { side, required, available } => {
                    info!(
                        "ℹ️  Insufficient funds for {}: Need {:.8}, Have {:.8}",
                        side, required, available
                    );
                }
                Withheld::NonPositivePrice { side, price } => {
                    warn!("⚠️  {} rung price {} is not positive, skipping", side, price);
                }
            }
        }

        let pair = self.pair();
        let mut execution = Execution::default();
        for intent in &plan.intents {
            match intent {
                OrderIntent::Cancel { order_id, side, price } => {
                    match self.market.cancel_order(order_id, pair).await {
                        Ok(()) => {
                            info!("🗑️  Canceled stale {} {} at {}", side, order_id, price);
                            execution.canceled += 1;
                        }
                        Err(e) => {
                            error!("❌ Failed to cancel {} {}: {}", side, order_id, e);
                            execution.failed += 1;
                        }
                    }
                }
                OrderIntent::Place { side, price, amount } => {
                    match self.market.place_limit_order(pair, *side, *amount, *price).await {
                        Ok(order) => {
                            info!("✅ Placed {}: {:.8} at {} (id {})", side, amount, price, order.id);
                            execution.placed += 1;
                        }
                        Err(e) => {
                            let e = TradingError::OrderActionFailed(e.to_string());
                            error!("❌ Failed {} at {}: {}", side, price, e);
                            execution.failed += 1;
                        }
                    }
                }
            }
        }
        execution
    }

    /// Cancel every open order on the instrument. Individual cancel failures
    /// are logged and counted; only failing to list open orders is an error.
    pub async fn cancel_all(&self) -> TradingResult<CancelSummary> {
        let pair = self.pair();
        let open_orders = self
            .market
            .get_open_orders(pair)
            .await
            .map_err(|e| TradingError::DataUnavailable(format!("open orders: {}", e)))?;

        let mut summary = CancelSummary::default();
        if open_orders.is_empty() {
            info!("ℹ️  No open orders to cancel.");
            return Ok(summary);
        }

        let pause = Duration::from_millis(self.config.schedule.cancel_pause_ms);
        for (i, order) in open_orders.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                sleep(pause).await;
            }
            match self.market.cancel_order(&order.id, pair).await {
                Ok(()) => {
                    info!("🗑️  Canceled order {}.", order.id);
                    summary.canceled += 1;
                }
                Err(e) => {
                    error!("❌ Failed to cancel order {}: {}", order.id, e);
                    summary.failed += 1;
                }
            }
        }
        debug!("cancel-all finished: {:?}", summary);
        Ok(summary)
    }
}
