// Grid policy: hold, place, recenter or reconcile, decided once per tick

use crate::config::Config;
use crate::core::types::{
    round_price, GridAction, GridState, RecenterReason, RungPrices, Snapshot, Trend,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct GridPolicy {
    grid_spacing: Decimal,
    price_shift_threshold: Decimal,
    trend_shift_threshold: Decimal,
    idle_timeout: Duration,
    initial_center: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub state: GridState,
    pub action: GridAction,
}

impl GridPolicy {
    pub fn new(
        grid_spacing: Decimal,
        price_shift_threshold: Decimal,
        trend_shift_threshold: Decimal,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            grid_spacing,
            price_shift_threshold,
            trend_shift_threshold,
            idle_timeout,
            initial_center: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let spacing = config.trading.grid_spacing;
        Self::new(
            spacing,
            config.policy.effective_price_shift_threshold(spacing),
            config.policy.trend_shift_threshold,
            Duration::seconds(config.policy.idle_timeout_secs as i64),
        )
        .with_initial_center(config.trading.initial_center)
    }

    pub fn with_initial_center(mut self, center: Option<Decimal>) -> Self {
        self.initial_center = center;
        self
    }

    pub fn rung_prices(&self, center: Decimal) -> RungPrices {
        RungPrices::around(center, self.grid_spacing)
    }

    pub fn decide(&self, state: &GridState, snapshot: &Snapshot, trend: Trend, now: DateTime<Utc>) -> Decision {
        let Some(price) = snapshot.current_price.map(round_price) else {
            return Decision {
                state: state.clone(),
                action: GridAction::Hold,
            };
        };

        let Some(center) = state.center_price else {
            let center = self.initial_center.unwrap_or(price);
            return Decision {
                state: GridState {
                    center_price: Some(center),
                    active: false,
                    last_active_time: state.last_active_time,
                },
                action: GridAction::InitialPlacement { center },
            };
        };

        // Nothing placed since the last (re)center: place again around the live price
        if !state.active {
            return Decision {
                state: GridState {
                    center_price: Some(price),
                    active: false,
                    last_active_time: state.last_active_time,
                },
                action: GridAction::InitialPlacement { center: price },
            };
        }

        match self.recenter_reason(center, price, trend, state.last_active_time, now) {
            Some(reason) => Decision {
                state: GridState {
                    center_price: Some(price),
                    active: false,
                    last_active_time: state.last_active_time,
                },
                action: GridAction::Recenter {
                    from: center,
                    to: price,
                    reason,
                },
            },
            None => Decision {
                state: state.clone(),
                action: GridAction::Reconcile { center },
            },
        }
    }

    /// First matching trigger in priority order: trend shift, idle out of range, drift
    pub fn recenter_reason(
        &self,
        center: Decimal,
        price: Decimal,
        trend: Trend,
        last_active_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Option<RecenterReason> {
        let trend_shift = match trend {
            Trend::Uptrend => price > center + self.trend_shift_threshold,
            Trend::Downtrend => price < center - self.trend_shift_threshold,
            Trend::Sideways | Trend::InsufficientData => false,
        };
        if trend_shift {
            return Some(RecenterReason::TrendShift(trend));
        }

        let rungs = self.rung_prices(center);
        if !rungs.contains(price) && now - last_active_time > self.idle_timeout {
            return Some(RecenterReason::IdleOutOfRange);
        }

        if (price - center).abs() > self.price_shift_threshold {
            return Some(RecenterReason::Drift);
        }

        None
    }

    /// Fold the outcome of executing `action` back into the state
    pub fn after_execution(
        &self,
        mut state: GridState,
        action: &GridAction,
        rungs_open: bool,
        placed: usize,
        now: DateTime<Utc>,
    ) -> GridState {
        match action {
            GridAction::InitialPlacement { .. } | GridAction::Recenter { .. } => {
                if rungs_open {
                    state.active = true;
                    state.last_active_time = now;
                }
            }
            GridAction::Reconcile { .. } => {
                if placed > 0 {
                    state.last_active_time = now;
                }
            }
            GridAction::Hold => {}
        }
        state
    }
}
