// Core trading logic modules

pub mod types;
pub mod trend;
pub mod grid_policy;
pub mod reconciler;
pub mod profit;
pub mod engine;
pub mod control_loop;

// Re-export commonly used types
pub use types::{
    Balances, Candle, GridAction, GridPhase, GridState, Order, OrderIntent, OrderStatus,
    RecenterReason, RungPrices, Side, Snapshot, Trend,
};
pub use trend::TrendClassifier;
pub use grid_policy::{Decision, GridPolicy};
pub use reconciler::{OrderReconciler, Reconciliation, RungMatch, Withheld};
pub use profit::{compute_profit, ProfitAccountant, ProfitLedger};
pub use engine::{CancelSummary, CycleReport, GridEngine};
pub use control_loop::{ControlLoop, LoopSummary};
