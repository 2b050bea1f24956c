// Recentering Grid Bot Library
//
// A single-level buy/sell grid that follows the market: SMA trend detection,
// threshold and idle-timeout recentering, order reconciliation and profit tracking

pub mod core;
pub mod clients;
pub mod config;
pub mod error;       // Unified error handling
pub mod simulation;  // Paper exchange

// Re-export core trading types
pub use crate::core::{
    Balances, Candle, GridAction, GridEngine, GridPolicy, GridState, Order, OrderIntent,
    OrderReconciler, OrderStatus, ProfitAccountant, ProfitLedger, Side, Snapshot, Trend,
    TrendClassifier, ControlLoop, CycleReport,
};

// Re-export error types
pub use error::{TradingError, TradingResult};

// Re-export client types
pub use clients::{KrakenPublicClient, MarketCollaborator, MarketFeed, RetryPolicy, RetryingMarket};

// Re-export configuration
pub use config::{Config, TradingConfig, PolicyConfig, MarketConfig, ScheduleConfig, ExchangeConfig, LoggingConfig};

pub use simulation::PaperExchange;
