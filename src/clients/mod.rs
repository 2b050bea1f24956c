// Exchange collaborator interfaces and their implementations

pub mod kraken_rest;
pub mod retry;

use crate::core::types::{Balances, Candle, Order, Side};
use crate::error::TradingResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

pub use kraken_rest::KrakenPublicClient;
pub use retry::{RetryPolicy, RetryingMarket};

/// Everything the grid engine needs from an exchange.
///
/// Every call may fail with a transient error; the engine treats a failed
/// read as "no data this tick" and a failed action as "retry next tick".
#[async_trait]
pub trait MarketCollaborator: Send + Sync {
    async fn get_price(&self, instrument: &str) -> TradingResult<Option<Decimal>>;

    async fn get_candles(&self, instrument: &str, timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>>;

    async fn get_balances(&self) -> TradingResult<Balances>;

    async fn get_open_orders(&self, instrument: &str) -> TradingResult<Vec<Order>>;

    async fn get_closed_orders(&self, instrument: &str, since: DateTime<Utc>) -> TradingResult<Vec<Order>>;

    async fn place_limit_order(
        &self,
        instrument: &str,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> TradingResult<Order>;

    async fn cancel_order(&self, order_id: &str, instrument: &str) -> TradingResult<()>;
}

/// Public price and candle source backing the paper exchange
#[async_trait]
pub trait MarketFeed: Send + Sync {
    async fn latest_price(&self, instrument: &str) -> TradingResult<Option<Decimal>>;

    async fn candles(&self, instrument: &str, timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>>;
}
