// Bounded retries with exponential backoff around a market collaborator

use crate::clients::MarketCollaborator;
use crate::config::ExchangeConfig;
use crate::core::types::{Balances, Candle, Order, Side};
use crate::error::TradingResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry mechanism with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), Duration::from_secs(8))
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            max_delay,
        }
    }

    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.backoff_base_ms),
            Duration::from_millis(config.backoff_max_ms),
        )
    }

    /// Delay before retry number `attempt` (0-based): base, 2×base, 4×base, ... capped
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Run `operation`, retrying retryable errors. The last error is returned
    /// once retries are exhausted; non-retryable errors return immediately.
    pub async fn execute<T, F, Fut>(&self, name: &str, mut operation: F) -> TradingResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TradingResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() && attempt < self.max_retries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        "🔁 {} failed (attempt {}), retrying in {:?}: {}",
                        name,
                        attempt + 1,
                        delay,
                        error
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

/// Wraps a collaborator so idempotent calls are retried. Order placement is
/// passed through untouched: a retried POST could open a duplicate order.
pub struct RetryingMarket<M> {
    inner: M,
    policy: RetryPolicy,
}

impl<M: MarketCollaborator> RetryingMarket<M> {
    pub fn new(inner: M, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: MarketCollaborator> MarketCollaborator for RetryingMarket<M> {
    async fn get_price(&self, instrument: &str) -> TradingResult<Option<Decimal>> {
        self.policy
            .execute("get_price", move || self.inner.get_price(instrument))
            .await
    }

    async fn get_candles(&self, instrument: &str, timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>> {
        self.policy
            .execute("get_candles", move || self.inner.get_candles(instrument, timeframe, limit))
            .await
    }

    async fn get_balances(&self) -> TradingResult<Balances> {
        self.policy
            .execute("get_balances", move || self.inner.get_balances())
            .await
    }

    async fn get_open_orders(&self, instrument: &str) -> TradingResult<Vec<Order>> {
        self.policy
            .execute("get_open_orders", move || self.inner.get_open_orders(instrument))
            .await
    }

    async fn get_closed_orders(&self, instrument: &str, since: DateTime<Utc>) -> TradingResult<Vec<Order>> {
        self.policy
            .execute("get_closed_orders", move || self.inner.get_closed_orders(instrument, since))
            .await
    }

    async fn place_limit_order(
        &self,
        instrument: &str,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> TradingResult<Order> {
        self.inner.place_limit_order(instrument, side, amount, price).await
    }

    async fn cancel_order(&self, order_id: &str, instrument: &str) -> TradingResult<()> {
        self.policy
            .execute("cancel_order", move || self.inner.cancel_order(order_id, instrument))
            .await
    }
}
