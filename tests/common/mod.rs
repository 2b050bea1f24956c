// Common test utilities and helpers
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use recentering_grid_bot::{
    Balances, Candle, Config, MarketCollaborator, MarketFeed, Order, OrderStatus, Side,
    TradingError, TradingResult,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::{Mutex, MutexGuard};

/// BTC/USDT grid with 500 spacing and no pauses anywhere
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.trading.pair = "BTC/USDT".to_string();
    config.trading.grid_spacing = dec!(500);
    config.trading.min_order_size = dec!(0.0011);
    config.trading.trading_fee = dec!(0.001);
    config.schedule.min_sleep_secs = 0;
    config.schedule.max_sleep_secs = 0;
    config.schedule.error_backoff_secs = 0;
    config.schedule.cancel_pause_ms = 0;
    config
}

/// `count` hourly candles ending now, closes moving by `step` from `start`
pub fn generate_candles(start: Decimal, step: Decimal, count: usize) -> Vec<Candle> {
    let first = Utc::now() - Duration::hours(count as i64);
    (0..count)
        .map(|i| Candle {
            timestamp: first + Duration::hours(i as i64),
            close: start + step * Decimal::from(i),
        })
        .collect()
}

pub fn open_order(id: &str, side: Side, price: Decimal, amount: Decimal) -> Order {
    Order {
        id: id.to_string(),
        side,
        price,
        amount,
        status: OrderStatus::Open,
        timestamp: Utc::now(),
        cost: None,
    }
}

pub fn closed_sell(price: Decimal, amount: Decimal, at: DateTime<Utc>) -> Order {
    Order {
        id: format!("sell-{}", price),
        side: Side::Sell,
        price,
        amount,
        status: OrderStatus::Closed,
        timestamp: at,
        cost: Some(price * amount),
    }
}

/// Mutable exchange state behind `ScriptedMarket`
#[derive(Debug, Default)]
pub struct MarketScript {
    pub price: Option<Decimal>,
    pub candles: Vec<Candle>,
    pub balances: Balances,
    pub open: Vec<Order>,
    pub closed: Vec<Order>,

    pub fail_price: bool,
    pub fail_balances: bool,
    pub fail_closed_orders: bool,
    /// Listing open orders fails from this call index onwards
    pub fail_open_orders_from: Option<usize>,
    /// The next N placements are rejected
    pub fail_next_places: usize,
    pub fail_cancels: bool,

    pub open_orders_calls: usize,
    pub placed: Vec<Order>,
    pub canceled: Vec<String>,
    next_id: usize,
}

/// In-memory exchange whose every read and action can be scripted to fail
pub struct ScriptedMarket {
    script: Mutex<MarketScript>,
}

impl ScriptedMarket {
    pub fn new(price: Decimal, balances: Balances) -> Self {
        Self {
            script: Mutex::new(MarketScript {
                price: Some(price),
                balances,
                ..MarketScript::default()
            }),
        }
    }

    pub fn script(&self) -> MutexGuard<'_, MarketScript> {
        self.script.lock().expect("script lock")
    }

    pub fn set_price(&self, price: Decimal) {
        self.script().price = Some(price);
    }

    pub fn open_orders(&self) -> Vec<Order> {
        self.script().open.clone()
    }

    pub fn placed(&self) -> Vec<Order> {
        self.script().placed.clone()
    }

    pub fn canceled(&self) -> Vec<String> {
        self.script().canceled.clone()
    }
}

fn unavailable(what: &str) -> TradingError {
    TradingError::ApiConnection(format!("{} unavailable", what))
}

#[async_trait]
impl MarketCollaborator for ScriptedMarket {
    async fn get_price(&self, _instrument: &str) -> TradingResult<Option<Decimal>> {
        let script = self.script();
        if script.fail_price {
            return Err(unavailable("ticker"));
        }
        Ok(script.price)
    }

    async fn get_candles(&self, _instrument: &str, _timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>> {
        let script = self.script();
        let skip = script.candles.len().saturating_sub(limit);
        Ok(script.candles[skip..].to_vec())
    }

    async fn get_balances(&self) -> TradingResult<Balances> {
        let script = self.script();
        if script.fail_balances {
            return Err(unavailable("balance"));
        }
        Ok(script.balances)
    }

    async fn get_open_orders(&self, _instrument: &str) -> TradingResult<Vec<Order>> {
        let mut script = self.script();
        let call = script.open_orders_calls;
        script.open_orders_calls += 1;
        if script.fail_open_orders_from.is_some_and(|from| call >= from) {
            return Err(unavailable("open orders"));
        }
        Ok(script.open.clone())
    }

    async fn get_closed_orders(&self, _instrument: &str, since: DateTime<Utc>) -> TradingResult<Vec<Order>> {
        let script = self.script();
        if script.fail_closed_orders {
            return Err(unavailable("closed orders"));
        }
        Ok(script.closed.iter().filter(|o| o.timestamp >= since).cloned().collect())
    }

    async fn place_limit_order(
        &self,
        _instrument: &str,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> TradingResult<Order> {
        let mut script = self.script();
        if script.fail_next_places > 0 {
            script.fail_next_places -= 1;
            return Err(TradingError::ApiTimeout("order placement timed out".to_string()));
        }

        script.next_id += 1;
        let order = open_order(&format!("ord-{}", script.next_id), side, price, amount);
        script.open.push(order.clone());
        script.placed.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str, _instrument: &str) -> TradingResult<()> {
        let mut script = self.script();
        if script.fail_cancels {
            return Err(unavailable("cancel"));
        }
        script.open.retain(|o| o.id != order_id);
        script.canceled.push(order_id.to_string());
        Ok(())
    }
}

/// Price and candle feed for the paper exchange
pub struct ScriptedFeed {
    price: Mutex<Option<Decimal>>,
    candles: Vec<Candle>,
}

impl ScriptedFeed {
    pub fn new(price: Decimal) -> Self {
        Self {
            price: Mutex::new(Some(price)),
            candles: Vec::new(),
        }
    }

    pub fn with_candles(mut self, candles: Vec<Candle>) -> Self {
        self.candles = candles;
        self
    }

    pub fn set_price(&self, price: Decimal) {
        *self.price.lock().expect("price lock") = Some(price);
    }
}

#[async_trait]
impl MarketFeed for ScriptedFeed {
    async fn latest_price(&self, _instrument: &str) -> TradingResult<Option<Decimal>> {
        Ok(*self.price.lock().expect("price lock"))
    }

    async fn candles(&self, _instrument: &str, _timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>> {
        let skip = self.candles.len().saturating_sub(limit);
        Ok(self.candles[skip..].to_vec())
    }
}
