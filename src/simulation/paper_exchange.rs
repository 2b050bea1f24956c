// In-memory paper exchange: live prices from a feed, simulated balances and fills

use crate::clients::{MarketCollaborator, MarketFeed};
use crate::core::types::{Balances, Candle, Order, OrderStatus, Side};
use crate::error::{TradingError, TradingResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct RestingOrder {
    order: Order,
    /// Quote (buy) or base (sell) held back while the order rests
    reserved: Decimal,
}

#[derive(Debug)]
struct PaperBook {
    quote_free: Decimal,
    base_free: Decimal,
    open: Vec<RestingOrder>,
    /// Filled orders only; cancels leave no trace
    history: Vec<Order>,
    fees_paid: Decimal,
}

pub struct PaperExchange<F> {
    feed: F,
    fee: Decimal,
    book: Mutex<PaperBook>,
}

impl<F: MarketFeed> PaperExchange<F> {
    pub fn new(feed: F, initial: Balances, fee: Decimal) -> Self {
        Self {
            feed,
            fee,
            book: Mutex::new(PaperBook {
                quote_free: initial.quote,
                base_free: initial.base,
                open: Vec::new(),
                history: Vec::new(),
                fees_paid: Decimal::ZERO,
            }),
        }
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    pub fn fees_paid(&self) -> TradingResult<Decimal> {
        Ok(self.lock()?.fees_paid)
    }

    /// Fill every resting order the price has crossed
    pub fn match_orders(&self, price: Decimal, now: DateTime<Utc>) -> TradingResult<Vec<Order>> {
        let mut book = self.lock()?;
        let (crossed, resting): (Vec<RestingOrder>, Vec<RestingOrder>) =
            std::mem::take(&mut book.open).into_iter().partition(|r| match r.order.side {
                Side::Buy => price <= r.order.price,
                Side::Sell => price >= r.order.price,
            });
        book.open = resting;

        let mut filled = Vec::with_capacity(crossed.len());
        for resting in crossed {
            let mut order = resting.order;
            let cost = order.price * order.amount;
            let fee = cost * self.fee;
            match order.side {
                Side::Buy => {
                    book.base_free += order.amount;
                    book.quote_free += resting.reserved - cost - fee;
                }
                Side::Sell => {
                    book.quote_free += cost - fee;
                }
            }
            book.fees_paid += fee;
            order.status = OrderStatus::Closed;
            order.cost = Some(cost);
            order.timestamp = now;
            info!(
                "💱 Paper fill: {} {} @ {} at market {} ({})",
                order.side, order.amount, order.price, price, now.format("%H:%M:%S")
            );
            book.history.push(order.clone());
            filled.push(order);
        }

        Ok(filled)
    }

    fn lock(&self) -> TradingResult<MutexGuard<'_, PaperBook>> {
        self.book
            .lock()
            .map_err(|_| TradingError::Internal("paper book lock poisoned".to_string()))
    }
}

#[async_trait]
impl<F: MarketFeed> MarketCollaborator for PaperExchange<F> {
    async fn get_price(&self, instrument: &str) -> TradingResult<Option<Decimal>> {
        let price = self.feed.latest_price(instrument).await?;
        if let Some(price) = price {
            self.match_orders(price, Utc::now())?;
        }
        Ok(price)
    }

    async fn get_candles(&self, instrument: &str, timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>> {
        self.feed.candles(instrument, timeframe, limit).await
    }

    async fn get_balances(&self) -> TradingResult<Balances> {
        let book = self.lock()?;
        Ok(Balances {
            quote: book.quote_free,
            base: book.base_free,
        })
    }

    async fn get_open_orders(&self, _instrument: &str) -> TradingResult<Vec<Order>> {
        Ok(self.lock()?.open.iter().map(|r| r.order.clone()).collect())
    }

    async fn get_closed_orders(&self, _instrument: &str, since: DateTime<Utc>) -> TradingResult<Vec<Order>> {
        Ok(self
            .lock()?
            .history
            .iter()
            .filter(|order| order.timestamp >= since)
            .cloned()
            .collect())
    }

    async fn place_limit_order(
        &self,
        _instrument: &str,
        side: Side,
        amount: Decimal,
        price: Decimal,
    ) -> TradingResult<Order> {
        if amount <= Decimal::ZERO || price <= Decimal::ZERO {
            return Err(TradingError::OrderActionFailed(format!(
                "invalid order {} {} @ {}",
                side, amount, price
            )));
        }

        let mut book = self.lock()?;
        let reserved = match side {
            Side::Buy => {
                let required = amount * price * (Decimal::ONE + self.fee);
                if book.quote_free < required {
                    return Err(TradingError::InsufficientFunds {
                        required,
                        available: book.quote_free,
                    });
                }
                book.quote_free -= required;
                required
            }
            Side::Sell => {
                if book.base_free < amount {
                    return Err(TradingError::InsufficientFunds {
                        required: amount,
                        available: book.base_free,
                    });
                }
                book.base_free -= amount;
                amount
            }
        };

        let order = Order {
            id: Uuid::new_v4().to_string(),
            side,
            price,
            amount,
            status: OrderStatus::Open,
            timestamp: Utc::now(),
            cost: None,
        };
        book.open.push(RestingOrder {
            order: order.clone(),
            reserved,
        });
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str, _instrument: &str) -> TradingResult<()> {
        let mut book = self.lock()?;
        let index = book
            .open
            .iter()
            .position(|r| r.order.id == order_id)
            .ok_or_else(|| TradingError::OrderActionFailed(format!("unknown order {}", order_id)))?;

        let resting = book.open.remove(index);
        match resting.order.side {
            Side::Buy => book.quote_free += resting.reserved,
            Side::Sell => book.base_free += resting.reserved,
        }
        Ok(())
    }
}
