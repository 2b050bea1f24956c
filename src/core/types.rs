// Common types used across the application

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prices are compared and submitted at this many decimal places
pub const PRICE_DECIMALS: u32 = 2;

/// Round a price the way rung prices and open-order prices are compared
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp(PRICE_DECIMALS)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Open,
    Closed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub side: Side,
    pub price: Decimal,
    pub amount: Decimal,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    /// Quote amount actually spent/received, when the exchange reports it
    #[serde(default)]
    pub cost: Option<Decimal>,
}

impl Order {
    /// Reported cost, or `price × amount` when the exchange omitted it
    pub fn cost(&self) -> Decimal {
        self.cost.unwrap_or(self.price * self.amount)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
}

/// Free balances of the instrument's quote (e.g. USDT) and base (e.g. BTC) assets
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Balances {
    pub quote: Decimal,
    pub base: Decimal,
}

/// One tick's view of the market. `None` fields failed to load this tick.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub current_price: Option<Decimal>,
    pub candles: Vec<Candle>,
    pub balances: Option<Balances>,
    pub open_orders: Option<Vec<Order>>,
    pub closed_orders: Option<Vec<Order>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Uptrend,
    Downtrend,
    Sideways,
    InsufficientData,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Uptrend => "uptrend",
            Trend::Downtrend => "downtrend",
            Trend::Sideways => "sideways",
            Trend::InsufficientData => "insufficient_data",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridPhase {
    Uninitialized,
    /// Center chosen but no rung placed since the last (re)center
    Recentering,
    Active,
}

/// The grid's control state, threaded through every cycle by the driver
#[derive(Debug, Clone, PartialEq)]
pub struct GridState {
    pub center_price: Option<Decimal>,
    pub active: bool,
    pub last_active_time: DateTime<Utc>,
}

impl GridState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            center_price: None,
            active: false,
            last_active_time: now,
        }
    }

    pub fn phase(&self) -> GridPhase {
        match (self.center_price, self.active) {
            (None, _) => GridPhase::Uninitialized,
            (Some(_), false) => GridPhase::Recentering,
            (Some(_), true) => GridPhase::Active,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecenterReason {
    TrendShift(Trend),
    IdleOutOfRange,
    Drift,
}

impl fmt::Display for RecenterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecenterReason::TrendShift(trend) => write!(f, "{} shift", trend),
            RecenterReason::IdleOutOfRange => write!(f, "idle outside grid range"),
            RecenterReason::Drift => write!(f, "price drift"),
        }
    }
}

/// What the policy wants done this tick
#[derive(Debug, Clone, PartialEq)]
pub enum GridAction {
    /// Degraded snapshot, nothing to do
    Hold,
    InitialPlacement { center: Decimal },
    Recenter { from: Decimal, to: Decimal, reason: RecenterReason },
    Reconcile { center: Decimal },
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderIntent {
    Place { side: Side, price: Decimal, amount: Decimal },
    Cancel { order_id: String, side: Side, price: Decimal },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RungPrices {
    pub buy: Decimal,
    pub sell: Decimal,
}

impl RungPrices {
    /// `center ∓ spacing`, each rounded to the price precision
    pub fn around(center: Decimal, grid_spacing: Decimal) -> Self {
        Self {
            buy: round_price(center - grid_spacing),
            sell: round_price(center + grid_spacing),
        }
    }

    pub fn price_for(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.buy,
            Side::Sell => self.sell,
        }
    }

    pub fn contains(&self, price: Decimal) -> bool {
        price >= self.buy && price <= self.sell
    }
}
