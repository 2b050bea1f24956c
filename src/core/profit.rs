// Realized profit, rebuilt from closed sell orders every time it is asked for

use crate::core::types::{Order, OrderStatus, Side};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProfitLedger {
    pub total_profit: Decimal,
    pub sell_count: usize,
}

#[derive(Debug, Clone)]
pub struct ProfitAccountant {
    grid_spacing: Decimal,
    fee: Decimal,
}

impl ProfitAccountant {
    pub fn new(grid_spacing: Decimal, fee: Decimal) -> Self {
        Self { grid_spacing, fee }
    }

    pub fn ledger(&self, closed_orders: &[Order], bot_start_time: DateTime<Utc>) -> ProfitLedger {
        let sells: Vec<&Order> = closed_orders
            .iter()
            .filter(|order| qualifies(order, bot_start_time))
            .collect();

        ProfitLedger {
            total_profit: sells
                .iter()
                .map(|order| sell_profit(order, self.grid_spacing, self.fee))
                .sum(),
            sell_count: sells.len(),
        }
    }
}

/// Total realized profit of closed sells since `bot_start_time`
pub fn compute_profit(
    closed_orders: &[Order],
    bot_start_time: DateTime<Utc>,
    grid_spacing: Decimal,
    fee: Decimal,
) -> Decimal {
    ProfitAccountant::new(grid_spacing, fee)
        .ledger(closed_orders, bot_start_time)
        .total_profit
}

fn qualifies(order: &Order, bot_start_time: DateTime<Utc>) -> bool {
    order.status == OrderStatus::Closed && order.side == Side::Sell && order.timestamp >= bot_start_time
}

/// The matching buy is assumed one grid spacing below, less the round-trip fee
pub fn implied_buy_price(sell_price: Decimal, grid_spacing: Decimal, fee: Decimal) -> Decimal {
    sell_price - grid_spacing - sell_price * Decimal::TWO * fee
}

fn sell_profit(order: &Order, grid_spacing: Decimal, fee: Decimal) -> Decimal {
    let buy_price = implied_buy_price(order.price, grid_spacing, fee);
    (order.price - buy_price) * order.amount - order.cost() * fee * Decimal::TWO
}
