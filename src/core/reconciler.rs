// Order reconciliation: desired rungs vs. what is actually open on the exchange

use crate::config::TradingConfig;
use crate::core::types::{round_price, Balances, Order, OrderIntent, RungPrices, Side};
use rust_decimal::{Decimal, RoundingStrategy};

/// How an existing open order is matched against a rung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RungMatch {
    /// Any open order on the side counts (first placement after a (re)center)
    BySide,
    /// Only an open order at exactly the rung price counts
    ByPrice,
}

/// Why a rung was not placed this tick. Informational, never an error.
#[derive(Debug, Clone, PartialEq)]
pub enum Withheld {
    InsufficientFunds {
        side: Side,
        required: Decimal,
        available: Decimal,
    },
    NonPositivePrice {
        side: Side,
        price: Decimal,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Cancels come first, then placements
    pub intents: Vec<OrderIntent>,
    pub withheld: Vec<Withheld>,
    /// Sides whose rung is already covered by an open order
    pub existing: Vec<Side>,
}

impl Reconciliation {
    pub fn placements(&self) -> impl Iterator<Item = &OrderIntent> {
        self.intents
            .iter()
            .filter(|intent| matches!(intent, OrderIntent::Place { .. }))
    }
}

#[derive(Debug, Clone)]
pub struct OrderReconciler {
    grid_spacing: Decimal,
    min_order_size: Decimal,
    fee_buffer: Decimal,
    amount_precision: u32,
}

impl OrderReconciler {
    pub fn new(grid_spacing: Decimal, min_order_size: Decimal, fee_buffer: Decimal, amount_precision: u32) -> Self {
        Self {
            grid_spacing,
            min_order_size,
            fee_buffer,
            amount_precision,
        }
    }

    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(
            config.grid_spacing,
            config.min_order_size,
            config.fee_buffer,
            config.amount_precision,
        )
    }

    pub fn rung_prices(&self, center: Decimal) -> RungPrices {
        RungPrices::around(center, self.grid_spacing)
    }

    /// Steady-state reconciliation: rungs must sit at exactly the computed prices
    pub fn reconcile(&self, center: Decimal, balances: &Balances, open_orders: &[Order]) -> Reconciliation {
        self.plan(center, balances, open_orders, RungMatch::ByPrice)
    }

    /// First placement around a fresh center
    pub fn initial_placement(&self, center: Decimal, balances: &Balances, open_orders: &[Order]) -> Reconciliation {
        self.plan(center, balances, open_orders, RungMatch::BySide)
    }

    pub fn plan(
        &self,
        center: Decimal,
        balances: &Balances,
        open_orders: &[Order],
        matching: RungMatch,
    ) -> Reconciliation {
        let rungs = self.rung_prices(center);
        let mut cancels = Vec::new();
        let mut places = Vec::new();
        let mut result = Reconciliation::default();

        for side in [Side::Buy, Side::Sell] {
            let rung_price = rungs.price_for(side);
            let on_side: Vec<&Order> = open_orders.iter().filter(|o| o.side == side).collect();

            let covered = match matching {
                RungMatch::BySide => !on_side.is_empty(),
                RungMatch::ByPrice => {
                    let mut kept = false;
                    for order in on_side {
                        if round_price(order.price) == rung_price && !kept {
                            kept = true;
                        } else {
                            // Stale price or duplicate: at most one order per side
                            cancels.push(OrderIntent::Cancel {
                                order_id: order.id.clone(),
                                side,
                                price: order.price,
                            });
                        }
                    }
                    kept
                }
            };

            if covered {
                result.existing.push(side);
                continue;
            }

            match self.size_rung(side, rung_price, balances, matching) {
                Ok(amount) => places.push(OrderIntent::Place {
                    side,
                    price: rung_price,
                    amount,
                }),
                Err(withheld) => result.withheld.push(withheld),
            }
        }

        result.intents = cancels;
        result.intents.extend(places);
        result
    }

    /// Quote needed to buy the minimum size at `price`, fee buffer included
    pub fn quote_required(&self, price: Decimal) -> Decimal {
        self.min_order_size * price * (Decimal::ONE + self.fee_buffer)
    }

    /// Fresh rungs (`BySide`) carry exactly `min_order_size`; steady-state
    /// replacements are sized up to the free balance.
    fn size_rung(
        &self,
        side: Side,
        price: Decimal,
        balances: &Balances,
        matching: RungMatch,
    ) -> Result<Decimal, Withheld> {
        if price <= Decimal::ZERO {
            return Err(Withheld::NonPositivePrice { side, price });
        }

        match side {
            Side::Buy => {
                let required = self.quote_required(price);
                if balances.quote < required {
                    return Err(Withheld::InsufficientFunds {
                        side,
                        required,
                        available: balances.quote,
                    });
                }
                let affordable = balances.quote / price / (Decimal::ONE + self.fee_buffer);
                Ok(self.amount_for(affordable, matching))
            }
            Side::Sell => {
                if balances.base < self.min_order_size {
                    return Err(Withheld::InsufficientFunds {
                        side,
                        required: self.min_order_size,
                        available: balances.base,
                    });
                }
                Ok(self.amount_for(balances.base, matching))
            }
        }
    }

    fn amount_for(&self, affordable: Decimal, matching: RungMatch) -> Decimal {
        match matching {
            RungMatch::BySide => self.min_order_size,
            RungMatch::ByPrice => self.truncate(affordable).max(self.min_order_size),
        }
    }

    fn truncate(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(self.amount_precision, RoundingStrategy::ToZero)
    }
}
