// Trend detection from candle closes (short vs long SMA crossover)

use crate::config::MarketConfig;
use crate::core::types::{Candle, Trend};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct TrendClassifier {
    short_window: usize,
    long_window: usize,
}

impl Default for TrendClassifier {
    fn default() -> Self {
        Self::new(10, 50)
    }
}

impl TrendClassifier {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }

    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(config.short_window, config.long_window)
    }

    /// Minimum number of candles needed for a verdict
    pub fn required_candles(&self) -> usize {
        self.long_window.max(self.short_window)
    }

    pub fn classify(&self, candles: &[Candle]) -> Trend {
        if candles.len() < self.required_candles() {
            return Trend::InsufficientData;
        }

        let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();
        let (Some(sma_short), Some(sma_long)) = (
            calculate_sma(&closes, self.short_window),
            calculate_sma(&closes, self.long_window),
        ) else {
            return Trend::InsufficientData;
        };

        match sma_short.cmp(&sma_long) {
            std::cmp::Ordering::Greater => Trend::Uptrend,
            std::cmp::Ordering::Less => Trend::Downtrend,
            std::cmp::Ordering::Equal => Trend::Sideways,
        }
    }
}

/// Mean of the last `period` prices, `None` if there are fewer than `period`
pub fn calculate_sma(prices: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let start = prices.len() - period;
    let sum: Decimal = prices[start..].iter().sum();
    Some(sum / Decimal::from(period))
}
