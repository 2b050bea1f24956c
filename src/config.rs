// Configuration management for the grid bot

use crate::error::{TradingError, TradingResult};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    pub pair: String,
    pub grid_spacing: Decimal,
    pub min_order_size: Decimal,
    pub trading_fee: Decimal,
    #[serde(default = "default_fee_buffer")]
    pub fee_buffer: Decimal,
    #[serde(default = "default_amount_precision")]
    pub amount_precision: u32,
    /// Center used for the very first placement instead of the live price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_center: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Falls back to `grid_spacing` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_shift_threshold: Option<Decimal>,
    #[serde(default = "default_trend_shift_threshold")]
    pub trend_shift_threshold: Decimal,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_timeframe")]
    pub candle_timeframe: String,
    #[serde(default = "default_candle_limit")]
    pub candle_limit: usize,
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_min_sleep")]
    pub min_sleep_secs: u64,
    #[serde(default = "default_max_sleep")]
    pub max_sleep_secs: u64,
    #[serde(default = "default_error_backoff")]
    pub error_backoff_secs: u64,
    /// Pause between consecutive cancels during cancel-all
    #[serde(default = "default_cancel_pause")]
    pub cancel_pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(default = "default_rest_url")]
    pub rest_url: String,
    /// Exchange-native pair name, derived from `trading.pair` when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_pair: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,
    #[serde(default = "default_paper_quote")]
    pub paper_quote_balance: Decimal,
    #[serde(default)]
    pub paper_base_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub trading: TradingConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

// Default value functions
fn default_fee_buffer() -> Decimal { dec!(0.001) }
fn default_amount_precision() -> u32 { 8 }
fn default_trend_shift_threshold() -> Decimal { dec!(100) }
fn default_idle_timeout() -> u64 { 300 }
fn default_timeframe() -> String { "1h".to_string() }
fn default_candle_limit() -> usize { 50 }
fn default_short_window() -> usize { 10 }
fn default_long_window() -> usize { 50 }
fn default_min_sleep() -> u64 { 30 }
fn default_max_sleep() -> u64 { 60 }
fn default_error_backoff() -> u64 { 10 }
fn default_cancel_pause() -> u64 { 500 }
fn default_rest_url() -> String { "https://api.kraken.com".to_string() }
fn default_max_retries() -> u32 { 3 }
fn default_backoff_base() -> u64 { 1000 }
fn default_backoff_max() -> u64 { 8000 }
fn default_paper_quote() -> Decimal { dec!(1000) }
fn default_log_level() -> String { "info".to_string() }

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            pair: "BTC/USDT".to_string(),
            grid_spacing: dec!(500),
            min_order_size: dec!(0.0011),
            trading_fee: dec!(0.001),
            fee_buffer: default_fee_buffer(),
            amount_precision: default_amount_precision(),
            initial_center: None,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            price_shift_threshold: None,
            trend_shift_threshold: default_trend_shift_threshold(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            candle_timeframe: default_timeframe(),
            candle_limit: default_candle_limit(),
            short_window: default_short_window(),
            long_window: default_long_window(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            min_sleep_secs: default_min_sleep(),
            max_sleep_secs: default_max_sleep(),
            error_backoff_secs: default_error_backoff(),
            cancel_pause_ms: default_cancel_pause(),
        }
    }
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            rest_url: default_rest_url(),
            exchange_pair: None,
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base(),
            backoff_max_ms: default_backoff_max(),
            paper_quote_balance: default_paper_quote(),
            paper_base_balance: Decimal::ZERO,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trading: TradingConfig::default(),
            policy: PolicyConfig::default(),
            market: MarketConfig::default(),
            schedule: ScheduleConfig::default(),
            exchange: ExchangeConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl PolicyConfig {
    /// Drift threshold, defaulting to one grid spacing
    pub fn effective_price_shift_threshold(&self, grid_spacing: Decimal) -> Decimal {
        self.price_shift_threshold.unwrap_or(grid_spacing)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TradingResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(TradingError::ConfigNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| TradingError::FileRead(e.to_string()))?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> TradingResult<()> {
        let content = toml::to_string_pretty(self)?;

        fs::write(path, content)
            .map_err(|e| TradingError::FileWrite(e.to_string()))?;

        Ok(())
    }

    /// Load configuration from file, or create default if file doesn't exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> TradingResult<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.to_file(&path)?;
            info!("📁 Created default config file: {}", path.as_ref().display());
            Ok(config)
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> TradingResult<()> {
        let trading = &self.trading;

        if trading.pair.split('/').count() != 2 {
            return Err(invalid("pair must look like BASE/QUOTE"));
        }

        if trading.grid_spacing <= Decimal::ZERO {
            return Err(invalid("grid_spacing must be positive"));
        }

        if trading.min_order_size <= Decimal::ZERO {
            return Err(invalid("min_order_size must be positive"));
        }

        if trading.min_order_size.scale() > trading.amount_precision {
            return Err(invalid("min_order_size has more decimals than amount_precision"));
        }

        if trading.trading_fee < Decimal::ZERO || trading.trading_fee >= Decimal::ONE {
            return Err(invalid("trading_fee must be in [0, 1)"));
        }

        if trading.fee_buffer < Decimal::ZERO || trading.fee_buffer >= Decimal::ONE {
            return Err(invalid("fee_buffer must be in [0, 1)"));
        }

        if let Some(center) = trading.initial_center {
            if center <= Decimal::ZERO {
                return Err(invalid("initial_center must be positive"));
            }
        }

        if let Some(threshold) = self.policy.price_shift_threshold {
            if threshold <= Decimal::ZERO {
                return Err(invalid("price_shift_threshold must be positive"));
            }
        }

        if self.policy.trend_shift_threshold < Decimal::ZERO {
            return Err(invalid("trend_shift_threshold must be non-negative"));
        }

        if self.market.short_window == 0 || self.market.long_window < self.market.short_window {
            return Err(invalid("windows must satisfy 0 < short_window <= long_window"));
        }

        if self.market.candle_limit < self.market.long_window {
            return Err(invalid("candle_limit must cover long_window"));
        }

        if self.schedule.min_sleep_secs > self.schedule.max_sleep_secs {
            return Err(invalid("min_sleep_secs must not exceed max_sleep_secs"));
        }

        if self.exchange.backoff_base_ms > self.exchange.backoff_max_ms {
            return Err(invalid("backoff_base_ms must not exceed backoff_max_ms"));
        }

        Ok(())
    }
}

fn invalid(msg: &str) -> TradingError {
    TradingError::ConfigValidation(msg.to_string())
}
