//! Unified error handling for the grid bot
//!
//! Collaborator calls return `TradingResult` so the engine can tell
//! "no data this tick" apart from "an order action failed" and branch
//! on it instead of unwinding the whole cycle.

use rust_decimal::Decimal;
use std::io;
use thiserror::Error;

/// Main error type for the grid bot
#[derive(Debug, Error)]
pub enum TradingError {
    // Policy-level outcomes
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Order action failed: {0}")]
    OrderActionFailed(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    // Exchange transport errors
    #[error("API connection error: {0}")]
    ApiConnection(String),

    #[error("API timeout: {0}")]
    ApiTimeout(String),

    #[error("API rate limit exceeded: {0}")]
    ApiRateLimit(String),

    #[error("API response error ({status}): {message}")]
    ApiResponse { status: u16, message: String },

    #[error("API parse error: {0}")]
    ApiParse(String),

    // Configuration errors
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidation(String),

    // IO errors
    #[error("File read error: {0}")]
    FileRead(String),

    #[error("File write error: {0}")]
    FileWrite(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TradingError {
    /// Get a user-friendly error message with helpful context
    pub fn user_message(&self) -> String {
        match self {
            TradingError::ConfigNotFound(path) => {
                format!(
                    "Configuration file not found: {}\n\n\
                    💡 Quick fix:\n\
                    1. Run: grid-bot init\n\
                    2. Edit config.toml (pair, grid_spacing, min_order_size)\n\
                    3. Try again",
                    path
                )
            }
            TradingError::ConfigValidation(msg) => {
                format!(
                    "Configuration validation error: {}\n\n\
                    💡 Check config.toml for:\n\
                    - Positive grid_spacing and min_order_size\n\
                    - trading_fee between 0 and 1\n\
                    - min_sleep_secs <= max_sleep_secs",
                    msg
                )
            }
            TradingError::ApiRateLimit(msg) => {
                format!(
                    "API rate limit exceeded: {}\n\n\
                    💡 Increase [schedule] sleep bounds or wait before retrying",
                    msg
                )
            }
            _ => self.to_string(),
        }
    }

    /// Transient failures worth retrying at the collaborator layer
    pub fn is_retryable(&self) -> bool {
        match self {
            TradingError::ApiTimeout(_)
            | TradingError::ApiConnection(_)
            | TradingError::ApiRateLimit(_) => true,
            TradingError::ApiResponse { status, .. } => matches!(status, 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TradingError::DataUnavailable(_) => "data",

            TradingError::OrderActionFailed(_) | TradingError::InsufficientFunds { .. } => {
                "trading"
            }

            TradingError::ApiConnection(_)
            | TradingError::ApiTimeout(_)
            | TradingError::ApiRateLimit(_)
            | TradingError::ApiResponse { .. }
            | TradingError::ApiParse(_) => "api",

            TradingError::ConfigNotFound(_)
            | TradingError::ConfigParse(_)
            | TradingError::ConfigValidation(_) => "config",

            TradingError::FileRead(_) | TradingError::FileWrite(_) => "io",

            TradingError::Internal(_) => "internal",
        }
    }
}

// Conversion implementations for common error types

impl From<io::Error> for TradingError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => TradingError::ConfigNotFound(err.to_string()),
            io::ErrorKind::TimedOut => TradingError::ApiTimeout(err.to_string()),
            io::ErrorKind::ConnectionRefused => TradingError::ApiConnection(err.to_string()),
            _ => TradingError::FileRead(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for TradingError {
    fn from(err: toml::de::Error) -> Self {
        TradingError::ConfigParse(format!("TOML parse error: {}", err))
    }
}

impl From<toml::ser::Error> for TradingError {
    fn from(err: toml::ser::Error) -> Self {
        TradingError::FileWrite(format!("TOML serialize error: {}", err))
    }
}

impl From<serde_json::Error> for TradingError {
    fn from(err: serde_json::Error) -> Self {
        TradingError::ApiParse(format!("JSON parse error: {}", err))
    }
}

impl From<reqwest::Error> for TradingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TradingError::ApiTimeout(err.to_string())
        } else if let Some(status) = err.status() {
            TradingError::ApiResponse {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            TradingError::ApiParse(err.to_string())
        } else {
            TradingError::ApiConnection(err.to_string())
        }
    }
}

/// Result type alias using TradingError
pub type TradingResult<T> = Result<T, TradingError>;
