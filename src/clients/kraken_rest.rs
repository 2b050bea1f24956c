// Kraken public REST market data (ticker + OHLC), used as the paper exchange feed

use crate::clients::MarketFeed;
use crate::core::types::Candle;
use crate::error::{TradingError, TradingResult};
use async_trait::async_trait;
use chrono::DateTime;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct KrakenPublicClient {
    client: reqwest::Client,
    base_url: String,
    pair_override: Option<String>,
}

impl KrakenPublicClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            pair_override: None,
        }
    }

    /// Use an exchange-native pair name instead of deriving one
    pub fn with_pair_override(mut self, pair: Option<String>) -> Self {
        self.pair_override = pair;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// "BTC/USDT" -> "XBTUSDT"
    pub fn kraken_pair(&self, instrument: &str) -> String {
        if let Some(pair) = &self.pair_override {
            return pair.clone();
        }
        instrument
            .split('/')
            .map(|asset| if asset.eq_ignore_ascii_case("BTC") { "XBT".to_string() } else { asset.to_uppercase() })
            .collect::<Vec<_>>()
            .concat()
    }

    pub async fn fetch_ticker(&self, instrument: &str) -> TradingResult<Decimal> {
        let pair = self.kraken_pair(instrument);
        let json = self.get_public("Ticker", &[("pair", pair)]).await?;
        parse_ticker(&json)
    }

    pub async fn fetch_ohlc(&self, instrument: &str, timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>> {
        let pair = self.kraken_pair(instrument);
        let interval = timeframe_minutes(timeframe)?;
        let json = self
            .get_public("OHLC", &[("pair", pair), ("interval", interval.to_string())])
            .await?;
        parse_ohlc(&json, limit)
    }

    async fn get_public(&self, endpoint: &str, params: &[(&str, String)]) -> TradingResult<Value> {
        let url = format!("{}/0/public/{}", self.base_url, endpoint);
        debug!("GET {} {:?}", url, params);

        let response = self.client.get(&url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TradingError::ApiResponse {
                status: status.as_u16(),
                message: format!("{} returned {}", endpoint, status),
            });
        }

        let json: Value = response.json().await?;
        check_kraken_errors(&json)?;
        Ok(json)
    }
}

#[async_trait]
impl MarketFeed for KrakenPublicClient {
    async fn latest_price(&self, instrument: &str) -> TradingResult<Option<Decimal>> {
        self.fetch_ticker(instrument).await.map(Some)
    }

    async fn candles(&self, instrument: &str, timeframe: &str, limit: usize) -> TradingResult<Vec<Candle>> {
        self.fetch_ohlc(instrument, timeframe, limit).await
    }
}

/// Timeframe strings such as "15m", "1h", "1d" to Kraken interval minutes
pub fn timeframe_minutes(timeframe: &str) -> TradingResult<u32> {
    let invalid = || TradingError::ConfigValidation(format!("unsupported candle timeframe: {}", timeframe));

    let unit = timeframe.chars().last().ok_or_else(invalid)?;
    let count: u32 = timeframe[..timeframe.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| invalid())?;
    let minutes = match unit {
        'm' => count,
        'h' => count.saturating_mul(60),
        'd' => count.saturating_mul(1440),
        'w' => count.saturating_mul(10080),
        _ => return Err(invalid()),
    };

    match minutes {
        1 | 5 | 15 | 30 | 60 | 240 | 1440 | 10080 => Ok(minutes),
        _ => Err(invalid()),
    }
}

fn check_kraken_errors(json: &Value) -> TradingResult<()> {
    let errors: Vec<&str> = json["error"]
        .as_array()
        .map(|errs| errs.iter().filter_map(|e| e.as_str()).collect())
        .unwrap_or_default();

    if errors.is_empty() {
        return Ok(());
    }

    let message = errors.join(", ");
    if message.contains("Rate limit") || message.contains("Too many requests") {
        Err(TradingError::ApiRateLimit(message))
    } else if message.contains("Unavailable") || message.contains("Busy") {
        Err(TradingError::ApiResponse { status: 503, message })
    } else {
        Err(TradingError::ApiResponse { status: 400, message })
    }
}

/// First array/object entry of `result`, skipping Kraken's "last" cursor
fn pair_payload<'a>(json: &'a Value, want_array: bool) -> TradingResult<&'a Value> {
    let result = json["result"]
        .as_object()
        .ok_or_else(|| TradingError::ApiParse("Missing result field".to_string()))?;

    result
        .iter()
        .filter(|(key, _)| key.as_str() != "last")
        .map(|(_, value)| value)
        .find(|value| if want_array { value.is_array() } else { value.is_object() })
        .ok_or_else(|| TradingError::ApiParse("Missing pair data".to_string()))
}

fn parse_decimal(value: &Value, what: &str) -> TradingResult<Decimal> {
    value
        .as_str()
        .and_then(|s| Decimal::from_str(s).ok())
        .ok_or_else(|| TradingError::ApiParse(format!("Invalid {}", what)))
}

pub fn parse_ticker(json: &Value) -> TradingResult<Decimal> {
    let ticker = pair_payload(json, false)?;
    parse_decimal(&ticker["c"][0], "last trade price")
}

/// Close series in chronological order, keeping the most recent `limit` candles
pub fn parse_ohlc(json: &Value, limit: usize) -> TradingResult<Vec<Candle>> {
    let rows = pair_payload(json, true)?
        .as_array()
        .ok_or_else(|| TradingError::ApiParse("Invalid OHLC data format".to_string()))?;

    let mut candles = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(fields) = row.as_array() else { continue };
        if fields.len() < 5 {
            continue; // Skip malformed candles
        }

        let seconds = fields[0]
            .as_i64()
            .ok_or_else(|| TradingError::ApiParse("Invalid timestamp".to_string()))?;
        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| TradingError::ApiParse("Invalid timestamp conversion".to_string()))?;
        let close = parse_decimal(&fields[4], "close price")?;

        candles.push(Candle { timestamp, close });
    }

    candles.sort_by_key(|candle| candle.timestamp);
    if candles.len() > limit {
        candles.drain(..candles.len() - limit);
    }
    Ok(candles)
}
