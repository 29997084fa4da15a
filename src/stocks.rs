//! Daily stock quotes from the Alpha Vantage `TIME_SERIES_DAILY` endpoint.
//!
//! The provider reports most failures inside a `200 OK` JSON body, so the
//! outcome is decided by the shape of that body (see [`classify`]).

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::StockError;

pub const TIME_SERIES_KEY: &str = "Time Series (Daily)";
pub const RATE_LIMIT_KEY: &str = "Note";
pub const ERROR_MESSAGE_KEY: &str = "Error Message";

/// Prices of one ticker on its most recent trading day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockQuote {
    pub ticker: String,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Trim and upper-case a submitted ticker
pub fn normalize_ticker(raw: &str) -> Result<String, StockError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        Err(StockError::EmptyTicker)
    } else {
        Ok(ticker)
    }
}

/// The most recent date key of a time series
///
/// Keys are compared as calendar dates when they parse as `YYYY-MM-DD`; those
/// always rank above keys that don't, which fall back to string order.
pub fn latest_date(series: &Map<String, Value>) -> Option<&str> {
    series
        .keys()
        .max_by_key(|&key| (NaiveDate::parse_from_str(key, "%Y-%m-%d").ok(), key.as_str()))
        .map(String::as_str)
}

/// Turn a provider response body into a quote or a categorised error
///
/// Checked in order: time series, rate-limit note, error message. Anything
/// else is an unexpected response.
pub fn classify(ticker: &str, body: &Value) -> Result<StockQuote, StockError> {
    let Some(body) = body.as_object() else {
        return Err(StockError::UnexpectedResponse);
    };

    if let Some(series) = body.get(TIME_SERIES_KEY) {
        let series = series.as_object().ok_or(StockError::UnexpectedResponse)?;
        let date = latest_date(series).ok_or(StockError::UnexpectedResponse)?;
        return quote_for(ticker, date, &series[date]);
    }
    if body.contains_key(RATE_LIMIT_KEY) {
        return Err(StockError::RateLimit);
    }
    if body.contains_key(ERROR_MESSAGE_KEY) {
        return Err(StockError::InvalidTicker);
    }
    Err(StockError::UnexpectedResponse)
}

fn quote_for(ticker: &str, date: &str, prices: &Value) -> Result<StockQuote, StockError> {
    let price = |field: &str| -> Result<f64, StockError> {
        let value = prices.get(field);
        value
            .and_then(|v| match v {
                Value::String(s) => s.trim().parse::<f64>().ok(),
                other => other.as_f64(),
            })
            .ok_or_else(|| malformed(date, field))
    };

    let volume = prices
        .get("5. volume")
        .and_then(|v| match v {
            Value::String(s) => s.trim().parse::<u64>().ok(),
            other => other.as_u64(),
        })
        .ok_or_else(|| malformed(date, "5. volume"))?;

    Ok(StockQuote {
        ticker: ticker.to_string(),
        date: date.to_string(),
        open: price("1. open")?,
        high: price("2. high")?,
        low: price("3. low")?,
        close: price("4. close")?,
        volume,
    })
}

fn malformed(date: &str, field: &str) -> StockError {
    StockError::MalformedQuote {
        date: date.to_string(),
        field: field.to_string(),
    }
}

/// Somewhere daily series come from
#[cfg(feature = "web")]
#[async_trait::async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the raw response body for `ticker`
    ///
    /// Only transport and decoding failures are errors here; provider-level
    /// failures come back as a body for [`classify`].
    async fn daily_series(&self, ticker: &str) -> Result<Value, StockError>;
}

/// HTTP client for the quote provider
#[cfg(feature = "web")]
#[derive(Debug, Clone)]
pub struct AlphaVantage {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[cfg(feature = "web")]
impl AlphaVantage {
    pub fn new(config: &crate::config::Config) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.api_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/query", self.base_url)
    }
}

#[cfg(feature = "web")]
#[async_trait::async_trait]
impl QuoteSource for AlphaVantage {
    async fn daily_series(&self, ticker: &str) -> Result<Value, StockError> {
        let network = |e: reqwest::Error| StockError::Network(e.to_string());

        let response = self
            .client
            .get(self.endpoint())
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", ticker),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(network)?;

        log::debug!("quote provider answered {} for {}", response.status(), ticker);
        response.json::<Value>().await.map_err(network)
    }
}

/// Look up the latest daily quote for a submitted ticker
///
/// Makes at most one call to `source`, and none for an empty ticker.
#[cfg(feature = "web")]
pub async fn lookup(source: &dyn QuoteSource, raw_ticker: &str) -> Result<StockQuote, StockError> {
    let ticker = normalize_ticker(raw_ticker)?;
    let body = source.daily_series(&ticker).await?;
    let outcome = classify(&ticker, &body);
    match &outcome {
        Ok(quote) => log::info!("quote for {} on {}", quote.ticker, quote.date),
        Err(e) => log::warn!("quote lookup for {} failed: {}", ticker, e),
    }
    outcome
}
