//! Alpha Vantage REST client
//!
//! Gold is requested through the FX endpoints (`XAU`/`USD`), the index through
//! the equity time-series endpoints (`^NDX`). Responses are JSON objects keyed
//! by timestamp, in the time zone named in the response meta data.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::{MarketDataProvider, ProviderError};
use crate::market::{Asset, Timeframe};
use crate::models::MarketBar;

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        })
    }

    /// Query string for one (asset, timeframe) request
    pub fn query_params(&self, asset: Asset, timeframe: Timeframe) -> Vec<(&'static str, String)> {
        let function = match (asset, timeframe.is_intraday()) {
            (Asset::Xauusd, true) => "FX_INTRADAY",
            (Asset::Xauusd, false) => "FX_DAILY",
            (Asset::Nasdaq, true) => "TIME_SERIES_INTRADAY",
            (Asset::Nasdaq, false) => "TIME_SERIES_DAILY",
        };

        let mut params = vec![
            ("function", function.to_string()),
            ("apikey", self.api_key.clone()),
            ("outputsize", "compact".to_string()),
        ];
        if timeframe.is_intraday() {
            params.push(("interval", timeframe.provider_interval().to_string()));
        }
        match asset {
            Asset::Xauusd => {
                params.push(("from_symbol", "XAU".to_string()));
                params.push(("to_symbol", "USD".to_string()));
            }
            Asset::Nasdaq => params.push(("symbol", "^NDX".to_string())),
        }
        params
    }
}

#[async_trait]
impl MarketDataProvider for AlphaVantageClient {
    async fn fetch_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
    ) -> Result<Vec<MarketBar>, ProviderError> {
        debug!("Requesting {} {} from Alpha Vantage", asset, timeframe);
        let response = self
            .http
            .get(&self.base_url)
            .query(&self.query_params(asset, timeframe))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // Body read failures (timeouts, resets) stay transport errors
        let raw = response.bytes().await?;
        let body: Value =
            serde_json::from_slice(&raw).map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let bars = parse_series(asset, timeframe, &body)?;
        info!("Fetched {} bars for {} {}", bars.len(), asset, timeframe);
        Ok(bars)
    }
}

/// Turn an Alpha Vantage JSON body into bars sorted oldest first
pub fn parse_series(
    asset: Asset,
    timeframe: Timeframe,
    body: &Value,
) -> Result<Vec<MarketBar>, ProviderError> {
    let object = body
        .as_object()
        .ok_or_else(|| ProviderError::Malformed("response is not a JSON object".to_string()))?;

    if let Some(message) = object.get("Error Message").and_then(Value::as_str) {
        let lower = message.to_lowercase();
        if lower.contains("apikey") || lower.contains("api key") {
            return Err(ProviderError::Unauthorized(message.to_string()));
        }
        return Err(ProviderError::Api(message.to_string()));
    }
    if let Some(message) = object.get("Note").and_then(Value::as_str) {
        return Err(ProviderError::Throttled(message.to_string()));
    }
    // "Information" is either the per-minute throttle notice or a permanent
    // refusal (premium endpoint, daily quota)
    if let Some(message) = object.get("Information").and_then(Value::as_str) {
        let lower = message.to_lowercase();
        if lower.contains("premium") || lower.contains("per day") || lower.contains("daily") {
            return Err(ProviderError::Api(message.to_string()));
        }
        return Err(ProviderError::Throttled(message.to_string()));
    }

    let series = object
        .iter()
        .find(|(key, _)| key.starts_with("Time Series"))
        .and_then(|(_, value)| value.as_object())
        .ok_or_else(|| ProviderError::Malformed("missing time series".to_string()))?;

    let tz = meta_time_zone(object.get("Meta Data"));
    let mut bars = Vec::with_capacity(series.len());
    for (stamp, values) in series {
        let timestamp = parse_timestamp(stamp, tz)?;
        let values = values
            .as_object()
            .ok_or_else(|| ProviderError::Malformed(format!("bar {stamp} is not an object")))?;

        bars.push(MarketBar {
            timestamp,
            asset,
            timeframe,
            open: field(values, "1. open", stamp)?,
            high: field(values, "2. high", stamp)?,
            low: field(values, "3. low", stamp)?,
            close: field(values, "4. close", stamp)?,
            // FX series carry no volume
            volume: match values.get("5. volume") {
                Some(_) => field(values, "5. volume", stamp)? as i64,
                None => 0,
            },
        });
    }

    if bars.is_empty() {
        return Err(ProviderError::Empty { asset, timeframe });
    }
    bars.sort_by_key(|bar| bar.timestamp);
    Ok(bars)
}

fn meta_time_zone(meta: Option<&Value>) -> Tz {
    meta.and_then(Value::as_object)
        .and_then(|meta| {
            meta.iter()
                .find(|(key, _)| key.ends_with("Time Zone"))
                .and_then(|(_, value)| value.as_str())
        })
        .and_then(|name| name.parse::<Tz>().ok())
        .unwrap_or(Tz::UTC)
}

fn parse_timestamp(raw: &str, tz: Tz) -> Result<DateTime<Utc>, ProviderError> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d").map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
        .map_err(|e| ProviderError::Malformed(format!("bad timestamp {raw}: {e}")))?;

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| ProviderError::Malformed(format!("timestamp {raw} does not exist in {tz}")))
}

fn field(values: &Map<String, Value>, name: &str, stamp: &str) -> Result<f64, ProviderError> {
    let raw = values
        .get(name)
        .ok_or_else(|| ProviderError::Malformed(format!("bar {stamp} is missing {name}")))?;
    let parsed = match raw {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| ProviderError::Malformed(format!("bar {stamp} has a bad {name}: {raw}")))
}
