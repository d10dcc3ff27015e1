use dotenv::dotenv;
use std::net::SocketAddr;
use std::time::Duration;

use crate::market::{parse_list, Asset, Timeframe};

pub const DEFAULT_ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub alpha_vantage_api_key: String,
    pub alpha_vantage_base_url: String,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub assets: Vec<Asset>,
    pub timeframes: Vec<Timeframe>,
    pub rate_limit_per_minute: u32,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub http_timeout: Duration,
    /// Periodic refresh; `None` means refresh only on request
    pub refresh_interval: Option<Duration>,
    pub run_migrations: bool,
    pub cors_allow_any: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let alpha_vantage_api_key = required("ALPHA_VANTAGE_API_KEY")?;
        let database_url = required("DATABASE_URL")?;

        let assets: Vec<Asset> = match get("PIPELINE_ASSETS") {
            Some(raw) => parse_list(&raw).map_err(|e| invalid("PIPELINE_ASSETS", e))?,
            None => Asset::ALL.to_vec(),
        };
        let timeframes: Vec<Timeframe> = match get("PIPELINE_TIMEFRAMES") {
            Some(raw) => parse_list(&raw).map_err(|e| invalid("PIPELINE_TIMEFRAMES", e))?,
            None => Timeframe::ALL.to_vec(),
        };
        if assets.is_empty() {
            return Err(invalid("PIPELINE_ASSETS", "no assets configured"));
        }
        if timeframes.is_empty() {
            return Err(invalid("PIPELINE_TIMEFRAMES", "no timeframes configured"));
        }

        let rate_limit_per_minute = parse_or(&get, "RATE_LIMIT_PER_MINUTE", 5u32)?;
        if rate_limit_per_minute == 0 {
            return Err(invalid("RATE_LIMIT_PER_MINUTE", "must be at least 1"));
        }
        let retry_attempts = parse_or(&get, "RETRY_ATTEMPTS", 3u32)?;
        if retry_attempts == 0 {
            return Err(invalid("RETRY_ATTEMPTS", "must be at least 1"));
        }

        let refresh_interval = match parse_or(&get, "REFRESH_INTERVAL_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Config {
            alpha_vantage_api_key,
            alpha_vantage_base_url: get("ALPHA_VANTAGE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ALPHA_VANTAGE_URL.to_string()),
            database_url,
            bind_addr: parse_or(&get, "API_BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 5000)))?,
            assets,
            timeframes,
            rate_limit_per_minute,
            retry_attempts,
            retry_delay: Duration::from_secs(parse_or(&get, "RETRY_DELAY_SECS", 5u64)?),
            http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", 30u64)?),
            refresh_interval,
            run_migrations: parse_bool(&get, "RUN_MIGRATIONS", true)?,
            cors_allow_any: parse_bool(&get, "CORS_ALLOW_ANY", true)?,
        })
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(name, e)),
        None => Ok(default),
    }
}

fn parse_bool<G>(get: &G, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(invalid(name, format!("expected a boolean, got {other}"))),
        },
        None => Ok(default),
    }
}
