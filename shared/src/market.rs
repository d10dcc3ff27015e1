//! Closed enumerations for the assets and timeframes the pipeline tracks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Instruments fetched from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Asset {
    /// Gold against the US dollar
    #[serde(rename = "XAUUSD")]
    Xauusd,
    /// Nasdaq-100 index
    #[serde(rename = "NASDAQ")]
    Nasdaq,
}

impl Asset {
    pub const ALL: [Asset; 2] = [Asset::Xauusd, Asset::Nasdaq];

    pub fn as_str(&self) -> &'static str {
        match self {
            Asset::Xauusd => "XAUUSD",
            Asset::Nasdaq => "NASDAQ",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Asset {
    type Err = ParseMarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XAUUSD" => Ok(Asset::Xauusd),
            "NASDAQ" => Ok(Asset::Nasdaq),
            other => Err(ParseMarketError::Asset(other.to_string())),
        }
    }
}

/// Bar intervals, sub-minute through daily.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 6] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    /// Interval name the provider expects
    pub fn provider_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1min",
            Timeframe::M5 => "5min",
            Timeframe::M15 => "15min",
            Timeframe::H1 => "60min",
            Timeframe::H4 => "240min",
            Timeframe::D1 => "daily",
        }
    }

    pub fn is_intraday(&self) -> bool {
        !matches!(self, Timeframe::D1)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = ParseMarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" => Ok(Timeframe::M1),
            "5m" => Ok(Timeframe::M5),
            "15m" => Ok(Timeframe::M15),
            "1h" => Ok(Timeframe::H1),
            "4h" => Ok(Timeframe::H4),
            "1d" => Ok(Timeframe::D1),
            other => Err(ParseMarketError::Timeframe(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseMarketError {
    #[error("unknown asset: {0}")]
    Asset(String),
    #[error("unknown timeframe: {0}")]
    Timeframe(String),
}

/// Parse a comma separated list, e.g. `"XAUUSD,NASDAQ"`. Duplicates are dropped.
pub fn parse_list<T>(raw: &str) -> Result<Vec<T>, ParseMarketError>
where
    T: FromStr<Err = ParseMarketError> + PartialEq,
{
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let value = part.parse::<T>()?;
        if !out.contains(&value) {
            out.push(value);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_keys_roundtrip_through_serde() {
        let json = serde_json::to_string(&Timeframe::H4).unwrap();
        assert_eq!(json, "\"4h\"");
        let tf: Timeframe = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(tf, Timeframe::M15);
    }

    #[test]
    fn test_provider_intervals() {
        assert_eq!(Timeframe::H1.provider_interval(), "60min");
        assert_eq!(Timeframe::D1.provider_interval(), "daily");
        assert!(!Timeframe::D1.is_intraday());
    }

    #[test]
    fn test_parse_list() {
        let assets: Vec<Asset> = parse_list("xauusd, NASDAQ,XAUUSD").unwrap();
        assert_eq!(assets, vec![Asset::Xauusd, Asset::Nasdaq]);

        let err = parse_list::<Timeframe>("1m,2h").unwrap_err();
        assert_eq!(err, ParseMarketError::Timeframe("2h".to_string()));
    }
}
