//! Market-data provider port and the Alpha Vantage adapter

pub mod alpha_vantage;

use async_trait::async_trait;

use crate::market::{Asset, Timeframe};
use crate::models::MarketBar;
use crate::retry::AttemptError;

pub use alpha_vantage::AlphaVantageClient;

/// Source of OHLCV bars for one (asset, timeframe) pair per call
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
    ) -> Result<Vec<MarketBar>, ProviderError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider throttled the request: {0}")]
    Throttled(String),
    #[error("invalid or missing API key: {0}")]
    Unauthorized(String),
    #[error("provider rejected the request: {0}")]
    Api(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("no bars returned for {asset} {timeframe}")]
    Empty { asset: Asset, timeframe: Timeframe },
}

impl ProviderError {
    /// Map a provider failure onto the retry classes.
    ///
    /// Network errors, timeouts, 408/429/5xx and provider throttle notes are
    /// transient. Credential problems stop the whole refresh. Anything else
    /// fails only the current pair.
    pub fn classify(&self) -> AttemptError {
        let message = self.to_string();
        match self {
            ProviderError::Transport(_) | ProviderError::Throttled(_) => {
                AttemptError::Retryable(message)
            }
            ProviderError::Status { status, .. } => match *status {
                401 | 403 => AttemptError::Fatal(message),
                408 | 429 | 500..=599 => AttemptError::Retryable(message),
                _ => AttemptError::Rejected(message),
            },
            ProviderError::Unauthorized(_) => AttemptError::Fatal(message),
            ProviderError::Api(_) | ProviderError::Malformed(_) | ProviderError::Empty { .. } => {
                AttemptError::Rejected(message)
            }
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key
        let e = e.without_url();
        match e.status() {
            Some(status) => ProviderError::Status {
                status: status.as_u16(),
                body: e.to_string(),
            },
            None => ProviderError::Transport(e.to_string()),
        }
    }
}
