//! Fetch-and-store pipeline
//!
//! One invocation walks every configured (asset, timeframe) pair in order.
//! For each pair it asks the provider for bars (at most `max_attempts` times,
//! every attempt gated by the shared rate limiter) and upserts them. A pair
//! that cannot be fetched or stored is reported as failed and the walk goes
//! on; only a fatal provider error stops the invocation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::market::{Asset, Timeframe};
use crate::provider::MarketDataProvider;
use crate::rate_limit::RollingWindowLimiter;
use crate::retry::{run_with_retry, RetryError, RetryPolicy};
use crate::store::{BarStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Success,
    Failed,
}

/// `{ asset: { timeframe: "success" | "failed" } }`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshReport(pub BTreeMap<Asset, BTreeMap<Timeframe, UnitStatus>>);

impl RefreshReport {
    pub fn record(&mut self, asset: Asset, timeframe: Timeframe, status: UnitStatus) {
        self.0.entry(asset).or_default().insert(timeframe, status);
    }

    pub fn status(&self, asset: Asset, timeframe: Timeframe) -> Option<UnitStatus> {
        self.0.get(&asset)?.get(&timeframe).copied()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (Asset, Timeframe, UnitStatus)> + '_ {
        self.0.iter().flat_map(|(asset, timeframes)| {
            timeframes
                .iter()
                .map(move |(timeframe, status)| (*asset, *timeframe, *status))
        })
    }

    pub fn failed_pairs(&self) -> Vec<(Asset, Timeframe)> {
        self.pairs()
            .filter(|(_, _, status)| *status == UnitStatus::Failed)
            .map(|(asset, timeframe, _)| (asset, timeframe))
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.pairs().all(|(_, _, status)| status == UnitStatus::Success)
    }

    pub fn len(&self) -> usize {
        self.0.values().map(BTreeMap::len).sum()
    }
}

/// Why a single pair failed
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error(transparent)]
    Fetch(RetryError),
    #[error("storing bars failed: {0}")]
    Store(#[from] StoreError),
}

/// Terminal state of one unit of work
#[derive(Debug)]
pub enum UnitOutcome {
    Stored { attempts: u32, bars: u64 },
    Failed(UnitError),
}

impl UnitOutcome {
    pub fn status(&self) -> UnitStatus {
        match self {
            UnitOutcome::Stored { .. } => UnitStatus::Success,
            UnitOutcome::Failed(_) => UnitStatus::Failed,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("refresh aborted on {asset} {timeframe}: {reason}")]
    Fatal {
        asset: Asset,
        timeframe: Timeframe,
        reason: String,
        /// Pairs that reached a terminal status before the abort
        completed: RefreshReport,
    },
}

pub struct Pipeline {
    provider: Arc<dyn MarketDataProvider>,
    store: Arc<dyn BarStore>,
    limiter: Arc<RollingWindowLimiter>,
    policy: RetryPolicy,
    assets: Vec<Asset>,
    timeframes: Vec<Timeframe>,
}

impl Pipeline {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        store: Arc<dyn BarStore>,
        limiter: Arc<RollingWindowLimiter>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            store,
            limiter,
            policy,
            assets: Asset::ALL.to_vec(),
            timeframes: Timeframe::ALL.to_vec(),
        }
    }

    /// Restrict the pairs a refresh covers
    pub fn with_universe(mut self, assets: Vec<Asset>, timeframes: Vec<Timeframe>) -> Self {
        self.assets = assets;
        self.timeframes = timeframes;
        self
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    /// Run every configured pair to a terminal status
    pub async fn run(&self) -> Result<RefreshReport, PipelineError> {
        info!(
            "Refreshing {} assets x {} timeframes",
            self.assets.len(),
            self.timeframes.len()
        );
        let mut report = RefreshReport::default();

        for &asset in &self.assets {
            for &timeframe in &self.timeframes {
                match self.run_unit(asset, timeframe).await {
                    Ok(outcome) => report.record(asset, timeframe, outcome.status()),
                    Err(PipelineError::Fatal {
                        asset,
                        timeframe,
                        reason,
                        ..
                    }) => {
                        return Err(PipelineError::Fatal {
                            asset,
                            timeframe,
                            reason,
                            completed: report,
                        })
                    }
                }
            }
        }

        let failed = report.failed_pairs();
        if failed.is_empty() {
            info!("Refresh finished: all {} pairs updated", report.len());
        } else {
            warn!(
                "Refresh finished: {} of {} pairs failed",
                failed.len(),
                report.len()
            );
        }
        Ok(report)
    }

    /// Fetch and store one pair. Only fatal provider errors are returned as `Err`.
    pub async fn run_unit(
        &self,
        asset: Asset,
        timeframe: Timeframe,
    ) -> Result<UnitOutcome, PipelineError> {
        let mut attempts = 0;
        let fetched = run_with_retry(&self.policy, &self.limiter, |attempt| {
            attempts = attempt;
            info!("{} {}: attempt {}", asset, timeframe, attempt);
            let provider = Arc::clone(&self.provider);
            async move {
                provider
                    .fetch_bars(asset, timeframe)
                    .await
                    .map_err(|e| e.classify())
            }
        })
        .await;

        let bars = match fetched {
            Ok(bars) => bars,
            Err(e) if e.is_fatal() => {
                error!("{} {}: {}", asset, timeframe, e);
                return Err(PipelineError::Fatal {
                    asset,
                    timeframe,
                    reason: e.to_string(),
                    completed: RefreshReport::default(),
                });
            }
            Err(e) => {
                warn!("{} {} failed: {}", asset, timeframe, e);
                return Ok(UnitOutcome::Failed(UnitError::Fetch(e)));
            }
        };

        match self.store.upsert_bars(&bars).await {
            Ok(written) => {
                info!(
                    "{} {}: stored {} bars after {} attempt(s)",
                    asset, timeframe, written, attempts
                );
                Ok(UnitOutcome::Stored {
                    attempts,
                    bars: written,
                })
            }
            Err(e) => {
                warn!("{} {}: fetched but could not store bars: {}", asset, timeframe, e);
                Ok(UnitOutcome::Failed(UnitError::Store(e)))
            }
        }
    }
}
