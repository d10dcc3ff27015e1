//! Read-side view the dashboard renders from

use serde::Serialize;

use crate::market::{Asset, Timeframe};
use crate::models::{PortfolioMetric, TradeSignal};
use crate::pipeline::{RefreshReport, UnitStatus};
use crate::store::{DashboardStore, StoreError};

/// Signals and metrics loaded once; timeframe selection filters locally.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    /// Newest first
    pub signals: Vec<TradeSignal>,
    pub metrics: Vec<PortfolioMetric>,
}

impl DashboardView {
    pub async fn load(
        store: &dyn DashboardStore,
        signal_limit: Option<u64>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            signals: store.trade_signals(None, signal_limit).await?,
            metrics: store.portfolio_metrics(None).await?,
        })
    }

    /// Signals for the selected timeframe, keeping newest-first order
    pub fn visible_signals(&self, timeframe: Timeframe) -> Vec<&TradeSignal> {
        self.signals
            .iter()
            .filter(|signal| signal.timeframe == timeframe.as_str())
            .collect()
    }

    pub fn metric_for(&self, timeframe: Timeframe) -> Option<&PortfolioMetric> {
        self.metrics
            .iter()
            .find(|metric| metric.timeframe == timeframe.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StalePair {
    pub asset: Asset,
    pub timeframe: Timeframe,
}

/// Pairs without a successful update in the latest cycle.
///
/// Before any cycle has run every configured pair is stale.
pub fn stale_pairs(
    report: Option<&RefreshReport>,
    assets: &[Asset],
    timeframes: &[Timeframe],
) -> Vec<StalePair> {
    assets
        .iter()
        .flat_map(|&asset| timeframes.iter().map(move |&timeframe| (asset, timeframe)))
        .filter(|&(asset, timeframe)| {
            report.and_then(|r| r.status(asset, timeframe)) != Some(UnitStatus::Success)
        })
        .map(|(asset, timeframe)| StalePair { asset, timeframe })
        .collect()
}
