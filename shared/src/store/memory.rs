//! In-process store with the same ordering and upsert rules as the database

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{BarStore, DashboardStore, StoreError};
use crate::market::{Asset, Timeframe};
use crate::models::{MarketBar, PortfolioMetric, TradeSignal};

type BarKey = (Asset, Timeframe, DateTime<Utc>);

#[derive(Debug, Default)]
pub struct MemoryStore {
    bars: RwLock<BTreeMap<BarKey, MarketBar>>,
    signals: RwLock<Vec<TradeSignal>>,
    metrics: RwLock<BTreeMap<String, PortfolioMetric>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `upsert_bars` fail, e.g. to simulate an outage
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn bar_count(&self) -> usize {
        self.bars.read().await.len()
    }

    pub async fn get_bar(
        &self,
        asset: Asset,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Option<MarketBar> {
        self.bars
            .read()
            .await
            .get(&(asset, timeframe, timestamp))
            .cloned()
    }

    /// Signals come from an external producer; this seeds them
    pub async fn insert_signal(&self, signal: TradeSignal) {
        self.signals.write().await.push(signal);
    }

    pub async fn put_metric(&self, metric: PortfolioMetric) {
        self.metrics
            .write()
            .await
            .insert(metric.timeframe.clone(), metric);
    }
}

#[async_trait]
impl BarStore for MemoryStore {
    async fn upsert_bars(&self, bars: &[MarketBar]) -> Result<u64, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        let mut stored = self.bars.write().await;
        for bar in bars {
            stored.insert(bar.key(), bar.clone());
        }
        Ok(bars.len() as u64)
    }
}

#[async_trait]
impl DashboardStore for MemoryStore {
    async fn market_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
        limit: Option<u64>,
    ) -> Result<Vec<MarketBar>, StoreError> {
        let stored = self.bars.read().await;
        // BTreeMap keys sort by timestamp within one (asset, timeframe)
        let mut bars: Vec<MarketBar> = stored
            .values()
            .filter(|bar| bar.asset == asset && bar.timeframe == timeframe)
            .cloned()
            .collect();
        if let Some(limit) = limit {
            let keep = usize::try_from(limit).unwrap_or(usize::MAX);
            let skip = bars.len().saturating_sub(keep);
            bars.drain(..skip);
        }
        Ok(bars)
    }

    async fn trade_signals(
        &self,
        timeframe: Option<Timeframe>,
        limit: Option<u64>,
    ) -> Result<Vec<TradeSignal>, StoreError> {
        let mut signals: Vec<TradeSignal> = self
            .signals
            .read()
            .await
            .iter()
            .filter(|s| timeframe.map_or(true, |tf| s.timeframe == tf.as_str()))
            .cloned()
            .collect();
        signals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        if let Some(limit) = limit {
            signals.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        Ok(signals)
    }

    async fn portfolio_metrics(
        &self,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<PortfolioMetric>, StoreError> {
        Ok(self
            .metrics
            .read()
            .await
            .values()
            .filter(|m| timeframe.map_or(true, |tf| m.timeframe == tf.as_str()))
            .cloned()
            .collect())
    }
}
