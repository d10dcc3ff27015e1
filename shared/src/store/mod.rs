//! Storage ports for the pipeline (writes) and the dashboard (reads)

pub mod memory;
pub mod sea_orm_store;

use async_trait::async_trait;

use crate::market::{Asset, Timeframe};
use crate::models::{MarketBar, PortfolioMetric, TradeSignal};

pub use memory::MemoryStore;
pub use sea_orm_store::SeaOrmStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Write side used by the pipeline
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Insert or overwrite bars keyed by (asset, timeframe, timestamp).
    /// Returns the number of bars written.
    async fn upsert_bars(&self, bars: &[MarketBar]) -> Result<u64, StoreError>;
}

/// Read side used by the dashboard endpoints
#[async_trait]
pub trait DashboardStore: Send + Sync {
    /// Most recent `limit` bars, returned oldest first
    async fn market_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
        limit: Option<u64>,
    ) -> Result<Vec<MarketBar>, StoreError>;

    /// Signals newest first, optionally for one timeframe
    async fn trade_signals(
        &self,
        timeframe: Option<Timeframe>,
        limit: Option<u64>,
    ) -> Result<Vec<TradeSignal>, StoreError>;

    async fn portfolio_metrics(
        &self,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<PortfolioMetric>, StoreError>;
}
