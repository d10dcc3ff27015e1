pub mod config;
pub mod dashboard;
pub mod database;
pub mod entity;
pub mod market;
pub mod models;
pub mod pipeline;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod store;

pub use config::{Config, ConfigError};
pub use database::get_db_connection;
pub use market::{Asset, Timeframe};
pub use models::*;
pub use pipeline::{Pipeline, PipelineError, RefreshReport, UnitStatus};
pub use provider::{AlphaVantageClient, MarketDataProvider, ProviderError};
pub use rate_limit::RollingWindowLimiter;
pub use retry::{run_with_retry, AttemptError, RetryError, RetryPolicy};
pub use store::{BarStore, DashboardStore, MemoryStore, SeaOrmStore, StoreError};
