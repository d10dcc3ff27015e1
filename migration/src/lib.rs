pub use sea_orm_migration::prelude::*;

mod m20240301_000001_create_market_data;
mod m20240301_000002_create_trade_signals;
mod m20240301_000003_create_portfolio_metrics;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_market_data::Migration),
            Box::new(m20240301_000002_create_trade_signals::Migration),
            Box::new(m20240301_000003_create_portfolio_metrics::Migration),
        ]
    }
}
