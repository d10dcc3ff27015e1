//! `SeaORM` entities for the dashboard tables

pub mod market_data;
pub mod portfolio_metrics;
pub mod trade_signals;
