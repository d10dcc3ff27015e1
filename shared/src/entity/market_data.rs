//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "market_data")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub asset: String, // "XAUUSD", "NASDAQ"
    #[sea_orm(primary_key, auto_increment = false)]
    pub timeframe: String, // "1m", "5m", ... "1d"
    #[sea_orm(primary_key, auto_increment = false)]
    pub timestamp: DateTimeUtc, // Bar open time
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub fetched_at: DateTimeUtc, // Last time the pipeline wrote this row
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
