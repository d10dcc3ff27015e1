//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trade_signals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub asset: String,
    pub timeframe: String,
    #[sea_orm(nullable)]
    pub bias: Option<String>, // "bullish", "bearish", "neutral"
    #[sea_orm(column_type = "Text", nullable)]
    pub liquidity_zones: Option<String>, // JSON string (clusters, pd_arrays)
    #[sea_orm(nullable)]
    pub direction: Option<String>, // "long" or "short"
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub invalidation_point: Option<f64>,
    #[sea_orm(nullable)]
    pub system: Option<String>, // Originating entry system label
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
