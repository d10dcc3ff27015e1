//! `SeaORM` Entity, @generated manually

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "portfolio_metrics")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub timeframe: String,
    pub risk_reward_ratio: f64,
    pub win_rate: f64, // 0.00 to 1.00
    pub drawdown: f64, // Max drawdown as a fraction of peak equity
    pub total_trades: i32,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
