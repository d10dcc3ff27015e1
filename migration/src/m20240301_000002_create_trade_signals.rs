use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Written by the signal engine, read by the dashboard
        manager
            .create_table(
                Table::create()
                    .table(TradeSignals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TradeSignals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TradeSignals::Asset).string_len(16).not_null())
                    .col(ColumnDef::new(TradeSignals::Timeframe).string_len(8).not_null())
                    .col(ColumnDef::new(TradeSignals::Bias).string_len(16).null())
                    .col(ColumnDef::new(TradeSignals::LiquidityZones).text().null()) // JSON
                    .col(ColumnDef::new(TradeSignals::Direction).string_len(8).null())
                    .col(ColumnDef::new(TradeSignals::EntryPrice).double().null())
                    .col(ColumnDef::new(TradeSignals::StopLoss).double().null())
                    .col(ColumnDef::new(TradeSignals::TakeProfit).double().null())
                    .col(ColumnDef::new(TradeSignals::InvalidationPoint).double().null())
                    .col(ColumnDef::new(TradeSignals::System).string().null())
                    .col(ColumnDef::new(TradeSignals::Timestamp).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Separate statement: SQLite has no inline index syntax
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_trade_signals_timeframe_timestamp")
                    .table(TradeSignals::Table)
                    .col(TradeSignals::Timeframe)
                    .col(TradeSignals::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TradeSignals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TradeSignals {
    Table,
    Id,
    Asset,
    Timeframe,
    Bias,
    LiquidityZones,
    Direction,
    EntryPrice,
    StopLoss,
    TakeProfit,
    InvalidationPoint,
    System,
    Timestamp,
}
