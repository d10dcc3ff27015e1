use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per bar; the composite key is the upsert conflict target
        manager
            .create_table(
                Table::create()
                    .table(MarketData::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(MarketData::Asset).string_len(16).not_null())
                    .col(ColumnDef::new(MarketData::Timeframe).string_len(8).not_null())
                    .col(ColumnDef::new(MarketData::Timestamp).timestamp().not_null())
                    .col(ColumnDef::new(MarketData::Open).double().not_null())
                    .col(ColumnDef::new(MarketData::High).double().not_null())
                    .col(ColumnDef::new(MarketData::Low).double().not_null())
                    .col(ColumnDef::new(MarketData::Close).double().not_null())
                    .col(ColumnDef::new(MarketData::Volume).big_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(MarketData::FetchedAt)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(MarketData::Asset)
                            .col(MarketData::Timeframe)
                            .col(MarketData::Timestamp),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MarketData::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MarketData {
    Table,
    Asset,
    Timeframe,
    Timestamp,
    Open,
    High,
    Low,
    Close,
    Volume,
    FetchedAt,
}
