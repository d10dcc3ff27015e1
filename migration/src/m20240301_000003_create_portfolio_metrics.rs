use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PortfolioMetrics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioMetrics::Timeframe)
                            .string_len(8)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioMetrics::RiskRewardRatio).double().not_null().default(0.0))
                    .col(ColumnDef::new(PortfolioMetrics::WinRate).double().not_null().default(0.0))
                    .col(ColumnDef::new(PortfolioMetrics::Drawdown).double().not_null().default(0.0))
                    .col(ColumnDef::new(PortfolioMetrics::TotalTrades).integer().not_null().default(0))
                    .col(ColumnDef::new(PortfolioMetrics::UpdatedAt).timestamp().null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioMetrics::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PortfolioMetrics {
    Table,
    Timeframe,
    RiskRewardRatio,
    WinRate,
    Drawdown,
    TotalTrades,
    UpdatedAt,
}
