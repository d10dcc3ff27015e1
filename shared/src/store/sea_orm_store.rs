use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::debug;

use super::{BarStore, DashboardStore, StoreError};
use crate::entity::{market_data, portfolio_metrics, trade_signals};
use crate::market::{Asset, Timeframe};
use crate::models::{MarketBar, PortfolioMetric, TradeSignal};

pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BarStore for SeaOrmStore {
    async fn upsert_bars(&self, bars: &[MarketBar]) -> Result<u64, StoreError> {
        if bars.is_empty() {
            return Ok(0);
        }

        let fetched_at = Utc::now();
        let models = bars.iter().map(|bar| market_data::ActiveModel {
            asset: Set(bar.asset.as_str().to_string()),
            timeframe: Set(bar.timeframe.as_str().to_string()),
            timestamp: Set(bar.timestamp),
            open: Set(bar.open),
            high: Set(bar.high),
            low: Set(bar.low),
            close: Set(bar.close),
            volume: Set(bar.volume),
            fetched_at: Set(fetched_at),
        });

        let rows = market_data::Entity::insert_many(models)
            .on_conflict(
                OnConflict::columns([
                    market_data::Column::Asset,
                    market_data::Column::Timeframe,
                    market_data::Column::Timestamp,
                ])
                .update_columns([
                    market_data::Column::Open,
                    market_data::Column::High,
                    market_data::Column::Low,
                    market_data::Column::Close,
                    market_data::Column::Volume,
                    market_data::Column::FetchedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        debug!("Upserted {} bars ({} rows affected)", bars.len(), rows);

        Ok(bars.len() as u64)
    }
}

#[async_trait]
impl DashboardStore for SeaOrmStore {
    async fn market_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
        limit: Option<u64>,
    ) -> Result<Vec<MarketBar>, StoreError> {
        let rows = market_data::Entity::find()
            .filter(market_data::Column::Asset.eq(asset.as_str()))
            .filter(market_data::Column::Timeframe.eq(timeframe.as_str()))
            .order_by_desc(market_data::Column::Timestamp)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        rows.into_iter().rev().map(bar_from_model).collect()
    }

    async fn trade_signals(
        &self,
        timeframe: Option<Timeframe>,
        limit: Option<u64>,
    ) -> Result<Vec<TradeSignal>, StoreError> {
        let mut query = trade_signals::Entity::find();
        if let Some(timeframe) = timeframe {
            query = query.filter(trade_signals::Column::Timeframe.eq(timeframe.as_str()));
        }
        let rows = query
            .order_by_desc(trade_signals::Column::Timestamp)
            .order_by_desc(trade_signals::Column::Id)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(rows.into_iter().map(signal_from_model).collect())
    }

    async fn portfolio_metrics(
        &self,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<PortfolioMetric>, StoreError> {
        let mut query = portfolio_metrics::Entity::find();
        if let Some(timeframe) = timeframe {
            query = query.filter(portfolio_metrics::Column::Timeframe.eq(timeframe.as_str()));
        }
        let rows = query
            .order_by_asc(portfolio_metrics::Column::Timeframe)
            .all(self.db.as_ref())
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| PortfolioMetric {
                timeframe: row.timeframe,
                risk_reward_ratio: row.risk_reward_ratio,
                win_rate: row.win_rate,
                drawdown: row.drawdown,
                total_trades: row.total_trades,
                updated_at: row.updated_at,
            })
            .collect())
    }
}

fn bar_from_model(row: market_data::Model) -> Result<MarketBar, StoreError> {
    Ok(MarketBar {
        asset: row
            .asset
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("market_data.asset: {e}")))?,
        timeframe: row
            .timeframe
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("market_data.timeframe: {e}")))?,
        timestamp: row.timestamp,
        open: row.open,
        high: row.high,
        low: row.low,
        close: row.close,
        volume: row.volume,
    })
}

fn signal_from_model(row: trade_signals::Model) -> TradeSignal {
    // Zones are stored as JSON text; keep the raw text if it does not parse
    let liquidity_zones = row.liquidity_zones.map(|raw| {
        serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
    });

    TradeSignal {
        id: row.id,
        asset: row.asset,
        timeframe: row.timeframe,
        bias: row.bias,
        liquidity_zones,
        direction: row.direction,
        entry_price: row.entry_price,
        stop_loss: row.stop_loss,
        take_profit: row.take_profit,
        invalidation_point: row.invalidation_point,
        system: row.system,
        timestamp: row.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, EntityTrait, PaginatorTrait, Schema};

    async fn sqlite_store() -> (SeaOrmStore, Arc<DatabaseConnection>) {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();

        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        db.execute(backend.build(&schema.create_table_from_entity(market_data::Entity)))
            .await
            .unwrap();
        db.execute(backend.build(&schema.create_table_from_entity(trade_signals::Entity)))
            .await
            .unwrap();

        let db = Arc::new(db);
        (SeaOrmStore::new(db.clone()), db)
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap()
    }

    fn bar(minute: u32, close: f64) -> MarketBar {
        MarketBar {
            timestamp: at(minute),
            asset: Asset::Xauusd,
            timeframe: Timeframe::M1,
            open: 2044.0,
            high: 2046.0,
            low: 2043.5,
            close,
            volume: 0,
        }
    }

    #[tokio::test]
    async fn test_upsert_overwrites_instead_of_duplicating() {
        let (store, db) = sqlite_store().await;

        store.upsert_bars(&[bar(0, 2045.0), bar(1, 2045.5)]).await.unwrap();
        store.upsert_bars(&[bar(1, 2047.25)]).await.unwrap();

        let count = market_data::Entity::find().count(db.as_ref()).await.unwrap();
        assert_eq!(count, 2);

        let bars = store
            .market_bars(Asset::Xauusd, Timeframe::M1, None)
            .await
            .unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp, at(0));
        assert_eq!(bars[1].close, 2047.25);
    }

    #[tokio::test]
    async fn test_market_bars_limit_keeps_latest_ascending() {
        let (store, _db) = sqlite_store().await;
        let bars: Vec<_> = (0..5).map(|m| bar(m, 2045.0 + m as f64)).collect();
        store.upsert_bars(&bars).await.unwrap();

        let latest = store
            .market_bars(Asset::Xauusd, Timeframe::M1, Some(2))
            .await
            .unwrap();
        let stamps: Vec<_> = latest.iter().map(|b| b.timestamp).collect();
        assert_eq!(stamps, vec![at(3), at(4)]);

        let other = store
            .market_bars(Asset::Nasdaq, Timeframe::M1, None)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_signals_filtered_and_newest_first() {
        let (store, db) = sqlite_store().await;
        for (minute, timeframe) in [(0, "1m"), (5, "1h"), (9, "1h")] {
            trade_signals::Entity::insert(trade_signals::ActiveModel {
                asset: Set("XAUUSD".to_string()),
                timeframe: Set(timeframe.to_string()),
                bias: Set(Some("bullish".to_string())),
                liquidity_zones: Set(Some(r#"{"clusters":[]}"#.to_string())),
                direction: Set(None),
                entry_price: Set(None),
                stop_loss: Set(None),
                take_profit: Set(None),
                invalidation_point: Set(None),
                system: Set(None),
                timestamp: Set(at(minute)),
                ..Default::default()
            })
            .exec(db.as_ref())
            .await
            .unwrap();
        }

        let hourly = store.trade_signals(Some(Timeframe::H1), None).await.unwrap();
        assert_eq!(hourly.len(), 2);
        assert_eq!(hourly[0].timestamp, at(9));
        assert_eq!(hourly[1].timestamp, at(5));
        assert_eq!(
            hourly[0].liquidity_zones,
            Some(serde_json::json!({ "clusters": [] }))
        );

        let all = store.trade_signals(None, Some(10)).await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
