//! HTTP handlers

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use ictdash_shared::dashboard::{stale_pairs, StalePair};
use ictdash_shared::{Asset, MarketBar, PortfolioMetric, RefreshReport, Timeframe, TradeSignal};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::state::AppState;

const MAX_LIMIT: u64 = 5000;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/market-data", get(refresh_market_data).post(refresh_market_data))
        .route("/api/market-data", get(market_data))
        .route("/api/signals", get(signals))
        .route("/api/portfolio-metrics", get(portfolio_metrics))
        .route("/api/refresh/status", get(refresh_status))
        .route("/api/dashboard", get(dashboard))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Run one full fetch-and-store cycle and return the per-pair status map
async fn refresh_market_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RefreshReport>, ApiError> {
    info!("Refresh requested");
    let report = state.refresh().await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct MarketDataQuery {
    pub asset: Option<String>,
    pub timeframe: Option<String>,
    pub limit: Option<u64>,
}

async fn market_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MarketDataQuery>,
) -> Result<Json<Vec<MarketBar>>, ApiError> {
    let asset: Asset = required(query.asset.as_deref(), "asset")?;
    let timeframe: Timeframe = required(query.timeframe.as_deref(), "timeframe")?;
    let limit = check_limit(query.limit)?;

    let bars = state.store.market_bars(asset, timeframe, limit).await?;
    Ok(Json(bars))
}

#[derive(Debug, Deserialize)]
pub struct SignalsQuery {
    pub timeframe: Option<String>,
    pub limit: Option<u64>,
}

async fn signals(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignalsQuery>,
) -> Result<Json<Vec<TradeSignal>>, ApiError> {
    let timeframe = optional::<Timeframe>(query.timeframe.as_deref())?;
    let limit = check_limit(query.limit)?;

    let signals = state.store.trade_signals(timeframe, limit).await?;
    Ok(Json(signals))
}

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    pub timeframe: Option<String>,
}

async fn portfolio_metrics(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<Vec<PortfolioMetric>>, ApiError> {
    let timeframe = optional::<Timeframe>(query.timeframe.as_deref())?;
    let metrics = state.store.portfolio_metrics(timeframe).await?;
    Ok(Json(metrics))
}

#[derive(Debug, Serialize)]
pub struct RefreshStatus {
    pub report: Option<RefreshReport>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Set when the latest cycle was aborted
    pub error: Option<String>,
    pub stale: Vec<StalePair>,
}

async fn refresh_status(State(state): State<Arc<AppState>>) -> Json<RefreshStatus> {
    let last = state.last_refresh().await;
    let stale = stale_pairs(
        last.as_ref().map(|l| &l.report),
        state.pipeline.assets(),
        state.pipeline.timeframes(),
    );

    Json(RefreshStatus {
        finished_at: last.as_ref().map(|l| l.finished_at),
        error: last.as_ref().and_then(|l| l.error.clone()),
        report: last.map(|l| l.report),
        stale,
    })
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub timeframe: Option<String>,
}

/// What the dashboard shows for one selected timeframe
#[derive(Debug, Serialize)]
pub struct DashboardPanel {
    pub timeframe: Timeframe,
    pub signals: Vec<TradeSignal>,
    pub metric: Option<PortfolioMetric>,
    pub stale: Vec<StalePair>,
}

/// Filters the cached view, so switching timeframe does not hit the store
async fn dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardPanel>, ApiError> {
    let timeframe: Timeframe = required(query.timeframe.as_deref(), "timeframe")?;
    let view = state.dashboard().await?;
    let last = state.last_refresh().await;

    Ok(Json(DashboardPanel {
        timeframe,
        signals: view.visible_signals(timeframe).into_iter().cloned().collect(),
        metric: view.metric_for(timeframe).cloned(),
        stale: stale_pairs(
            last.as_ref().map(|l| &l.report),
            state.pipeline.assets(),
            &[timeframe],
        ),
    }))
}

fn required<T>(raw: Option<&str>, name: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) if !value.trim().is_empty() => {
            value.parse().map_err(|e: T::Err| ApiError::BadRequest(e.to_string()))
        }
        _ => Err(ApiError::BadRequest(format!("missing query parameter: {name}"))),
    }
}

fn optional<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ApiError::BadRequest(e.to_string())),
    }
}

fn check_limit(limit: Option<u64>) -> Result<Option<u64>, ApiError> {
    match limit {
        Some(0) => Err(ApiError::BadRequest("limit must be positive".to_string())),
        Some(n) if n > MAX_LIMIT => Err(ApiError::BadRequest(format!(
            "limit must be at most {MAX_LIMIT}"
        ))),
        other => Ok(other),
    }
}
