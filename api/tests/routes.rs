use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use ictdash_api::{app, AppState};
use ictdash_shared::{
    Asset, BarStore, DashboardStore, MarketBar, MarketDataProvider, MemoryStore, Pipeline,
    PortfolioMetric, ProviderError, RetryPolicy, RollingWindowLimiter, StoreError, Timeframe,
    TradeSignal,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

/// Returns three consecutive bars per pair, or a credential error once the
/// key is revoked
#[derive(Default)]
struct StaticProvider {
    reject_key: AtomicBool,
}

impl StaticProvider {
    fn revoke_key(&self) {
        self.reject_key.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MarketDataProvider for StaticProvider {
    async fn fetch_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
    ) -> Result<Vec<MarketBar>, ProviderError> {
        if self.reject_key.load(Ordering::SeqCst) {
            return Err(ProviderError::Unauthorized(
                "the parameter apikey is invalid or missing".to_string(),
            ));
        }
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap();
        Ok((0..3)
            .map(|i| MarketBar {
                timestamp: start + ChronoDuration::minutes(i),
                asset,
                timeframe,
                open: 2040.0 + i as f64,
                high: 2045.0 + i as f64,
                low: 2035.0 + i as f64,
                close: 2042.0 + i as f64,
                volume: 0,
            })
            .collect())
    }
}

fn signal(id: i64, timeframe: &str, minute: u32) -> TradeSignal {
    TradeSignal {
        id,
        asset: "NASDAQ".to_string(),
        timeframe: timeframe.to_string(),
        bias: Some("bullish".to_string()),
        liquidity_zones: Some(json!([{ "type": "sell_side", "price": 17950.0 }])),
        direction: Some("long".to_string()),
        entry_price: Some(18000.0),
        stop_loss: Some(17940.0),
        take_profit: Some(18120.0),
        invalidation_point: None,
        system: Some("silver_bullet".to_string()),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
    }
}

fn pipeline(provider: Arc<StaticProvider>, store: Arc<MemoryStore>) -> Pipeline {
    Pipeline::new(
        provider,
        store,
        Arc::new(RollingWindowLimiter::per_minute(5)),
        RetryPolicy::default(),
    )
    .with_universe(
        vec![Asset::Xauusd, Asset::Nasdaq],
        vec![Timeframe::M1, Timeframe::D1],
    )
}

fn setup() -> (Router, Arc<MemoryStore>, Arc<StaticProvider>) {
    let provider = Arc::new(StaticProvider::default());
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Arc::new(pipeline(provider.clone(), store.clone())),
        store.clone(),
    );
    (app(state, true), store, provider)
}

async fn send(router: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (router, _, _) = setup();
    let (status, body) = send(&router, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_refresh_returns_status_map() {
    let (router, store, _) = setup();

    let (status, body) = send(&router, Method::POST, "/market-data").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "XAUUSD": { "1m": "success", "1d": "success" },
            "NASDAQ": { "1m": "success", "1d": "success" }
        })
    );
    assert_eq!(store.bar_count().await, 12);
}

#[tokio::test]
async fn test_refresh_with_rejected_key_is_bad_gateway() {
    let (router, store, provider) = setup();
    provider.revoke_key();

    let (status, body) = send(&router, Method::GET, "/market-data").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("apikey"));
    assert_eq!(store.bar_count().await, 0);
}

#[tokio::test]
async fn test_refresh_status_tracks_stale_pairs() {
    let (router, _, _) = setup();

    let (status, body) = send(&router, Method::GET, "/api/refresh/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"], Value::Null);
    assert_eq!(body["stale"].as_array().unwrap().len(), 4);

    send(&router, Method::POST, "/market-data").await;

    let (_, body) = send(&router, Method::GET, "/api/refresh/status").await;
    assert_eq!(body["report"]["XAUUSD"]["1m"], "success");
    assert!(body["finished_at"].is_string());
    assert_eq!(body["stale"], json!([]));
}

#[tokio::test]
async fn test_market_data_ascending_with_limit() {
    let (router, store, provider) = setup();
    let bars = provider
        .fetch_bars(Asset::Xauusd, Timeframe::M1)
        .await
        .unwrap();
    store.upsert_bars(&bars).await.unwrap();

    let (status, body) = send(
        &router,
        Method::GET,
        "/api/market-data?asset=XAUUSD&timeframe=1m&limit=2",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["close"], 2043.0);
    assert_eq!(rows[1]["close"], 2044.0);
    assert!(rows[0]["timestamp"].as_str() < rows[1]["timestamp"].as_str());
}

#[tokio::test]
async fn test_market_data_rejects_bad_query() {
    let (router, _, _) = setup();

    let (status, body) = send(&router, Method::GET, "/api/market-data?timeframe=1m").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("asset"));

    let (status, _) = send(
        &router,
        Method::GET,
        "/api/market-data?asset=XAUUSD&timeframe=2h",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_signals_filtered_newest_first() {
    let (router, store, _) = setup();
    store.insert_signal(signal(1, "5m", 0)).await;
    store.insert_signal(signal(2, "1h", 5)).await;
    store.insert_signal(signal(3, "5m", 30)).await;

    let (status, body) = send(&router, Method::GET, "/api/signals?timeframe=5m").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 1]);

    let (_, body) = send(&router, Method::GET, "/api/signals?limit=1").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], 3);
}

#[tokio::test]
async fn test_portfolio_metrics_by_timeframe() {
    let (router, store, _) = setup();
    for (timeframe, win_rate) in [("1h", 0.55), ("1d", 0.61)] {
        store
            .put_metric(PortfolioMetric {
                timeframe: timeframe.to_string(),
                risk_reward_ratio: 2.0,
                win_rate,
                drawdown: 0.08,
                total_trades: 40,
                updated_at: None,
            })
            .await;
    }

    let (status, body) = send(&router, Method::GET, "/api/portfolio-metrics?timeframe=1d").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["win_rate"], 0.61);

    let (_, body) = send(&router, Method::GET, "/api/portfolio-metrics").await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_aborted_cycle_marks_every_pair_stale() {
    let (router, _, provider) = setup();
    let (status, _) = send(&router, Method::POST, "/market-data").await;
    assert_eq!(status, StatusCode::OK);

    provider.revoke_key();
    let (status, _) = send(&router, Method::POST, "/market-data").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, body) = send(&router, Method::GET, "/api/refresh/status").await;
    assert_eq!(body["report"], json!({}));
    assert!(body["error"].as_str().unwrap().contains("apikey"));
    assert_eq!(body["stale"].as_array().unwrap().len(), 4);
}

/// Counts reads that reach the store
struct CountingStore {
    inner: Arc<MemoryStore>,
    reads: AtomicUsize,
}

#[async_trait]
impl DashboardStore for CountingStore {
    async fn market_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
        limit: Option<u64>,
    ) -> Result<Vec<MarketBar>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.market_bars(asset, timeframe, limit).await
    }

    async fn trade_signals(
        &self,
        timeframe: Option<Timeframe>,
        limit: Option<u64>,
    ) -> Result<Vec<TradeSignal>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.trade_signals(timeframe, limit).await
    }

    async fn portfolio_metrics(
        &self,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<PortfolioMetric>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.portfolio_metrics(timeframe).await
    }
}

#[tokio::test]
async fn test_dashboard_switches_timeframe_without_reloading() {
    let memory = Arc::new(MemoryStore::new());
    memory.insert_signal(signal(1, "1m", 0)).await;
    memory.insert_signal(signal(2, "1d", 5)).await;
    memory.insert_signal(signal(3, "1m", 40)).await;
    memory
        .put_metric(PortfolioMetric {
            timeframe: "1d".to_string(),
            risk_reward_ratio: 2.5,
            win_rate: 0.6,
            drawdown: 0.05,
            total_trades: 12,
            updated_at: None,
        })
        .await;
    let counting = Arc::new(CountingStore {
        inner: memory.clone(),
        reads: AtomicUsize::new(0),
    });
    let provider = Arc::new(StaticProvider::default());
    let state = AppState::new(Arc::new(pipeline(provider, memory)), counting.clone());
    let router = app(state, false);

    let (status, body) = send(&router, Method::GET, "/api/dashboard?timeframe=1m").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["signals"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 1]);
    assert_eq!(body["metric"], Value::Null);
    assert_eq!(body["stale"].as_array().unwrap().len(), 2);
    let reads_after_first = counting.reads.load(Ordering::SeqCst);

    let (_, body) = send(&router, Method::GET, "/api/dashboard?timeframe=1d").await;
    assert_eq!(body["signals"][0]["id"], 2);
    assert_eq!(body["metric"]["win_rate"], 0.6);
    assert_eq!(counting.reads.load(Ordering::SeqCst), reads_after_first);

    // A refresh cycle drops the cached view
    send(&router, Method::POST, "/market-data").await;
    let (_, body) = send(&router, Method::GET, "/api/dashboard?timeframe=1d").await;
    assert_eq!(body["stale"], json!([]));
    assert!(counting.reads.load(Ordering::SeqCst) > reads_after_first);

    let (status, _) = send(&router, Method::GET, "/api/dashboard").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
