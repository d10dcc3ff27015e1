use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use ictdash_api::{spawn_refresh_loop, AppState};
use ictdash_shared::{
    Asset, MarketBar, MarketDataProvider, MemoryStore, Pipeline, ProviderError, RetryPolicy,
    RollingWindowLimiter, Timeframe,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// The first fetch takes `first_delay`; later ones return at once
struct SlowStartProvider {
    first_delay: Duration,
    calls: Mutex<Vec<Instant>>,
}

#[async_trait]
impl MarketDataProvider for SlowStartProvider {
    async fn fetch_bars(
        &self,
        asset: Asset,
        timeframe: Timeframe,
    ) -> Result<Vec<MarketBar>, ProviderError> {
        let first = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(Instant::now());
            calls.len() == 1
        };
        if first {
            tokio::time::sleep(self.first_delay).await;
        }
        Ok(vec![MarketBar {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            asset,
            timeframe,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 0,
        }])
    }
}

#[tokio::test(start_paused = true)]
async fn test_slow_cycle_does_not_trigger_catch_up_burst() {
    let provider = Arc::new(SlowStartProvider {
        first_delay: Duration::from_secs(35),
        calls: Mutex::new(Vec::new()),
    });
    let store = Arc::new(MemoryStore::new());
    let pipeline = Pipeline::new(
        provider.clone(),
        store.clone(),
        Arc::new(RollingWindowLimiter::per_minute(5)),
        RetryPolicy::default(),
    )
    .with_universe(vec![Asset::Xauusd], vec![Timeframe::D1]);
    let state = AppState::new(Arc::new(pipeline), store);
    let start = Instant::now();

    let handle = spawn_refresh_loop(state, Duration::from_secs(10));
    tokio::time::sleep(Duration::from_secs(39)).await;
    handle.abort();

    // First cycle runs 0..35s; the overdue tick fires once at 35s and the
    // next one is pushed to 45s instead of replaying the ticks at 10/20/30s
    let offsets: Vec<u64> = provider
        .calls
        .lock()
        .unwrap()
        .iter()
        .map(|at| at.duration_since(start).as_secs())
        .collect();
    assert_eq!(offsets, vec![0, 35]);
}
