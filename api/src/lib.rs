pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use error::ApiError;
pub use state::{AppState, LastRefresh};

/// Assemble the application router.
pub fn app(state: Arc<AppState>, cors_allow_any: bool) -> Router {
    let router = routes::router().layer(TraceLayer::new_for_http());
    let router = if cors_allow_any {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };
    router.with_state(state)
}

/// Background task: run a full refresh on a fixed interval.
pub fn spawn_refresh_loop(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    info!("Periodic refresh every {:?}", every);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        // A cycle slower than the interval pushes the next one back
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match state.refresh().await {
                Ok(report) if report.all_succeeded() => {}
                Ok(report) => warn!("Periodic refresh left stale pairs: {:?}", report.failed_pairs()),
                Err(e) => error!("Periodic refresh aborted: {}", e),
            }
        }
    })
}
