use chrono::{DateTime, Utc};
use ictdash_shared::dashboard::DashboardView;
use ictdash_shared::{DashboardStore, Pipeline, PipelineError, RefreshReport, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Signals kept in the cached dashboard view
const DASHBOARD_SIGNAL_LIMIT: u64 = 500;

/// Outcome of the most recent refresh cycle, aborted or not
#[derive(Debug, Clone, Serialize)]
pub struct LastRefresh {
    /// Pairs that reached a terminal status; an aborted cycle lists only
    /// those finished before the abort
    pub report: RefreshReport,
    pub finished_at: DateTime<Utc>,
    pub error: Option<String>,
}

/// Shared application state, passed to all route handlers via `axum::extract::State`.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Arc<dyn DashboardStore>,
    /// Held for the whole cycle so overlapping refreshes queue instead of
    /// splitting the provider budget
    refresh_lock: Mutex<()>,
    last_refresh: RwLock<Option<LastRefresh>>,
    /// Loaded on first use, dropped after each refresh cycle
    dashboard: RwLock<Option<Arc<DashboardView>>>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, store: Arc<dyn DashboardStore>) -> Arc<Self> {
        Arc::new(Self {
            pipeline,
            store,
            refresh_lock: Mutex::new(()),
            last_refresh: RwLock::new(None),
            dashboard: RwLock::new(None),
        })
    }

    /// Run one full cycle and remember its outcome
    pub async fn refresh(&self) -> Result<RefreshReport, PipelineError> {
        let _guard = self.refresh_lock.lock().await;
        let result = self.pipeline.run().await;

        let last = match &result {
            Ok(report) => LastRefresh {
                report: report.clone(),
                finished_at: Utc::now(),
                error: None,
            },
            Err(e) => {
                let PipelineError::Fatal { completed, .. } = e;
                LastRefresh {
                    report: completed.clone(),
                    finished_at: Utc::now(),
                    error: Some(e.to_string()),
                }
            }
        };
        *self.last_refresh.write().await = Some(last);
        *self.dashboard.write().await = None;

        result
    }

    pub async fn last_refresh(&self) -> Option<LastRefresh> {
        self.last_refresh.read().await.clone()
    }

    /// Dashboard view shared by every timeframe selection
    pub async fn dashboard(&self) -> Result<Arc<DashboardView>, StoreError> {
        if let Some(view) = self.dashboard.read().await.as_ref() {
            return Ok(Arc::clone(view));
        }

        let mut slot = self.dashboard.write().await;
        if let Some(view) = slot.as_ref() {
            return Ok(Arc::clone(view));
        }
        debug!("Loading dashboard view");
        let view =
            Arc::new(DashboardView::load(self.store.as_ref(), Some(DASHBOARD_SIGNAL_LIMIT)).await?);
        *slot = Some(Arc::clone(&view));
        Ok(view)
    }
}
