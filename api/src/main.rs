use anyhow::Result;
use ictdash_api::{app, spawn_refresh_loop, AppState};
use ictdash_shared::{
    get_db_connection, AlphaVantageClient, Config, Pipeline, RetryPolicy, RollingWindowLimiter,
    SeaOrmStore,
};
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting ICT dashboard API server...");

    let config = Config::from_env()?;
    let db = Arc::new(get_db_connection(&config.database_url).await?);
    info!("Connected to database");

    if config.run_migrations {
        Migrator::up(db.as_ref(), None).await?;
        info!("Migrations applied");
    }

    let provider = AlphaVantageClient::new(
        config.alpha_vantage_base_url.clone(),
        config.alpha_vantage_api_key.clone(),
        config.http_timeout,
    )?;
    let store = Arc::new(SeaOrmStore::new(db));
    let limiter = Arc::new(RollingWindowLimiter::per_minute(config.rate_limit_per_minute));
    let policy = RetryPolicy::new(config.retry_attempts, config.retry_delay);

    let pipeline = Pipeline::new(Arc::new(provider), store.clone(), limiter, policy)
        .with_universe(config.assets.clone(), config.timeframes.clone());
    let state = AppState::new(Arc::new(pipeline), store);

    if let Some(every) = config.refresh_interval {
        spawn_refresh_loop(Arc::clone(&state), every);
    }

    let router = app(state, config.cors_allow_any);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping");
}
