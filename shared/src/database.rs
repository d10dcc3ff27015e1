use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use tracing::info;

pub async fn get_db_connection(database_url: &str) -> Result<DatabaseConnection> {
    info!("Connecting to database via Sea-ORM at: {}", redact_url(database_url));
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    Ok(db)
}

/// Hide the password part of a connection URL before logging it
pub fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
