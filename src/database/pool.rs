use backoff::{future::retry, ExponentialBackoff};
use log::{info, warn};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres};
use std::time::Duration;

use super::super::config::Config;

// Opens the shared pool, retrying with exponential backoff while the database comes up
pub async fn connect(config: &Config) -> Result<Pool<Postgres>, sqlx::Error> {
    let backoff = ExponentialBackoff {
        max_elapsed_time: Some(Duration::from_secs(config.db_connect_timeout)),
        ..Default::default()
    };

    let pool = retry(backoff, || async {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.db_url)
            .await
            .map_err(|e| {
                warn!("Database connection failed: {}. Retrying...", e);
                backoff::Error::transient(e)
            })
    })
    .await?;

    info!("Connected to database with up to {} connections", config.max_connections);
    Ok(pool)
}
