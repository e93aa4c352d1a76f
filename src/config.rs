use std::env;
use std::time::Duration;

use super::loader::LoaderConfig;

// Configuration for the GraphQL server
#[derive(Debug, Clone)]
pub struct Config {
    pub db_url: String, // Database connection URL
    pub bind_addr: String, // Address for the HTTP server
    pub max_connections: u32, // Upper bound on pooled database connections
    pub db_connect_timeout: u64, // Seconds to keep retrying the initial connection
    pub loader: LoaderConfig, // Batching behaviour of request-scoped loaders
}

impl Config {
    // Loads configuration from environment variables, with defaults for optional fields
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    // Builds the configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error + Send + Sync + 'static>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = LoaderConfig::default();

        let config = Config {
            // Required: Database connection URL
            db_url: lookup("DATABASE_URL").ok_or("DATABASE_URL must be set")?,
            // Optional: bind address (defaults to 0.0.0.0:8000)
            bind_addr: lookup("BIND_ADDR").unwrap_or("0.0.0.0:8000".to_string()),
            max_connections: lookup("DB_MAX_CONNECTIONS").and_then(|v| v.parse().ok()).unwrap_or(10),
            db_connect_timeout: lookup("DB_CONNECT_TIMEOUT").and_then(|v| v.parse().ok()).unwrap_or(60),
            loader: LoaderConfig {
                max_batch_size: lookup("LOADER_MAX_BATCH_SIZE")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.max_batch_size),
                delay: lookup("LOADER_DELAY_MS")
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.delay),
                cache_failures: lookup("LOADER_CACHE_FAILURES")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(defaults.cache_failures),
            },
        };

        // Validate fields that have no sensible fallback
        if config.db_url.is_empty() {
            return Err("DATABASE_URL must not be empty".into());
        }
        if config.loader.max_batch_size == 0 {
            return Err("LOADER_MAX_BATCH_SIZE must be at least 1".into());
        }

        Ok(config)
    }
}
