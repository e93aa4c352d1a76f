use actix_web::{web, App, HttpServer};
use log::info;
use std::sync::Arc;

use todoql::database::{self, PgStore};
use todoql::graphql::{self, AppState};
use todoql::Config;

// Main function
#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Pick up a local .env before anything reads the environment
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    // Initialize database
    let pool = database::connect(&config).await?;
    database::init_db(&pool).await?;

    let state = AppState::new(Arc::new(PgStore::new(pool)), config.loader);
    info!(
        "Serving GraphQL on {} (batch size {}, delay {:?})",
        config.bind_addr, config.loader.max_batch_size, config.loader.delay
    );

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(graphql::configure)
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;

    Ok(())
}
