// GraphQL module for defining the application state and GraphQL schema
pub mod guard;
pub mod objects;
pub mod routes;
pub mod schema;

// Re-export key types for external use
pub use guard::RoleGuard;
pub use routes::{configure, graphql, playground};
pub use schema::QueryRoot;

use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use std::sync::Arc;

use super::database::StoreGateway;
use super::loader::LoaderConfig;
use super::models::Role;

pub type TodoSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

// Builds the schema; per-request data is attached when each request executes
pub fn build_schema() -> TodoSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        // Not reachable from any field, but clients still see the roles
        .register_output_type::<Role>()
        .finish()
}

// Application state shared across HTTP workers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreGateway>, // Gateway shared by every request's loaders
    pub loader_config: LoaderConfig, // Settings for loaders created per request
    pub schema: TodoSchema, // GraphQL schema instance
}

impl AppState {
    pub fn new(store: Arc<dyn StoreGateway>, loader_config: LoaderConfig) -> Self {
        AppState {
            store,
            loader_config,
            schema: build_schema(),
        }
    }
}
