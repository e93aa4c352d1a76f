pub mod config;
pub mod context;
pub mod database;
pub mod graphql;
pub mod loader;
pub mod metrics;
pub mod models;

pub use config::Config;
pub use context::RequestContext;
pub use database::{EntityKind, MemoryStore, PgStore, StoreGateway};
pub use graphql::AppState;
pub use loader::{BatchFn, BatchLoader, LoadError, LoaderConfig};
pub use models::{Group, Role, Todo, User};
