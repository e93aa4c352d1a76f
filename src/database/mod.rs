// Data access for users, todos and groups behind the `StoreGateway` seam
pub mod memory;
pub mod pool;
pub mod queries;
pub mod schema;

pub use memory::MemoryStore;
pub use pool::connect;
pub use queries::PgStore;
pub use schema::init_db;

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Group, Todo, UserRow};

// Which rows a keyed lookup selects, and by which column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,        // users.id
    UserByGroup, // users.group_id
    Todo,        // todos.id
    TodoByOwner, // todos.user_id
    Group,       // groups.id
}

// A stored row as returned by the gateway
#[derive(Debug, Clone)]
pub enum Record {
    User(UserRow),
    Todo(Todo),
    Group(Group),
}

impl Record {
    pub fn into_user(self) -> Option<UserRow> {
        match self {
            Record::User(row) => Some(row),
            _ => None,
        }
    }

    pub fn into_todo(self) -> Option<Todo> {
        match self {
            Record::Todo(todo) => Some(todo),
            _ => None,
        }
    }

    pub fn into_group(self) -> Option<Group> {
        match self {
            Record::Group(group) => Some(group),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("failed to decode record {key}: {reason}")]
    Decode { key: i32, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// Keyed, read-only lookups against persistent storage.
//
// An empty key set yields an empty result. Callers must not rely on the
// order of the returned records.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    async fn fetch_by_keys(&self, kind: EntityKind, keys: &[i32]) -> Result<Vec<Record>, StoreError>;
}
