use async_trait::async_trait;
use log::debug;
use sqlx::{Pool, Postgres};

use super::{EntityKind, Record, StoreError, StoreGateway};
use super::super::models::{Group, Todo, UserRow};

const USER_COLUMNS: &str = "id, name, age, metadata, group_id";
const TODO_COLUMNS: &str = "id, title, content, user_id";
const GROUP_COLUMNS: &str = "id, kind";

// PostgreSQL-backed gateway sharing one pool across all requests
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        PgStore { pool }
    }
}

// Builds the keyed SELECT for an entity kind; keys bind to $1 as an array
pub fn select_by_keys(kind: EntityKind) -> String {
    let (columns, table, key_column) = match kind {
        EntityKind::User => (USER_COLUMNS, "users", "id"),
        EntityKind::UserByGroup => (USER_COLUMNS, "users", "group_id"),
        EntityKind::Todo => (TODO_COLUMNS, "todos", "id"),
        EntityKind::TodoByOwner => (TODO_COLUMNS, "todos", "user_id"),
        EntityKind::Group => (GROUP_COLUMNS, "groups", "id"),
    };
    format!("SELECT {columns} FROM {table} WHERE {key_column} = ANY($1) ORDER BY id")
}

#[async_trait]
impl StoreGateway for PgStore {
    async fn fetch_by_keys(&self, kind: EntityKind, keys: &[i32]) -> Result<Vec<Record>, StoreError> {
        // Nothing to look up; skip the round trip
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let sql = select_by_keys(kind);
        debug!("{} {:?}", sql, keys);

        let records = match kind {
            EntityKind::User | EntityKind::UserByGroup => sqlx::query_as::<_, UserRow>(&sql)
                .bind(keys)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Record::User)
                .collect(),
            EntityKind::Todo | EntityKind::TodoByOwner => sqlx::query_as::<_, Todo>(&sql)
                .bind(keys)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Record::Todo)
                .collect(),
            EntityKind::Group => sqlx::query_as::<_, Group>(&sql)
                .bind(keys)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(Record::Group)
                .collect(),
        };

        Ok(records)
    }
}
