use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::{BatchFn, BatchLoader, LoadError, LoadResult};
use crate::database::{EntityKind, Record, StoreGateway};
use crate::models::{Todo, User};

pub type UserLoader = BatchLoader<i32, Option<User>, UsersById>;
pub type TodosByUserLoader = BatchLoader<i32, Vec<Todo>, TodosByUserId>;
pub type UsersByGroupLoader = BatchLoader<i32, Vec<User>, UsersByGroupId>;

// Users keyed by id; one record per key
pub struct UsersById {
    store: Arc<dyn StoreGateway>,
}

impl UsersById {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<i32, Option<User>> for UsersById {
    async fn load(&self, keys: &[i32]) -> Result<HashMap<i32, LoadResult<Option<User>>>, LoadError> {
        let records = self.store.fetch_by_keys(EntityKind::User, keys).await?;

        Ok(records
            .into_iter()
            .filter_map(Record::into_user)
            .map(|row| {
                let id = row.id;
                (id, User::try_from(row).map(Some).map_err(LoadError::from))
            })
            .collect())
    }
}

// Todos grouped under the id of the user owning them
pub struct TodosByUserId {
    store: Arc<dyn StoreGateway>,
}

impl TodosByUserId {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<i32, Vec<Todo>> for TodosByUserId {
    async fn load(&self, keys: &[i32]) -> Result<HashMap<i32, LoadResult<Vec<Todo>>>, LoadError> {
        let records = self.store.fetch_by_keys(EntityKind::TodoByOwner, keys).await?;

        let mut by_owner: HashMap<i32, Vec<Todo>> = HashMap::new();
        for todo in records.into_iter().filter_map(Record::into_todo) {
            by_owner.entry(todo.user_id).or_default().push(todo);
        }

        Ok(by_owner.into_iter().map(|(owner, todos)| (owner, Ok(todos))).collect())
    }
}

// Members of each group. A member whose record cannot be decoded fails its
// group, not the batch.
pub struct UsersByGroupId {
    store: Arc<dyn StoreGateway>,
}

impl UsersByGroupId {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchFn<i32, Vec<User>> for UsersByGroupId {
    async fn load(&self, keys: &[i32]) -> Result<HashMap<i32, LoadResult<Vec<User>>>, LoadError> {
        let records = self.store.fetch_by_keys(EntityKind::UserByGroup, keys).await?;

        let mut by_group: HashMap<i32, LoadResult<Vec<User>>> = HashMap::new();
        for row in records.into_iter().filter_map(Record::into_user) {
            let Some(group_id) = row.group_id else {
                continue;
            };
            let slot = by_group.entry(group_id).or_insert_with(|| Ok(Vec::new()));
            match User::try_from(row) {
                Ok(user) => {
                    if let Ok(members) = slot {
                        members.push(user);
                    }
                }
                // First bad member wins
                Err(err) => {
                    if slot.is_ok() {
                        *slot = Err(err.into());
                    }
                }
            }
        }

        Ok(by_group)
    }
}
