use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{EntityKind, Record, StoreError, StoreGateway};
use super::super::models::{Group, Todo, UserRow};

// In-process gateway over fixed rows.
//
// Every call is journaled so callers can count round trips, and any entity
// kind can be switched to fail.
#[derive(Default)]
pub struct MemoryStore {
    users: Vec<UserRow>,
    todos: Vec<Todo>,
    groups: Vec<Group>,
    calls: Mutex<Vec<(EntityKind, Vec<i32>)>>,
    failing: Mutex<HashSet<EntityKind>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserRow) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_todo(mut self, todo: Todo) -> Self {
        self.todos.push(todo);
        self
    }

    pub fn with_group(mut self, group: Group) -> Self {
        self.groups.push(group);
        self
    }

    // Makes every later fetch of `kind` fail
    pub fn fail(&self, kind: EntityKind) {
        lock(&self.failing).insert(kind);
    }

    pub fn calls(&self) -> Vec<(EntityKind, Vec<i32>)> {
        lock(&self.calls).clone()
    }

    // Key sets of every call made for `kind`, in call order
    pub fn calls_for(&self, kind: EntityKind) -> Vec<Vec<i32>> {
        lock(&self.calls)
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, keys)| keys.clone())
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn fetch_by_keys(&self, kind: EntityKind, keys: &[i32]) -> Result<Vec<Record>, StoreError> {
        let mut journaled = keys.to_vec();
        journaled.sort_unstable();
        lock(&self.calls).push((kind, journaled));

        if lock(&self.failing).contains(&kind) {
            return Err(StoreError::Unavailable(format!("{:?} lookups are down", kind)));
        }

        let records = match kind {
            EntityKind::User => self
                .users
                .iter()
                .filter(|u| keys.contains(&u.id))
                .cloned()
                .map(Record::User)
                .collect(),
            EntityKind::UserByGroup => self
                .users
                .iter()
                .filter(|u| u.group_id.is_some_and(|g| keys.contains(&g)))
                .cloned()
                .map(Record::User)
                .collect(),
            EntityKind::Todo => self
                .todos
                .iter()
                .filter(|t| keys.contains(&t.id))
                .cloned()
                .map(Record::Todo)
                .collect(),
            EntityKind::TodoByOwner => self
                .todos
                .iter()
                .filter(|t| keys.contains(&t.user_id))
                .cloned()
                .map(Record::Todo)
                .collect(),
            EntityKind::Group => self
                .groups
                .iter()
                .filter(|g| keys.contains(&g.id))
                .cloned()
                .map(Record::Group)
                .collect(),
        };

        Ok(records)
    }
}
