#![allow(dead_code)]

use todoql::database::MemoryStore;
use todoql::models::{Group, Todo, UserRow};

pub fn user(id: i32, name: &str, metadata: Option<&str>, group_id: Option<i32>) -> UserRow {
    UserRow {
        id,
        name: name.to_string(),
        age: 20 + id,
        metadata: metadata.map(str::to_string),
        group_id,
    }
}

pub fn todo(id: i32, user_id: i32) -> Todo {
    Todo {
        id,
        title: format!("todo {id}"),
        content: format!("content of todo {id}"),
        user_id,
    }
}

// Two well-formed users in group 1, one user with broken metadata, and a
// todo whose owner does not exist
pub fn seeded() -> MemoryStore {
    MemoryStore::new()
        .with_group(Group {
            id: 1,
            kind: "admins".to_string(),
        })
        .with_user(user(1, "minh", Some(r#"{"theme":"dark"}"#), Some(1)))
        .with_user(user(2, "lan", None, Some(1)))
        .with_user(user(3, "phuc", Some("[1, 2]"), None))
        .with_todo(todo(1, 1))
        .with_todo(todo(2, 1))
        .with_todo(todo(3, 2))
        .with_todo(todo(4, 99))
        .with_todo(todo(5, 3))
}
