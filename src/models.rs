use async_graphql::{Enum, InputValueError, InputValueResult, Scalar, ScalarType, SimpleObject, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::database::StoreError;

// A user exactly as stored; `metadata` is raw JSON text
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub metadata: Option<String>,
    pub group_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, SimpleObject)]
#[graphql(complex)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub metadata: Option<JsonString>,
    #[graphql(skip)]
    pub group_id: Option<i32>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    // Decodes the stored metadata; an empty column means no metadata
    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let metadata = match row.metadata.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(JsonString::from_json(raw).map_err(|reason| StoreError::Decode {
                key: row.id,
                reason,
            })?),
        };

        Ok(User {
            id: row.id,
            name: row.name,
            age: row.age,
            metadata,
            group_id: row.group_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject, sqlx::FromRow)]
#[graphql(complex)]
pub struct Todo {
    pub id: i32,
    pub title: String,
    pub content: String,
    #[graphql(skip)]
    pub user_id: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject, sqlx::FromRow)]
#[graphql(complex)]
pub struct Group {
    pub id: i32,
    pub kind: String,
}

// Role the caller acts under for the duration of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Enum)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    // Reads a role name such as `ADMIN`; anything unrecognised is a plain user
    pub fn from_name(name: Option<&str>) -> Self {
        match name.map(str::trim) {
            Some(name) if name.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        }
    }
}

// Free-form JSON object attached to a user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonString(pub Map<String, JsonValue>);

impl JsonString {
    pub fn from_json(raw: &str) -> Result<Self, String> {
        match serde_json::from_str::<JsonValue>(raw).map_err(|e| e.to_string())? {
            JsonValue::Object(map) => Ok(JsonString(map)),
            other => Err(format!("expected a JSON object, found {}", kind_of(&other))),
        }
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[Scalar(name = "JSONString")]
impl ScalarType for JsonString {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value.into_json()? {
            JsonValue::Object(map) => Ok(JsonString(map)),
            other => Err(InputValueError::custom(format!("wrong type: {}", kind_of(&other)))),
        }
    }

    fn to_value(&self) -> Value {
        Value::from_json(JsonValue::Object(self.0.clone())).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(metadata: Option<&str>) -> UserRow {
        UserRow {
            id: 4,
            name: "minh".to_string(),
            age: 27,
            metadata: metadata.map(str::to_string),
            group_id: None,
        }
    }

    #[test]
    fn test_user_without_metadata() {
        assert!(User::try_from(row(None)).unwrap().metadata.is_none());
        assert!(User::try_from(row(Some(""))).unwrap().metadata.is_none());
    }

    #[test]
    fn test_user_metadata_is_decoded() {
        let user = User::try_from(row(Some(r#"{"theme":"dark","beta":true}"#))).unwrap();
        let metadata = user.metadata.unwrap();
        assert_eq!(metadata.0["theme"], "dark");
        assert_eq!(metadata.0["beta"], true);
    }

    #[test]
    fn test_malformed_metadata_is_a_decode_error() {
        match User::try_from(row(Some("[1, 2]"))) {
            Err(StoreError::Decode { key, reason }) => {
                assert_eq!(key, 4);
                assert!(reason.contains("an array"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(User::try_from(row(Some("{oops"))).is_err());
    }

    #[test]
    fn test_role_from_name() {
        assert_eq!(Role::from_name(Some("ADMIN")), Role::Admin);
        assert_eq!(Role::from_name(Some(" admin ")), Role::Admin);
        assert_eq!(Role::from_name(Some("USER")), Role::User);
        assert_eq!(Role::from_name(Some("root")), Role::User);
        assert_eq!(Role::from_name(None), Role::User);
    }

    #[test]
    fn test_scalar_rejects_non_objects() {
        assert!(<JsonString as ScalarType>::parse(Value::from(3)).is_err());
        let parsed = <JsonString as ScalarType>::parse(Value::from_json(serde_json::json!({"a": 1})).unwrap()).unwrap();
        assert_eq!(parsed.0["a"], 1);
    }
}
