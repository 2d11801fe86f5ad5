//! Entities: typed rows with the managed base fields and their table layout.

mod behaviour;
mod client;
mod creature;
mod user;

pub use behaviour::Behaviour;
pub use client::Client;
pub use creature::Creature;
pub use user::User;

use crate::error::AppError;
use crate::store::{Record, TableSpec};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;
use uuid::Uuid;

/// Tables of every entity, for schema synchronization.
pub fn tables() -> [TableSpec; 4] {
    [Client::TABLE, Creature::TABLE, Behaviour::TABLE, User::TABLE]
}

/// Fields every entity carries. Assigned and maintained by the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityBase {
    #[serde(default)]
    pub uuid: Uuid,
    #[serde(default)]
    pub version: i64,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Create,
    Update,
}

pub trait Entity: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    const NAME: &'static str;
    const TABLE: TableSpec;

    fn validate(_fields: &Record, _method: Method) -> Result<(), AppError> {
        Ok(())
    }

    /// Defaults, overlaid with every present non-null field.
    fn from_partial(fields: &Record) -> Result<Self, AppError> {
        let mut value = serde_json::to_value(Self::default())?;
        if let Value::Object(map) = &mut value {
            for (key, v) in fields.iter().filter(|(_, v)| !v.is_null()) {
                map.insert(key.clone(), v.clone());
            }
        }
        serde_json::from_value(value)
            .map_err(|e| AppError::BadRequest(format!("Invalid {}: {}", Self::NAME, e)))
    }

    /// Decode a stored row.
    fn from_record(record: Record) -> Result<Self, AppError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    /// Entity-specific column values, ready for the store.
    fn to_columns(&self) -> Result<Record, AppError> {
        let Value::Object(mut map) = serde_json::to_value(self)? else {
            return Err(AppError::Internal(format!("{} did not serialize to an object", Self::NAME)));
        };
        map.retain(|key, _| Self::TABLE.column(key).is_some());
        Ok(map)
    }

    fn before_insert(&mut self) {}

    fn before_update(&self, _changes: &Record) {}

    fn before_remove(&self) {}
}

/// Required fields must be present and non-null on create.
pub(crate) fn require(fields: &Record, field: &str, method: Method) -> Result<(), AppError> {
    if method == Method::Create && fields.get(field).map_or(true, Value::is_null) {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

fn email_pattern() -> Result<&'static Regex, AppError> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$"))
        .as_ref()
        .map_err(|_| AppError::Internal("invalid email pattern".into()))
}

pub(crate) fn validate_email(fields: &Record, field: &str) -> Result<(), AppError> {
    let Some(v) = fields.get(field).filter(|v| !v.is_null()) else {
        return Ok(());
    };
    let re = email_pattern()?;
    match v.as_str() {
        Some(s) if re.is_match(s) => Ok(()),
        _ => Err(AppError::BadRequest(format!("{} must be a valid email", field))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: Value) -> Record {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn from_partial_keeps_defaults_for_null_and_missing() {
        let creature = Creature::from_partial(&record(json!({"client": null}))).unwrap();
        assert_eq!(creature.client, None);
        assert!(creature.behaviours.is_empty());
    }

    #[test]
    fn from_partial_rejects_wrong_types() {
        let err = Client::from_partial(&record(json!({"neighbors": "next door"}))).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn base_fields_serialize_camel_case() {
        let value = serde_json::to_value(Client::default()).unwrap();
        for key in ["uuid", "version", "createdAt", "updatedAt", "neighbors"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn to_columns_drops_managed_fields() {
        let behaviour = Behaviour::from_partial(&record(json!({"type": "flying"}))).unwrap();
        let columns = behaviour.to_columns().unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns["type"], json!("flying"));
    }

    #[test]
    fn email_check() {
        assert!(validate_email(&record(json!({"email": "a@b.io"})), "email").is_ok());
        assert!(validate_email(&record(json!({"email": "nope"})), "email").is_err());
        assert!(validate_email(&record(json!({})), "email").is_ok());
    }

    #[test]
    fn email_pattern_is_shared() {
        let first = email_pattern().unwrap() as *const Regex;
        assert!(validate_email(&record(json!({"email": "c@d.io"})), "email").is_ok());
        assert_eq!(first, email_pattern().unwrap() as *const Regex);
    }
}
