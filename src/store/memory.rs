//! In-memory store. Used by the `memory` connection profile and by tests.

use crate::store::{Record, Store, StoreError, TableSpec};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<&'static str, Vec<Record>>>,
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn id_of(record: &Record) -> Option<&str> {
    record.get("uuid").and_then(Value::as_str)
}

/// First unique column whose (non-null) value in `record` is already taken by another row.
fn duplicate_column(table: &TableSpec, rows: &[Record], record: &Record, skip: Option<&str>) -> Option<&'static str> {
    table
        .columns
        .iter()
        .filter(|c| c.unique)
        .find(|c| {
            let Some(value) = record.get(c.name).filter(|v| !v.is_null()) else {
                return false;
            };
            rows.iter()
                .filter(|r| skip.is_none() || id_of(r) != skip)
                .any(|r| r.get(c.name) == Some(value))
        })
        .map(|c| c.name)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_all(&self, table: &TableSpec) -> Result<Vec<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.get(table.name).cloned().unwrap_or_default())
    }

    async fn find_by_id(&self, table: &TableSpec, id: Uuid) -> Result<Option<Record>, StoreError> {
        let id = id.to_string();
        let tables = self.tables.read().await;
        Ok(tables
            .get(table.name)
            .and_then(|rows| rows.iter().find(|r| id_of(r) == Some(id.as_str())))
            .cloned())
    }

    async fn find_one(&self, table: &TableSpec, filter: &Record) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(table.name)
            .and_then(|rows| {
                rows.iter()
                    .find(|r| filter.iter().all(|(k, v)| r.get(k) == Some(v)))
            })
            .cloned())
    }

    async fn insert(&self, table: &TableSpec, mut record: Record) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.name).or_default();
        if let Some(column) = duplicate_column(table, rows, &record, None) {
            return Err(StoreError::Duplicate {
                table: table.name.to_string(),
                column: column.to_string(),
            });
        }
        let stamp = now();
        record.insert("uuid".into(), Value::String(Uuid::new_v4().to_string()));
        record.insert("version".into(), Value::from(1));
        record.insert("createdAt".into(), stamp.clone());
        record.insert("updatedAt".into(), stamp);
        rows.push(record.clone());
        tracing::debug!(table = table.name, "record inserted");
        Ok(record)
    }

    async fn update(&self, table: &TableSpec, id: Uuid, changes: &Record) -> Result<Option<Record>, StoreError> {
        let id = id.to_string();
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table.name) else {
            return Ok(None);
        };
        let Some(pos) = rows.iter().position(|r| id_of(r) == Some(id.as_str())) else {
            return Ok(None);
        };
        let mut updated = rows[pos].clone();
        for (k, v) in changes {
            if table.column(k).is_some() {
                updated.insert(k.clone(), v.clone());
            }
        }
        if let Some(column) = duplicate_column(table, rows, &updated, Some(id.as_str())) {
            return Err(StoreError::Duplicate {
                table: table.name.to_string(),
                column: column.to_string(),
            });
        }
        let version = updated.get("version").and_then(Value::as_i64).unwrap_or(0) + 1;
        updated.insert("version".into(), Value::from(version));
        updated.insert("updatedAt".into(), now());
        rows[pos] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete(&self, table: &TableSpec, id: Uuid) -> Result<bool, StoreError> {
        let id = id.to_string();
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table.name) else {
            return Ok(false);
        };
        let before = rows.len();
        rows.retain(|r| id_of(r) != Some(id.as_str()));
        Ok(rows.len() != before)
    }

    async fn clear(&self, table: &TableSpec) -> Result<(), StoreError> {
        self.tables.write().await.remove(table.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Column;
    use serde_json::json;

    const PETS: TableSpec = TableSpec {
        name: "pet",
        columns: &[Column::new("name", "text").unique(), Column::new("age", "bigint")],
    };

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_identity_version_and_timestamps() {
        let store = MemoryStore::new();
        let saved = store.insert(&PETS, record(json!({"name": "rex"}))).await.unwrap();
        assert!(Uuid::parse_str(saved["uuid"].as_str().unwrap()).is_ok());
        assert_eq!(saved["version"], json!(1));
        assert_eq!(saved["createdAt"], saved["updatedAt"]);
        assert_eq!(store.find_all(&PETS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unique_columns_reject_duplicates() {
        let store = MemoryStore::new();
        store.insert(&PETS, record(json!({"name": "rex"}))).await.unwrap();
        let err = store.insert(&PETS, record(json!({"name": "rex"}))).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn update_bumps_version_and_ignores_unknown_keys() {
        let store = MemoryStore::new();
        let saved = store.insert(&PETS, record(json!({"name": "rex", "age": 2}))).await.unwrap();
        let id = Uuid::parse_str(saved["uuid"].as_str().unwrap()).unwrap();
        let updated = store
            .update(&PETS, id, &record(json!({"age": 3, "uuid": "nope"})))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated["age"], json!(3));
        assert_eq!(updated["version"], json!(2));
        assert_eq!(updated["uuid"], saved["uuid"]);
        assert!(store.update(&PETS, Uuid::new_v4(), &Record::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_one_matches_every_filter_entry() {
        let store = MemoryStore::new();
        store.insert(&PETS, record(json!({"name": "rex", "age": 2}))).await.unwrap();
        let hit = store.find_one(&PETS, &record(json!({"name": "rex", "age": 2}))).await.unwrap();
        assert!(hit.is_some());
        let miss = store.find_one(&PETS, &record(json!({"name": "rex", "age": 5}))).await.unwrap();
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = MemoryStore::new();
        let saved = store.insert(&PETS, record(json!({"name": "rex"}))).await.unwrap();
        let id = Uuid::parse_str(saved["uuid"].as_str().unwrap()).unwrap();
        assert!(store.delete(&PETS, id).await.unwrap());
        assert!(!store.delete(&PETS, id).await.unwrap());
        store.insert(&PETS, record(json!({"name": "max"}))).await.unwrap();
        store.clear(&PETS).await.unwrap();
        assert!(store.find_all(&PETS).await.unwrap().is_empty());
    }
}
