//! Persistence seam: JSON records per table, backed by PostgreSQL or memory.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::config::{ConnectionProfile, Driver};
use crate::error::{AppError, ConfigError};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// One row as the API sees it: camelCase keys, `uuid` as the identity.
pub type Record = Map<String, Value>;

/// Fields every table carries and the store maintains.
pub const MANAGED_FIELDS: &[&str] = &["uuid", "version", "createdAt", "updatedAt"];

/// Managed fields callers may never write.
pub const IMMUTABLE_FIELDS: &[&str] = &["uuid", "createdAt", "updatedAt"];

/// Entity-specific column. `name` is the API (camelCase) name.
#[derive(Clone, Copy, Debug)]
pub struct Column {
    pub name: &'static str,
    pub pg_type: &'static str,
    pub unique: bool,
}

impl Column {
    pub const fn new(name: &'static str, pg_type: &'static str) -> Self {
        Column {
            name,
            pg_type,
            unique: false,
        }
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

#[derive(Clone, Copy, Debug)]
pub struct TableSpec {
    pub name: &'static str,
    pub columns: &'static [Column],
}

impl TableSpec {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        MANAGED_FIELDS.contains(&name) || self.column(name).is_some()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("duplicate value for unique column '{column}' in {table}")]
    Duplicate { table: String, column: String },
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_all(&self, table: &TableSpec) -> Result<Vec<Record>, StoreError>;

    async fn find_by_id(&self, table: &TableSpec, id: Uuid) -> Result<Option<Record>, StoreError>;

    /// First record whose fields equal every entry of `filter`.
    async fn find_one(&self, table: &TableSpec, filter: &Record) -> Result<Option<Record>, StoreError>;

    /// Insert entity columns; the store assigns `uuid`, `version` and timestamps.
    async fn insert(&self, table: &TableSpec, record: Record) -> Result<Record, StoreError>;

    /// Apply `changes`, bump `version` and `updatedAt`. None when the id does not exist.
    async fn update(&self, table: &TableSpec, id: Uuid, changes: &Record) -> Result<Option<Record>, StoreError>;

    /// Returns whether a row was removed.
    async fn delete(&self, table: &TableSpec, id: Uuid) -> Result<bool, StoreError>;

    async fn clear(&self, table: &TableSpec) -> Result<(), StoreError>;

    /// Connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store handle registered as a provider so controllers can declare it as a dependency.
#[derive(Clone)]
pub struct Database(Arc<dyn Store>);

impl Database {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Database(store)
    }

    pub fn store(&self) -> Arc<dyn Store> {
        self.0.clone()
    }
}

/// Open the store selected by the connection profile. Creates tables when the profile asks to.
pub async fn connect(profile: &ConnectionProfile, tables: &[TableSpec]) -> Result<Arc<dyn Store>, AppError> {
    match profile.driver {
        Driver::Memory => {
            tracing::info!(profile = %profile.name, "using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        Driver::Postgres => {
            let url = profile
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::Load(format!("profile '{}' has no url", profile.name)))?;
            let store = PgStore::connect(url, profile.max_connections).await?;
            if profile.synchronize {
                store.ensure_tables(tables).await?;
            }
            tracing::info!(profile = %profile.name, "postgres connection set");
            Ok(Arc::new(store))
        }
    }
}
