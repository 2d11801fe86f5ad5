//! PostgreSQL store: parameterized SQL from table specs, rows decoded to JSON records.

use crate::case::row_to_fields;
use crate::sql::{self, PgBindValue, QueryBuf};
use crate::store::{Record, Store, StoreError, TableSpec};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use uuid::Uuid;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(PgStore { pool })
    }

    /// CREATE TABLE IF NOT EXISTS for every table.
    pub async fn ensure_tables(&self, tables: &[TableSpec]) -> Result<(), StoreError> {
        for table in tables {
            let ddl = sql::create_table(table);
            tracing::debug!(sql = %ddl, "ensure table");
            sqlx::query(&ddl).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn fetch_optional(&self, table: &TableSpec, q: &QueryBuf) -> Result<Option<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(table, e))?;
        Ok(row.map(|r| row_to_fields(row_to_json(&r))))
    }

    async fn fetch_all(&self, table: &TableSpec, q: &QueryBuf) -> Result<Vec<Record>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(table, e))?;
        Ok(rows.iter().map(|r| row_to_fields(row_to_json(r))).collect())
    }
}

/// Unique violations become `Duplicate`; everything else stays a database error.
fn map_db_error(table: &TableSpec, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some("23505") {
            return StoreError::Duplicate {
                table: table.name.to_string(),
                column: db.constraint().unwrap_or("unknown").to_string(),
            };
        }
    }
    StoreError::Db(err)
}

#[async_trait]
impl Store for PgStore {
    async fn find_all(&self, table: &TableSpec) -> Result<Vec<Record>, StoreError> {
        self.fetch_all(table, &sql::select_all(table)).await
    }

    async fn find_by_id(&self, table: &TableSpec, id: Uuid) -> Result<Option<Record>, StoreError> {
        self.fetch_optional(table, &sql::select_by_id(table, &id.to_string()))
            .await
    }

    async fn find_one(&self, table: &TableSpec, filter: &Record) -> Result<Option<Record>, StoreError> {
        self.fetch_optional(table, &sql::select_where(table, filter)).await
    }

    async fn insert(&self, table: &TableSpec, record: Record) -> Result<Record, StoreError> {
        let q = sql::insert(table, &record);
        self.fetch_optional(table, &q)
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(&self, table: &TableSpec, id: Uuid, changes: &Record) -> Result<Option<Record>, StoreError> {
        self.fetch_optional(table, &sql::update(table, &id.to_string(), changes))
            .await
    }

    async fn delete(&self, table: &TableSpec, id: Uuid) -> Result<bool, StoreError> {
        let removed = self
            .fetch_optional(table, &sql::delete(table, &id.to_string()))
            .await?;
        Ok(removed.is_some())
    }

    async fn clear(&self, table: &TableSpec) -> Result<(), StoreError> {
        sqlx::query(&sql::truncate(table)).execute(&self.pool).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

fn row_to_json(row: &PgRow) -> Record {
    use sqlx::Column;
    use sqlx::Row;
    let mut map = Record::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    map
}

fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(u)) = row.try_get::<Option<Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<serde_json::Value>, _>(name) {
        return j;
    }
    Value::Null
}
