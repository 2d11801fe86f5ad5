//! Builds parameterized SELECT, INSERT, UPDATE, DELETE and DDL from a table spec.

use crate::case::field_to_column;
use crate::store::{Record, TableSpec};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from table specs).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// Columns the store manages, with their PostgreSQL types.
const MANAGED_COLUMNS: &[(&str, &str)] = &[
    ("id", "uuid"),
    ("version", "bigint"),
    ("created_at", "timestamptz"),
    ("updated_at", "timestamptz"),
];

/// PostgreSQL type for an API field, if the table knows it.
fn field_type(table: &TableSpec, field: &str) -> Option<&'static str> {
    let column = field_to_column(field);
    MANAGED_COLUMNS
        .iter()
        .find(|(name, _)| *name == column)
        .map(|(_, t)| *t)
        .or_else(|| table.column(field).map(|c| c.pg_type))
}

fn select_column_list(table: &TableSpec) -> String {
    MANAGED_COLUMNS
        .iter()
        .map(|(name, _)| quoted(name))
        .chain(table.columns.iter().map(|c| quoted(&field_to_column(c.name))))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn select_all(table: &TableSpec) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(table),
        quoted(table.name),
        quoted("created_at")
    );
    q
}

pub fn select_by_id(table: &TableSpec, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}::uuid",
        select_column_list(table),
        quoted(table.name),
        quoted("id"),
        n
    );
    q
}

/// SELECT the first row matching every filter field (exact match). An unknown field matches nothing.
pub fn select_where(table: &TableSpec, filter: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut where_parts = Vec::new();
    for (field, val) in filter {
        let Some(pg_type) = field_type(table, field) else {
            where_parts.push("FALSE".to_string());
            continue;
        };
        if val.is_null() {
            where_parts.push(format!("{} IS NULL", quoted(&field_to_column(field))));
            continue;
        }
        let n = q.push_param(val.clone());
        where_parts.push(format!("{} = ${}::{}", quoted(&field_to_column(field)), n, pg_type));
    }
    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT 1",
        select_column_list(table),
        quoted(table.name),
        where_clause,
        quoted("created_at")
    );
    q
}

/// INSERT entity columns present in the record; the database fills id, version and timestamps.
pub fn insert(table: &TableSpec, record: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in table.columns {
        let Some(val) = record.get(c.name) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(&field_to_column(c.name)));
        placeholders.push(format!("${}::{}", n, c.pg_type));
    }
    let returning = select_column_list(table);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", quoted(table.name), returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quoted(table.name),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET entity columns present in `changes`, bump version, touch updated_at.
pub fn update(table: &TableSpec, id: &str, changes: &Record) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for (field, val) in changes {
        let Some(c) = table.column(field) else { continue };
        let n = q.push_param(val.clone());
        sets.push(format!("{} = ${}::{}", quoted(&field_to_column(field)), n, c.pg_type));
    }
    sets.push(format!("{} = {} + 1", quoted("version"), quoted("version")));
    sets.push(format!("{} = NOW()", quoted("updated_at")));
    let id_param = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${}::uuid RETURNING {}",
        quoted(table.name),
        sets.join(", "),
        quoted("id"),
        id_param,
        select_column_list(table)
    );
    q
}

pub fn delete(table: &TableSpec, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::String(id.to_string()));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${}::uuid RETURNING {}",
        quoted(table.name),
        quoted("id"),
        n,
        quoted("id")
    );
    q
}

pub fn truncate(table: &TableSpec) -> String {
    format!("TRUNCATE TABLE {}", quoted(table.name))
}

/// CREATE TABLE IF NOT EXISTS with managed columns first.
pub fn create_table(table: &TableSpec) -> String {
    let mut defs = vec![
        format!("{} UUID PRIMARY KEY DEFAULT gen_random_uuid()", quoted("id")),
        format!("{} BIGINT NOT NULL DEFAULT 1", quoted("version")),
        format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted("created_at")),
        format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted("updated_at")),
    ];
    for c in table.columns {
        let mut def = format!("{} {}", quoted(&field_to_column(c.name)), c.pg_type.to_uppercase());
        if c.unique {
            def.push_str(" UNIQUE");
        }
        defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        quoted(table.name),
        defs.join(",\n    ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Column;
    use serde_json::json;

    const USERS: TableSpec = TableSpec {
        name: "user",
        columns: &[Column::new("email", "text").unique(), Column::new("password", "text")],
    };

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn insert_casts_every_placeholder() {
        let q = insert(&USERS, &record(json!({"email": "a@b.c"})));
        assert_eq!(
            q.sql,
            "INSERT INTO \"user\" (\"email\") VALUES ($1::text) RETURNING \"id\", \"version\", \"created_at\", \"updated_at\", \"email\", \"password\""
        );
        assert_eq!(q.params, vec![json!("a@b.c")]);
    }

    #[test]
    fn insert_without_columns_uses_defaults() {
        let q = insert(&USERS, &Record::new());
        assert!(q.sql.starts_with("INSERT INTO \"user\" DEFAULT VALUES"));
    }

    #[test]
    fn update_skips_unknown_fields_and_bumps_version() {
        let q = update(&USERS, "00000000-0000-0000-0000-000000000000", &record(json!({"password": "x", "nope": 1})));
        assert!(q.sql.starts_with("UPDATE \"user\" SET \"password\" = $1::text, \"version\" = \"version\" + 1"));
        assert!(q.sql.contains("WHERE \"id\" = $2::uuid"));
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn select_where_maps_identity_and_nulls() {
        let q = select_where(&USERS, &record(json!({"uuid": "abc", "password": null})));
        assert!(q.sql.contains("\"id\" = $1::uuid"));
        assert!(q.sql.contains("\"password\" IS NULL"));
        assert_eq!(q.params, vec![json!("abc")]);
    }

    #[test]
    fn select_where_unknown_field_matches_nothing() {
        let q = select_where(&USERS, &record(json!({"nickname": "zed"})));
        assert!(q.sql.contains(" WHERE FALSE "));
        assert!(q.params.is_empty());
    }

    #[test]
    fn create_table_marks_unique_columns() {
        let ddl = create_table(&USERS);
        assert!(ddl.contains("\"email\" TEXT UNIQUE"));
        assert!(ddl.contains("\"id\" UUID PRIMARY KEY DEFAULT gen_random_uuid()"));
    }
}
