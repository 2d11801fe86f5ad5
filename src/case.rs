//! Key conversion between the API (camelCase, `uuid`) and PostgreSQL columns (snake_case, `id`).

use serde_json::{Map, Value};

/// Convert a single identifier from snake_case to camelCase.
/// e.g. "created_at" -> "createdAt"
pub fn to_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut capitalize_next = false;
    for c in s.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            out.extend(c.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "updatedAt" -> "updated_at"
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// API field -> column name. The identity is stored as `id`.
pub fn field_to_column(field: &str) -> String {
    if field == "uuid" {
        "id".to_string()
    } else {
        to_snake_case(field)
    }
}

/// Column name -> API field.
pub fn column_to_field(column: &str) -> String {
    if column == "id" {
        "uuid".to_string()
    } else {
        to_camel_case(column)
    }
}

/// Rename all keys of a row from column names to API fields.
pub fn row_to_fields(row: Map<String, Value>) -> Map<String, Value> {
    row.into_iter().map(|(k, v)| (column_to_field(&k), v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identity_maps_to_id_column() {
        assert_eq!(field_to_column("uuid"), "id");
        assert_eq!(field_to_column("createdAt"), "created_at");
        assert_eq!(column_to_field("id"), "uuid");
        assert_eq!(column_to_field("updated_at"), "updatedAt");
    }

    #[test]
    fn rows_are_renamed_to_fields() {
        let row = json!({"id": "a", "created_at": "t", "email": "e"});
        let fields = row_to_fields(row.as_object().cloned().unwrap());
        assert_eq!(Value::Object(fields), json!({"uuid": "a", "createdAt": "t", "email": "e"}));
    }
}
