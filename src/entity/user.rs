use crate::entity::{require, validate_email, Entity, EntityBase, Method};
use crate::error::AppError;
use crate::store::{Column, Record, TableSpec};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub base: EntityBase,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl Default for User {
    /// A new user without a password gets a random token.
    fn default() -> Self {
        User {
            base: EntityBase::default(),
            email: String::new(),
            password: Uuid::new_v4().simple().to_string(),
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "User";
    const TABLE: TableSpec = TableSpec {
        name: "user",
        columns: &[Column::new("email", "text").unique(), Column::new("password", "text")],
    };

    fn validate(fields: &Record, method: Method) -> Result<(), AppError> {
        require(fields, "email", method)?;
        validate_email(fields, "email")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_defaults_to_token() {
        let fields = json!({"email": "ann@example.com"}).as_object().cloned().unwrap();
        let user = User::from_partial(&fields).unwrap();
        assert_eq!(user.password.len(), 32);
    }

    #[test]
    fn email_required_on_create_only() {
        let empty = Record::new();
        assert!(User::validate(&empty, Method::Create).is_err());
        assert!(User::validate(&empty, Method::Update).is_ok());
    }
}
