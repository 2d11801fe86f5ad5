use crate::controller::UserController;
use crate::entity::User;
use crate::error::AppError;
use crate::store::Record;
use serde_json::Value;

impl UserController {
    /// User whose email and password both match. A miss is 422.
    pub async fn authenticate(&self, username: Option<String>, password: Option<String>) -> Result<User, AppError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AppError::UnprocessableEntity("Invalid credentials".into()));
        };
        let mut filter = Record::new();
        filter.insert("email".into(), Value::String(username));
        filter.insert("password".into(), Value::String(password));
        self.get_one(&filter)
            .await
            .map_err(|_| AppError::UnprocessableEntity("Invalid credentials".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn authenticate_matches_email_and_password() {
        let users = UserController::new(Arc::new(MemoryStore::new()));
        let fields = json!({"email": "ann@example.com", "password": "hunter2"});
        users.add(fields.as_object().cloned().unwrap()).await.unwrap();

        let user = users
            .authenticate(Some("ann@example.com".into()), Some("hunter2".into()))
            .await
            .unwrap();
        assert_eq!(user.email, "ann@example.com");
        let err = users
            .authenticate(Some("ann@example.com".into()), Some("wrong".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnprocessableEntity(_)));
        assert!(users.authenticate(None, None).await.is_err());
    }
}
