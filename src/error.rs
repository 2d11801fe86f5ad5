//! Typed errors and HTTP mapping.

use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Wiring and startup failures. These are fatal: the process should not start serving.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("'{name}' is not marked injectable")]
    NotInjectable { name: String },
    #[error("no type was specified for member '{property}' in [{target}]")]
    NoType { target: String, property: String },
    #[error("mismatching injectable parameters for '{target}': resolved {resolved} out of {declared}")]
    DependencyMismatch {
        target: String,
        resolved: usize,
        declared: usize,
    },
    #[error("circular dependency while resolving '{0}'")]
    CircularDependency(String),
    #[error("no prefix set for injectable router '{0}'")]
    MissingPrefix(String),
    #[error("invalid redirect status {code} in router '{router}'")]
    InvalidRedirect { router: String, code: u16 },
    #[error("path '{path}' of router '{router}' is already mounted")]
    RouteCollision { router: String, path: String },
    #[error("no connection profile configured for environment '{0}'")]
    UnknownProfile(String),
    #[error("unsupported database driver '{0}'")]
    UnsupportedDriver(String),
    #[error("config load: {0}")]
    Load(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    BadRequest(String),
    /// Framework rejection (body too large, unreadable body) with its own status.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Rejected { status, .. } => *status,
            AppError::Config(_)
            | AppError::Store(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error observed on its way out of the request chain. Attached to the response by
/// `IntoResponse` and completed with the request line by the error-reporting middleware.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorEvent {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        let event = ErrorEvent {
            status: status.as_u16(),
            message: message.clone(),
            method: None,
            path: None,
        };
        let mut response = (status, message).into_response();
        response.extensions_mut().insert(event);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_errors_keep_status_and_plain_message() {
        let response = AppError::UnprocessableEntity("Unable to find Client with id 'x'".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let event = response.extensions().get::<ErrorEvent>().cloned().unwrap();
        assert_eq!(event.status, 422);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Unable to find Client with id 'x'");
    }

    #[test]
    fn rejections_keep_their_status() {
        let err = AppError::Rejected {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "length limit exceeded".into(),
        };
        assert_eq!(err.into_response().status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn wiring_errors_map_to_500() {
        let err = AppError::from(ConfigError::MissingPrefix("AuthRouter".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "no prefix set for injectable router 'AuthRouter'");
    }
}
