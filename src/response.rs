//! Response envelope for handler results.

use crate::error::AppError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (StatusCode::OK, Json(SuccessOne { data }))
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}

/// Wrap a handler result: lists get a count, `null` means nothing to send and becomes 404.
pub fn envelope(result: Result<Value, AppError>) -> Response {
    match result {
        Ok(Value::Null) => AppError::NotFound("Not Found".into()).into_response(),
        Ok(Value::Array(items)) => success_many(items).into_response(),
        Ok(value) => success_one(value).into_response(),
        Err(err) => err.into_response(),
    }
}
