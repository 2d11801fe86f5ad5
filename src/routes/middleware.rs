//! Middleware used by the application routers and the outer stack.

use crate::routing::RouterContext;
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

/// Response header naming the router that served the request.
pub const ROUTER_HEADER: &str = "x-router";

/// Tag factory-built responses with the serving router's name.
pub async fn router_name(req: Request, next: Next) -> Response {
    let name = req
        .extensions()
        .get::<RouterContext>()
        .and_then(|ctx| HeaderValue::from_str(&ctx.name).ok());
    let mut response = next.run(req).await;
    if let Some(name) = name {
        response.headers_mut().insert(ROUTER_HEADER, name);
    }
    response
}

/// Credentials responses must not be cached.
pub async fn no_store(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Adds to every response:
/// - X-Content-Type-Options: nosniff
/// - X-Frame-Options: DENY
/// - X-XSS-Protection: 1; mode=block
/// - Referrer-Policy: strict-origin-when-cross-origin
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        HeaderName::from_static("x-xss-protection"),
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}
