//! Process wiring: provider registry, routers, error reporting and the outer middleware stack.

use crate::config::Settings;
use crate::controller::{BehaviourController, ClientController, CreatureController, UserController};
use crate::di::Registry;
use crate::entity;
use crate::error::{AppError, ConfigError, ErrorEvent};
use crate::routes::{common_routes, security_headers, ApiRouter, AuthRouter, COMMON_PATHS};
use crate::routing::{MountedRouter, RouterFactory};
use crate::state::AppState;
use crate::store::{self, Database, Store};
use axum::{
    extract::{Request, State},
    handler::HandlerWithoutStateExt,
    middleware::{from_fn, from_fn_with_state, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::{
    catch_panic::CatchPanicLayer,
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 1024 * 1024;

/// `RUST_LOG`, defaulting to `bestiary=info,tower_http=info`.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bestiary=info,tower_http=info"));
    if tracing_subscriber::fmt().with_env_filter(filter).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Registry with the store provider and every controller and router marked injectable.
pub fn bootstrap(store: Arc<dyn Store>) -> Arc<Registry> {
    let registry = Arc::new(Registry::new());
    registry.register(Database::new(store));
    registry.mark_injectable::<ClientController>();
    registry.mark_injectable::<CreatureController>();
    registry.mark_injectable::<BehaviourController>();
    registry.mark_injectable::<UserController>();
    registry.mark_injectable::<ApiRouter>();
    registry.mark_injectable::<AuthRouter>();
    registry
}

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".into())
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| err.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".into());
    tracing::error!(%detail, "handler panicked");
    AppError::Internal("Internal Server Error".into()).into_response()
}

/// Log every error response and publish it on the error feed.
async fn report_errors(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let response = next.run(req).await;

    let status = response.status();
    if !status.is_client_error() && !status.is_server_error() {
        return response;
    }
    let mut event = response
        .extensions()
        .get::<ErrorEvent>()
        .cloned()
        .unwrap_or_else(|| ErrorEvent {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or("Error").to_string(),
            method: None,
            path: None,
        });
    event.method = Some(method);
    event.path = Some(path);

    if status.is_server_error() {
        tracing::error!(status = event.status, method = ?event.method, path = ?event.path, message = %event.message, "request failed");
    } else {
        tracing::warn!(status = event.status, method = ?event.method, path = ?event.path, message = %event.message, "request rejected");
    }
    if state.errors.send(event).is_err() {
        tracing::trace!("no error subscribers");
    }
    response
}

/// Merge built routers. A path mounted twice (an alias shadowing another router's prefix,
/// or a common route) is a startup error rather than a panic inside `Router::merge`.
pub fn mount_all(routers: Vec<MountedRouter>) -> Result<Router, ConfigError> {
    let mut owners: BTreeMap<String, String> = COMMON_PATHS
        .iter()
        .map(|p| (p.to_string(), "common".to_string()))
        .collect();
    for mounted in &routers {
        for path in &mounted.paths {
            if let Some(owner) = owners.insert(path.clone(), mounted.name.clone()) {
                tracing::error!(router = %mounted.name, %path, %owner, "route collision");
                return Err(ConfigError::RouteCollision {
                    router: mounted.name.clone(),
                    path: path.clone(),
                });
            }
        }
    }
    Ok(routers
        .into_iter()
        .fold(Router::new(), |app, mounted| app.merge(mounted.into_router())))
}

/// Mount both routers and the common routes, serve static files for anything unrouted,
/// and wrap everything in the error-reporting and security stack.
pub fn build_app(state: AppState) -> Result<Router, ConfigError> {
    let api = RouterFactory::build::<ApiRouter>(&state.registry, None)?;
    let auth = RouterFactory::build::<AuthRouter>(&state.registry, None)?;

    let assets = ServeDir::new(&state.public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(not_found.into_service());

    Ok(Router::new()
        .merge(common_routes(state.clone()))
        .merge(mount_all(vec![api, auth])?)
        .fallback_service(assets)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(from_fn_with_state(state, report_errors))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(from_fn(security_headers)))
}

/// Open the store for `settings`, wire the registry and build the router.
pub async fn get_app(settings: &Settings) -> Result<(Router, AppState), AppError> {
    let store = store::connect(&settings.profile, &entity::tables()).await?;
    let registry = bootstrap(store.clone());
    let state = AppState::new(registry, store).with_public_dir(&settings.public_dir);
    let app = build_app(state.clone())?;
    Ok((app, state))
}
