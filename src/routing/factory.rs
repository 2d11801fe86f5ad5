//! Turns a [`RouterDescriptor`] into an axum [`Router`]: prefix, redirects, routes with their
//! middleware chain, the default index route and alias routers.

use crate::di::Registry;
use crate::error::{AppError, ConfigError};
use crate::extractors::RequestSources;
use crate::response::envelope;
use crate::routing::descriptor::{Middleware, Route, RouterDescriptor, Verb};
use crate::routing::params::{bindings_for, Args};
use crate::routing::{RouterClass, RouterContext};
use axum::{
    extract::Request,
    http::{header::LOCATION, StatusCode},
    middleware::{from_fn, Next},
    routing::{get, on, MethodRouter},
    Router,
};
use std::any::Any;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

/// A built router plus the root-level alias routers that point into it.
pub struct MountedRouter {
    pub name: String,
    pub prefix: String,
    pub router: Router,
    pub aliased: Vec<Router>,
    /// Every path mounted by `router` and `aliased`.
    pub paths: BTreeSet<String>,
}

impl MountedRouter {
    pub fn into_router(self) -> Router {
        self.aliased.into_iter().fold(self.router, Router::merge)
    }
}

/// Leading slash, no trailing slash. "/" and "" normalize to "".
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

pub fn join(prefix: &str, path: &str) -> String {
    let path = path.trim().trim_end_matches('/');
    if path.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else if path.starts_with('/') {
        format!("{}{}", prefix, path)
    } else {
        format!("{}/{}", prefix, path)
    }
}

fn redirect_to(code: StatusCode, location: String) -> MethodRouter {
    get(move || {
        let location = location.clone();
        async move { (code, [(LOCATION, location)]) }
    })
}

fn redirect_code(router: &str, code: Option<u16>) -> Result<StatusCode, ConfigError> {
    let code = code.unwrap_or(302);
    StatusCode::from_u16(code)
        .ok()
        .filter(StatusCode::is_redirection)
        .ok_or_else(|| ConfigError::InvalidRedirect {
            router: router.to_string(),
            code,
        })
}

fn layer(method_router: MethodRouter, mw: &Middleware) -> MethodRouter {
    let mw = mw.clone();
    method_router.layer(from_fn(move |req: Request, next: Next| mw(req, next)))
}

/// Route table under construction. The first claim on a (verb, path) wins.
struct Table {
    name: String,
    router: Router,
    claimed: HashSet<(Verb, String)>,
    paths: BTreeSet<String>,
}

impl Table {
    fn claim(&mut self, verb: Verb, path: &str) -> bool {
        if self.claimed.insert((verb, path.to_string())) {
            return true;
        }
        tracing::warn!(router = %self.name, method = verb.as_str(), %path, "route already registered, skipping");
        false
    }

    /// Mount at `path`, and at `path/` for a router's root.
    fn mount(&mut self, path: &str, root: bool, method_router: MethodRouter) {
        let router = std::mem::replace(&mut self.router, Router::new());
        self.paths.insert(path.to_string());
        self.router = if root && path != "/" {
            self.paths.insert(format!("{}/", path));
            router
                .route(path, method_router.clone())
                .route(&format!("{}/", path), method_router)
        } else {
            router.route(path, method_router)
        };
    }
}

pub struct RouterFactory;

impl RouterFactory {
    /// Build router `R`. A non-empty `prefix` replaces the declared one.
    pub fn build<R: RouterClass>(registry: &Arc<Registry>, prefix: Option<&str>) -> Result<MountedRouter, ConfigError> {
        let RouterDescriptor {
            name,
            prefix: declared,
            mut routes,
            params,
            aliases,
            redirects,
            middleware: router_middleware,
            providers,
            skip_default_route,
        } = R::descriptor();

        if !registry.is_injectable::<R>() {
            return Err(ConfigError::NotInjectable { name });
        }
        let prefix = match prefix.filter(|p| !p.trim().is_empty()).map(str::to_string).or(declared) {
            Some(p) => normalize_prefix(&p),
            None => {
                tracing::error!(router = %name, "no prefix set");
                return Err(ConfigError::MissingPrefix(name));
            }
        };

        let instance = registry.resolve::<R>()?;
        for key in &providers {
            registry.resolve_key(key)?;
        }

        let root = join(&prefix, "/");
        let mut table = Table {
            name: name.clone(),
            router: Router::new(),
            claimed: HashSet::new(),
            paths: BTreeSet::new(),
        };

        let mut aliased = Vec::with_capacity(aliases.len());
        let mut alias_paths = BTreeSet::new();
        for alias in &aliases {
            let from = format!("/{}", alias.name);
            let to = join(&prefix, &alias.destination);
            if !alias_paths.insert(from.clone()) {
                return Err(ConfigError::RouteCollision { router: name, path: from });
            }
            alias_paths.insert(format!("{}/", from));
            tracing::debug!(router = %name, %from, %to, "alias");
            aliased.push(
                Router::new()
                    .route(&from, redirect_to(StatusCode::FOUND, to.clone()))
                    .route(&format!("{}/", from), redirect_to(StatusCode::FOUND, to)),
            );
        }

        for redirect in &redirects {
            let code = redirect_code(&name, redirect.code)?;
            let target_prefix = match redirect.router {
                Some(target) => {
                    let (target_name, target_prefix) = target();
                    normalize_prefix(&target_prefix.ok_or(ConfigError::MissingPrefix(target_name))?)
                }
                None => prefix.clone(),
            };
            let destination = join(&target_prefix, &redirect.destination);
            for path in &redirect.paths {
                let full = join(&prefix, path);
                if table.claim(Verb::Get, &full) {
                    tracing::debug!(router = %name, from = %full, to = %destination, code = code.as_u16(), "redirect");
                    table.mount(&full, full == root, redirect_to(code, destination.clone()));
                }
            }
        }

        let root_claimed = table.claimed.contains(&(Verb::Get, root.clone()))
            || routes.iter().any(|r| r.verb == Verb::Get && join(&prefix, &r.path) == root);
        if !root_claimed && !skip_default_route {
            let index = format!("{} -> index", root);
            routes.push(Route::get("/", "index", move |_router: Arc<R>, _args| {
                let index = index.clone();
                async move { Ok::<_, AppError>(index) }
            }));
        }

        let context = RouterContext::new(
            name.clone(),
            prefix.clone(),
            instance.clone() as Arc<dyn Any + Send + Sync>,
            registry.clone(),
        );
        let mut mounted = 0usize;
        for route in routes {
            let full = join(&prefix, &route.path);
            if !table.claim(route.verb, &full) {
                continue;
            }
            let bindings = bindings_for(&params, &route.handler_name);
            let handler = route.handler.clone();
            let target = instance.clone();
            let endpoint = move |sources: RequestSources| {
                let handler = handler.clone();
                let target = target.clone();
                let args = Args::extract(&bindings, &sources);
                async move { envelope(handler(target, args).await) }
            };

            let mut method_router: MethodRouter = on(route.verb.filter(), endpoint);
            for mw in route.middleware.iter().rev() {
                method_router = layer(method_router, mw);
            }
            if !route.skip_router_middleware {
                for mw in router_middleware.iter().rev() {
                    method_router = layer(method_router, mw);
                }
            }
            let ctx = context.clone();
            method_router = method_router.layer(from_fn(move |mut req: Request, next: Next| {
                req.extensions_mut().insert(ctx.clone());
                next.run(req)
            }));

            tracing::debug!(router = %name, method = route.verb.as_str(), path = %full, handler = %route.handler_name, "route");
            table.mount(&full, full == root, method_router);
            mounted += 1;
        }

        if let Some(path) = alias_paths.intersection(&table.paths).next() {
            return Err(ConfigError::RouteCollision {
                router: name,
                path: path.clone(),
            });
        }
        let mut paths = table.paths;
        paths.extend(alias_paths);

        tracing::info!(router = %name, prefix = %root, routes = mounted, aliases = aliased.len(), "router mounted");
        Ok(MountedRouter {
            name,
            prefix,
            router: table.router,
            aliased,
            paths,
        })
    }
}
