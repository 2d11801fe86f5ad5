//! Declarative router metadata: prefix, routes, bindings, aliases, redirects, middleware.

use crate::di::{short_type_name, ProviderKey};
use crate::error::AppError;
use crate::routing::params::{Args, Param, ParamBinding};
use crate::routing::RouterClass;
use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
    routing::MethodFilter,
};
use futures::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

pub type Handler<R> = Arc<dyn Fn(Arc<R>, Args) -> BoxFuture<'static, Result<Value, AppError>> + Send + Sync>;

pub type Middleware = Arc<dyn Fn(Request, Next) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wrap an async fn as a router or route middleware.
pub fn middleware<F, Fut>(f: F) -> Middleware
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req, next| Box::pin(f(req, next)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    pub fn filter(self) -> MethodFilter {
        match self {
            Verb::Get => MethodFilter::GET,
            Verb::Post => MethodFilter::POST,
            Verb::Put => MethodFilter::PUT,
            Verb::Delete => MethodFilter::DELETE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

pub struct Route<R> {
    pub verb: Verb,
    pub path: String,
    pub handler_name: String,
    pub(crate) handler: Handler<R>,
    pub(crate) middleware: Vec<Middleware>,
    pub skip_router_middleware: bool,
}

impl<R: Send + Sync + 'static> Route<R> {
    pub fn new<F, Fut, T>(verb: Verb, path: &str, handler_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<R>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Serialize,
    {
        let handler: Handler<R> = Arc::new(move |router, args| {
            let fut = f(router, args);
            Box::pin(async move { Ok(serde_json::to_value(fut.await?)?) })
        });
        Route {
            verb,
            path: path.to_string(),
            handler_name: handler_name.into(),
            handler,
            middleware: Vec::new(),
            skip_router_middleware: false,
        }
    }

    pub fn get<F, Fut, T>(path: &str, handler_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<R>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Serialize,
    {
        Self::new(Verb::Get, path, handler_name, f)
    }

    pub fn post<F, Fut, T>(path: &str, handler_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<R>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Serialize,
    {
        Self::new(Verb::Post, path, handler_name, f)
    }

    pub fn put<F, Fut, T>(path: &str, handler_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<R>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Serialize,
    {
        Self::new(Verb::Put, path, handler_name, f)
    }

    pub fn delete<F, Fut, T>(path: &str, handler_name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Arc<R>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, AppError>> + Send + 'static,
        T: Serialize,
    {
        Self::new(Verb::Delete, path, handler_name, f)
    }

    /// Runs after the router-wide middleware, in the order added.
    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    pub fn skip_router_middleware(mut self) -> Self {
        self.skip_router_middleware = true;
        self
    }
}

/// `GET /<name>` at the root redirects to `prefix + destination`.
#[derive(Clone, Debug)]
pub struct Alias {
    pub name: String,
    pub destination: String,
}

/// Declared name and prefix of another router, used as a redirect target.
pub type TargetRouter = fn() -> (String, Option<String>);

fn target_of<T: RouterClass>() -> (String, Option<String>) {
    let descriptor = T::descriptor();
    (descriptor.name, descriptor.prefix)
}

#[derive(Clone, Debug)]
pub struct Redirect {
    pub paths: Vec<String>,
    pub destination: String,
    pub router: Option<TargetRouter>,
    pub code: Option<u16>,
}

impl Redirect {
    pub fn new<I, P>(paths: I, destination: &str) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Redirect {
            paths: paths.into_iter().map(Into::into).collect(),
            destination: destination.to_string(),
            router: None,
            code: None,
        }
    }

    /// Resolve the destination under another router's prefix.
    pub fn to_router<T: RouterClass>(mut self) -> Self {
        self.router = Some(target_of::<T>);
        self
    }

    pub fn code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }
}

pub struct RouterDescriptor<R> {
    pub name: String,
    pub prefix: Option<String>,
    pub(crate) routes: Vec<Route<R>>,
    pub(crate) params: Vec<ParamBinding>,
    pub aliases: Vec<Alias>,
    pub redirects: Vec<Redirect>,
    pub(crate) middleware: Vec<Middleware>,
    pub providers: Vec<ProviderKey>,
    pub skip_default_route: bool,
}

impl<R: Send + Sync + 'static> Default for RouterDescriptor<R> {
    fn default() -> Self {
        RouterDescriptor::new(short_type_name(std::any::type_name::<R>()))
    }
}

impl<R: Send + Sync + 'static> RouterDescriptor<R> {
    pub fn new(name: impl Into<String>) -> Self {
        RouterDescriptor {
            name: name.into(),
            prefix: None,
            routes: Vec::new(),
            params: Vec::new(),
            aliases: Vec::new(),
            redirects: Vec::new(),
            middleware: Vec::new(),
            providers: Vec::new(),
            skip_default_route: false,
        }
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    pub fn alias(mut self, name: &str, destination: &str) -> Self {
        self.aliases.push(Alias {
            name: name.trim_matches('/').to_string(),
            destination: destination.to_string(),
        });
        self
    }

    pub fn redirect(mut self, redirect: Redirect) -> Self {
        self.redirects.push(redirect);
        self
    }

    pub fn skip_default_route(mut self) -> Self {
        self.skip_default_route = true;
        self
    }

    /// Router-wide middleware, run in the order added.
    pub fn middleware(mut self, mw: Middleware) -> Self {
        self.middleware.push(mw);
        self
    }

    /// Extra provider resolved when the router is built.
    pub fn provider(mut self, key: ProviderKey) -> Self {
        self.providers.push(key);
        self
    }

    pub fn route(mut self, route: Route<R>) -> Self {
        self.routes.push(route);
        self
    }

    /// Bind argument `index` of `handler` to a request source.
    pub fn param(mut self, handler: &str, index: usize, param: Param) -> Self {
        self.params.push(ParamBinding {
            handler: handler.to_string(),
            index,
            param,
        });
        self
    }

    pub fn routes(&self) -> &[Route<R>] {
        &self.routes
    }

    pub fn params(&self) -> &[ParamBinding] {
        &self.params
    }
}
