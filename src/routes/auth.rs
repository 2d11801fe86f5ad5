//! `/auth`: login and register pages, reachable from the root through aliases.

use crate::controller::UserController;
use crate::di::{Dependencies, Injectable, ProviderKey};
use crate::error::{AppError, ConfigError};
use crate::routes::ApiRouter;
use crate::routing::{Redirect, Route, RouterClass, RouterDescriptor};
use std::sync::Arc;

pub struct AuthRouter {
    pub users: Arc<UserController>,
}

impl Injectable for AuthRouter {
    fn dependencies() -> Vec<ProviderKey> {
        vec![ProviderKey::of::<UserController>()]
    }

    fn construct(deps: &Dependencies) -> Result<Self, ConfigError> {
        Ok(AuthRouter { users: deps.get()? })
    }
}

impl RouterClass for AuthRouter {
    fn descriptor() -> RouterDescriptor<Self> {
        RouterDescriptor::new("AuthRouter")
            .prefix("auth")
            .alias("login", "/login")
            .alias("register", "/register")
            .redirect(Redirect::new(["/"], "/login"))
            .redirect(Redirect::new(["/clients"], "/clients").to_router::<ApiRouter>())
            .route(Route::get("/login", "login", |_, _| async {
                tracing::debug!("authrouter/login");
                Ok::<_, AppError>("authrouter/login")
            }))
            .route(Route::get("/register", "register", |_, _| async {
                tracing::debug!("authrouter/register");
                Ok::<_, AppError>("authrouter/register")
            }))
    }
}
