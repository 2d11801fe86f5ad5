//! `/api`: CRUD for every entity plus a few relation lookups and credential checks.

use crate::controller::{BehaviourController, ClientController, CreatureController, CrudController, UserController};
use crate::di::{Dependencies, Injectable, ProviderKey};
use crate::entity::Entity;
use crate::error::{AppError, ConfigError};
use crate::routes::middleware::{no_store, router_name};
use crate::routing::{middleware, Args, Param, Route, RouterClass, RouterDescriptor};
use crate::store::Record;
use std::sync::Arc;

pub struct ApiRouter {
    pub clients: Arc<ClientController>,
    pub creatures: Arc<CreatureController>,
    pub behaviours: Arc<BehaviourController>,
    pub users: Arc<UserController>,
}

impl Injectable for ApiRouter {
    fn dependencies() -> Vec<ProviderKey> {
        vec![
            ProviderKey::of::<ClientController>(),
            ProviderKey::of::<CreatureController>(),
            ProviderKey::of::<BehaviourController>(),
            ProviderKey::of::<UserController>(),
        ]
    }

    fn construct(deps: &Dependencies) -> Result<Self, ConfigError> {
        Ok(ApiRouter {
            clients: deps.get()?,
            creatures: deps.get()?,
            behaviours: deps.get()?,
            users: deps.get()?,
        })
    }
}

type Pick<E> = fn(&ApiRouter) -> &CrudController<E>;

fn fields(args: &Args, i: usize) -> Result<Record, AppError> {
    Ok(args.get::<Option<Record>>(i)?.unwrap_or_default())
}

/// list, add, get, update and delete for one entity under `/<path>`.
fn resource<E: Entity>(descriptor: RouterDescriptor<ApiRouter>, path: &str, pick: Pick<E>) -> RouterDescriptor<ApiRouter> {
    let item = format!("{}/:id", path);
    let name = |action: &str| format!("{}.{}", path.trim_start_matches('/'), action);
    descriptor
        .route(Route::get(path, name("list"), move |api, _| async move {
            pick(&api).get_all().await
        }))
        .route(Route::post(path, name("add"), move |api, args: Args| async move {
            pick(&api).add(fields(&args, 0)?).await
        }))
        .route(Route::get(&item, name("get"), move |api, args: Args| async move {
            pick(&api).get_by_id(&args.get::<String>(0)?).await
        }))
        .route(Route::put(&item, name("update"), move |api, args: Args| async move {
            pick(&api).update_by_id(&args.get::<String>(0)?, fields(&args, 1)?).await
        }))
        .route(Route::delete(&item, name("delete"), move |api, args: Args| async move {
            pick(&api).delete_by_id(&args.get::<String>(0)?).await
        }))
        .param(&name("add"), 0, Param::body(None))
        .param(&name("get"), 0, Param::path("id"))
        .param(&name("update"), 0, Param::path("id"))
        .param(&name("update"), 1, Param::body(None))
        .param(&name("delete"), 0, Param::path("id"))
}

impl RouterClass for ApiRouter {
    fn descriptor() -> RouterDescriptor<Self> {
        let descriptor = RouterDescriptor::new("ApiRouter")
            .prefix("api")
            .middleware(middleware(router_name));
        let descriptor = resource(descriptor, "/clients", |api| &*api.clients);
        let descriptor = resource(descriptor, "/creatures", |api| &*api.creatures);
        let descriptor = resource(descriptor, "/behaviours", |api| &*api.behaviours);
        let descriptor = resource(descriptor, "/users", |api| &*api.users);
        descriptor
            .route(Route::get("/clients/:id/creatures", "clientCreatures", |api: Arc<Self>, args: Args| async move {
                api.creatures.get_by_client_id(&args.get::<String>(0)?).await
            }))
            .route(Route::get("/creatures/:id/behaviours", "creatureBehaviours", |api: Arc<Self>, args: Args| async move {
                api.behaviours.get_by_creature_id(&args.get::<String>(0)?).await
            }))
            .route(
                Route::post("/auth", "authenticate", |api: Arc<Self>, args: Args| async move {
                    api.users.authenticate(args.get(0)?, args.get(1)?).await
                })
                .middleware(middleware(no_store)),
            )
            .param("clientCreatures", 0, Param::path("id"))
            .param("creatureBehaviours", 0, Param::path("id"))
            .param("authenticate", 0, Param::body(Some("username")))
            .param("authenticate", 1, Param::body(Some("password")))
    }
}
