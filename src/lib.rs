//! Bestiary: CRUD REST backend for clients, creatures, behaviours and users, with routes
//! produced from router descriptors by a typed provider registry.

pub mod app;
pub mod case;
pub mod config;
pub mod controller;
pub mod di;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod routing;
pub mod sql;
pub mod state;
pub mod store;

pub use app::{bootstrap, build_app, get_app, init_tracing, mount_all};
pub use config::Settings;
pub use di::{Configurable, Dependencies, Injectable, ProviderKey, Registry};
pub use error::{AppError, ConfigError, ErrorEvent};
pub use response::{success_many, success_one};
pub use routing::{MountedRouter, RouterClass, RouterDescriptor, RouterFactory};
pub use state::AppState;
pub use store::{Database, MemoryStore, PgStore, Store};
