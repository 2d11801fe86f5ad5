//! Router descriptors and the factory that mounts them on axum.

pub mod context;
pub mod descriptor;
pub mod factory;
pub mod params;

pub use context::RouterContext;
pub use descriptor::{middleware, Alias, Middleware, Redirect, Route, RouterDescriptor, Verb};
pub use factory::{MountedRouter, RouterFactory};
pub use params::{Args, Param, ParamBinding, Source};

use crate::di::Injectable;

/// An injectable type that describes the routes it serves.
pub trait RouterClass: Injectable {
    fn descriptor() -> RouterDescriptor<Self>;
}
