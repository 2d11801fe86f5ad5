use crate::di::Registry;
use std::any::Any;
use std::sync::Arc;

/// Inserted into request extensions ahead of every factory-built route.
#[derive(Clone)]
pub struct RouterContext {
    pub name: String,
    pub prefix: String,
    instance: Arc<dyn Any + Send + Sync>,
    registry: Arc<Registry>,
}

impl RouterContext {
    pub(crate) fn new(
        name: String,
        prefix: String,
        instance: Arc<dyn Any + Send + Sync>,
        registry: Arc<Registry>,
    ) -> Self {
        RouterContext {
            name,
            prefix,
            instance,
            registry,
        }
    }

    /// The router instance serving this request.
    pub fn router<R: Send + Sync + 'static>(&self) -> Option<Arc<R>> {
        self.instance.clone().downcast::<R>().ok()
    }

    pub fn provider<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.registry.provider::<T>()
    }

    pub fn provider_by_name(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.registry.provider_by_name(name)
    }
}
