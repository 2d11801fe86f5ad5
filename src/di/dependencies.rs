use crate::di::key::short_type_name;
use crate::error::ConfigError;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// Resolved constructor arguments for one target, keyed by provider type.
pub struct Dependencies {
    target: &'static str,
    declared: usize,
    resolved: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Dependencies {
    pub(crate) fn new(target: &'static str, declared: usize) -> Self {
        Dependencies {
            target,
            declared,
            resolved: HashMap::new(),
        }
    }

    /// Empty bag, for constructing types without dependencies outside the registry.
    pub fn none<T: 'static>() -> Self {
        Dependencies::new(type_name::<T>(), 0)
    }

    pub(crate) fn insert(&mut self, provider: Arc<dyn Any + Send + Sync>) {
        let id = Any::type_id(&*provider);
        self.resolved.insert(id, provider);
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    /// Typed access to a declared dependency.
    pub fn get<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ConfigError> {
        self.resolved
            .get(&TypeId::of::<T>())
            .and_then(|p| p.clone().downcast::<T>().ok())
            .ok_or_else(|| {
                tracing::error!(
                    target_type = %short_type_name(self.target),
                    dependency = %short_type_name(type_name::<T>()),
                    "dependency requested but not declared"
                );
                ConfigError::DependencyMismatch {
                    target: short_type_name(self.target),
                    resolved: self.resolved.len(),
                    declared: self.declared,
                }
            })
    }
}
