//! Process-lifetime provider table: type identity -> singleton instance.

use crate::di::key::short_type_name;
use crate::di::{Configurable, Dependencies, Injectable, ProviderKey};
use crate::error::ConfigError;
use std::any::{type_name, Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type Provider = Arc<dyn Any + Send + Sync>;
type Factory = fn(&Registry) -> Result<Provider, ConfigError>;
type Hook = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) + Send + Sync>;

struct Marker {
    name: &'static str,
    /// None for instances handed over with `register`; those cannot be rebuilt.
    factory: Option<Factory>,
    hook: Option<Hook>,
}

thread_local! {
    static RESOLVING: RefCell<Vec<TypeId>> = const { RefCell::new(Vec::new()) };
}

#[derive(Default)]
pub struct Registry {
    markers: RwLock<HashMap<TypeId, Marker>>,
    providers: RwLock<HashMap<TypeId, Provider>>,
}

fn erased<T: Injectable>(registry: &Registry) -> Result<Provider, ConfigError> {
    registry.resolve::<T>().map(|p| p as Provider)
}

impl Registry {
    pub fn new() -> Self {
        tracing::debug!("creating provider registry");
        Self::default()
    }

    fn markers(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Marker>> {
        self.markers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn markers_mut(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Marker>> {
        self.markers.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn providers(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Provider>> {
        self.providers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn providers_mut(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Provider>> {
        self.providers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flag `T` as resolvable. Construction is deferred to the first `resolve`.
    pub fn mark_injectable<T: Injectable>(&self) {
        self.mark::<T>(None);
    }

    /// Flag `T` as resolvable and run `hook` on every instance the registry builds.
    pub fn mark_injectable_with<T, F>(&self, hook: F)
    where
        T: Injectable,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let hook: Hook = Arc::new(move |any: &mut (dyn Any + Send + Sync)| {
            if let Some(instance) = any.downcast_mut::<T>() {
                hook(instance);
            }
        });
        self.mark::<T>(Some(hook));
    }

    fn mark<T: Injectable>(&self, hook: Option<Hook>) {
        let name = type_name::<T>();
        self.markers_mut().insert(
            TypeId::of::<T>(),
            Marker {
                name,
                factory: Some(erased::<T>),
                hook,
            },
        );
        tracing::debug!(provider = %short_type_name(name), "marked injectable");
    }

    /// Hand over a ready-made instance (e.g. the store handle) as the provider for `T`.
    pub fn register<T: Send + Sync + 'static>(&self, instance: T) -> Arc<T> {
        let name = type_name::<T>();
        let instance = Arc::new(instance);
        self.markers_mut()
            .entry(TypeId::of::<T>())
            .or_insert(Marker {
                name,
                factory: None,
                hook: None,
            });
        self.providers_mut()
            .insert(TypeId::of::<T>(), instance.clone() as Provider);
        tracing::debug!(provider = %short_type_name(name), "provider registered");
        instance
    }

    pub fn is_injectable<T: 'static>(&self) -> bool {
        self.markers().contains_key(&TypeId::of::<T>())
    }

    /// Whether an instance of `T` is cached.
    pub fn contains<T: 'static>(&self) -> bool {
        self.providers().contains_key(&TypeId::of::<T>())
    }

    /// Number of cached providers.
    pub fn len(&self) -> usize {
        self.providers().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers().is_empty()
    }

    /// Cached provider for `T`, without constructing.
    pub fn provider<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.providers()
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|p| p.downcast::<T>().ok())
    }

    /// Cached provider by full or short type name, without constructing.
    pub fn provider_by_name(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        let id = self.type_id_by_name(name)?;
        self.providers().get(&id).cloned()
    }

    fn type_id_by_name(&self, name: &str) -> Option<TypeId> {
        self.markers()
            .iter()
            .find(|(_, m)| m.name == name || short_type_name(m.name) == name)
            .map(|(id, _)| *id)
    }

    /// Singleton lookup: the cached instance, or a new one built from the declared
    /// dependencies. Concurrent first resolutions keep the first stored instance.
    pub fn resolve<T: Injectable>(&self) -> Result<Arc<T>, ConfigError> {
        if let Some(found) = self.provider::<T>() {
            return Ok(found);
        }
        let id = TypeId::of::<T>();
        let name = type_name::<T>();
        let hook = {
            let markers = self.markers();
            let marker = markers.get(&id).ok_or_else(|| ConfigError::NotInjectable {
                name: short_type_name(name),
            })?;
            marker.hook.clone()
        };

        let entered = RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&id) {
                false
            } else {
                stack.push(id);
                true
            }
        });
        if !entered {
            return Err(ConfigError::CircularDependency(short_type_name(name)));
        }
        let built = self.build::<T>(hook);
        RESOLVING.with(|stack| {
            stack.borrow_mut().retain(|t| *t != id);
        });
        let instance = built?;

        let stored = {
            let mut providers = self.providers_mut();
            providers
                .entry(id)
                .or_insert_with(|| Arc::new(instance) as Provider)
                .clone()
        };
        tracing::debug!(provider = %short_type_name(name), "provider resolved");
        stored.downcast::<T>().map_err(|_| ConfigError::NotInjectable {
            name: short_type_name(name),
        })
    }

    fn build<T: Injectable>(&self, hook: Option<Hook>) -> Result<T, ConfigError> {
        let deps = self.resolve_dependencies(type_name::<T>(), &T::dependencies())?;
        let mut instance = T::construct(&deps)?;
        if let Some(hook) = hook {
            hook(&mut instance as &mut (dyn Any + Send + Sync));
        }
        Ok(instance)
    }

    /// Resolve a declared constructor parameter list. Every declared key must resolve.
    pub fn resolve_dependencies(
        &self,
        target: &'static str,
        declared: &[ProviderKey],
    ) -> Result<Dependencies, ConfigError> {
        let mut deps = Dependencies::new(target, declared.len());
        for key in declared {
            match self.resolve_key(key) {
                Ok(provider) => deps.insert(provider),
                Err(ConfigError::NotInjectable { name }) => {
                    tracing::warn!(
                        target_type = %short_type_name(target),
                        dependency = %name,
                        "dependency is not injectable"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        if deps.len() != declared.len() {
            return Err(ConfigError::DependencyMismatch {
                target: short_type_name(target),
                resolved: deps.len(),
                declared: declared.len(),
            });
        }
        Ok(deps)
    }

    /// Dynamic resolution for declared keys and name lookups.
    pub fn resolve_key(&self, key: &ProviderKey) -> Result<Arc<dyn Any + Send + Sync>, ConfigError> {
        let id = match key {
            ProviderKey::Type { id, .. } => *id,
            ProviderKey::Named(name) if name.trim().is_empty() => {
                return Err(ConfigError::NoType {
                    target: "Registry".into(),
                    property: "<unnamed>".into(),
                });
            }
            ProviderKey::Named(name) => {
                self.type_id_by_name(name).ok_or_else(|| ConfigError::NotInjectable { name: name.clone() })?
            }
        };
        if let Some(found) = self.providers().get(&id).cloned() {
            return Ok(found);
        }
        let factory = self.markers().get(&id).and_then(|m| m.factory);
        match factory {
            Some(factory) => factory(self),
            None => Err(ConfigError::NotInjectable {
                name: key.to_string(),
            }),
        }
    }

    /// Build `T` from explicit arguments, merge the cached provider underneath it, and
    /// cache the result for everyone resolving `T` afterwards. `property` names the member
    /// the caller binds the instance to.
    pub fn inject<T: Configurable>(&self, property: &str, args: T::Args) -> Result<Arc<T>, ConfigError> {
        let id = TypeId::of::<T>();
        let name = type_name::<T>();
        if property.trim().is_empty() {
            return Err(ConfigError::NoType {
                target: short_type_name(name),
                property: property.to_string(),
            });
        }
        let hook = {
            let markers = self.markers();
            let marker = markers.get(&id).ok_or_else(|| ConfigError::NotInjectable {
                name: short_type_name(name),
            })?;
            marker.hook.clone()
        };
        let mut fresh = T::with_args(args);
        if let Some(hook) = hook {
            hook(&mut fresh as &mut (dyn Any + Send + Sync));
        }
        if let Some(cached) = self.provider::<T>() {
            fresh.merge_from(&cached);
        }
        let fresh = Arc::new(fresh);
        self.providers_mut().insert(id, fresh.clone() as Provider);
        tracing::debug!(provider = %short_type_name(name), property, "provider injected");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BUILT: AtomicUsize = AtomicUsize::new(0);

    struct Counter {
        id: usize,
        touched: bool,
    }

    impl Injectable for Counter {
        fn construct(_deps: &Dependencies) -> Result<Self, ConfigError> {
            Ok(Counter {
                id: BUILT.fetch_add(1, Ordering::SeqCst),
                touched: false,
            })
        }
    }

    struct Greeter {
        counter: Arc<Counter>,
    }

    impl Injectable for Greeter {
        fn dependencies() -> Vec<ProviderKey> {
            vec![ProviderKey::of::<Counter>()]
        }

        fn construct(deps: &Dependencies) -> Result<Self, ConfigError> {
            Ok(Greeter {
                counter: deps.get::<Counter>()?,
            })
        }
    }

    struct Unmarked;

    impl Injectable for Unmarked {
        fn construct(_deps: &Dependencies) -> Result<Self, ConfigError> {
            Ok(Unmarked)
        }
    }

    struct NeedsUnmarked;

    impl Injectable for NeedsUnmarked {
        fn dependencies() -> Vec<ProviderKey> {
            vec![ProviderKey::of::<Counter>(), ProviderKey::of::<Unmarked>()]
        }

        fn construct(_deps: &Dependencies) -> Result<Self, ConfigError> {
            Ok(NeedsUnmarked)
        }
    }

    #[derive(Debug, Default)]
    struct Settings {
        host: Option<String>,
        port: Option<u16>,
    }

    impl Injectable for Settings {
        fn construct(_deps: &Dependencies) -> Result<Self, ConfigError> {
            Ok(Settings {
                host: Some("localhost".into()),
                port: Some(80),
            })
        }
    }

    impl Configurable for Settings {
        type Args = (Option<String>, Option<u16>);

        fn with_args((host, port): Self::Args) -> Self {
            Settings { host, port }
        }

        fn merge_from(&mut self, cached: &Self) {
            if self.host.is_none() {
                self.host = cached.host.clone();
            }
            if self.port.is_none() {
                self.port = cached.port;
            }
        }
    }

    struct Ouroboros;

    impl Injectable for Ouroboros {
        fn dependencies() -> Vec<ProviderKey> {
            vec![ProviderKey::of::<Ouroboros>()]
        }

        fn construct(_deps: &Dependencies) -> Result<Self, ConfigError> {
            Ok(Ouroboros)
        }
    }

    #[test]
    fn resolve_returns_the_same_instance() {
        let registry = Registry::new();
        registry.mark_injectable::<Counter>();
        let a = registry.resolve::<Counter>().unwrap();
        let b = registry.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn hook_runs_after_construction() {
        let registry = Registry::new();
        registry.mark_injectable_with::<Counter, _>(|c| c.touched = true);
        assert!(registry.resolve::<Counter>().unwrap().touched);
    }

    #[test]
    fn dependencies_resolve_through_the_registry() {
        let registry = Registry::new();
        registry.mark_injectable::<Counter>();
        registry.mark_injectable::<Greeter>();
        let greeter = registry.resolve::<Greeter>().unwrap();
        let counter = registry.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&greeter.counter, &counter));
    }

    #[test]
    fn unmarked_types_are_a_configuration_error() {
        let registry = Registry::new();
        let err = registry.resolve::<Unmarked>().err().unwrap();
        assert!(matches!(err, ConfigError::NotInjectable { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn missing_dependency_is_a_count_mismatch() {
        let registry = Registry::new();
        registry.mark_injectable::<Counter>();
        registry.mark_injectable::<NeedsUnmarked>();
        match registry.resolve::<NeedsUnmarked>() {
            Err(ConfigError::DependencyMismatch { resolved, declared, .. }) => {
                assert_eq!((resolved, declared), (1, 2));
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
        assert!(!registry.contains::<NeedsUnmarked>());
    }

    #[test]
    fn named_keys_resolve_by_short_name() {
        let registry = Registry::new();
        registry.mark_injectable::<Counter>();
        let provider = registry.resolve_key(&ProviderKey::named("Counter")).unwrap();
        assert!(provider.downcast::<Counter>().is_ok());
        assert!(registry.provider_by_name("Counter").is_some());
    }

    #[test]
    fn empty_named_key_has_no_type() {
        let registry = Registry::new();
        let err = registry.resolve_key(&ProviderKey::named("")).err().unwrap();
        assert!(matches!(err, ConfigError::NoType { .. }));
    }

    #[test]
    fn inject_merges_over_cached_and_replaces_it() {
        let registry = Registry::new();
        registry.mark_injectable::<Settings>();
        let first = registry.resolve::<Settings>().unwrap();
        assert_eq!(first.port, Some(80));

        let injected = registry.inject::<Settings>("settings", (None, Some(8080))).unwrap();
        assert_eq!(injected.host.as_deref(), Some("localhost"));
        assert_eq!(injected.port, Some(8080));

        let again = registry.resolve::<Settings>().unwrap();
        assert!(Arc::ptr_eq(&injected, &again));
    }

    #[test]
    fn inject_requires_a_marked_type() {
        let registry = Registry::new();
        let err = registry.inject::<Settings>("settings", (None, None)).err().unwrap();
        assert!(matches!(err, ConfigError::NotInjectable { .. }));
    }

    #[test]
    fn registered_instances_resolve_as_dependencies() {
        let registry = Registry::new();
        registry.register(String::from("handle"));
        let provider = registry.resolve_key(&ProviderKey::of::<String>()).unwrap();
        assert_eq!(provider.downcast::<String>().unwrap().as_str(), "handle");
    }

    #[test]
    fn self_dependency_is_detected() {
        let registry = Registry::new();
        registry.mark_injectable::<Ouroboros>();
        let err = registry.resolve::<Ouroboros>().err().unwrap();
        assert!(matches!(err, ConfigError::CircularDependency(_)));
    }
}
