//! Provider registry: explicit, typed dependency injection built once at startup.
//!
//! A type becomes resolvable after [`Registry::mark_injectable`] (or
//! [`Registry::register`] for ready-made instances). Constructor dependencies are
//! declared by [`Injectable::dependencies`] and handed to [`Injectable::construct`].

mod dependencies;
mod key;
mod registry;

pub use dependencies::Dependencies;
pub use key::{short_type_name, ProviderKey};
pub use registry::Registry;

use crate::error::ConfigError;

/// A type the registry can construct and cache as a singleton provider.
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Constructor parameter types, in declaration order.
    fn dependencies() -> Vec<ProviderKey> {
        Vec::new()
    }

    fn construct(deps: &Dependencies) -> Result<Self, ConfigError>;
}

/// A provider that can also be built from explicit arguments via [`Registry::inject`].
pub trait Configurable: Injectable {
    type Args;

    fn with_args(args: Self::Args) -> Self;

    /// Fill whatever the explicit construction left unset from the cached provider.
    /// Values already set on `self` take precedence.
    fn merge_from(&mut self, cached: &Self);
}
