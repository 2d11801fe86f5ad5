use std::any::{type_name, TypeId};
use std::fmt;

/// Identity of a provider: either a concrete type or a name to be looked up.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ProviderKey {
    Type { id: TypeId, name: &'static str },
    Named(String),
}

impl ProviderKey {
    pub fn of<T: 'static>() -> Self {
        ProviderKey::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Key resolved by type name at lookup time. Accepts the full path or the short name
    /// (`CrudController<Client>`).
    pub fn named(name: impl Into<String>) -> Self {
        ProviderKey::Named(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            ProviderKey::Type { name, .. } => name,
            ProviderKey::Named(name) => name,
        }
    }
}

impl fmt::Display for ProviderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&short_type_name(self.name()))
    }
}

/// Strip module paths from a type name, generics included.
/// e.g. "bestiary::controller::CrudController<bestiary::entity::Client>" -> "CrudController<Client>"
pub fn short_type_name(full: &str) -> String {
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    let mut chars = full.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            segment.clear();
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            segment.push(c);
        } else {
            out.push_str(&segment);
            segment.clear();
            out.push(c);
        }
    }
    out.push_str(&segment);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_drop_paths_inside_generics() {
        assert_eq!(short_type_name("alloc::string::String"), "String");
        assert_eq!(
            short_type_name("bestiary::controller::CrudController<bestiary::entity::Client>"),
            "CrudController<Client>"
        );
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[test]
    fn typed_keys_compare_by_type() {
        assert_eq!(ProviderKey::of::<u8>(), ProviderKey::of::<u8>());
        assert_ne!(ProviderKey::of::<u8>(), ProviderKey::of::<u16>());
        assert_eq!(ProviderKey::of::<String>().to_string(), "String");
    }
}
