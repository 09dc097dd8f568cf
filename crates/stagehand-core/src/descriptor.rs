//! Resource set descriptors
//!
//! A descriptor is the ordered list of resource names that make up one
//! loadable configuration. Equality only looks at the descriptor's
//! variant: two descriptors built from the same [`ResourceSet`] type are
//! equal even if their name lists differ.

use std::any::{type_name, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A loadable configuration; each implementing type is one variant
pub trait ResourceSet: Send + Sync + 'static {
    /// Resource names in load order
    fn resource_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum VariantKey {
    Type(TypeId),
    Named(String),
}

/// Immutable snapshot of a resource set, used as a transition target
#[derive(Clone)]
pub struct ResourceSetDescriptor {
    key: VariantKey,
    label: String,
    names: Arc<[String]>,
}

impl ResourceSetDescriptor {
    /// Snapshot a typed resource set; its Rust type is the variant
    #[must_use]
    pub fn of<S: ResourceSet>(set: &S) -> Self {
        let full = type_name::<S>();
        let base = full.split('<').next().unwrap_or(full);
        let label = base.rsplit("::").next().unwrap_or(base).to_string();
        Self {
            key: VariantKey::Type(TypeId::of::<S>()),
            label,
            names: set.resource_names().into(),
        }
    }

    /// Build from data; `kind` is the variant
    #[must_use]
    pub fn named<I, N>(kind: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let kind = kind.into();
        Self {
            key: VariantKey::Named(kind.clone()),
            label: kind,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable variant name
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Resource names in load order
    #[inline]
    #[must_use]
    pub fn resource_names(&self) -> &[String] {
        &self.names
    }

    /// Whether `name` is one of this descriptor's resources
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl PartialEq for ResourceSetDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ResourceSetDescriptor {}

impl Hash for ResourceSetDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ResourceSetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSetDescriptor")
            .field("label", &self.label)
            .field("names", &self.names)
            .finish()
    }
}

impl fmt::Display for ResourceSetDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Lobby;

    impl ResourceSet for Lobby {
        fn resource_names(&self) -> Vec<String> {
            vec!["LobbyMain".to_string(), "LobbyLights".to_string()]
        }
    }

    struct Configurable(Vec<String>);

    impl ResourceSet for Configurable {
        fn resource_names(&self) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn typed_descriptor_keeps_order_and_label() {
        let descriptor = ResourceSetDescriptor::of(&Lobby);
        assert_eq!(descriptor.label(), "Lobby");
        assert_eq!(descriptor.resource_names(), ["LobbyMain", "LobbyLights"]);
    }

    struct Wing<T>(std::marker::PhantomData<fn() -> T>);

    impl<T: 'static> ResourceSet for Wing<T> {
        fn resource_names(&self) -> Vec<String> {
            vec!["WingMain".to_string()]
        }
    }

    #[test]
    fn generic_variant_label_drops_type_arguments() {
        let descriptor = ResourceSetDescriptor::of(&Wing::<Lobby>(std::marker::PhantomData));
        assert_eq!(descriptor.label(), "Wing");
        assert_ne!(descriptor, ResourceSetDescriptor::of(&Wing::<Configurable>(std::marker::PhantomData)));
    }

    #[test]
    fn equality_ignores_contents_of_same_variant() {
        let a = ResourceSetDescriptor::of(&Configurable(vec!["X".to_string()]));
        let b = ResourceSetDescriptor::of(&Configurable(vec!["Y".to_string()]));
        assert_eq!(a, b);
        assert_ne!(a, ResourceSetDescriptor::of(&Lobby));
    }

    #[test]
    fn named_variants_compare_by_kind() {
        let a = ResourceSetDescriptor::named("forest", ["F1"]);
        let b = ResourceSetDescriptor::named("forest", ["F2", "F3"]);
        let c = ResourceSetDescriptor::named("desert", ["F1"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
