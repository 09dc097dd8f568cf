//! Descriptor registry
//!
//! Maps identifiers to descriptor constructors. Variants are registered
//! explicitly at startup; nothing is discovered at runtime.

use crate::descriptor::{ResourceSet, ResourceSetDescriptor};
use crate::error::RegistryError;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

type Constructor = Arc<dyn Fn() -> ResourceSetDescriptor + Send + Sync>;

/// Registry of descriptor constructors, in registration order
#[derive(Default, Clone)]
pub struct DescriptorRegistry {
    constructors: IndexMap<String, Constructor>,
}

impl DescriptorRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed variant, constructed through `Default`
    ///
    /// # Errors
    /// `RegistryError::DuplicateId` if `id` is taken.
    pub fn register<S: ResourceSet + Default>(&mut self, id: &str) -> Result<(), RegistryError> {
        self.register_with(id, || ResourceSetDescriptor::of(&S::default()))
    }

    /// Register a data-defined variant whose kind is `id`
    ///
    /// # Errors
    /// `RegistryError::DuplicateId` if `id` is taken.
    pub fn register_names(&mut self, id: &str, names: Vec<String>) -> Result<(), RegistryError> {
        let kind = id.to_string();
        self.register_with(id, move || ResourceSetDescriptor::named(kind.clone(), names.clone()))
    }

    /// Register an arbitrary constructor
    ///
    /// # Errors
    /// `RegistryError::DuplicateId` if `id` is taken.
    pub fn register_with(
        &mut self,
        id: &str,
        constructor: impl Fn() -> ResourceSetDescriptor + Send + Sync + 'static,
    ) -> Result<(), RegistryError> {
        if self.constructors.contains_key(id) {
            return Err(RegistryError::DuplicateId { id: id.to_string() });
        }
        self.constructors.insert(id.to_string(), Arc::new(constructor));
        Ok(())
    }

    /// Construct the descriptor registered under `id`
    ///
    /// # Errors
    /// `RegistryError::UnknownDescriptor` if nothing is registered.
    pub fn create(&self, id: &str) -> Result<ResourceSetDescriptor, RegistryError> {
        self.constructors
            .get(id)
            .map(|constructor| constructor())
            .ok_or_else(|| RegistryError::UnknownDescriptor { id: id.to_string() })
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.constructors.contains_key(id)
    }

    /// Registered ids in registration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for DescriptorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorRegistry")
            .field("ids", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
