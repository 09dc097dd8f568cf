//! Resource catalog
//!
//! Validates requested names against the resources the host has
//! registered, and wraps the host's load/unload calls so that every
//! operation goes through the same protocol:
//! - names are checked case-insensitively against the registered set
//! - loads come back as [`LoadingToken`]s
//! - a missing host handle is a [`ProviderFault`], never retried

mod entry;

pub use entry::{CatalogEntry, NamingRule};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, ProviderFault, ValidationError};
use crate::provider::{PendingOperation, ResourceProvider};
use crate::token::LoadingToken;
use crate::types::LoadMode;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Validated registry of loadable resources bound to a host provider
#[derive(Clone)]
pub struct ResourceCatalog {
    provider: Arc<dyn ResourceProvider>,
    entries: IndexMap<String, CatalogEntry>,
}

impl ResourceCatalog {
    /// Scan the provider's registered paths
    ///
    /// # Errors
    /// - `CatalogError::DuplicateName` if two paths derive the same name
    /// - `CatalogError::UnrecognisedPath` if a path does not follow the rule
    pub fn scan(provider: Arc<dyn ResourceProvider>, config: &CatalogConfig) -> Result<Self, CatalogError> {
        let entries = build_entries(&provider.registered_paths(), config)?;
        tracing::debug!("Catalog built with {} resources", entries.len());
        Ok(Self { provider, entries })
    }

    /// True iff a registered resource matches `name`, ignoring case
    #[must_use]
    pub fn validate(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_lowercase())
    }

    /// Entry matching `name`, ignoring case
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&name.to_lowercase())
    }

    /// Entry matching `name`, as a validation result
    ///
    /// # Errors
    /// `ValidationError::UnknownResource` if no entry matches.
    pub fn resolve(&self, name: &str) -> Result<&CatalogEntry, ValidationError> {
        self.get(name).ok_or_else(|| ValidationError::UnknownResource {
            name: name.to_string(),
        })
    }

    /// Entries in registration order
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the host currently reports `name` loaded
    #[must_use]
    pub fn is_loaded(&self, name: &str) -> bool {
        self.provider.is_loaded(name)
    }

    /// Start loading `name` and wrap the host handle in a token
    ///
    /// # Errors
    /// [`ProviderFault`] if the host cannot start the load.
    pub fn begin_load(&self, name: &str, mode: LoadMode) -> Result<LoadingToken, ProviderFault> {
        let operation = self.provider.begin_load(name, mode).map_err(|fault| {
            tracing::error!("Load of {} failed: {}", name, fault);
            fault
        })?;
        Ok(LoadingToken::new(name, operation))
    }

    /// Start unloading `name`
    ///
    /// # Errors
    /// [`ProviderFault`] if the host cannot start the unload.
    pub fn begin_unload(&self, name: &str) -> Result<Box<dyn PendingOperation>, ProviderFault> {
        self.provider.begin_unload(name).map_err(|fault| {
            tracing::error!("Unload of {} failed: {}", name, fault);
            fault
        })
    }

    /// Start the host's release-unused pass
    ///
    /// # Errors
    /// [`ProviderFault`] if the host cannot start the pass.
    pub fn release_unused(&self) -> Result<Box<dyn PendingOperation>, ProviderFault> {
        self.provider.release_unused().map_err(|fault| {
            tracing::error!("Release of unused assets failed: {}", fault);
            fault
        })
    }

    /// Host provider this catalog wraps
    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn ResourceProvider> {
        &self.provider
    }
}

impl fmt::Debug for ResourceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCatalog")
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Derive entries from registered paths, keyed by lowercase name
///
/// # Errors
/// See [`ResourceCatalog::scan`].
pub fn build_entries(
    paths: &[String],
    config: &CatalogConfig,
) -> Result<IndexMap<String, CatalogEntry>, CatalogError> {
    let rule = NamingRule::new(config)?;
    let mut entries: IndexMap<String, CatalogEntry> = IndexMap::with_capacity(paths.len());

    for (index, path) in paths.iter().enumerate() {
        let entry = rule.entry(index, path)?;
        let key = entry.key();

        if let Some(existing) = entries.get(&key) {
            return Err(CatalogError::DuplicateName {
                name: entry.name().to_string(),
                first: existing.path().to_string(),
                second: entry.path().to_string(),
            });
        }

        entries.insert(key, entry);
    }

    Ok(entries)
}
