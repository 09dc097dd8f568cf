//! Host-facing interfaces
//!
//! The orchestrator never loads content itself. A host implements
//! [`ResourceProvider`] and hands back operation objects that the
//! orchestrator polls once per tick.

use crate::error::ProviderFault;
use crate::types::{Anchor, EntityId, LoadMode, LoadedResource};

/// In-flight asynchronous load
///
/// Progress stops at 0.9 until [`allow_activation`](Self::allow_activation)
/// is called; the remaining work makes the content live.
pub trait LoadOperation: Send {
    /// Current progress in `[0, 1]`
    fn progress(&self) -> f32;

    /// Let the host finish activating the loaded content
    fn allow_activation(&mut self);

    /// Whether the host reports the load finished
    fn is_done(&self) -> bool;
}

/// In-flight unload or cleanup pass
pub trait PendingOperation: Send {
    fn is_done(&self) -> bool;
}

/// Content-loading primitives supplied by the host
pub trait ResourceProvider: Send + Sync {
    /// Canonical paths of every loadable resource, in registration order
    fn registered_paths(&self) -> Vec<String>;

    /// Whether `name` is currently loaded
    fn is_loaded(&self, name: &str) -> bool;

    /// Start loading `name`
    ///
    /// # Errors
    /// Returns [`ProviderFault`] when the host cannot produce a handle.
    fn begin_load(&self, name: &str, mode: LoadMode) -> Result<Box<dyn LoadOperation>, ProviderFault>;

    /// Start unloading `name`
    ///
    /// # Errors
    /// Returns [`ProviderFault`] when the host cannot produce a handle.
    fn begin_unload(&self, name: &str) -> Result<Box<dyn PendingOperation>, ProviderFault>;

    /// Start a host-wide pass releasing assets nothing references anymore
    ///
    /// # Errors
    /// Returns [`ProviderFault`] when the host cannot produce a handle.
    fn release_unused(&self) -> Result<Box<dyn PendingOperation>, ProviderFault>;

    /// Mark a loaded resource as the one new content is attached to
    ///
    /// # Errors
    /// Returns [`ProviderFault`] when `name` is not loaded.
    fn set_active(&self, name: &str) -> Result<(), ProviderFault>;

    /// Loaded resources in host order
    fn loaded_resources(&self) -> Vec<LoadedResource>;

    /// Root entities of a loaded resource, in enumeration order
    fn root_entities(&self, resource: &LoadedResource) -> Vec<EntityId>;

    /// Direct children of an entity, in enumeration order
    fn children(&self, entity: EntityId) -> Vec<EntityId>;

    /// Anchor capability exposed by an entity, if any
    fn anchor(&self, entity: EntityId) -> Option<Anchor>;

    /// Names of loaded resources in host order
    fn loaded_names(&self) -> Vec<String> {
        self.loaded_resources().into_iter().map(|r| r.name).collect()
    }
}
