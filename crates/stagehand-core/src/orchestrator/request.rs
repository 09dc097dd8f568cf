//! Transition requests

use crate::config::TransitionOptions;
use crate::descriptor::{ResourceSet, ResourceSetDescriptor};
use crate::error::RegistryError;
use crate::registry::DescriptorRegistry;
use crate::types::Pose;
use std::fmt;

/// Anchor looked up when a request does not name one
pub const DEFAULT_ANCHOR: &str = "Default";

/// Receives the resolved anchor pose once the new content is live
pub type PoseCallback = Box<dyn FnOnce(Pose) -> anyhow::Result<()> + Send>;

/// Everything a transition needs: target, anchor, callback and options
pub struct TransitionRequest {
    descriptor: ResourceSetDescriptor,
    anchor: String,
    on_pose: Option<PoseCallback>,
    options: Option<TransitionOptions>,
}

impl TransitionRequest {
    #[must_use]
    pub fn new(descriptor: ResourceSetDescriptor) -> Self {
        Self {
            descriptor,
            anchor: DEFAULT_ANCHOR.to_string(),
            on_pose: None,
            options: None,
        }
    }

    /// Request for a typed variant built through `Default`
    #[must_use]
    pub fn to<S: ResourceSet + Default>() -> Self {
        Self::new(ResourceSetDescriptor::of(&S::default()))
    }

    /// Request for a descriptor registered under `id`
    ///
    /// # Errors
    /// `RegistryError::UnknownDescriptor` if `id` is not registered.
    pub fn from_registry(registry: &DescriptorRegistry, id: &str) -> Result<Self, RegistryError> {
        registry.create(id).map(Self::new)
    }

    /// Anchor to resolve after loading
    #[must_use]
    pub fn with_anchor(mut self, name: impl Into<String>) -> Self {
        self.anchor = name.into();
        self
    }

    /// Callback receiving the resolved pose; without one no anchor is resolved
    #[must_use]
    pub fn with_pose_callback(
        mut self,
        callback: impl FnOnce(Pose) -> anyhow::Result<()> + Send + 'static,
    ) -> Self {
        self.on_pose = Some(Box::new(callback));
        self
    }

    /// Override the orchestrator's default options
    #[must_use]
    pub fn with_options(mut self, options: TransitionOptions) -> Self {
        self.options = Some(options);
        self
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &ResourceSetDescriptor {
        &self.descriptor
    }

    #[inline]
    #[must_use]
    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> Option<TransitionOptions> {
        self.options
    }

    pub(crate) fn into_parts(self) -> (ResourceSetDescriptor, String, Option<PoseCallback>, Option<TransitionOptions>) {
        (self.descriptor, self.anchor, self.on_pose, self.options)
    }
}

impl fmt::Debug for TransitionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionRequest")
            .field("descriptor", &self.descriptor)
            .field("anchor", &self.anchor)
            .field("on_pose", &self.on_pose.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_default_anchor_without_callback() {
        let request = TransitionRequest::new(ResourceSetDescriptor::named("hall", ["Hall"]));
        assert_eq!(request.anchor(), DEFAULT_ANCHOR);
        assert!(request.options().is_none());
        assert!(request.on_pose.is_none());
    }

    #[test]
    fn registry_lookup_failure_is_reported() {
        let registry = DescriptorRegistry::new();
        assert!(TransitionRequest::from_registry(&registry, "hall").is_err());
    }
}
