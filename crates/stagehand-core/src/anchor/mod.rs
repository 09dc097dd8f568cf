//! Anchor lookup across loaded content
//!
//! Search order is deterministic:
//! - resources in host load order
//! - root entities in enumeration order
//! - each root itself first, then its descendants depth-first pre-order
//!
//! The first entity whose anchor carries the requested name wins. If no
//! entity matches, the result is [`Pose::ORIGIN`] and `found` is false.

use crate::provider::ResourceProvider;
use crate::types::{EntityId, LoadedResource, Pose};
use serde::Serialize;

/// Outcome of an anchor lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorResolution {
    /// Anchor name that was requested
    pub name: String,
    /// Matched pose, or the origin when nothing matched
    pub pose: Pose,
    /// Whether a matching anchor was found
    pub found: bool,
    /// Resource the match was found in
    pub resource: Option<String>,
}

impl AnchorResolution {
    fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            pose: Pose::ORIGIN,
            found: false,
            resource: None,
        }
    }
}

/// Walks the provider's entity hierarchy looking for named anchors
#[derive(Clone, Copy)]
pub struct AnchorLocator<'a> {
    provider: &'a dyn ResourceProvider,
}

impl<'a> AnchorLocator<'a> {
    #[must_use]
    pub fn new(provider: &'a dyn ResourceProvider) -> Self {
        Self { provider }
    }

    /// Resolve `name` across the host's currently loaded resources
    #[must_use]
    pub fn resolve_loaded(&self, name: &str) -> AnchorResolution {
        self.resolve(&self.provider.loaded_resources(), name)
    }

    /// Resolve `name` across `resources`, searched in the given order
    #[must_use]
    pub fn resolve(&self, resources: &[LoadedResource], name: &str) -> AnchorResolution {
        for resource in resources {
            for root in self.provider.root_entities(resource) {
                let hit = self
                    .match_entity(root, name)
                    .or_else(|| self.match_descendants(root, name));

                if let Some(pose) = hit {
                    return self.found(name, pose, resource);
                }
            }
        }

        tracing::warn!("Anchor {} not found, falling back to origin", name);
        AnchorResolution::fallback(name)
    }

    fn found(&self, name: &str, pose: Pose, resource: &LoadedResource) -> AnchorResolution {
        tracing::debug!("Anchor {} found in {}", name, resource.name);
        AnchorResolution {
            name: name.to_string(),
            pose,
            found: true,
            resource: Some(resource.name.clone()),
        }
    }

    fn match_descendants(&self, root: EntityId, name: &str) -> Option<Pose> {
        let mut stack: Vec<EntityId> = self.provider.children(root).into_iter().rev().collect();

        while let Some(entity) = stack.pop() {
            if let Some(pose) = self.match_entity(entity, name) {
                return Some(pose);
            }
            stack.extend(self.provider.children(entity).into_iter().rev());
        }

        None
    }

    fn match_entity(&self, entity: EntityId, name: &str) -> Option<Pose> {
        self.provider
            .anchor(entity)
            .filter(|anchor| anchor.name == name)
            .map(|anchor| anchor.pose)
    }
}
