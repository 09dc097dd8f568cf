//! Stagehand Core - resource-set transition orchestrator
//!
//! Moves a host from one set of loaded resources to another:
//! - validates requested names against a case-insensitive catalog
//! - loads new resources through progress tokens (pre-load, commit, complete)
//! - unloads stale resources, except those with a protected prefix
//! - resolves a named anchor in the new content and hands its pose back
//! - publishes every phase change to registered observers
//!
//! # Example
//!
//! ```rust,ignore
//! use stagehand_core::prelude::*;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(SimulatedProvider::default());
//! provider.register("Assets/Scenes/Hall.unity");
//!
//! let orchestrator = Orchestrator::new(provider.clone(), OrchestratorConfig::new())?;
//! let request = TransitionRequest::new(ResourceSetDescriptor::named("hall", ["Hall"]))
//!     .with_anchor("Entrance")
//!     .with_pose_callback(|pose| {
//!         println!("spawn at {:?}", pose.position);
//!         Ok(())
//!     });
//!
//! let mut task = orchestrator.transition(request);
//! let outcome = Harness::new(provider).run(&mut task)?;
//! assert!(outcome.is_completed());
//! ```

#![allow(missing_docs)]

pub mod anchor;
pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod orchestrator;
pub mod provider;
pub mod registry;
pub mod simulator;
pub mod token;
pub mod types;

pub use anchor::{AnchorLocator, AnchorResolution};
pub use catalog::{CatalogEntry, NamingRule, ResourceCatalog};
pub use config::{CatalogConfig, LoadStrategy, OrchestratorConfig, TransitionOptions};
pub use descriptor::{ResourceSet, ResourceSetDescriptor};
pub use error::{
    CatalogError, PhaseError, ProviderFault, ProviderOperation, RegistryError, StagehandError, ValidationError,
};
pub use orchestrator::{
    ListenerId, Orchestrator, Phase, RejectReason, TransitionEvent, TransitionOutcome, TransitionPlan,
    TransitionReport, TransitionRequest, TransitionTask, DEFAULT_ANCHOR,
};
pub use provider::{LoadOperation, PendingOperation, ResourceProvider};
pub use registry::DescriptorRegistry;
pub use simulator::{Harness, HarnessError, SimulatedProvider, SimulatorConfig};
pub use token::{LoadingToken, MultiToken, TokenEvent, TokenStage, PRELOAD_THRESHOLD};
pub use types::{Anchor, EntityId, LoadMode, LoadedResource, Pose, ResourceHandle, TransitionId};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving transitions
    pub use crate::{
        Anchor, DescriptorRegistry, Harness, Orchestrator, OrchestratorConfig, Phase, Pose, ResourceProvider,
        ResourceSet, ResourceSetDescriptor, SimulatedProvider, StagehandError, TransitionEvent, TransitionOptions,
        TransitionOutcome, TransitionRequest,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
