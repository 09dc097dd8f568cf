//! Testing utilities for the Stagehand workspace
//!
//! Shared fixtures: the A/B scene catalog, descriptor variants, anchor
//! layouts and a recording observer.

#![allow(missing_docs)]

use glam::Vec3;
use parking_lot::Mutex;
use stagehand_core::simulator::{EntityNode, ResourceLayout, SimulatedProvider, SimulatorConfig};
use stagehand_core::{Anchor, Harness, Orchestrator, OrchestratorConfig, Phase, Pose, ResourceSet, TransitionEvent};
use std::sync::Arc;

pub const A1: &str = "TestScene_A1";
pub const A2: &str = "TestScene_A2";
pub const B1: &str = "TestScene_B1";
pub const B2: &str = "TestScene_B2";

/// Registered paths of the fixture catalog
pub const SCENE_PATHS: [&str; 4] = [
    "Assets/Tests/Scenes/TestScene_A1.unity",
    "Assets/Tests/Scenes/TestScene_A2.unity",
    "Assets/Tests/Scenes/TestScene_B1.unity",
    "Assets/Tests/Scenes/TestScene_B2.unity",
];

/// Protected resource preloaded by the fixture host
pub const BOOT_SCENE: &str = "InitTestScene0";
pub const PROTECTED_PREFIX: &str = "InitTestScene";

/// Anchor placed in `A1` at (0, 1, 0)
pub const BATHROOM: &str = "Bathroom";

#[derive(Debug, Default)]
pub struct SceneA;

impl ResourceSet for SceneA {
    fn resource_names(&self) -> Vec<String> {
        vec![A1.to_string(), A2.to_string()]
    }
}

#[derive(Debug, Default)]
pub struct SceneB;

impl ResourceSet for SceneB {
    fn resource_names(&self) -> Vec<String> {
        vec![B1.to_string(), B2.to_string()]
    }
}

/// Unloads everything that is not protected
#[derive(Debug, Default)]
pub struct EmptyScene;

impl ResourceSet for EmptyScene {
    fn resource_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Host with the A/B catalog, the bathroom anchor and a preloaded boot
/// resource
pub fn fixture_provider() -> Arc<SimulatedProvider> {
    fixture_provider_with(SimulatorConfig::default())
}

pub fn fixture_provider_with(config: SimulatorConfig) -> Arc<SimulatedProvider> {
    let provider = Arc::new(SimulatedProvider::new(config));
    for path in SCENE_PATHS {
        provider.register(path);
    }

    provider.set_layout(
        A1,
        ResourceLayout::new(vec![
            EntityNode::new("Lighting"),
            EntityNode::new("House")
                .with_child(EntityNode::new("Kitchen"))
                .with_child(
                    EntityNode::new("Upstairs").with_child(
                        EntityNode::new("BathroomSpawn").with_anchor(Anchor::new(BATHROOM, Pose::at(Vec3::Y))),
                    ),
                ),
        ]),
    );
    provider.set_layout(
        B1,
        ResourceLayout::new(vec![
            EntityNode::new("Garden").with_anchor(Anchor::new("Default", Pose::at(Vec3::new(5.0, 0.0, -2.0))))
        ]),
    );

    provider.preload(BOOT_SCENE);
    provider
}

pub fn fixture_config() -> OrchestratorConfig {
    OrchestratorConfig::new().with_protected_prefix(PROTECTED_PREFIX)
}

/// Orchestrator, host and harness over the fixture catalog
pub fn setup() -> (Orchestrator, Arc<SimulatedProvider>, Harness) {
    let provider = fixture_provider();
    let orchestrator = Orchestrator::new(provider.clone(), fixture_config()).unwrap();
    let harness = Harness::new(Arc::clone(&provider));
    (orchestrator, provider, harness)
}

/// Loaded names excluding protected resources, sorted
pub fn loaded_user_names(orchestrator: &Orchestrator) -> Vec<String> {
    let mut names: Vec<String> = orchestrator
        .loaded_resource_names()
        .into_iter()
        .filter(|name| !name.starts_with(PROTECTED_PREFIX))
        .collect();
    names.sort();
    names
}

/// Observer recording every event it receives
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<TransitionEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a recorder to `orchestrator`
    pub fn attach(orchestrator: &Orchestrator) -> Self {
        let recorder = Self::new();
        let sink = Arc::clone(&recorder.events);
        orchestrator.subscribe(move |event| sink.lock().push(event.clone()));
        recorder
    }

    pub fn events(&self) -> Vec<TransitionEvent> {
        self.events.lock().clone()
    }

    /// Recorded events other than load progress
    pub fn lifecycle(&self) -> Vec<TransitionEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| !matches!(event, TransitionEvent::LoadProgress { .. }))
            .cloned()
            .collect()
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.events.lock().iter().filter_map(TransitionEvent::phase).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// The full phase cycle of one transition, as observed
pub fn full_cycle() -> Vec<Phase> {
    vec![
        Phase::NextLoading,
        Phase::NextLoaded,
        Phase::PrevUnloading,
        Phase::PrevUnloaded,
        Phase::AnchorMoving,
        Phase::AnchorMoved,
        Phase::Idle,
    ]
}
