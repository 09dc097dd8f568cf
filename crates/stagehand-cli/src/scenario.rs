//! Scenario files
//!
//! A scenario describes a simulated host, the descriptors it knows about
//! and the transitions to run, in TOML:
//!
//! ```toml
//! [orchestrator]
//! protected_prefixes = ["Boot"]
//!
//! [host]
//! registered = ["Assets/Scenes/Hall.unity"]
//! preloaded = ["Boot"]
//! load_step = 0.3
//!
//! [scenes]
//! hall = ["Hall"]
//!
//! [[steps]]
//! scene = "hall"
//! anchor = "Entrance"
//! ```

use anyhow::{bail, Context};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use stagehand_core::simulator::{ResourceLayout, SimulatedProvider, SimulatorConfig};
use stagehand_core::{DescriptorRegistry, Orchestrator, OrchestratorConfig, TransitionOptions};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Scenario {
    pub(crate) orchestrator: OrchestratorConfig,
    pub(crate) host: HostSpec,
    /// Descriptor id to resource names
    pub(crate) scenes: IndexMap<String, Vec<String>>,
    pub(crate) steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct HostSpec {
    pub(crate) registered: Vec<String>,
    pub(crate) preloaded: Vec<String>,
    #[serde(flatten)]
    pub(crate) timing: SimulatorConfig,
    pub(crate) layouts: IndexMap<String, ResourceLayout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Step {
    pub(crate) scene: String,
    #[serde(default)]
    pub(crate) anchor: Option<String>,
    #[serde(default)]
    pub(crate) options: Option<TransitionOptions>,
}

/// Everything needed to run a scenario's steps
pub(crate) struct World {
    pub(crate) orchestrator: Orchestrator,
    pub(crate) provider: Arc<SimulatedProvider>,
    pub(crate) registry: DescriptorRegistry,
}

impl Scenario {
    pub(crate) fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> anyhow::Result<Self> {
        let scenario: Self = toml::from_str(text)?;
        scenario.check()?;
        Ok(scenario)
    }

    fn check(&self) -> anyhow::Result<()> {
        for step in &self.steps {
            if !self.scenes.contains_key(&step.scene) {
                bail!("step refers to unknown scene {:?}", step.scene);
            }
        }
        Ok(())
    }

    /// Build the simulated host, orchestrator and descriptor registry
    pub(crate) fn build(&self) -> anyhow::Result<World> {
        let provider = Arc::new(SimulatedProvider::new(self.host.timing));
        for path in &self.host.registered {
            provider.register(path.clone());
        }
        for (name, layout) in &self.host.layouts {
            provider.set_layout(name.clone(), layout.clone());
        }
        for name in &self.host.preloaded {
            provider.preload(name);
        }

        let mut registry = DescriptorRegistry::new();
        for (id, names) in &self.scenes {
            registry.register_names(id, names.clone())?;
        }

        let orchestrator =
            Orchestrator::new(provider.clone(), self.orchestrator.clone()).context("building resource catalog")?;

        Ok(World {
            orchestrator,
            provider,
            registry,
        })
    }
}
