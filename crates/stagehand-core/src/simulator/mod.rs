//! In-memory host for tests and the CLI
//!
//! [`SimulatedProvider`] implements every [`ResourceProvider`] operation
//! against a tick clock:
//! - loads advance by `load_step` per tick and hold at 0.9 until
//!   activation is allowed, then complete on the next tick
//! - unloads and release passes finish after a fixed number of ticks
//! - entity trees with anchors are instantiated from [`ResourceLayout`]s
//! - faults can be injected per operation and resource

mod harness;

pub use harness::{Harness, HarnessError, DEFAULT_MAX_TICKS};

use crate::error::{ProviderFault, ProviderOperation};
use crate::provider::{LoadOperation, PendingOperation, ResourceProvider};
use crate::token::PRELOAD_THRESHOLD;
use crate::types::{Anchor, EntityId, LoadMode, LoadedResource, ResourceHandle};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Simulator timing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Load progress added per tick
    pub load_step: f32,
    /// Ticks an unload takes; 0 finishes immediately
    pub unload_ticks: u32,
    /// Ticks a release pass takes; 0 finishes immediately
    pub release_ticks: u32,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            load_step: 0.25,
            unload_ticks: 1,
            release_ticks: 1,
        }
    }
}

/// Entity in a resource layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityNode {
    pub label: String,
    #[serde(default)]
    pub anchor: Option<Anchor>,
    #[serde(default)]
    pub children: Vec<EntityNode>,
}

impl EntityNode {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            anchor: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: EntityNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Entity trees instantiated when a resource finishes loading
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceLayout {
    #[serde(default)]
    pub roots: Vec<EntityNode>,
}

impl ResourceLayout {
    #[must_use]
    pub fn new(roots: Vec<EntityNode>) -> Self {
        Self { roots }
    }
}

#[derive(Debug)]
struct EntityRecord {
    anchor: Option<Anchor>,
    children: Vec<EntityId>,
}

#[derive(Debug)]
struct LoadedEntry {
    handle: ResourceHandle,
    roots: Vec<EntityId>,
}

#[derive(Debug)]
struct LoadJob {
    name: String,
    mode: LoadMode,
    progress: f32,
    activated: bool,
    done: bool,
}

#[derive(Debug)]
struct CountdownJob {
    resource: Option<String>,
    remaining: u32,
    done: bool,
}

#[derive(Debug, Default)]
struct SimState {
    registered: Vec<String>,
    layouts: HashMap<String, ResourceLayout>,
    loaded: IndexMap<String, LoadedEntry>,
    entities: HashMap<EntityId, EntityRecord>,
    loads: BTreeMap<u64, LoadJob>,
    countdowns: BTreeMap<u64, CountdownJob>,
    faults: Vec<(ProviderOperation, Option<String>)>,
    active: Option<String>,
    load_requests: Vec<String>,
    release_count: usize,
    ticks: u64,
    next_op: u64,
    next_handle: u64,
    next_entity: u64,
}

impl SimState {
    fn next_op(&mut self) -> u64 {
        self.next_op += 1;
        self.next_op
    }

    fn fault(&self, operation: ProviderOperation, resource: Option<&str>) -> Option<ProviderFault> {
        self.faults
            .iter()
            .find(|(op, target)| *op == operation && (target.is_none() || target.as_deref() == resource))
            .map(|_| match resource {
                Some(name) => ProviderFault::new(operation, name, "injected fault"),
                None => ProviderFault::global(operation, "injected fault"),
            })
    }

    fn is_registered(&self, name: &str) -> bool {
        self.registered.iter().any(|path| {
            Path::new(path)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case(name))
        })
    }

    fn instantiate(&mut self, node: &EntityNode) -> EntityId {
        let children = node.children.iter().map(|child| self.instantiate(child)).collect();
        self.next_entity += 1;
        let id = EntityId(self.next_entity);
        self.entities.insert(
            id,
            EntityRecord {
                anchor: node.anchor.clone(),
                children,
            },
        );
        id
    }

    fn despawn(&mut self, id: EntityId) {
        if let Some(record) = self.entities.remove(&id) {
            for child in record.children {
                self.despawn(child);
            }
        }
    }

    fn insert_loaded(&mut self, name: &str, mode: LoadMode) {
        if mode == LoadMode::Replace {
            let names: Vec<String> = self.loaded.keys().cloned().collect();
            for other in names {
                self.remove_loaded(&other);
            }
        }
        self.remove_loaded(name);

        let layout = self.layouts.get(name).cloned().unwrap_or_default();
        let roots = layout.roots.iter().map(|node| self.instantiate(node)).collect();
        self.next_handle += 1;
        let handle = ResourceHandle(self.next_handle);
        self.loaded.insert(name.to_string(), LoadedEntry { handle, roots });
    }

    fn remove_loaded(&mut self, name: &str) {
        if let Some(entry) = self.loaded.shift_remove(name) {
            for root in entry.roots {
                self.despawn(root);
            }
            if self.active.as_deref() == Some(name) {
                self.active = None;
            }
        }
    }

    fn tick(&mut self, config: &SimulatorConfig) {
        self.ticks += 1;

        let mut finished = Vec::new();
        for job in self.loads.values_mut().filter(|job| !job.done) {
            if job.activated {
                job.progress = 1.0;
                job.done = true;
                finished.push((job.name.clone(), job.mode));
            } else {
                job.progress = (job.progress + config.load_step).min(PRELOAD_THRESHOLD);
            }
        }
        for (name, mode) in finished {
            self.insert_loaded(&name, mode);
        }

        let mut released = Vec::new();
        for job in self.countdowns.values_mut().filter(|job| !job.done) {
            job.remaining = job.remaining.saturating_sub(1);
            if job.remaining == 0 {
                job.done = true;
                released.push(job.resource.clone());
            }
        }
        for resource in released {
            self.complete_countdown(resource);
        }
    }

    fn complete_countdown(&mut self, resource: Option<String>) {
        match resource {
            Some(name) => self.remove_loaded(&name),
            None => self.release_count += 1,
        }
    }
}

/// Tick-driven in-memory host
#[derive(Default)]
pub struct SimulatedProvider {
    config: SimulatorConfig,
    state: Arc<Mutex<SimState>>,
}

impl SimulatedProvider {
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(SimState::default())),
        }
    }

    /// Register a canonical path
    pub fn register(&self, path: impl Into<String>) {
        self.state.lock().registered.push(path.into());
    }

    /// Entity layout instantiated when `name` loads
    pub fn set_layout(&self, name: impl Into<String>, layout: ResourceLayout) {
        self.state.lock().layouts.insert(name.into(), layout);
    }

    /// Mark `name` loaded without a load operation; registration is not
    /// required
    pub fn preload(&self, name: &str) {
        self.state.lock().insert_loaded(name, LoadMode::Merge);
    }

    /// Make `operation` fail, for `resource` or for every resource
    pub fn inject_fault(&self, operation: ProviderOperation, resource: Option<&str>) {
        self.state
            .lock()
            .faults
            .push((operation, resource.map(ToString::to_string)));
    }

    /// Remove every injected fault
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Advance every in-flight operation by one tick
    pub fn tick(&self) {
        self.state.lock().tick(&self.config);
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.state.lock().ticks
    }

    /// Resource last marked active
    #[must_use]
    pub fn active(&self) -> Option<String> {
        self.state.lock().active.clone()
    }

    /// Every name passed to `begin_load`, in call order
    #[must_use]
    pub fn load_requests(&self) -> Vec<String> {
        self.state.lock().load_requests.clone()
    }

    /// Completed release passes
    #[must_use]
    pub fn release_count(&self) -> usize {
        self.state.lock().release_count
    }

    /// Load, unload and release jobs whose handles are still alive
    #[must_use]
    pub fn tracked_jobs(&self) -> usize {
        let state = self.state.lock();
        state.loads.len() + state.countdowns.len()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    fn begin_countdown(&self, resource: Option<String>, ticks: u32) -> Box<dyn PendingOperation> {
        let mut state = self.state.lock();
        let id = state.next_op();

        if ticks == 0 {
            state.complete_countdown(resource.clone());
        }
        state.countdowns.insert(
            id,
            CountdownJob {
                resource,
                remaining: ticks,
                done: ticks == 0,
            },
        );

        Box::new(SimPending {
            id,
            state: Arc::clone(&self.state),
        })
    }
}

impl ResourceProvider for SimulatedProvider {
    fn registered_paths(&self) -> Vec<String> {
        self.state.lock().registered.clone()
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.state.lock().loaded.contains_key(name)
    }

    fn begin_load(&self, name: &str, mode: LoadMode) -> Result<Box<dyn LoadOperation>, ProviderFault> {
        let mut state = self.state.lock();
        state.load_requests.push(name.to_string());

        if let Some(fault) = state.fault(ProviderOperation::Load, Some(name)) {
            return Err(fault);
        }
        if !state.is_registered(name) {
            return Err(ProviderFault::new(ProviderOperation::Load, name, "not registered"));
        }

        let id = state.next_op();
        state.loads.insert(
            id,
            LoadJob {
                name: name.to_string(),
                mode,
                progress: 0.0,
                activated: false,
                done: false,
            },
        );

        Ok(Box::new(SimLoad {
            id,
            state: Arc::clone(&self.state),
        }))
    }

    fn begin_unload(&self, name: &str) -> Result<Box<dyn PendingOperation>, ProviderFault> {
        {
            let state = self.state.lock();
            if let Some(fault) = state.fault(ProviderOperation::Unload, Some(name)) {
                return Err(fault);
            }
            if !state.loaded.contains_key(name) {
                return Err(ProviderFault::new(ProviderOperation::Unload, name, "not loaded"));
            }
        }
        Ok(self.begin_countdown(Some(name.to_string()), self.config.unload_ticks))
    }

    fn release_unused(&self) -> Result<Box<dyn PendingOperation>, ProviderFault> {
        if let Some(fault) = self.state.lock().fault(ProviderOperation::ReleaseUnused, None) {
            return Err(fault);
        }
        Ok(self.begin_countdown(None, self.config.release_ticks))
    }

    fn set_active(&self, name: &str) -> Result<(), ProviderFault> {
        let mut state = self.state.lock();
        if let Some(fault) = state.fault(ProviderOperation::SetActive, Some(name)) {
            return Err(fault);
        }
        if !state.loaded.contains_key(name) {
            return Err(ProviderFault::new(ProviderOperation::SetActive, name, "not loaded"));
        }
        state.active = Some(name.to_string());
        Ok(())
    }

    fn loaded_resources(&self) -> Vec<LoadedResource> {
        self.state
            .lock()
            .loaded
            .iter()
            .map(|(name, entry)| LoadedResource {
                name: name.clone(),
                handle: entry.handle,
            })
            .collect()
    }

    fn root_entities(&self, resource: &LoadedResource) -> Vec<EntityId> {
        self.state
            .lock()
            .loaded
            .get(&resource.name)
            .filter(|entry| entry.handle == resource.handle)
            .map(|entry| entry.roots.clone())
            .unwrap_or_default()
    }

    fn children(&self, entity: EntityId) -> Vec<EntityId> {
        self.state
            .lock()
            .entities
            .get(&entity)
            .map(|record| record.children.clone())
            .unwrap_or_default()
    }

    fn anchor(&self, entity: EntityId) -> Option<Anchor> {
        self.state
            .lock()
            .entities
            .get(&entity)
            .and_then(|record| record.anchor.clone())
    }
}

impl fmt::Debug for SimulatedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SimulatedProvider")
            .field("config", &self.config)
            .field("registered", &state.registered)
            .field("loaded", &state.loaded.keys().collect::<Vec<_>>())
            .field("ticks", &state.ticks)
            .finish_non_exhaustive()
    }
}

struct SimLoad {
    id: u64,
    state: Arc<Mutex<SimState>>,
}

impl LoadOperation for SimLoad {
    fn progress(&self) -> f32 {
        self.state.lock().loads.get(&self.id).map_or(0.0, |job| job.progress)
    }

    fn allow_activation(&mut self) {
        if let Some(job) = self.state.lock().loads.get_mut(&self.id) {
            job.activated = true;
        }
    }

    fn is_done(&self) -> bool {
        self.state.lock().loads.get(&self.id).is_some_and(|job| job.done)
    }
}

impl Drop for SimLoad {
    fn drop(&mut self) {
        self.state.lock().loads.remove(&self.id);
    }
}

struct SimPending {
    id: u64,
    state: Arc<Mutex<SimState>>,
}

impl PendingOperation for SimPending {
    fn is_done(&self) -> bool {
        self.state
            .lock()
            .countdowns
            .get(&self.id)
            .is_some_and(|job| job.done)
    }
}

impl Drop for SimPending {
    fn drop(&mut self) {
        self.state.lock().countdowns.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pose;
    use glam::Vec3;

    fn provider() -> SimulatedProvider {
        let provider = SimulatedProvider::new(SimulatorConfig::default());
        provider.register("Assets/Scenes/Hall.unity");
        provider
    }

    #[test]
    fn load_holds_at_threshold_until_activated() {
        let provider = provider();
        let mut load = provider.begin_load("Hall", LoadMode::Merge).unwrap();

        for _ in 0..10 {
            provider.tick();
        }
        assert!((load.progress() - PRELOAD_THRESHOLD).abs() < f32::EPSILON);
        assert!(!load.is_done());
        assert!(!provider.is_loaded("Hall"));

        load.allow_activation();
        provider.tick();
        assert!(load.is_done());
        assert!(provider.is_loaded("Hall"));
    }

    #[test]
    fn unregistered_load_is_a_fault() {
        let provider = provider();
        let fault = provider.begin_load("Cellar", LoadMode::Merge).err().unwrap();
        assert_eq!(fault.operation, ProviderOperation::Load);
        assert_eq!(fault.resource.as_deref(), Some("Cellar"));
    }

    #[test]
    fn unload_finishes_after_configured_ticks() {
        let provider = SimulatedProvider::new(SimulatorConfig {
            unload_ticks: 2,
            ..SimulatorConfig::default()
        });
        provider.preload("Hall");

        let pending = provider.begin_unload("Hall").unwrap();
        provider.tick();
        assert!(!pending.is_done());
        provider.tick();
        assert!(pending.is_done());
        assert!(!provider.is_loaded("Hall"));
    }

    #[test]
    fn jobs_are_dropped_with_their_handles() {
        let provider = provider();
        let mut load = provider.begin_load("Hall", LoadMode::Merge).unwrap();
        let release = provider.release_unused().unwrap();
        assert_eq!(provider.tracked_jobs(), 2);

        load.allow_activation();
        provider.tick();
        assert!(load.is_done() && release.is_done());
        drop(load);
        drop(release);

        assert_eq!(provider.tracked_jobs(), 0);
        assert!(provider.is_loaded("Hall"));
        assert_eq!(provider.release_count(), 1);
    }

    #[test]
    fn entities_follow_layout() {
        let provider = provider();
        provider.set_layout(
            "Hall",
            ResourceLayout::new(vec![EntityNode::new("Root")
                .with_child(EntityNode::new("Door").with_anchor(Anchor::new("Door", Pose::at(Vec3::X))))]),
        );
        provider.preload("Hall");

        let resource = provider.loaded_resources().remove(0);
        let roots = provider.root_entities(&resource);
        assert_eq!(roots.len(), 1);
        assert!(provider.anchor(roots[0]).is_none());

        let children = provider.children(roots[0]);
        assert_eq!(provider.anchor(children[0]).unwrap().name, "Door");
    }

    #[test]
    fn injected_fault_matches_resource() {
        let provider = provider();
        provider.preload("Hall");
        provider.inject_fault(ProviderOperation::SetActive, Some("Hall"));

        assert!(provider.set_active("Hall").is_err());
        provider.clear_faults();
        assert!(provider.set_active("Hall").is_ok());
        assert_eq!(provider.active().as_deref(), Some("Hall"));
    }
}
