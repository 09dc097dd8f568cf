//! Transition orchestrator
//!
//! Owns the phase machine and the active descriptor. One transition runs
//! at a time; it is driven by polling the [`TransitionTask`] returned from
//! [`Orchestrator::transition`] once per tick.
//!
//! State lives behind a single lock. Every phase change updates the state
//! under that lock and notifies observers only after releasing it, so an
//! observer may call back into the orchestrator.

mod events;
mod phase;
mod plan;
mod request;
mod task;

pub use events::{ListenerId, TransitionEvent};
pub use phase::{validate_transition, Phase};
pub use plan::TransitionPlan;
pub use request::{PoseCallback, TransitionRequest, DEFAULT_ANCHOR};
pub use task::{RejectReason, TransitionOutcome, TransitionReport, TransitionTask};

use crate::catalog::ResourceCatalog;
use crate::config::OrchestratorConfig;
use crate::descriptor::{ResourceSet, ResourceSetDescriptor};
use crate::error::{PhaseError, StagehandError};
use crate::provider::ResourceProvider;
use crate::registry::DescriptorRegistry;
use crate::types::TransitionId;
use events::Observers;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Default)]
struct OrchestratorState {
    phase: Phase,
    active: Option<ResourceSetDescriptor>,
    active_resource: Option<String>,
    current: Option<TransitionId>,
}

struct Shared {
    config: OrchestratorConfig,
    catalog: ResourceCatalog,
    state: Mutex<OrchestratorState>,
    observers: Observers,
}

/// Outcome of the admission check run on a task's first poll
enum Admission {
    Admitted(TransitionPlan),
    Rejected(RejectReason),
}

/// Handle to the transition state machine; clones share state
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    /// Build the catalog from `provider` and start in [`Phase::Idle`]
    ///
    /// # Errors
    /// `StagehandError::Catalog` if the registered paths do not form a
    /// valid catalog.
    pub fn new(provider: Arc<dyn ResourceProvider>, config: OrchestratorConfig) -> Result<Self, StagehandError> {
        let catalog = ResourceCatalog::scan(provider, &config.catalog)?;
        tracing::info!(
            "Orchestrator ready with {} resources, {} protected prefixes",
            catalog.len(),
            config.protected_prefixes.len()
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                catalog,
                state: Mutex::new(OrchestratorState::default()),
                observers: Observers::default(),
            }),
        })
    }

    /// Create a task for `request`; nothing happens until it is polled
    ///
    /// Once the first poll admits it the task must be driven until it
    /// settles. There is no cancellation: dropping an admitted task leaves
    /// the orchestrator in its current phase and every later request is
    /// rejected as busy.
    #[must_use]
    pub fn transition(&self, request: TransitionRequest) -> TransitionTask {
        TransitionTask::new(self.clone(), request)
    }

    /// Transition to a typed variant built through `Default`
    #[must_use]
    pub fn transition_to<S: ResourceSet + Default>(&self) -> TransitionTask {
        self.transition(TransitionRequest::to::<S>())
    }

    /// Transition to the descriptor registered under `id`
    ///
    /// # Errors
    /// `StagehandError::Registry` if `id` is not registered.
    pub fn transition_by_id(&self, registry: &DescriptorRegistry, id: &str) -> Result<TransitionTask, StagehandError> {
        let request = TransitionRequest::from_registry(registry, id)?;
        Ok(self.transition(request))
    }

    /// Register an observer; observers are notified in registration order
    pub fn subscribe(&self, listener: impl Fn(&TransitionEvent) + Send + Sync + 'static) -> ListenerId {
        self.shared.observers.subscribe(Arc::new(listener))
    }

    /// Remove an observer; returns whether it was registered
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.observers.unsubscribe(id)
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.shared.state.lock().phase
    }

    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        !self.phase().is_idle()
    }

    /// Descriptor of the last completed transition
    #[must_use]
    pub fn active_descriptor(&self) -> Option<ResourceSetDescriptor> {
        self.shared.state.lock().active.clone()
    }

    /// Resource marked active by the last completed transition
    #[must_use]
    pub fn active_resource(&self) -> Option<String> {
        self.shared.state.lock().active_resource.clone()
    }

    /// Transition currently in flight
    #[must_use]
    pub fn current_transition(&self) -> Option<TransitionId> {
        self.shared.state.lock().current
    }

    /// Names the host reports loaded, in host order
    #[must_use]
    pub fn loaded_resource_names(&self) -> Vec<String> {
        self.provider().loaded_names()
    }

    /// True iff the host reports every resource of `descriptor` loaded
    ///
    /// Independent of the active descriptor.
    #[must_use]
    pub fn is_loaded(&self, descriptor: &ResourceSetDescriptor) -> bool {
        let catalog = &self.shared.catalog;
        descriptor.resource_names().iter().all(|name| {
            let canonical = catalog.get(name).map_or(name.as_str(), |entry| entry.name());
            catalog.is_loaded(canonical)
        })
    }

    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.shared.catalog
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }

    fn provider(&self) -> &dyn ResourceProvider {
        self.shared.catalog.provider().as_ref()
    }

    /// Busy and already-active checks, name validation and the diff, all
    /// under one lock; on admission the phase moves to NextLoading
    fn admit(&self, id: TransitionId, descriptor: &ResourceSetDescriptor) -> Result<Admission, StagehandError> {
        let plan = {
            let mut state = self.shared.state.lock();

            if !state.phase.is_idle() {
                return Ok(Admission::Rejected(RejectReason::Busy { phase: state.phase }));
            }
            if state.active.as_ref() == Some(descriptor) {
                return Ok(Admission::Rejected(RejectReason::AlreadyActive {
                    descriptor: descriptor.label().to_string(),
                }));
            }

            let target = descriptor
                .resource_names()
                .iter()
                .map(|name| self.shared.catalog.resolve(name).map(|entry| entry.name().to_string()))
                .collect::<Result<Vec<_>, _>>()?;

            let plan = TransitionPlan::compute(&target, &self.provider().loaded_names(), &self.shared.config);

            validate_transition(state.phase, Phase::NextLoading)?;
            state.phase = Phase::NextLoading;
            state.current = Some(id);
            plan
        };

        self.shared.observers.publish(&[
            TransitionEvent::Started {
                id,
                descriptor: descriptor.label().to_string(),
            },
            TransitionEvent::PhaseChanged {
                id,
                phase: Phase::NextLoading,
            },
        ]);

        Ok(Admission::Admitted(plan))
    }

    /// Move to the successor phase and notify observers
    fn advance_phase(&self, id: TransitionId, to: Phase) -> Result<(), PhaseError> {
        {
            let mut state = self.shared.state.lock();
            validate_transition(state.phase, to)?;
            state.phase = to;
        }

        tracing::debug!("Phase changed to {}", to);
        self.shared
            .observers
            .publish(&[TransitionEvent::PhaseChanged { id, phase: to }]);
        Ok(())
    }

    /// Record the new active descriptor and return to Idle
    fn finish(
        &self,
        id: TransitionId,
        descriptor: &ResourceSetDescriptor,
        active_resource: Option<String>,
    ) -> Result<(), PhaseError> {
        {
            let mut state = self.shared.state.lock();
            validate_transition(state.phase, Phase::Idle)?;
            state.active = Some(descriptor.clone());
            state.active_resource = active_resource;
            state.current = None;
            state.phase = Phase::Idle;
        }

        self.shared.observers.publish(&[
            TransitionEvent::Finished {
                id,
                descriptor: descriptor.label().to_string(),
            },
            TransitionEvent::PhaseChanged { id, phase: Phase::Idle },
        ]);
        Ok(())
    }

    fn publish(&self, event: TransitionEvent) {
        self.shared.observers.publish(&[event]);
    }
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("Orchestrator")
            .field("phase", &state.phase)
            .field("active", &state.active.as_ref().map(ResourceSetDescriptor::label))
            .field("catalog", &self.shared.catalog.len())
            .finish_non_exhaustive()
    }
}
