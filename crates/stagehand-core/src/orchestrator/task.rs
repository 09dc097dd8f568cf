//! Cooperative transition task
//!
//! A [`TransitionTask`] is an explicit step function. Each call to
//! [`TransitionTask::poll`] runs until the next suspension point and then
//! returns [`Poll::Pending`]. Suspension points are:
//! - a load below the pre-load threshold
//! - a committed load that has not completed
//! - an unload or release pass that is not done

use super::events::TransitionEvent;
use super::phase::Phase;
use super::plan::TransitionPlan;
use super::request::{PoseCallback, TransitionRequest};
use super::{Admission, Orchestrator};
use crate::anchor::{AnchorLocator, AnchorResolution};
use crate::config::{LoadStrategy, TransitionOptions};
use crate::descriptor::ResourceSetDescriptor;
use crate::error::StagehandError;
use crate::provider::PendingOperation;
use crate::token::{LoadingToken, MultiToken, TokenEvent, TokenStage};
use crate::types::{LoadMode, TransitionId};
use serde::Serialize;
use std::fmt;
use std::task::Poll;

/// Why a request was ignored without touching any state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    /// Another transition is in flight
    Busy { phase: Phase },
    /// The requested descriptor is already active
    AlreadyActive { descriptor: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy { phase } => write!(f, "transition already in flight (phase {phase})"),
            Self::AlreadyActive { descriptor } => write!(f, "{descriptor} is already active"),
        }
    }
}

/// Summary of a completed transition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionReport {
    pub id: TransitionId,
    pub descriptor: String,
    /// Resources loaded by this transition, in load order
    pub loaded: Vec<String>,
    /// Target resources that were already loaded
    pub skipped: Vec<String>,
    pub unloaded: Vec<String>,
    /// Stale resources kept by a protected prefix
    pub protected: Vec<String>,
    pub active_resource: Option<String>,
    /// Present when the request carried a pose callback
    pub anchor: Option<AnchorResolution>,
    /// Number of polls until the task settled
    pub polls: u64,
}

/// Final result of a task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    Completed(TransitionReport),
    Rejected(RejectReason),
}

impl TransitionOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    #[must_use]
    pub fn report(&self) -> Option<&TransitionReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Rejected(_) => None,
        }
    }

    #[must_use]
    pub fn rejection(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            Self::Completed(_) => None,
        }
    }
}

enum Stage {
    Admission,
    Loading { index: usize, token: Option<LoadingToken> },
    Batch { batch: Option<(Vec<String>, MultiToken)> },
    Unloading { index: usize, pending: Option<Box<dyn PendingOperation>> },
    Releasing { pending: Option<Box<dyn PendingOperation>> },
    Anchoring,
    Settled(TransitionOutcome),
    Failed(StagehandError),
}

enum Step {
    Continue,
    Pending,
    Ready(TransitionOutcome),
}

/// One transition, advanced by polling
pub struct TransitionTask {
    orchestrator: Orchestrator,
    id: TransitionId,
    span: tracing::Span,
    descriptor: ResourceSetDescriptor,
    anchor: String,
    on_pose: Option<PoseCallback>,
    options: TransitionOptions,
    stage: Stage,
    plan: TransitionPlan,
    loaded: Vec<String>,
    skipped: Vec<String>,
    unloaded: Vec<String>,
    active_resource: Option<String>,
    resolution: Option<AnchorResolution>,
    polls: u64,
}

impl TransitionTask {
    pub(super) fn new(orchestrator: Orchestrator, request: TransitionRequest) -> Self {
        let (descriptor, anchor, on_pose, options) = request.into_parts();
        let id = TransitionId::new();
        let options = options.unwrap_or(orchestrator.config().default_options);
        let span = tracing::info_span!("transition", id = %id, descriptor = %descriptor.label());

        Self {
            orchestrator,
            id,
            span,
            descriptor,
            anchor,
            on_pose,
            options,
            stage: Stage::Admission,
            plan: TransitionPlan::default(),
            loaded: Vec::new(),
            skipped: Vec::new(),
            unloaded: Vec::new(),
            active_resource: None,
            resolution: None,
            polls: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> TransitionId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &ResourceSetDescriptor {
        &self.descriptor
    }

    /// Diff computed at admission; empty before the first poll
    #[inline]
    #[must_use]
    pub fn plan(&self) -> &TransitionPlan {
        &self.plan
    }

    /// Whether the task has settled or failed
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.stage, Stage::Settled(_) | Stage::Failed(_))
    }

    /// Whether the task was admitted and has not yet settled or failed
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        !matches!(self.stage, Stage::Admission | Stage::Settled(_) | Stage::Failed(_))
    }

    /// Run until the next suspension point
    ///
    /// Once settled, every further poll returns the same outcome. After
    /// an error every further poll returns the same error; the
    /// orchestrator is left in the phase the error occurred in.
    ///
    /// # Errors
    /// - `StagehandError::Validation` from the first poll when a name is
    ///   not in the catalog; no state has changed
    /// - `StagehandError::Provider` when the host fails an operation
    pub fn poll(&mut self) -> Result<Poll<TransitionOutcome>, StagehandError> {
        let span = self.span.clone();
        let _entered = span.enter();

        match &self.stage {
            Stage::Settled(outcome) => return Ok(Poll::Ready(outcome.clone())),
            Stage::Failed(err) => return Err(err.clone()),
            _ => {}
        }

        self.polls += 1;
        loop {
            match self.step() {
                Ok(Step::Continue) => {}
                Ok(Step::Pending) => return Ok(Poll::Pending),
                Ok(Step::Ready(outcome)) => {
                    self.stage = Stage::Settled(outcome.clone());
                    return Ok(Poll::Ready(outcome));
                }
                Err(err) => {
                    if err.is_fatal() {
                        tracing::error!("Transition aborted in phase {}: {}", self.orchestrator.phase(), err);
                    } else {
                        tracing::warn!("Transition refused: {}", err);
                    }
                    self.stage = Stage::Failed(err.clone());
                    return Err(err);
                }
            }
        }
    }

    fn step(&mut self) -> Result<Step, StagehandError> {
        match std::mem::replace(&mut self.stage, Stage::Anchoring) {
            Stage::Admission => self.admit(),
            Stage::Loading { index, token } => self.load_sequential(index, token),
            Stage::Batch { batch } => self.load_batched(batch),
            Stage::Unloading { index, pending } => self.unload(index, pending),
            Stage::Releasing { pending } => self.release(pending),
            Stage::Anchoring => self.anchor(),
            Stage::Settled(outcome) => {
                self.stage = Stage::Settled(outcome.clone());
                Ok(Step::Ready(outcome))
            }
            Stage::Failed(err) => {
                self.stage = Stage::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn admit(&mut self) -> Result<Step, StagehandError> {
        match self.orchestrator.admit(self.id, &self.descriptor)? {
            Admission::Rejected(reason) => {
                tracing::warn!("Transition to {} ignored: {}", self.descriptor, reason);
                Ok(Step::Ready(TransitionOutcome::Rejected(reason)))
            }
            Admission::Admitted(plan) => {
                tracing::info!(
                    "Transition to {} started: {} to load, {} to unload",
                    self.descriptor,
                    plan.to_load.len(),
                    plan.to_unload.len()
                );
                self.plan = plan;
                self.stage = match self.options.load_strategy {
                    LoadStrategy::Sequential => Stage::Loading { index: 0, token: None },
                    LoadStrategy::Batched => Stage::Batch { batch: None },
                };
                Ok(Step::Continue)
            }
        }
    }

    fn needs_load(&self, name: &str) -> bool {
        self.options.allow_duplicate_load || !self.orchestrator.catalog().is_loaded(name)
    }

    fn begin_load(&self, name: &str) -> Result<LoadingToken, StagehandError> {
        let mut token = self.orchestrator.catalog().begin_load(name, LoadMode::Merge)?;

        let orchestrator = self.orchestrator.clone();
        let id = self.id;
        let resource = name.to_string();
        token.on_event(move |event| {
            if let TokenEvent::Progress(progress) = event {
                orchestrator.publish(TransitionEvent::LoadProgress {
                    id,
                    resource: resource.clone(),
                    progress: *progress,
                });
            }
        });

        Ok(token)
    }

    fn load_sequential(&mut self, index: usize, token: Option<LoadingToken>) -> Result<Step, StagehandError> {
        let Some(name) = self.plan.to_load.get(index).cloned() else {
            return self.enter_unloading();
        };

        let mut token = match token {
            Some(token) => token,
            None if self.needs_load(&name) => self.begin_load(&name)?,
            None => {
                tracing::info!("{} already loaded, skipping", name);
                self.skipped.push(name.clone());
                if index == 0 {
                    self.activate(&name)?;
                }
                self.stage = Stage::Loading { index: index + 1, token: None };
                return Ok(Step::Continue);
            }
        };

        match token.advance() {
            TokenStage::Loading => {}
            TokenStage::PreLoaded => {
                token.commit();
            }
            TokenStage::Completed => {
                tracing::info!("{} loaded", name);
                self.loaded.push(name.clone());
                if index == 0 {
                    self.activate(&name)?;
                }
                self.stage = Stage::Loading { index: index + 1, token: None };
                return Ok(Step::Continue);
            }
        }

        self.stage = Stage::Loading {
            index,
            token: Some(token),
        };
        Ok(Step::Pending)
    }

    fn load_batched(&mut self, batch: Option<(Vec<String>, MultiToken)>) -> Result<Step, StagehandError> {
        let (names, mut multi) = match batch {
            Some(batch) => batch,
            None => {
                let mut names = Vec::new();
                let mut tokens = Vec::new();

                for name in self.plan.to_load.clone() {
                    // Host state does not reflect this batch until it completes
                    let repeated = !self.options.allow_duplicate_load && names.contains(&name);
                    if !repeated && self.needs_load(&name) {
                        tokens.push(self.begin_load(&name)?);
                        names.push(name);
                    } else {
                        tracing::info!("{} already loaded, skipping", name);
                        self.skipped.push(name);
                    }
                }

                if let Some(first) = self.plan.to_load.first().cloned() {
                    if !names.contains(&first) {
                        self.activate(&first)?;
                    }
                }

                (names, MultiToken::new(tokens))
            }
        };

        match multi.advance() {
            TokenStage::Loading => {}
            TokenStage::PreLoaded => {
                multi.commit();
            }
            TokenStage::Completed => {
                tracing::info!("{} resources loaded together", names.len());
                if let Some(first) = self.plan.to_load.first().cloned() {
                    if names.contains(&first) {
                        self.activate(&first)?;
                    }
                }
                self.loaded = names;
                return self.enter_unloading();
            }
        }

        self.stage = Stage::Batch {
            batch: Some((names, multi)),
        };
        Ok(Step::Pending)
    }

    fn activate(&mut self, name: &str) -> Result<(), StagehandError> {
        self.orchestrator.catalog().provider().set_active(name).map_err(|fault| {
            tracing::error!("Could not mark {} active: {}", name, fault);
            fault
        })?;
        tracing::info!("{} is now the active resource", name);
        self.active_resource = Some(name.to_string());
        Ok(())
    }

    fn enter_unloading(&mut self) -> Result<Step, StagehandError> {
        self.orchestrator.advance_phase(self.id, Phase::NextLoaded)?;
        self.orchestrator.advance_phase(self.id, Phase::PrevUnloading)?;
        self.stage = Stage::Unloading { index: 0, pending: None };
        Ok(Step::Continue)
    }

    fn unload(&mut self, index: usize, pending: Option<Box<dyn PendingOperation>>) -> Result<Step, StagehandError> {
        let Some(name) = self.plan.to_unload.get(index).cloned() else {
            self.stage = Stage::Releasing { pending: None };
            return Ok(Step::Continue);
        };

        let pending = match pending {
            Some(pending) => pending,
            None => self.orchestrator.catalog().begin_unload(&name)?,
        };

        if pending.is_done() {
            tracing::info!("{} unloaded", name);
            self.unloaded.push(name);
            self.stage = Stage::Unloading { index: index + 1, pending: None };
            return Ok(Step::Continue);
        }

        self.stage = Stage::Unloading {
            index,
            pending: Some(pending),
        };
        Ok(Step::Pending)
    }

    fn release(&mut self, pending: Option<Box<dyn PendingOperation>>) -> Result<Step, StagehandError> {
        let pending = match pending {
            Some(pending) => pending,
            None => self.orchestrator.catalog().release_unused()?,
        };

        if !pending.is_done() {
            self.stage = Stage::Releasing { pending: Some(pending) };
            return Ok(Step::Pending);
        }

        tracing::debug!("Release of unused assets finished");
        self.orchestrator.advance_phase(self.id, Phase::PrevUnloaded)?;
        self.orchestrator.advance_phase(self.id, Phase::AnchorMoving)?;
        self.stage = Stage::Anchoring;
        Ok(Step::Continue)
    }

    fn anchor(&mut self) -> Result<Step, StagehandError> {
        if let Some(callback) = self.on_pose.take() {
            let locator = AnchorLocator::new(self.orchestrator.catalog().provider().as_ref());
            let resolution = locator.resolve_loaded(&self.anchor);

            if let Err(err) = callback(resolution.pose) {
                tracing::warn!("Pose callback for anchor {} failed: {:#}", self.anchor, err);
            }
            self.resolution = Some(resolution);
        }

        self.orchestrator.advance_phase(self.id, Phase::AnchorMoved)?;
        self.orchestrator
            .finish(self.id, &self.descriptor, self.active_resource.clone())?;

        tracing::info!("Transition to {} finished after {} polls", self.descriptor, self.polls);
        Ok(Step::Ready(TransitionOutcome::Completed(self.report())))
    }

    fn report(&self) -> TransitionReport {
        TransitionReport {
            id: self.id,
            descriptor: self.descriptor.label().to_string(),
            loaded: self.loaded.clone(),
            skipped: self.skipped.clone(),
            unloaded: self.unloaded.clone(),
            protected: self.plan.protected.clone(),
            active_resource: self.active_resource.clone(),
            anchor: self.resolution.clone(),
            polls: self.polls,
        }
    }
}

impl Drop for TransitionTask {
    fn drop(&mut self) {
        if self.is_in_flight() {
            let _entered = self.span.enter();
            tracing::error!(
                "Transition to {} dropped in phase {}; the orchestrator stays busy",
                self.descriptor,
                self.orchestrator.phase()
            );
        }
    }
}

impl fmt::Debug for TransitionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionTask")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor.label())
            .field("finished", &self.is_finished())
            .field("polls", &self.polls)
            .finish_non_exhaustive()
    }
}
