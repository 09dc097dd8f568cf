//! Tick driver for transitions against a [`SimulatedProvider`]

use super::SimulatedProvider;
use crate::error::StagehandError;
use crate::orchestrator::{TransitionOutcome, TransitionTask};
use std::sync::Arc;
use std::task::Poll;

/// Ticks allowed before a run is considered stalled
pub const DEFAULT_MAX_TICKS: u64 = 1_000;

/// Harness errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HarnessError {
    #[error("transition failed: {0}")]
    Transition(#[from] StagehandError),

    #[error("transition did not settle within {ticks} ticks")]
    Stalled { ticks: u64 },
}

/// Polls a task and ticks the provider until the task settles
#[derive(Debug, Clone)]
pub struct Harness {
    provider: Arc<SimulatedProvider>,
    max_ticks: u64,
}

impl Harness {
    #[must_use]
    pub fn new(provider: Arc<SimulatedProvider>) -> Self {
        Self {
            provider,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    #[inline]
    #[must_use]
    pub fn provider(&self) -> &Arc<SimulatedProvider> {
        &self.provider
    }

    /// Drive `task` to completion
    ///
    /// # Errors
    /// - `HarnessError::Transition` if a poll fails
    /// - `HarnessError::Stalled` if the task is still pending after
    ///   `max_ticks` ticks
    pub fn run(&self, task: &mut TransitionTask) -> Result<TransitionOutcome, HarnessError> {
        let mut ticks = 0;
        loop {
            if let Poll::Ready(outcome) = task.poll()? {
                tracing::debug!("Task settled after {} ticks", ticks);
                return Ok(outcome);
            }
            if ticks >= self.max_ticks {
                return Err(HarnessError::Stalled { ticks });
            }
            self.provider.tick();
            ticks += 1;
        }
    }
}
