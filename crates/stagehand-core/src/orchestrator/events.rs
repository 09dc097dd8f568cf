//! Transition events and their observers

use super::phase::Phase;
use crate::types::TransitionId;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Notification published by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TransitionEvent {
    /// A transition was admitted; precedes `PhaseChanged(NextLoading)`
    Started { id: TransitionId, descriptor: String },
    /// Phase was updated
    PhaseChanged { id: TransitionId, phase: Phase },
    /// A transition reached its last phase; precedes `PhaseChanged(Idle)`
    Finished { id: TransitionId, descriptor: String },
    /// A load's progress increased
    LoadProgress {
        id: TransitionId,
        resource: String,
        progress: f32,
    },
}

impl TransitionEvent {
    /// Transition the event belongs to
    #[must_use]
    pub fn transition_id(&self) -> TransitionId {
        match self {
            Self::Started { id, .. }
            | Self::PhaseChanged { id, .. }
            | Self::Finished { id, .. }
            | Self::LoadProgress { id, .. } => *id,
        }
    }

    /// Phase carried by a `PhaseChanged` event
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::PhaseChanged { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Handle returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&TransitionEvent) + Send + Sync>;

/// Listener list, notified in registration order
#[derive(Default)]
pub(crate) struct Observers {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl Observers {
    pub(crate) fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver `events` in order; listeners may re-enter the orchestrator
    pub(crate) fn publish(&self, events: &[TransitionEvent]) {
        if events.is_empty() {
            return;
        }

        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for event in events {
            for listener in &snapshot {
                listener(event);
            }
        }
    }
}
