//! Progress tokens for in-flight loads
//!
//! A [`LoadingToken`] wraps one host [`LoadOperation`]. The driver must:
//! 1. call [`LoadingToken::advance`] every tick until it is pre-loaded
//! 2. call [`LoadingToken::commit`] once
//! 3. keep calling [`LoadingToken::advance`] until it is completed
//!
//! No other interleaving is supported.

mod multi;

pub use multi::MultiToken;

use crate::provider::LoadOperation;
use std::fmt;

/// Progress at which a load is considered pre-loaded
pub const PRELOAD_THRESHOLD: f32 = 0.9;

/// Where a token is in its load
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TokenStage {
    /// Below the pre-load threshold
    Loading,
    /// Reached the threshold, waiting for or running activation
    PreLoaded,
    /// Host reports the load done
    Completed,
}

/// Notifications raised by [`LoadingToken::advance`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenEvent {
    /// Stored progress increased
    Progress(f32),
    /// Progress crossed [`PRELOAD_THRESHOLD`]; raised once per token
    PreLoaded,
    /// Host reported the load done; raised once per token
    Completed,
}

type TokenListener = Box<dyn FnMut(&TokenEvent) + Send>;

/// Progress tracker for one load
pub struct LoadingToken {
    resource: String,
    operation: Box<dyn LoadOperation>,
    progress: f32,
    preload_fired: bool,
    completion_fired: bool,
    committed: bool,
    listeners: Vec<TokenListener>,
}

impl LoadingToken {
    /// Wrap a host operation
    #[must_use]
    pub fn new(resource: impl Into<String>, operation: Box<dyn LoadOperation>) -> Self {
        Self {
            resource: resource.into(),
            operation,
            progress: 0.0,
            preload_fired: false,
            completion_fired: false,
            committed: false,
            listeners: Vec::new(),
        }
    }

    /// Register a listener for this token's events
    pub fn on_event(&mut self, listener: impl FnMut(&TokenEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Resource being loaded
    #[inline]
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Last observed progress
    #[inline]
    #[must_use]
    pub fn progress(&self) -> f32 {
        self.progress
    }

    #[inline]
    #[must_use]
    pub fn is_preloaded(&self) -> bool {
        self.progress >= PRELOAD_THRESHOLD
    }

    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.operation.is_done()
    }

    /// Whether [`commit`](Self::commit) has taken effect
    #[inline]
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    #[must_use]
    pub fn stage(&self) -> TokenStage {
        if self.is_completed() {
            TokenStage::Completed
        } else if self.is_preloaded() {
            TokenStage::PreLoaded
        } else {
            TokenStage::Loading
        }
    }

    /// Pull the latest progress from the host
    pub fn advance(&mut self) -> TokenStage {
        let reported = self.operation.progress().clamp(0.0, 1.0);

        if reported > self.progress {
            self.progress = reported;
            self.emit(TokenEvent::Progress(reported));

            if !self.preload_fired && self.is_preloaded() {
                self.preload_fired = true;
                tracing::debug!("{} pre-loaded", self.resource);
                self.emit(TokenEvent::PreLoaded);
            }
        }

        if !self.completion_fired && self.operation.is_done() {
            self.completion_fired = true;
            self.emit(TokenEvent::Completed);
        }

        self.stage()
    }

    /// Let the host finish activation
    ///
    /// Only has an effect when pre-loaded and not yet completed. Returns
    /// whether activation was allowed by this call.
    pub fn commit(&mut self) -> bool {
        if self.is_preloaded() && !self.is_completed() && !self.committed {
            self.operation.allow_activation();
            self.committed = true;
            true
        } else {
            false
        }
    }

    fn emit(&mut self, event: TokenEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

impl fmt::Debug for LoadingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingToken")
            .field("resource", &self.resource)
            .field("progress", &self.progress)
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Scripted load: progress values returned in order, last one repeats
    pub(crate) struct ScriptedLoad {
        pub(crate) script: Arc<Mutex<Vec<f32>>>,
        pub(crate) activated: Arc<Mutex<bool>>,
        pub(crate) done: Arc<Mutex<bool>>,
    }

    impl ScriptedLoad {
        pub(crate) fn new(script: &[f32]) -> Self {
            Self {
                script: Arc::new(Mutex::new(script.to_vec())),
                activated: Arc::new(Mutex::new(false)),
                done: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl LoadOperation for ScriptedLoad {
        fn progress(&self) -> f32 {
            let mut script = self.script.lock();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script.first().copied().unwrap_or(0.0)
            }
        }

        fn allow_activation(&mut self) {
            *self.activated.lock() = true;
        }

        fn is_done(&self) -> bool {
            *self.done.lock()
        }
    }

    #[test]
    fn preload_fires_exactly_once() {
        let load = ScriptedLoad::new(&[0.3, 0.9, 0.9, 0.9, 0.95, 0.9]);
        let mut token = LoadingToken::new("A1", Box::new(load));

        let fired = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&fired);
        token.on_event(move |event| {
            if *event == TokenEvent::PreLoaded {
                *counter.lock() += 1;
            }
        });

        for _ in 0..20 {
            token.advance();
        }

        assert_eq!(*fired.lock(), 1);
        assert!(token.is_preloaded());
    }

    #[test]
    fn progress_is_monotonic() {
        let load = ScriptedLoad::new(&[0.5, 0.2, 0.6, 0.1]);
        let mut token = LoadingToken::new("A1", Box::new(load));

        token.advance();
        assert!((token.progress() - 0.5).abs() < f32::EPSILON);
        token.advance();
        assert!((token.progress() - 0.5).abs() < f32::EPSILON);
        token.advance();
        assert!((token.progress() - 0.6).abs() < f32::EPSILON);
        token.advance();
        assert!((token.progress() - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn commit_before_preload_is_noop() {
        let load = ScriptedLoad::new(&[0.4]);
        let activated = Arc::clone(&load.activated);
        let mut token = LoadingToken::new("A1", Box::new(load));

        token.advance();
        assert!(!token.commit());
        assert!(!*activated.lock());
        assert_eq!(token.stage(), TokenStage::Loading);
    }

    #[test]
    fn commit_after_preload_allows_activation_once() {
        let load = ScriptedLoad::new(&[0.9]);
        let activated = Arc::clone(&load.activated);
        let done = Arc::clone(&load.done);
        let mut token = LoadingToken::new("A1", Box::new(load));

        assert_eq!(token.advance(), TokenStage::PreLoaded);
        assert!(!token.is_committed());
        assert!(token.commit());
        assert!(token.is_committed());
        assert!(!token.commit());
        assert!(*activated.lock());

        *done.lock() = true;
        assert_eq!(token.advance(), TokenStage::Completed);
        assert!(!token.commit());
    }

    #[test]
    fn completed_event_fires_once() {
        let load = ScriptedLoad::new(&[1.0]);
        let done = Arc::clone(&load.done);
        *done.lock() = true;
        let mut token = LoadingToken::new("A1", Box::new(load));

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        token.on_event(move |event| sink.lock().push(*event));

        token.advance();
        token.advance();

        assert_eq!(
            *events.lock(),
            vec![TokenEvent::Progress(1.0), TokenEvent::PreLoaded, TokenEvent::Completed]
        );
    }
}
