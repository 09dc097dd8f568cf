//! Transition phases
//!
//! A transition walks the phases in one fixed cycle:
//! Idle → NextLoading → NextLoaded → PrevUnloading → PrevUnloaded →
//! AnchorMoving → AnchorMoved → Idle.

use crate::error::PhaseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Current step of the transition state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Idle,
    NextLoading,
    NextLoaded,
    PrevUnloading,
    PrevUnloaded,
    AnchorMoving,
    AnchorMoved,
}

impl Phase {
    /// Every phase in cycle order, starting at Idle
    pub const CYCLE: [Phase; 7] = [
        Phase::Idle,
        Phase::NextLoading,
        Phase::NextLoaded,
        Phase::PrevUnloading,
        Phase::PrevUnloaded,
        Phase::AnchorMoving,
        Phase::AnchorMoved,
    ];

    /// The only phase that may follow this one
    #[must_use]
    pub fn next(self) -> Self {
        use Phase::*;
        match self {
            Idle => NextLoading,
            NextLoading => NextLoaded,
            NextLoaded => PrevUnloading,
            PrevUnloading => PrevUnloaded,
            PrevUnloaded => AnchorMoving,
            AnchorMoving => AnchorMoved,
            AnchorMoved => Idle,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_idle(self) -> bool {
        self == Phase::Idle
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Validates a phase change.
///
/// Returns an error for anything but the successor phase. The
/// `strict-debug` feature turns an illegal change into a panic.
///
/// # Errors
/// `PhaseError::IllegalTransition` when `to` is not `from.next()`.
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), PhaseError> {
    if from.next() == to {
        Ok(())
    } else {
        #[cfg(feature = "strict-debug")]
        panic!("Illegal phase transition attempted: {:?} -> {:?}", from, to);

        #[cfg(not(feature = "strict-debug"))]
        Err(PhaseError::IllegalTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_returns_to_idle() {
        let mut phase = Phase::Idle;
        for expected in Phase::CYCLE.iter().skip(1) {
            phase = phase.next();
            assert_eq!(phase, *expected);
        }
        assert_eq!(phase.next(), Phase::Idle);
    }

    #[test]
    fn successor_is_valid() {
        for phase in Phase::CYCLE {
            assert!(validate_transition(phase, phase.next()).is_ok());
        }
    }

    #[cfg(not(feature = "strict-debug"))]
    #[test]
    fn skipping_a_phase_is_rejected() {
        assert_eq!(
            validate_transition(Phase::NextLoading, Phase::PrevUnloading),
            Err(PhaseError::IllegalTransition {
                from: Phase::NextLoading,
                to: Phase::PrevUnloading,
            })
        );
        assert!(validate_transition(Phase::Idle, Phase::Idle).is_err());
    }
}
