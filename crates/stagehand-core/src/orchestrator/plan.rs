//! Load/unload diff for one transition

use crate::config::OrchestratorConfig;
use serde::Serialize;

/// Which resources a transition loads, unloads and leaves alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransitionPlan {
    /// Target resources in descriptor order
    pub to_load: Vec<String>,
    /// Loaded resources outside the target, in host order
    pub to_unload: Vec<String>,
    /// Loaded resources outside the target kept by a protected prefix
    pub protected: Vec<String>,
}

impl TransitionPlan {
    /// Diff `target` against the currently `loaded` names
    #[must_use]
    pub fn compute(target: &[String], loaded: &[String], config: &OrchestratorConfig) -> Self {
        let mut plan = Self {
            to_load: target.to_vec(),
            ..Self::default()
        };

        for name in loaded {
            if target.contains(name) || plan.to_unload.contains(name) || plan.protected.contains(name) {
                continue;
            }
            if config.is_protected(name) {
                plan.protected.push(name.clone());
            } else {
                plan.to_unload.push(name.clone());
            }
        }

        plan
    }
}
