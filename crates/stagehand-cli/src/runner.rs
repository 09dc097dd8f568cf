//! Tick loop driving scenario steps

use crate::scenario::{Scenario, World};
use anyhow::Context;
use parking_lot::Mutex;
use serde::Serialize;
use stagehand_core::{Pose, ResourceProvider, TransitionEvent, TransitionOutcome, TransitionRequest};
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

/// Driver settings
#[derive(Debug, Clone, Copy)]
pub(crate) struct RunOptions {
    /// Ticks a step may take before it is abandoned
    pub(crate) max_ticks: u64,
    /// Wall-clock delay between ticks
    pub(crate) tick: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            max_ticks: 1_000,
            tick: Duration::ZERO,
        }
    }
}

/// What one step did
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StepRecord {
    pub(crate) scene: String,
    pub(crate) outcome: TransitionOutcome,
    pub(crate) pose: Option<Pose>,
    pub(crate) ticks: u64,
    pub(crate) loaded_after: Vec<String>,
    pub(crate) events: Vec<TransitionEvent>,
}

/// Run every step of `scenario` in order
pub(crate) async fn run(scenario: &Scenario, options: RunOptions) -> anyhow::Result<Vec<StepRecord>> {
    let world = scenario.build()?;
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    world.orchestrator.subscribe(move |event| {
        if !matches!(event, TransitionEvent::LoadProgress { .. }) {
            sink.lock().push(event.clone());
        }
    });

    let mut records = Vec::with_capacity(scenario.steps.len());
    for (index, step) in scenario.steps.iter().enumerate() {
        tracing::info!("Step {}: transition to {}", index + 1, step.scene);

        let pose = Arc::new(Mutex::new(None));
        let mut request = TransitionRequest::from_registry(&world.registry, &step.scene)?;
        if let Some(anchor) = &step.anchor {
            let slot = Arc::clone(&pose);
            request = request.with_anchor(anchor.clone()).with_pose_callback(move |resolved| {
                *slot.lock() = Some(resolved);
                Ok(())
            });
        }
        if let Some(step_options) = step.options {
            request = request.with_options(step_options);
        }

        let (outcome, ticks) = drive(&world, request, options)
            .await
            .with_context(|| format!("step {} ({})", index + 1, step.scene))?;

        let pose = *pose.lock();
        records.push(StepRecord {
            scene: step.scene.clone(),
            outcome,
            pose,
            ticks,
            loaded_after: world.provider.loaded_names(),
            events: std::mem::take(&mut *events.lock()),
        });
    }

    Ok(records)
}

async fn drive(world: &World, request: TransitionRequest, options: RunOptions) -> anyhow::Result<(TransitionOutcome, u64)> {
    let mut task = world.orchestrator.transition(request);
    let mut ticks = 0;
    let mut interval = (!options.tick.is_zero()).then(|| tokio::time::interval(options.tick));

    loop {
        if let Poll::Ready(outcome) = task.poll()? {
            return Ok((outcome, ticks));
        }
        if ticks >= options.max_ticks {
            anyhow::bail!("did not settle within {} ticks", options.max_ticks);
        }

        match interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => tokio::task::yield_now().await,
        }
        world.provider.tick();
        ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stagehand_core::Phase;

    const SCENARIO: &str = r#"
        [orchestrator]
        protected_prefixes = ["Boot"]

        [host]
        registered = ["Assets/Hall.unity", "Assets/Garden.unity"]
        preloaded = ["Boot"]

        [[host.layouts.Garden.roots]]
        label = "Gate"
        anchor = { name = "Gate", position = [0.0, 0.0, 3.0] }

        [scenes]
        hall = ["Hall"]
        garden = ["Garden"]

        [[steps]]
        scene = "hall"

        [[steps]]
        scene = "garden"
        anchor = "Gate"

        [[steps]]
        scene = "garden"
    "#;

    #[tokio::test]
    async fn runs_every_step() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let records = run(&scenario, RunOptions::default()).await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].loaded_after, vec!["Boot".to_string(), "Hall".to_string()]);
        assert_eq!(records[1].loaded_after, vec!["Boot".to_string(), "Garden".to_string()]);
        assert_eq!(records[1].pose.map(|p| p.position.z), Some(3.0));
        assert!(records[2].outcome.rejection().is_some());
        assert!(records[2].events.is_empty());

        let phases: Vec<Phase> = records[0].events.iter().filter_map(TransitionEvent::phase).collect();
        assert_eq!(phases.last(), Some(&Phase::Idle));
        assert_eq!(phases.len(), 7);
    }

    #[tokio::test]
    async fn tick_budget_is_enforced() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let options = RunOptions {
            max_ticks: 1,
            ..RunOptions::default()
        };
        let err = run(&scenario, options).await.unwrap_err();
        assert!(format!("{err:#}").contains("did not settle"));
    }
}
