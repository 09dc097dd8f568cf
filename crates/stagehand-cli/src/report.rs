//! Timeline rendering

use crate::runner::StepRecord;
use stagehand_core::{TransitionEvent, TransitionOutcome};
use std::fmt::{self, Write};

/// Human-readable timeline of every step
pub(crate) fn render_text(records: &[StepRecord]) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_timeline(&mut out, records)?;
    Ok(out)
}

fn write_timeline(out: &mut impl Write, records: &[StepRecord]) -> fmt::Result {
    for (index, record) in records.iter().enumerate() {
        writeln!(out, "Step {}: {}", index + 1, record.scene)?;

        match &record.outcome {
            TransitionOutcome::Rejected(reason) => writeln!(out, "  ignored: {reason}")?,
            TransitionOutcome::Completed(report) => {
                let phases: Vec<String> = record
                    .events
                    .iter()
                    .filter_map(TransitionEvent::phase)
                    .map(|phase| phase.to_string())
                    .collect();
                writeln!(out, "  phases:   {}", phases.join(" -> "))?;
                writeln!(out, "  loaded:   {}", list(&report.loaded))?;
                writeln!(out, "  skipped:  {}", list(&report.skipped))?;
                writeln!(out, "  unloaded: {}", list(&report.unloaded))?;
                if !report.protected.is_empty() {
                    writeln!(out, "  kept:     {}", list(&report.protected))?;
                }
                if let Some(active) = &report.active_resource {
                    writeln!(out, "  active:   {active}")?;
                }
                if let Some(anchor) = &report.anchor {
                    let p = anchor.pose.position;
                    let found = if anchor.found { "" } else { " (not found, origin)" };
                    writeln!(out, "  anchor:   {} at ({}, {}, {}){found}", anchor.name, p.x, p.y, p.z)?;
                }
                writeln!(out, "  ticks:    {}", record.ticks)?;
            }
        }

        writeln!(out, "  host:     {}", list(&record.loaded_after))?;
    }

    Ok(())
}

/// Records as pretty-printed JSON
pub(crate) fn render_json(records: &[StepRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

fn list(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::{RejectReason, TransitionId, TransitionReport};

    fn completed() -> StepRecord {
        StepRecord {
            scene: "hall".to_string(),
            outcome: TransitionOutcome::Completed(TransitionReport {
                id: TransitionId::new(),
                descriptor: "hall".to_string(),
                loaded: vec!["Hall".to_string()],
                skipped: Vec::new(),
                unloaded: vec!["Garden".to_string()],
                protected: vec!["Boot".to_string()],
                active_resource: Some("Hall".to_string()),
                anchor: None,
                polls: 7,
            }),
            pose: None,
            ticks: 6,
            loaded_after: vec!["Boot".to_string(), "Hall".to_string()],
            events: Vec::new(),
        }
    }

    #[test]
    fn text_lists_changes() {
        let text = render_text(&[completed()]).unwrap();
        assert!(text.contains("Step 1: hall"));
        assert!(text.contains("unloaded: Garden"));
        assert!(text.contains("kept:     Boot"));
        assert!(text.contains("skipped:  -"));
    }

    #[test]
    fn text_reports_ignored_steps() {
        let mut record = completed();
        record.outcome = TransitionOutcome::Rejected(RejectReason::AlreadyActive {
            descriptor: "hall".to_string(),
        });
        assert!(render_text(&[record]).unwrap().contains("ignored: hall is already active"));
    }

    struct Closed;

    impl Write for Closed {
        fn write_str(&mut self, _: &str) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    #[test]
    fn write_errors_are_propagated() {
        assert_eq!(write_timeline(&mut Closed, &[completed()]), Err(fmt::Error));
        assert_eq!(write_timeline(&mut Closed, &[]), Ok(()));
    }

    #[test]
    fn json_is_tagged() {
        let json = render_json(&[completed()]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["outcome"]["outcome"], "completed");
        assert_eq!(value[0]["outcome"]["loaded"][0], "Hall");
    }
}
