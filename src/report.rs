//! Step summary for `new-run`.
//!
//! Formats one human-readable line per step once the orchestrator returns.

use crate::model::RunPlan;
use crate::orchestrator::{NewRunReport, StepOutcome};

/// Pre-formatted lines for the end-of-run summary.
pub(crate) struct StepSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_step_summary(plan: &RunPlan, report: &NewRunReport) -> StepSummary {
    let mut lines = Vec::new();

    match plan.run_path.as_ref() {
        Some(path) => lines.push(format!("Run: {path}")),
        None => lines.push("Run: created (no --path=, nothing else to do)".to_string()),
    }

    let dashboard = match (&report.dashboard, plan.dashboard()) {
        (StepOutcome::Done, Some((port, dir))) => format!("port {port} on {dir}"),
        (StepOutcome::Failed(e), _) => format!("failed: {e}"),
        _ if plan.port.is_none() => "skipped (no port)".to_string(),
        _ => "skipped (no --path=)".to_string(),
    };
    lines.push(format!("Dashboard: {dashboard}"));

    let session = match (&report.session, plan.session_key()) {
        (StepOutcome::Done, Some(key)) => format!("detached from {key}"),
        (StepOutcome::NoSession, Some(key)) => format!("no session {key}, not attached"),
        (StepOutcome::Failed(e), _) => format!("failed: {e}"),
        _ => "skipped (no --path=)".to_string(),
    };
    lines.push(format!("Session: {session}"));

    StepSummary { lines }
}
