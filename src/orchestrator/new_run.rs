//! Run-session orchestration.
//!
//! Creates the run, launches a dashboard on its family directory when a port
//! was given, then attaches the terminal to the run's session. Each step runs
//! at most once, strictly in that order.

use crate::config::MissingSession;
use crate::error::ToolError;
use crate::model::{RunPlan, SessionKey};
use crate::tools::{DashboardLauncher, RunRegistry, SessionManager};

/// The collaborators `new-run` talks to.
pub(crate) struct NewRunTools<'a> {
    pub registry: &'a dyn RunRegistry,
    pub dashboard: &'a dyn DashboardLauncher,
    pub sessions: &'a dyn SessionManager,
}

/// What happened to one optional step.
#[derive(Debug)]
pub(crate) enum StepOutcome {
    /// Not eligible: the values it needs were not bound.
    Skipped,
    Done,
    /// Session probe found nothing to attach to.
    NoSession,
    Failed(ToolError),
}

impl StepOutcome {
    fn failure(&self) -> Option<&ToolError> {
        match self {
            StepOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Outcome of the optional steps, in execution order.
#[derive(Debug)]
pub(crate) struct NewRunReport {
    pub dashboard: StepOutcome,
    pub session: StepOutcome,
}

impl NewRunReport {
    /// First non-zero status among the steps that ran.
    pub fn exit_code(&self) -> i32 {
        [&self.dashboard, &self.session]
            .into_iter()
            .find_map(StepOutcome::failure)
            .map_or(0, ToolError::exit_code)
    }
}

/// Execute `plan`. Run creation failing, or any interrupt, aborts; optional
/// step failures are recorded in the report instead.
pub(crate) async fn run_new_session(
    plan: &RunPlan,
    tools: &NewRunTools<'_>,
    on_missing: MissingSession,
) -> Result<NewRunReport, ToolError> {
    tools.registry.create_run(&plan.forwarded).await?;
    tracing::info!(path = ?plan.run_path.as_ref().map(|p| p.as_str()), "run created");

    let dashboard = match plan.dashboard() {
        Some((port, dir)) => {
            tracing::info!(%port, dir = %dir, "launching dashboard");
            settle(tools.dashboard.launch_dashboard(port, dir).await)?
        }
        None => {
            tracing::debug!("port or run directory unknown, no dashboard");
            StepOutcome::Skipped
        }
    };

    let session = match plan.session_key() {
        Some(key) => attach(tools.sessions, &key, on_missing).await?,
        None => {
            tracing::debug!("no --path=, nothing to attach");
            StepOutcome::Skipped
        }
    };

    Ok(NewRunReport { dashboard, session })
}

async fn attach(
    sessions: &dyn SessionManager,
    key: &SessionKey,
    on_missing: MissingSession,
) -> Result<StepOutcome, ToolError> {
    if on_missing == MissingSession::Skip {
        match sessions.has_session(key).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(session = %key, "no such session, not attaching");
                return Ok(StepOutcome::NoSession);
            }
            Err(e) => return settle(Err(e)),
        }
    }
    tracing::info!(session = %key, "attaching");
    settle(sessions.attach(key).await)
}

// Interrupts abort the whole invocation; anything else only fails the step.
fn settle(res: Result<(), ToolError>) -> Result<StepOutcome, ToolError> {
    match res {
        Ok(()) => Ok(StepOutcome::Done),
        Err(e) if e.is_interrupt() => Err(e),
        Err(e) => {
            tracing::warn!(tool = %e.tool(), error = %e, "step failed");
            Ok(StepOutcome::Failed(e))
        }
    }
}
