//! Child-process execution shared by every collaborator.
//!
//! Children run one at a time. While waiting, Ctrl-C is caught. A child still
//! running shortly afterwards gets SIGINT forwarded, and whatever is left when
//! `grace` runs out is killed.

use super::template::CommandLine;
use super::Tool;
use crate::error::ToolError;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

/// How long an interrupted child may take to exit on its own before SIGINT is
/// forwarded. A terminal Ctrl-C already reaches it through the process group.
const FORWARD_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    /// Child shares our stdin/stdout/stderr (interactive tools).
    Inherit,
    /// Stdout is captured; stderr still reaches the terminal.
    Capture,
    /// Stdout and stderr are discarded; only the exit status matters.
    Quiet,
}

#[derive(Debug, Clone)]
pub struct ProcessRunner {
    grace: Duration,
}

impl ProcessRunner {
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    /// Run to completion with inherited stdio; non-zero exit is an error.
    pub async fn run(&self, tool: Tool, cmd: &CommandLine) -> Result<(), ToolError> {
        let (status, _) = self.execute(tool, cmd, Output::Inherit).await?;
        check(tool, status)
    }

    /// Run and return raw stdout; non-zero exit is an error.
    pub async fn capture(&self, tool: Tool, cmd: &CommandLine) -> Result<String, ToolError> {
        let (status, stdout) = self.execute(tool, cmd, Output::Capture).await?;
        check(tool, status)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    /// Run silently and report whether it exited 0.
    pub async fn probe(&self, tool: Tool, cmd: &CommandLine) -> Result<bool, ToolError> {
        let (status, _) = self.execute(tool, cmd, Output::Quiet).await?;
        match check(tool, status) {
            Ok(()) => Ok(true),
            Err(ToolError::Exit { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn execute(
        &self,
        tool: Tool,
        cmd: &CommandLine,
        output: Output,
    ) -> Result<(ExitStatus, Vec<u8>), ToolError> {
        tracing::debug!(%tool, command = %cmd, "spawning");

        let mut command = Command::new(cmd.program());
        command.args(cmd.args());
        match output {
            Output::Inherit => {}
            Output::Capture => {
                command.stdout(Stdio::piped());
            }
            Output::Quiet => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        let mut child = command.spawn().map_err(|source| ToolError::Spawn {
            tool,
            program: cmd.program().to_string(),
            source,
        })?;

        let finished = {
            let collect = collect(&mut child);
            tokio::pin!(collect);
            tokio::select! {
                res = &mut collect => Some(res),
                _ = tokio::signal::ctrl_c() => None,
            }
        };

        match finished {
            Some(res) => res.map_err(|source| ToolError::Wait { tool, source }),
            None => {
                self.interrupt(tool, &mut child).await;
                Err(ToolError::Interrupted { tool })
            }
        }
    }

    async fn interrupt(&self, tool: Tool, child: &mut Child) {
        tracing::warn!(%tool, "interrupted, stopping child");
        let delay = FORWARD_DELAY.min(self.grace);
        if tokio::time::timeout(delay, child.wait()).await.is_ok() {
            return;
        }
        forward_sigint(child);
        let remaining = self.grace.saturating_sub(delay);
        if tokio::time::timeout(remaining, child.wait()).await.is_err() {
            tracing::warn!(
                %tool,
                grace = %humantime::format_duration(self.grace),
                "child still running after grace period, killing"
            );
            if let Err(e) = child.kill().await {
                tracing::debug!(%tool, error = %e, "failed to kill child");
            }
        }
    }
}

async fn collect(child: &mut Child) -> std::io::Result<(ExitStatus, Vec<u8>)> {
    let mut stdout = Vec::new();
    if let Some(mut pipe) = child.stdout.take() {
        pipe.read_to_end(&mut stdout).await?;
    }
    let status = child.wait().await?;
    Ok((status, stdout))
}

fn check(tool: Tool, status: ExitStatus) -> Result<(), ToolError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(ToolError::Exit { tool, code });
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(ToolError::Signalled { tool, signal });
        }
    }
    Err(ToolError::Exit { tool, code: 1 })
}

#[cfg(unix)]
fn forward_sigint(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGINT) {
        tracing::debug!(pid, error = %e, "failed to forward SIGINT");
    }
}

#[cfg(not(unix))]
fn forward_sigint(_child: &Child) {}

/// Tests that spawn children hold this: a SIGINT raised by one of them wakes
/// every `ctrl_c` listener in the test binary.
#[cfg(test)]
pub(crate) fn child_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
