//! Boundary to the external collaborators.
//!
//! Each collaborator is a trait so the orchestrators can be driven by fakes
//! in tests. [`ExternalTools`] implements all of them by expanding the
//! configured command templates and running them through [`ProcessRunner`].

mod external;
mod process;
pub mod template;

pub use external::ExternalTools;
pub use process::ProcessRunner;

use crate::error::{Error, ToolError};
use crate::model::{CrawlTarget, MetricTag, Port, RunDir, SessionKey};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use template::CommandLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    RunRegistry,
    Dashboard,
    Session,
    Resolver,
    Validator,
    Crawl,
}

impl Tool {
    /// Placeholders this tool's templates may use.
    pub fn placeholders(self) -> &'static [&'static str] {
        match self {
            Tool::RunRegistry => &[template::LIST_PLACEHOLDER],
            Tool::Dashboard => &["port", "dir"],
            Tool::Session => &["path"],
            Tool::Resolver => &["selector"],
            Tool::Validator => &["dir"],
            Tool::Crawl => &["dir", "tag"],
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tool::RunRegistry => "run registry",
            Tool::Dashboard => "dashboard launcher",
            Tool::Session => "session manager",
            Tool::Resolver => "directory resolver",
            Tool::Validator => "directory validator",
            Tool::Crawl => "crawl tool",
        })
    }
}

#[async_trait]
pub trait RunRegistry: Send + Sync {
    async fn create_run(&self, args: &[String]) -> Result<(), ToolError>;
}

#[async_trait]
pub trait DashboardLauncher: Send + Sync {
    async fn launch_dashboard(&self, port: &Port, dir: &RunDir) -> Result<(), ToolError>;
}

#[async_trait]
pub trait SessionManager: Send + Sync {
    async fn has_session(&self, key: &SessionKey) -> Result<bool, ToolError>;
    async fn attach(&self, key: &SessionKey) -> Result<(), ToolError>;
}

#[async_trait]
pub trait DirectoryResolver: Send + Sync {
    /// Map a selector to exactly one directory.
    async fn resolve(&self, selector: &str) -> Result<PathBuf, Error>;
}

#[async_trait]
pub trait DirectoryValidator: Send + Sync {
    async fn validate(&self, dir: &Path) -> Result<(), Error>;
}

#[async_trait]
pub trait CrawlTool: Send + Sync {
    /// Build the crawl invocation. Pure: same inputs, same command line.
    fn crawl_command(&self, target: &CrawlTarget, tag: &MetricTag) -> Result<CommandLine, ToolError>;
    async fn crawl(&self, cmd: &CommandLine) -> Result<(), ToolError>;
}
