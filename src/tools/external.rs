use super::template::{CommandLine, CommandTemplate, Value, LIST_PLACEHOLDER};
use super::{
    CrawlTool, DashboardLauncher, DirectoryResolver, DirectoryValidator, ProcessRunner,
    RunRegistry, SessionManager, Tool,
};
use crate::config::ToolsConfig;
use crate::error::{Error, ToolError};
use crate::model::{CrawlTarget, MetricTag, Port, RunDir, SessionKey};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Collaborators backed by real programs, as configured.
#[derive(Debug, Clone)]
pub struct ExternalTools {
    templates: ToolsConfig,
    runner: ProcessRunner,
}

impl ExternalTools {
    pub fn new(templates: ToolsConfig, runner: ProcessRunner) -> Self {
        Self { templates, runner }
    }

    pub fn registry_command(&self, args: &[String]) -> Result<CommandLine, ToolError> {
        expand(
            Tool::RunRegistry,
            &self.templates.run_registry,
            &[(LIST_PLACEHOLDER, Value::List(args))],
        )
    }

    pub fn dashboard_command(&self, port: &Port, dir: &RunDir) -> Result<CommandLine, ToolError> {
        expand(
            Tool::Dashboard,
            &self.templates.dashboard,
            &[("port", Value::Text(port.as_str())), ("dir", Value::Text(dir.as_str()))],
        )
    }

    pub fn probe_command(&self, key: &SessionKey) -> Result<CommandLine, ToolError> {
        expand(
            Tool::Session,
            &self.templates.session_probe,
            &[("path", Value::Text(key.as_str()))],
        )
    }

    pub fn attach_command(&self, key: &SessionKey) -> Result<CommandLine, ToolError> {
        expand(
            Tool::Session,
            &self.templates.session_attach,
            &[("path", Value::Text(key.as_str()))],
        )
    }

    fn resolver_command(&self, selector: &str) -> Result<CommandLine, ToolError> {
        expand(
            Tool::Resolver,
            &self.templates.resolver,
            &[("selector", Value::Text(selector))],
        )
    }

    fn validator_command(&self, dir: &Path) -> Result<CommandLine, ToolError> {
        let dir = dir.to_string_lossy();
        expand(
            Tool::Validator,
            &self.templates.validator,
            &[("dir", Value::Text(&dir))],
        )
    }
}

fn expand(
    tool: Tool,
    template: &CommandTemplate,
    bindings: &[(&str, Value<'_>)],
) -> Result<CommandLine, ToolError> {
    template
        .expand(bindings)
        .map_err(|source| ToolError::Template { tool, source })
}

#[async_trait]
impl RunRegistry for ExternalTools {
    async fn create_run(&self, args: &[String]) -> Result<(), ToolError> {
        let cmd = self.registry_command(args)?;
        self.runner.run(Tool::RunRegistry, &cmd).await
    }
}

#[async_trait]
impl DashboardLauncher for ExternalTools {
    async fn launch_dashboard(&self, port: &Port, dir: &RunDir) -> Result<(), ToolError> {
        let cmd = self.dashboard_command(port, dir)?;
        self.runner.run(Tool::Dashboard, &cmd).await
    }
}

#[async_trait]
impl SessionManager for ExternalTools {
    async fn has_session(&self, key: &SessionKey) -> Result<bool, ToolError> {
        let cmd = self.probe_command(key)?;
        self.runner.probe(Tool::Session, &cmd).await
    }

    async fn attach(&self, key: &SessionKey) -> Result<(), ToolError> {
        let cmd = self.attach_command(key)?;
        self.runner.run(Tool::Session, &cmd).await
    }
}

#[async_trait]
impl DirectoryResolver for ExternalTools {
    async fn resolve(&self, selector: &str) -> Result<PathBuf, Error> {
        let cmd = self.resolver_command(selector)?;
        match self.runner.capture(Tool::Resolver, &cmd).await {
            Ok(stdout) => parse_resolved(selector, &stdout),
            Err(e @ ToolError::Exit { .. }) => Err(Error::Resolution {
                selector: selector.to_string(),
                reason: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DirectoryValidator for ExternalTools {
    async fn validate(&self, dir: &Path) -> Result<(), Error> {
        let cmd = self.validator_command(dir)?;
        match self.runner.run(Tool::Validator, &cmd).await {
            Ok(()) => Ok(()),
            Err(e @ ToolError::Exit { .. }) => Err(Error::Validation {
                dir: dir.to_path_buf(),
                reason: e.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CrawlTool for ExternalTools {
    fn crawl_command(&self, target: &CrawlTarget, tag: &MetricTag) -> Result<CommandLine, ToolError> {
        let dir = target.as_path().to_string_lossy();
        expand(
            Tool::Crawl,
            &self.templates.crawl,
            &[("dir", Value::Text(&dir)), ("tag", Value::Quoted(tag.as_str()))],
        )
    }

    async fn crawl(&self, cmd: &CommandLine) -> Result<(), ToolError> {
        self.runner.run(Tool::Crawl, cmd).await
    }
}

/// The resolver must print exactly one absolute directory.
fn parse_resolved(selector: &str, stdout: &str) -> Result<PathBuf, Error> {
    let reject = |reason: &str| Error::Resolution {
        selector: selector.to_string(),
        reason: reason.to_string(),
    };

    let mut lines = stdout.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return Err(reject("resolver printed nothing"));
    };
    if lines.next().is_some() {
        return Err(reject("resolver printed more than one directory"));
    }
    let path = PathBuf::from(first);
    if !path.is_absolute() {
        return Err(reject("resolver printed a relative path"));
    }
    Ok(path)
}
