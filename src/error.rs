//! Error types and their process exit codes.

use crate::config::ConfigError;
use crate::tools::Tool;
use std::path::PathBuf;
use thiserror::Error;

/// Exit status for argument and configuration misuse.
pub const EXIT_USAGE: i32 = 2;
/// Exit status for resolution and validation failures.
pub const EXIT_REJECTED: i32 = 1;
/// Exit status when a collaborator program cannot be started.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit status after Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Misuse of the `new-run` argument list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("--path= given more than once ({first:?}, then {second:?})")]
    DuplicatePath { first: String, second: String },
    #[error("--path= has an empty value")]
    EmptyPath,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("command template is empty")]
    Empty,
    #[error("cannot split command template: {0}")]
    Split(String),
    #[error("unclosed placeholder in {0:?}")]
    Unclosed(String),
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),
    #[error("no value for placeholder {{{0}}}")]
    MissingValue(String),
    #[error("{{args}} must be a whole argument, found {0:?}")]
    EmbeddedList(String),
}

/// Failure of an external collaborator.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{tool}: cannot start `{program}`: {source}")]
    Spawn {
        tool: Tool,
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool}: i/o error while waiting: {source}")]
    Wait {
        tool: Tool,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} exited with status {code}")]
    Exit { tool: Tool, code: i32 },
    #[error("{tool} was killed by signal {signal}")]
    Signalled { tool: Tool, signal: i32 },
    #[error("{tool} interrupted")]
    Interrupted { tool: Tool },
    #[error("{tool}: {source}")]
    Template {
        tool: Tool,
        #[source]
        source: TemplateError,
    },
}

impl ToolError {
    pub fn tool(&self) -> Tool {
        match self {
            ToolError::Spawn { tool, .. }
            | ToolError::Wait { tool, .. }
            | ToolError::Exit { tool, .. }
            | ToolError::Signalled { tool, .. }
            | ToolError::Interrupted { tool }
            | ToolError::Template { tool, .. } => *tool,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            ToolError::Spawn { .. } => EXIT_NOT_FOUND,
            ToolError::Wait { .. } => 1,
            ToolError::Exit { code, .. } => *code,
            ToolError::Signalled { signal, .. } => 128 + signal,
            ToolError::Interrupted { .. } => EXIT_INTERRUPTED,
            ToolError::Template { .. } => EXIT_USAGE,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, ToolError::Interrupted { .. })
    }
}

/// Top-level error for both subcommands.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Arguments(#[from] ArgumentError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("cannot resolve {selector:?}: {reason}")]
    Resolution { selector: String, reason: String },
    #[error("{} failed validation: {reason}", .dir.display())]
    Validation { dir: PathBuf, reason: String },
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Arguments(_) | Error::Config(_) => EXIT_USAGE,
            // Ctrl-C keeps its own status even when it lands in the resolver or validator.
            Error::Tool(e) => e.exit_code(),
            Error::Resolution { .. } | Error::Validation { .. } => EXIT_REJECTED,
            Error::Output(_) => 1,
        }
    }
}
