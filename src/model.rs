use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Metric series crawled when the caller does not name one.
pub const DEFAULT_METRIC_TAG: &str = "eval_rewards";

/// Dashboard listening port, taken verbatim from an all-digit first argument.
///
/// No range check: an unusable number is the dashboard launcher's to reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Port(String);

impl Port {
    /// `None` unless `digits` is a non-empty run of ASCII digits.
    pub fn from_digits(digits: &str) -> Option<Self> {
        is_all_digits(digits).then(|| Self(digits.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Value of the `--path=` argument: where a run's artifacts live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunPath(String);

impl RunPath {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Family directory shared by numbered sibling runs.
    ///
    /// `/runs/exp/3` belongs to `/runs/exp`; any path whose last segment is
    /// not a plain integer is its own family.
    pub fn family(&self) -> RunDir {
        match self.0.rsplit_once('/') {
            Some((parent, last)) if !parent.is_empty() && is_all_digits(last) => {
                RunDir(parent.to_string())
            }
            _ => RunDir(self.0.clone()),
        }
    }

    /// Persistent terminal sessions are keyed by the run path itself.
    pub fn session_key(&self) -> SessionKey {
        SessionKey(self.0.clone())
    }
}

impl fmt::Display for RunPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Run family directory, always a prefix of its [`RunPath`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunDir(String);

impl RunDir {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricTag(String);

impl MetricTag {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MetricTag {
    fn default() -> Self {
        Self(DEFAULT_METRIC_TAG.to_string())
    }
}

impl fmt::Display for MetricTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A directory that the validator accepted. Only the crawl orchestrator
/// constructs these, after validation succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlTarget(PathBuf);

impl CrawlTarget {
    pub(crate) fn validated(dir: PathBuf) -> Self {
        Self(dir)
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

/// Everything `new-run` derived from its argument list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub port: Option<Port>,
    /// Arguments handed to the run registry, in order.
    pub forwarded: Vec<String>,
    pub run_path: Option<RunPath>,
    pub run_dir: Option<RunDir>,
}

impl RunPlan {
    /// Port and family directory, when both are known.
    pub fn dashboard(&self) -> Option<(&Port, &RunDir)> {
        match (self.port.as_ref(), self.run_dir.as_ref()) {
            (Some(port), Some(dir)) => Some((port, dir)),
            _ => None,
        }
    }

    pub fn session_key(&self) -> Option<SessionKey> {
        self.run_path.as_ref().map(RunPath::session_key)
    }
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
