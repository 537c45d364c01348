//! On-disk configuration: collaborator command templates and policies.

use crate::error::TemplateError;
use crate::model::DEFAULT_METRIC_TAG;
use crate::tools::template::CommandTemplate;
use crate::tools::Tool;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

const CONFIG_DIR: &str = "runctl";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("tools.{key}: {source}")]
    Template {
        key: &'static str,
        #[source]
        source: TemplateError,
    },
    #[error("crawl.default_tag must not be empty")]
    EmptyDefaultTag,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// How long an interrupted child gets to exit before it is killed.
    #[serde(with = "humantime_serde")]
    pub interrupt_grace: Duration,
    pub tools: ToolsConfig,
    pub session: SessionConfig,
    pub crawl: CrawlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interrupt_grace: Duration::from_secs(3),
            tools: ToolsConfig::default(),
            session: SessionConfig::default(),
            crawl: CrawlConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub run_registry: CommandTemplate,
    pub dashboard: CommandTemplate,
    pub session_probe: CommandTemplate,
    pub session_attach: CommandTemplate,
    pub resolver: CommandTemplate,
    pub validator: CommandTemplate,
    pub crawl: CommandTemplate,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            run_registry: builtin("runs new {args}"),
            dashboard: builtin(
                "tmux new-session -d -s tensorboard-{port} tensorboard --port {port} --logdir {dir}",
            ),
            session_probe: builtin("tmux has-session -t {path}"),
            session_attach: builtin("tmux attach-session -t {path}"),
            resolver: builtin("runs lookup path {selector}"),
            validator: builtin("test -d {dir}"),
            crawl: builtin("crawl {dir} --tag={tag}"),
        }
    }
}

fn builtin(template: &str) -> CommandTemplate {
    template
        .parse()
        .expect("built-in command templates are well formed")
}

impl ToolsConfig {
    /// Every template with its config key and the tool it drives.
    pub fn entries(&self) -> [(&'static str, Tool, &CommandTemplate); 7] {
        [
            ("run_registry", Tool::RunRegistry, &self.run_registry),
            ("dashboard", Tool::Dashboard, &self.dashboard),
            ("session_probe", Tool::Session, &self.session_probe),
            ("session_attach", Tool::Session, &self.session_attach),
            ("resolver", Tool::Resolver, &self.resolver),
            ("validator", Tool::Validator, &self.validator),
            ("crawl", Tool::Crawl, &self.crawl),
        ]
    }
}

/// What `new-run` does when the run's session does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSession {
    /// Attach anyway and let the session manager's failure propagate.
    #[default]
    Fail,
    /// Probe first and skip the attach when there is nothing to attach to.
    Skip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub on_missing: MissingSession,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CrawlConfig {
    pub default_tag: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            default_tag: DEFAULT_METRIC_TAG.to_string(),
        }
    }
}

impl Config {
    /// Load from `explicit` if given, else from the user config file if it
    /// exists, else fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_path().filter(|p| p.is_file()),
        };

        let cfg = match path {
            Some(path) => {
                let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                let cfg: Config =
                    toml::from_str(&text).map_err(|source| ConfigError::Parse { path: path.clone(), source })?;
                tracing::debug!(path = %path.display(), "loaded config");
                cfg
            }
            None => {
                tracing::debug!("no config file, using defaults");
                Config::default()
            }
        };

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, tool, template) in self.tools.entries() {
            template
                .check_placeholders(tool.placeholders())
                .map_err(|source| ConfigError::Template { key, source })?;
        }
        if self.crawl.default_tag.is_empty() {
            return Err(ConfigError::EmptyDefaultTag);
        }
        Ok(())
    }
}

/// `<config_dir>/runctl/config.toml`, if the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.interrupt_grace, Duration::from_secs(3));
        assert_eq!(cfg.session.on_missing, MissingSession::Fail);
        assert_eq!(cfg.crawl.default_tag, "eval_rewards");
        assert_eq!(cfg.tools.crawl.as_str(), "crawl {dir} --tag={tag}");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            interrupt_grace = "500ms"

            [tools]
            crawl = "python -m crawl {dir} --tag={tag}"

            [session]
            on_missing = "skip"
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.interrupt_grace, Duration::from_millis(500));
        assert_eq!(cfg.tools.crawl.as_str(), "python -m crawl {dir} --tag={tag}");
        assert_eq!(cfg.tools.validator.as_str(), "test -d {dir}");
        assert_eq!(cfg.session.on_missing, MissingSession::Skip);
    }

    #[test]
    fn foreign_placeholder_is_rejected() {
        let cfg: Config = toml::from_str(
            r#"
            [tools]
            dashboard = "tb {port} {path}"
            "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "tools.dashboard: unknown placeholder {path}");
    }

    #[test]
    fn malformed_template_fails_to_parse() {
        assert!(toml::from_str::<Config>("[tools]\ncrawl = \"\"\n").is_err());
        assert!(toml::from_str::<Config>("[tools]\nbogus = \"x\"\n").is_err());
    }

    #[test]
    fn empty_default_tag_is_rejected() {
        let cfg: Config = toml::from_str("[crawl]\ndefault_tag = \"\"\n").unwrap();
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyDefaultTag)));
    }

    #[test]
    fn serialized_config_round_trips_through_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("interrupt_grace = \"3s\""));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back.tools.dashboard, Config::default().tools.dashboard);
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runctl.toml");
        std::fs::write(&path, "[crawl]\ndefault_tag = \"train_loss\"\n").unwrap();
        let cfg = Config::load(Some(&path)).unwrap();
        assert_eq!(cfg.crawl.default_tag, "train_loss");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/missing/runctl.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
