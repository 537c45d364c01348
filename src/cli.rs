use crate::config::{Config, MissingSession};
use crate::error::Error;
use crate::model::{MetricTag, RunPlan};
use crate::orchestrator::{self, CrawlTools, NewRunTools};
use crate::tools::template::CommandLine;
use crate::tools::{ExternalTools, ProcessRunner, Tool};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "runctl",
    version,
    about = "Create training runs, launch their dashboards and crawl their logs"
)]
pub struct Cli {
    /// Config file [default: <config dir>/runctl/config.toml when present]
    #[arg(long, env = "RUNCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print what would run instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Create a run, launch a dashboard for its family and attach its session
    NewRun {
        /// Optional leading port, then arguments for the run registry (one of them `--path=<dir>`)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Resolve a run, validate its directory and crawl its logs for a metric tag
    Crawl {
        /// Run identifier or partial path understood by the resolver
        selector: String,
        /// Metric tag [default: crawl.default_tag, "eval_rewards" unless configured]
        #[arg(allow_hyphen_values = true)]
        tag: Option<String>,
    },
    /// Print the effective configuration as TOML
    Config,
}

/// Run the selected subcommand and return the process exit status.
pub async fn run(args: Cli) -> Result<i32> {
    let cfg = Config::load(args.config.as_deref()).map_err(Error::from)?;

    match args.command {
        Command::NewRun { args: raw } => run_new(&cfg, &raw, args.dry_run).await,
        Command::Crawl { selector, tag } => run_crawl(&cfg, &selector, tag, args.dry_run).await,
        Command::Config => {
            let text = toml::to_string_pretty(&cfg).context("failed to serialize config")?;
            print!("{text}");
            Ok(0)
        }
    }
}

fn external_tools(cfg: &Config) -> ExternalTools {
    ExternalTools::new(cfg.tools.clone(), ProcessRunner::new(cfg.interrupt_grace))
}

async fn run_new(cfg: &Config, raw: &[String], dry_run: bool) -> Result<i32> {
    let plan = crate::run_args::parse_run_args(raw).map_err(Error::from)?;
    let tools = external_tools(cfg);

    if dry_run {
        let out = serde_json::to_string_pretty(&plan_steps(&plan, &tools, cfg.session.on_missing)?)?;
        println!("{out}");
        return Ok(0);
    }

    let report = orchestrator::run_new_session(
        &plan,
        &NewRunTools {
            registry: &tools,
            dashboard: &tools,
            sessions: &tools,
        },
        cfg.session.on_missing,
    )
    .await
    .map_err(Error::from)?;

    for line in crate::report::build_step_summary(&plan, &report).lines {
        eprintln!("{line}");
    }
    Ok(report.exit_code())
}

async fn run_crawl(cfg: &Config, selector: &str, tag: Option<String>, dry_run: bool) -> Result<i32> {
    let tag = MetricTag::new(tag.unwrap_or_else(|| cfg.crawl.default_tag.clone()));
    let tools = external_tools(cfg);
    let mut stdout = std::io::stdout();

    orchestrator::crawl_logs(
        selector,
        &tag,
        &CrawlTools {
            resolver: &tools,
            validator: &tools,
            crawler: &tools,
        },
        &mut stdout,
        !dry_run,
    )
    .await?;
    Ok(0)
}

/// `--dry-run` output for `new-run`.
#[derive(Debug, Serialize)]
struct DryRun<'a> {
    plan: &'a RunPlan,
    steps: Vec<PlannedStep>,
}

#[derive(Debug, Serialize)]
struct PlannedStep {
    tool: Tool,
    command: CommandLine,
}

fn plan_steps<'a>(
    plan: &'a RunPlan,
    tools: &ExternalTools,
    on_missing: MissingSession,
) -> Result<DryRun<'a>, Error> {
    let mut steps = vec![PlannedStep {
        tool: Tool::RunRegistry,
        command: tools.registry_command(&plan.forwarded)?,
    }];
    if let Some((port, dir)) = plan.dashboard() {
        steps.push(PlannedStep {
            tool: Tool::Dashboard,
            command: tools.dashboard_command(port, dir)?,
        });
    }
    if let Some(key) = plan.session_key() {
        if on_missing == MissingSession::Skip {
            steps.push(PlannedStep {
                tool: Tool::Session,
                command: tools.probe_command(&key)?,
            });
        }
        steps.push(PlannedStep {
            tool: Tool::Session,
            command: tools.attach_command(&key)?,
        });
    }
    Ok(DryRun { plan, steps })
}
