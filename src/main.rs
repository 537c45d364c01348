mod cli;
mod config;
mod error;
mod model;
mod orchestrator;
mod report;
mod run_args;
mod tools;

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    let code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("runctl: {e:#}");
            exit_code(&e)
        }
    };
    std::process::exit(code);
}

/// Logs go to stderr; `RUST_LOG` overrides the `-v` level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("runctl={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn exit_code(e: &anyhow::Error) -> i32 {
    e.chain()
        .find_map(|cause| cause.downcast_ref::<error::Error>())
        .map_or(1, error::Error::exit_code)
}
