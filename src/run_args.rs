//! Typed parse of the `new-run` argument list.
//!
//! The argument list is mostly opaque: it belongs to the run registry and is
//! forwarded untouched. Two things are read out of it: an optional leading
//! port, and the `--path=` value naming the run directory.

use crate::error::ArgumentError;
use crate::model::{Port, RunPath, RunPlan};

const PATH_FLAG: &str = "--path=";

/// Build a [`RunPlan`] from the raw `new-run` arguments.
pub fn parse_run_args(args: &[String]) -> Result<RunPlan, ArgumentError> {
    let (port, forwarded) = match args.split_first() {
        Some((first, rest)) => match Port::from_digits(first) {
            Some(port) => (Some(port), rest.to_vec()),
            None => (None, args.to_vec()),
        },
        None => (None, Vec::new()),
    };

    let run_path = find_run_path(args)?;
    let run_dir = run_path.as_ref().map(RunPath::family);

    Ok(RunPlan {
        port,
        forwarded,
        run_path,
        run_dir,
    })
}

/// Scan the original list for exactly zero or one `--path=` token.
fn find_run_path(args: &[String]) -> Result<Option<RunPath>, ArgumentError> {
    let mut found: Option<RunPath> = None;
    for arg in args {
        let Some(value) = arg.strip_prefix(PATH_FLAG) else {
            continue;
        };
        if value.is_empty() {
            return Err(ArgumentError::EmptyPath);
        }
        if let Some(first) = &found {
            return Err(ArgumentError::DuplicatePath {
                first: first.to_string(),
                second: value.to_string(),
            });
        }
        found = Some(RunPath::new(value));
    }
    Ok(found)
}
