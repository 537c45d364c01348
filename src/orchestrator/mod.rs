//! Application-level orchestration.
//!
//! `new_run` sequences run creation, dashboard launch and session attach;
//! `crawl` sequences resolution, validation and the crawl itself. Both talk to
//! collaborators only through the traits in `crate::tools`, and the CLI layer
//! wires in the real implementations.

mod crawl;
mod new_run;

pub(crate) use crawl::{crawl_logs, CrawlTools};
pub(crate) use new_run::{run_new_session, NewRunReport, NewRunTools, StepOutcome};
