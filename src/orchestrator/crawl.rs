//! Log crawling: resolve, validate, echo, crawl.

use crate::error::Error;
use crate::model::{CrawlTarget, MetricTag};
use crate::tools::template::CommandLine;
use crate::tools::{CrawlTool, DirectoryResolver, DirectoryValidator};
use std::io::Write;

pub(crate) struct CrawlTools<'a> {
    pub resolver: &'a dyn DirectoryResolver,
    pub validator: &'a dyn DirectoryValidator,
    pub crawler: &'a dyn CrawlTool,
}

/// Resolve `selector`, validate the directory, print the crawl command to
/// `out`, then run it unless `execute` is false.
///
/// The crawl tool is never reached for a directory that failed validation.
pub(crate) async fn crawl_logs(
    selector: &str,
    tag: &MetricTag,
    tools: &CrawlTools<'_>,
    out: &mut (dyn Write + Send),
    execute: bool,
) -> Result<CommandLine, Error> {
    let dir = tools.resolver.resolve(selector).await?;
    tracing::debug!(selector, dir = %dir.display(), "resolved");

    tools.validator.validate(&dir).await?;
    let target = CrawlTarget::validated(dir);

    let cmd = tools.crawler.crawl_command(&target, tag)?;
    writeln!(out, "{cmd}")?;
    out.flush()?;

    if execute {
        tools.crawler.crawl(&cmd).await?;
    }
    Ok(cmd)
}
