//! Restore command implementation.

use crate::cli::RestoreArgs;
use crate::error::convert_restore_error;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Result;
use cachepull_core::NoopProgress;
use cachepull_core::ReqwestClient;
use cachepull_core::RestoreOutcome;
use cachepull_core::restore_cache_with;
use tracing::debug;

pub fn execute(args: &RestoreArgs, formatter: &dyn OutputFormatter, quiet: bool) -> Result<()> {
    let config = args.to_config();
    if config.cache_source.is_none() {
        return formatter.format_restore_result(&RestoreOutcome::NoCacheSource);
    }

    debug!(strategy = %config.strategy, work_dir = ?config.work_dir, "starting restore");
    let client = ReqwestClient::new().map_err(convert_restore_error)?;

    // Use progress bar if TTY is detected and output is not suppressed
    let outcome = if !quiet && CliProgress::should_show() {
        let mut progress = CliProgress::new("Downloading");
        restore_cache_with(&config, client, &mut progress).map_err(convert_restore_error)?
    } else {
        restore_cache_with(&config, client, &mut NoopProgress).map_err(convert_restore_error)?
    };

    if let Some(report) = outcome.report()
        && !report.placement.is_complete()
    {
        formatter.format_warning(&format!(
            "{} of {} cache items could not be placed",
            report.placement.skipped_count(),
            report.placement.placed_count() + report.placement.skipped_count()
        ));
    }
    formatter.format_restore_result(&outcome)
}
