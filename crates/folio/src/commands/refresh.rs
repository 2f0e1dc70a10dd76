//! `folio refresh` command implementation.

use clap::Args;
use folio_site::RefreshOutcome;

use super::ContentArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the refresh command.
#[derive(Args, Debug)]
pub(crate) struct RefreshArgs {
    #[command(flatten)]
    content: ContentArgs,
}

impl RefreshArgs {
    /// Run one ingestion cycle regardless of staleness and print a summary.
    pub(crate) fn execute(&self) -> Result<(), CliError> {
        let output = Output::new();
        let blog = self.content.open_blog()?;

        output.info(&format!(
            "Content root: {}",
            blog.layout().root().display()
        ));

        if let RefreshOutcome::Refreshed { records, modules } = blog.force_refresh()? {
            let snapshot = blog.snapshot();
            output.success(&format!(
                "Applied {records} document change(s) and {modules} script module(s)"
            ));
            output.info(&format!(
                "{} document(s), {} known module(s)",
                snapshot.cache.len(),
                snapshot.cache.known_modules().len()
            ));
            let unpersisted = snapshot.cache.unpersisted().count();
            if unpersisted > 0 {
                output.info(&format!("{unpersisted} document(s) not yet persisted"));
            }
        }
        Ok(())
    }
}
