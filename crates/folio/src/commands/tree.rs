//! `folio tree` command implementation.

use clap::Args;

use super::ContentArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args, Debug)]
pub(crate) struct TreeArgs {
    #[command(flatten)]
    content: ContentArgs,

    /// Print the temporal (year/month) tree instead of the topical one.
    #[arg(short, long)]
    temporal: bool,
}

impl TreeArgs {
    /// Print the serialized navigation tree.
    pub(crate) fn execute(&self) -> Result<(), CliError> {
        let output = Output::new();
        let blog = self.content.open_blog()?;
        blog.check_and_refresh()?;

        let snapshot = blog.snapshot();
        let tree = if self.temporal {
            &snapshot.temporal
        } else {
            &snapshot.topical
        };
        output.data(&tree.to_serializable());
        Ok(())
    }
}
