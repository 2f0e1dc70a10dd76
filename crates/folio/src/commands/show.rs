//! `folio show` command implementation.

use clap::Args;
use folio_site::{Document, Resolved};
use serde::Serialize;

use super::{ContentArgs, temporal_query};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the show command.
#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    /// Address to resolve, as it would appear after the app prefix.
    path: String,

    #[command(flatten)]
    content: ContentArgs,

    /// Resolve breadcrumbs against the temporal tree.
    #[arg(short, long)]
    temporal: bool,

    /// Print the resolution as JSON.
    #[arg(long)]
    json: bool,
}

/// JSON view of a resolved address.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowReport<'a> {
    path: &'a str,
    found: bool,
    temporal: bool,
    breadcrumbs: &'a [usize],
    trail: Vec<&'a str>,
    stylesheet_url: Option<&'a str>,
    module_urls: &'a [String],
    document: &'a Document,
}

impl<'a> ShowReport<'a> {
    fn new(path: &'a str, resolved: &'a Resolved) -> Self {
        Self {
            path,
            found: resolved.found,
            temporal: resolved.temporal,
            breadcrumbs: &resolved.breadcrumbs,
            trail: resolved.nav.trail(&resolved.breadcrumbs),
            stylesheet_url: resolved.stylesheet_url.as_deref(),
            module_urls: &resolved.module_urls,
            document: &resolved.document,
        }
    }
}

impl ShowArgs {
    /// Resolve one address and print what would be served.
    pub(crate) fn execute(&self) -> Result<(), CliError> {
        let output = Output::new();
        let blog = self.content.open_blog()?;
        blog.check_and_refresh()?;

        let resolved = blog.resolve(&self.path, &temporal_query(self.temporal));
        let report = ShowReport::new(&self.path, &resolved);

        if self.json {
            output.data(&serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if report.found {
            output.highlight(&self.path);
        } else {
            output.error(&format!("{} not found, serving the not-found page", self.path));
        }
        let doc = report.document;
        output.field("original path", &doc.original_path);
        output.field("modified", &doc.modified_at.to_rfc3339());
        output.field("content bytes", &doc.content.len().to_string());
        output.field("stylesheet", report.stylesheet_url.unwrap_or("-"));
        for url in report.module_urls {
            output.field("module", url);
        }
        output.field(
            "breadcrumbs",
            &format!("{:?} {}", report.breadcrumbs, report.trail.join(" > ")),
        );
        Ok(())
    }
}
