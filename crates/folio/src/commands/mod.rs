//! CLI command implementations.

pub(crate) mod refresh;
pub(crate) mod show;
pub(crate) mod tree;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::TimeDelta;
use clap::Args;
use folio_config::{CliSettings, Config};
use folio_ingest::{Layout, Limits};
use folio_site::{Blog, BlogConfig};
use folio_storage_fs::FsStorage;

use crate::error::CliError;

pub(crate) use refresh::RefreshArgs;
pub(crate) use show::ShowArgs;
pub(crate) use tree::TreeArgs;

/// Query sent to [`Blog::resolve`] to select the temporal tree.
pub(crate) fn temporal_query(temporal: bool) -> Vec<(String, String)> {
    if temporal {
        vec![("temp".to_owned(), String::new())]
    } else {
        Vec::new()
    }
}

/// Options shared by every command for locating content.
#[derive(Args, Debug)]
pub(crate) struct ContentArgs {
    /// Path to configuration file (default: auto-discover folio.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content root directory (overrides config).
    #[arg(short, long, env = "FOLIO_ROOT")]
    root_dir: Option<PathBuf>,
}

impl ContentArgs {
    /// Load configuration and build a [`Blog`] over the local filesystem.
    pub(crate) fn open_blog(&self) -> Result<Blog, CliError> {
        let cli_settings = CliSettings {
            root_dir: self.root_dir.clone(),
            interval_secs: None,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::info!(
            root = %config.content_resolved.root_dir.display(),
            config = ?config.config_path,
            "Loaded configuration"
        );

        Ok(Blog::new(Arc::new(FsStorage::new()), blog_config(&config)))
    }
}

/// Translate file configuration into [`BlogConfig`].
fn blog_config(config: &Config) -> BlogConfig {
    let layout = Layout::new(
        config.content_resolved.root_dir.clone(),
        config.layout.app_prefix.clone(),
    );
    BlogConfig {
        layout,
        limits: Limits {
            max_script_bytes: config.limits.max_script_bytes,
            max_document_bytes: config.limits.max_document_bytes,
        },
        refresh_interval: TimeDelta::from_std(config.refresh.interval())
            .unwrap_or(TimeDelta::MAX),
    }
}
