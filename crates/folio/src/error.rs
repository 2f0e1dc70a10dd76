//! CLI error types.

use folio_config::ConfigError;
use folio_site::RefreshError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Refresh(#[from] RefreshError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
