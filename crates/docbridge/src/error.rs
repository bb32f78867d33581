//! CLI error types.

use docbridge_config::ConfigError;
use docbridge_store::StoreError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Pipeline(#[from] docbridge_core::Error),

    #[error("{0}")]
    Validation(String),
}
