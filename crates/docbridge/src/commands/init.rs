//! `docbridge init` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use docbridge_config::{CliSettings, Config};
use docbridge_store::SqliteStore;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the init command.
#[derive(Args)]
pub(crate) struct InitArgs {
    /// Root category name (overrides config).
    #[arg(long)]
    root: Option<String>,

    /// Store database path (overrides config).
    #[arg(long)]
    store: Option<PathBuf>,
}

impl InitArgs {
    /// Execute the init command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the store cannot be created.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let cli_settings = CliSettings {
            store_path: self.store,
            root_category: self.root,
            ..Default::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;

        let path = &config.store_resolved.path;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CliError::Validation(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let store = SqliteStore::open(path)?;
        let root = store.create_root(&config.import_resolved.root_category)?;

        output.success(&format!(
            "Store ready at {} with root category \"{}\" (id {})",
            path.display(),
            root.name,
            root.id
        ));
        Ok(())
    }
}
