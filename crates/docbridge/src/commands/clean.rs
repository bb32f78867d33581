//! `docbridge clean` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use docbridge_config::Config;
use docbridge_core::{Normalizer, clean_directory};

use super::normalizer_options;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the clean command.
#[derive(Args)]
pub(crate) struct CleanArgs {
    /// Directory of Doxygen-generated HTML.
    input: PathBuf,

    /// Directory receiving cleaned pages and the index listing.
    output: PathBuf,
}

impl CleanArgs {
    /// Execute the clean command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the input directory is missing.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let config = Config::load(config_path, None)?;
        let normalizer = Normalizer::new(normalizer_options(&config.import_resolved));

        output.info(&format!(
            "Cleaning {} -> {}",
            self.input.display(),
            self.output.display()
        ));
        let report = clean_directory(&self.input, &self.output, &normalizer)?;

        output.success(&format!("\nWrote {} files", report.written.len()));
        output.issues("Skipped documents", &report.skipped);
        Ok(())
    }
}
