//! `docbridge convert` command implementation.

use std::path::PathBuf;

use clap::Args;
use docbridge_core::{convert_dir, convert_file};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// HTML file or directory.
    input: PathBuf,

    /// Markdown file or directory.
    output: PathBuf,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if the input cannot be read or the output cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        if self.input.is_dir() {
            let report = convert_dir(&self.input, &self.output)?;
            output.success(&format!(
                "Converted {} files into {}",
                report.written.len(),
                self.output.display()
            ));
            output.issues("Skipped files", &report.skipped);
        } else {
            output.info(&format!(
                "Converting {} -> {}",
                self.input.display(),
                self.output.display()
            ));
            convert_file(&self.input, &self.output)?;
            output.success("Done");
        }
        Ok(())
    }
}
