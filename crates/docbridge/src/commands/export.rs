//! `docbridge export` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use docbridge_config::{CliSettings, Config};
use docbridge_core::{ExportReport, Exporter};

use super::{export_options, open_existing_store};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the export command.
#[derive(Args)]
pub(crate) struct ExportArgs {
    /// Directory receiving the Markdown tree (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Root category name (overrides config).
    #[arg(long)]
    root: Option<String>,

    /// Store database path (overrides config).
    #[arg(long)]
    store: Option<PathBuf>,
}

impl ExportArgs {
    /// Execute the export command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the store is missing, or the
    /// export cannot start.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let cli_settings = CliSettings {
            store_path: self.store,
            output_dir: self.output,
            root_category: self.root,
            ..Default::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;
        let store = open_existing_store(&config)?;

        let options = export_options(&config);
        output.info(&format!(
            "Exporting \"{}\" to {}",
            options.root_category,
            options.output_dir.display()
        ));
        let report = Exporter::new(&store, options).run()?;

        print_export_report(&output, &report);
        Ok(())
    }
}

fn print_export_report(output: &Output, report: &ExportReport) {
    output.info(&format!("\nFiles written: {}", report.written.len()));
    output.issues("Failed pages", &report.failed);
    output.issues("Links degraded to text", &report.unresolved_links);

    if report.failed.is_empty() && report.unresolved_links.is_empty() {
        output.success("\nExport completed.");
    } else {
        output.warning("\nExport completed with issues.");
    }
}
