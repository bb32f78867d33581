//! `docbridge import` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use docbridge_config::{CliSettings, Config};
use docbridge_core::{ImportReport, Importer};

use super::{import_options, open_existing_store};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the import command.
#[derive(Args)]
pub(crate) struct ImportArgs {
    /// Directory of generated HTML (overrides config).
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Root category name (overrides config).
    #[arg(long)]
    root: Option<String>,

    /// Store database path (overrides config).
    #[arg(long)]
    store: Option<PathBuf>,

    /// Run the whole import and roll it back.
    #[arg(long)]
    dry_run: bool,
}

impl ImportArgs {
    /// Execute the import command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the store is missing, or the
    /// import cannot start.
    pub(crate) fn execute(self, config_path: Option<&Path>) -> Result<(), CliError> {
        let output = Output::new();
        let cli_settings = CliSettings {
            store_path: self.store,
            input_dir: self.input,
            root_category: self.root,
            ..Default::default()
        };
        let config = Config::load(config_path, Some(&cli_settings))?;
        let store = open_existing_store(&config)?;

        let options = import_options(&config.import_resolved, self.dry_run);
        output.info(&format!(
            "Importing {} into \"{}\"",
            options.input_dir.display(),
            options.root_category
        ));
        let report = Importer::new(&store, options).run()?;

        print_import_report(&output, &report);
        Ok(())
    }
}

fn print_import_report(output: &Output, report: &ImportReport) {
    if report.dry_run {
        output.highlight("\n[DRY RUN] All changes rolled back.");
    }
    output.info(&format!(
        "\nPages: {} processed ({} created, {} updated)",
        report.processed.len(),
        report.pages_created,
        report.pages_updated
    ));
    output.info(&format!("Categories created: {}", report.categories_created));

    output.issues("Skipped documents", &report.skipped);
    output.issues("Failed pages", &report.failed);
    output.issues("Links degraded to text", &report.unresolved_links);

    if report.is_clean() {
        output.success("\nImport completed.");
    } else {
        output.warning("\nImport completed with issues.");
    }
}
