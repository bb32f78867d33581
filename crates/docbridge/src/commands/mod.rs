//! CLI command implementations.

pub(crate) mod clean;
pub(crate) mod convert;
pub(crate) mod export;
pub(crate) mod import;
pub(crate) mod init;

use docbridge_config::{Config, ImportConfig};
use docbridge_core::{CategoryAssignment, ExportOptions, ImportOptions, NormalizerOptions};
use docbridge_store::SqliteStore;

use crate::error::CliError;

pub(crate) use clean::CleanArgs;
pub(crate) use convert::ConvertArgs;
pub(crate) use export::ExportArgs;
pub(crate) use import::ImportArgs;
pub(crate) use init::InitArgs;

/// Open the configured store, which `docbridge init` must have created.
fn open_existing_store(config: &Config) -> Result<SqliteStore, CliError> {
    let path = &config.store_resolved.path;
    if !path.is_file() {
        return Err(CliError::Validation(format!(
            "store {} does not exist, run `docbridge init` first",
            path.display()
        )));
    }
    Ok(SqliteStore::open(path)?)
}

fn normalizer_options(import: &ImportConfig) -> NormalizerOptions {
    NormalizerOptions {
        default_category: import.default_category.clone(),
        code_language: import.code_language.clone(),
        category_overrides: import
            .categories
            .iter()
            .flat_map(|c| c.pages.iter().map(|page| (page.clone(), c.name.clone())))
            .collect(),
    }
}

fn import_options(import: &ImportConfig, dry_run: bool) -> ImportOptions {
    ImportOptions {
        input_dir: import.input_dir.clone(),
        root_category: import.root_category.clone(),
        default_category: import.default_category.clone(),
        index_file: import.index_file.clone(),
        code_language: import.code_language.clone(),
        categories: import
            .categories
            .iter()
            .map(|c| CategoryAssignment {
                name: c.name.clone(),
                description: c.description.clone(),
                pages: c.pages.clone(),
            })
            .collect(),
        dry_run,
    }
}

fn export_options(config: &Config) -> ExportOptions {
    ExportOptions {
        output_dir: config.export_resolved.output_dir.clone(),
        root_category: config.import_resolved.root_category.clone(),
        service_host: config.export_resolved.service_host.clone(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use docbridge_config::CategoryMapping;
    use docbridge_store::Store;
    use pretty_assertions::assert_eq;

    use super::*;

    fn import_config() -> ImportConfig {
        ImportConfig {
            input_dir: PathBuf::from("/docs/html"),
            code_language: Some("cpp".to_owned()),
            categories: vec![CategoryMapping {
                name: "Core System".to_owned(),
                description: Some("Core SDK components".to_owned()),
                pages: vec!["core".to_owned(), "eventbus".to_owned()],
            }],
            ..ImportConfig::default()
        }
    }

    #[test]
    fn test_import_options_from_config() {
        let options = import_options(&import_config(), true);

        assert_eq!(options.input_dir, PathBuf::from("/docs/html"));
        assert_eq!(options.root_category, "SDK");
        assert_eq!(options.default_category, "Reference");
        assert_eq!(options.index_file.as_deref(), Some("index.html"));
        assert_eq!(options.categories.len(), 1);
        assert_eq!(options.categories[0].pages, vec!["core", "eventbus"]);
        assert!(options.dry_run);
    }

    #[test]
    fn test_normalizer_options_map_pages_to_category() {
        let options = normalizer_options(&import_config());

        assert_eq!(options.code_language.as_deref(), Some("cpp"));
        assert_eq!(
            options.category_overrides.get("eventbus").map(String::as_str),
            Some("Core System")
        );
        assert_eq!(options.category_overrides.len(), 2);
    }

    #[test]
    fn test_open_existing_store_requires_file() {
        let mut config = Config::default();
        config.store_resolved.path = PathBuf::from("/nonexistent/docbridge.sqlite");

        let err = open_existing_store(&config).unwrap_err();

        assert!(err.to_string().contains("docbridge init"));
    }

    #[test]
    fn test_open_existing_store_reopens_initialized_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.store_resolved.path = dir.path().join("docbridge.sqlite");
        SqliteStore::open(&config.store_resolved.path)
            .unwrap()
            .create_root("SDK")
            .unwrap();

        let store = open_existing_store(&config).unwrap();

        let root = store.find_root("SDK").unwrap().unwrap();
        assert_eq!(root.name, "SDK");
        assert_eq!(store.path(), Some(config.store_resolved.path.as_path()));
    }
}
