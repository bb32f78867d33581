//! Configuration management for docbridge.
//!
//! Parses `docbridge.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `store.path`
//! - `export.service_host`

mod expand;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the store database path.
    pub store_path: Option<PathBuf>,
    /// Override the import input directory.
    pub input_dir: Option<PathBuf>,
    /// Override the export output directory.
    pub output_dir: Option<PathBuf>,
    /// Override the root category name.
    pub root_category: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "docbridge.toml";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration (path is a relative string from TOML).
    store: StoreConfigRaw,
    /// Import configuration (paths are relative strings from TOML).
    import: ImportConfigRaw,
    /// Export configuration (paths are relative strings from TOML).
    export: ExportConfigRaw,

    /// Resolved store configuration (set after loading).
    #[serde(skip)]
    pub store_resolved: StoreConfig,
    /// Resolved import configuration (set after loading).
    #[serde(skip)]
    pub import_resolved: ImportConfig,
    /// Resolved export configuration (set after loading).
    #[serde(skip)]
    pub export_resolved: ExportConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw store configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StoreConfigRaw {
    path: Option<String>,
}

/// Resolved store configuration.
#[derive(Debug, Default)]
pub struct StoreConfig {
    /// SQLite database file.
    pub path: PathBuf,
}

/// Raw import configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ImportConfigRaw {
    input_dir: Option<String>,
    root_category: Option<String>,
    default_category: Option<String>,
    index_file: Option<String>,
    code_language: Option<String>,
    categories: Vec<CategoryMapping>,
}

/// Explicit assignment of source pages to a category under the root.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CategoryMapping {
    /// Category display name.
    pub name: String,
    /// Category description stored alongside the category.
    #[serde(default)]
    pub description: Option<String>,
    /// Source file stems placed in this category.
    #[serde(default)]
    pub pages: Vec<String>,
}

/// Resolved import configuration with absolute paths.
#[derive(Debug)]
pub struct ImportConfig {
    /// Directory of generated HTML files.
    pub input_dir: PathBuf,
    /// Name of the pre-existing root category in the store.
    pub root_category: String,
    /// Category used for sources without hierarchy information.
    pub default_category: String,
    /// Listing file providing titles and abstracts (`None` disables it).
    pub index_file: Option<String>,
    /// Language hint attached to converted code fragments.
    pub code_language: Option<String>,
    /// Explicit page to category assignments.
    pub categories: Vec<CategoryMapping>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("html"),
            root_category: "SDK".to_owned(),
            default_category: "Reference".to_owned(),
            index_file: Some("index.html".to_owned()),
            code_language: None,
            categories: Vec::new(),
        }
    }
}

/// Raw export configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ExportConfigRaw {
    output_dir: Option<String>,
    service_host: Option<String>,
}

/// Resolved export configuration with absolute paths.
#[derive(Debug, Default)]
pub struct ExportConfig {
    /// Directory receiving the Markdown tree.
    pub output_dir: PathBuf,
    /// Public CMS host whose absolute links are treated as internal.
    pub service_host: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`store.path`").
        field: String,
        /// Error message (e.g., "${`DOCBRIDGE_DB`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `docbridge.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(path) = &settings.store_path {
            self.store_resolved.path.clone_from(path);
        }
        if let Some(input_dir) = &settings.input_dir {
            self.import_resolved.input_dir.clone_from(input_dir);
        }
        if let Some(output_dir) = &settings.output_dir {
            self.export_resolved.output_dir.clone_from(output_dir);
        }
        if let Some(root) = &settings.root_category {
            self.import_resolved.root_category.clone_from(root);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            store: StoreConfigRaw::default(),
            import: ImportConfigRaw::default(),
            export: ExportConfigRaw::default(),
            store_resolved: StoreConfig {
                path: base.join("docbridge.sqlite"),
            },
            import_resolved: ImportConfig {
                input_dir: base.join("html"),
                ..ImportConfig::default()
            },
            export_resolved: ExportConfig {
                output_dir: base.join("markdown"),
                service_host: None,
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_import()?;
        self.validate_export()?;
        Ok(())
    }

    fn validate_import(&self) -> Result<(), ConfigError> {
        let import = &self.import_resolved;
        require_non_empty(&import.root_category, "import.root_category")?;
        require_non_empty(&import.default_category, "import.default_category")?;

        let mut seen = HashSet::new();
        for mapping in &import.categories {
            require_non_empty(&mapping.name, "import.categories.name")?;
            for page in &mapping.pages {
                if !seen.insert(page.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "page \"{page}\" is mapped to more than one category"
                    )));
                }
            }
        }
        Ok(())
    }

    fn validate_export(&self) -> Result<(), ConfigError> {
        if let Some(ref host) = self.export_resolved.service_host {
            require_non_empty(host, "export.service_host")?;
            require_http_url(host, "export.service_host")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.store.path {
            self.store.path = Some(expand::expand_env(path, "store.path")?);
        }
        if let Some(ref host) = self.export.service_host {
            self.export.service_host = Some(expand::expand_env(host, "export.service_host")?);
        }
        Ok(())
    }

    /// Resolve relative paths against the config directory and fill defaults.
    fn resolve(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));
        let defaults = ImportConfig::default();

        self.store_resolved = StoreConfig {
            path: resolve(self.store.path.as_deref(), "docbridge.sqlite"),
        };

        let import = std::mem::take(&mut self.import);
        self.import_resolved = ImportConfig {
            input_dir: resolve(import.input_dir.as_deref(), "html"),
            root_category: import.root_category.unwrap_or(defaults.root_category),
            default_category: import.default_category.unwrap_or(defaults.default_category),
            index_file: match import.index_file {
                Some(name) if name.is_empty() => None,
                Some(name) => Some(name),
                None => defaults.index_file,
            },
            code_language: import.code_language.filter(|lang| !lang.is_empty()),
            categories: import.categories,
        };

        self.export_resolved = ExportConfig {
            output_dir: resolve(self.export.output_dir.as_deref(), "markdown"),
            service_host: self.export.service_host.clone(),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn assert_validation_error(config: &Config, expected: &[&str]) {
        let err = config.validate().unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let message = err.to_string();
        for fragment in expected {
            assert!(
                message.contains(fragment),
                "Expected '{fragment}' in error message: {message}"
            );
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(
            config.store_resolved.path,
            PathBuf::from("/test/docbridge.sqlite")
        );
        assert_eq!(config.import_resolved.input_dir, PathBuf::from("/test/html"));
        assert_eq!(config.import_resolved.root_category, "SDK");
        assert_eq!(config.import_resolved.default_category, "Reference");
        assert_eq!(
            config.import_resolved.index_file.as_deref(),
            Some("index.html")
        );
        assert_eq!(
            config.export_resolved.output_dir,
            PathBuf::from("/test/markdown")
        );
        assert!(config.export_resolved.service_host.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let mut config: Config = toml::from_str("").unwrap();
        config.resolve(Path::new("/project"));
        assert_eq!(config.import_resolved.root_category, "SDK");
        assert_eq!(
            config.store_resolved.path,
            PathBuf::from("/project/docbridge.sqlite")
        );
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[store]
path = "cms/site.sqlite"

[import]
input_dir = "docs/html"
root_category = "CloudMouse SDK"
default_category = "Misc"
index_file = "listing.html"
code_language = "cpp"

[[import.categories]]
name = "Core System"
description = "Core SDK components"
pages = ["core", "eventbus"]

[[import.categories]]
name = "Networking"
pages = ["wifimanager"]

[export]
output_dir = "out"
service_host = "https://cms.example.com/"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve(Path::new("/project"));

        assert_eq!(
            config.store_resolved.path,
            PathBuf::from("/project/cms/site.sqlite")
        );
        assert_eq!(
            config.import_resolved.input_dir,
            PathBuf::from("/project/docs/html")
        );
        assert_eq!(config.import_resolved.root_category, "CloudMouse SDK");
        assert_eq!(config.import_resolved.default_category, "Misc");
        assert_eq!(
            config.import_resolved.index_file.as_deref(),
            Some("listing.html")
        );
        assert_eq!(config.import_resolved.code_language.as_deref(), Some("cpp"));
        assert_eq!(
            config.import_resolved.categories,
            vec![
                CategoryMapping {
                    name: "Core System".to_owned(),
                    description: Some("Core SDK components".to_owned()),
                    pages: vec!["core".to_owned(), "eventbus".to_owned()],
                },
                CategoryMapping {
                    name: "Networking".to_owned(),
                    description: None,
                    pages: vec!["wifimanager".to_owned()],
                },
            ]
        );
        assert_eq!(config.export_resolved.output_dir, PathBuf::from("/project/out"));
        assert_eq!(
            config.export_resolved.service_host.as_deref(),
            Some("https://cms.example.com/")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_index_file_disables_listing() {
        let mut config: Config = toml::from_str("[import]\nindex_file = \"\"\n").unwrap();
        config.resolve(Path::new("/project"));
        assert!(config.import_resolved.index_file.is_none());
    }

    #[test]
    fn test_load_from_file_resolves_relative_to_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[import]\ninput_dir = \"generated\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.import_resolved.input_dir, dir.path().join("generated"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/docbridge.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[import\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            input_dir: Some(PathBuf::from("/custom/html")),
            root_category: Some("Docs".to_owned()),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.import_resolved.input_dir,
            PathBuf::from("/custom/html")
        );
        assert_eq!(config.import_resolved.root_category, "Docs");
        // Unchanged
        assert_eq!(
            config.export_resolved.output_dir,
            PathBuf::from("/test/markdown")
        );
    }

    #[test]
    fn test_apply_cli_settings_store_and_output() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            store_path: Some(PathBuf::from("/tmp/cms.sqlite")),
            output_dir: Some(PathBuf::from("/tmp/md")),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.store_resolved.path, PathBuf::from("/tmp/cms.sqlite"));
        assert_eq!(config.export_resolved.output_dir, PathBuf::from("/tmp/md"));
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_root_category_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.import_resolved.root_category = "  ".to_owned();
        assert_validation_error(&config, &["import.root_category", "empty"]);
    }

    #[test]
    fn test_validate_default_category_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.import_resolved.default_category = String::new();
        assert_validation_error(&config, &["import.default_category"]);
    }

    #[test]
    fn test_validate_page_mapped_twice() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.import_resolved.categories = vec![
            CategoryMapping {
                name: "A".to_owned(),
                description: None,
                pages: vec!["core".to_owned()],
            },
            CategoryMapping {
                name: "B".to_owned(),
                description: None,
                pages: vec!["core".to_owned()],
            },
        ];
        assert_validation_error(&config, &["core", "more than one category"]);
    }

    #[test]
    fn test_validate_service_host_invalid_scheme() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.export_resolved.service_host = Some("ftp://cms.example.com".to_owned());
        assert_validation_error(&config, &["service_host", "http"]);
    }

    #[test]
    fn test_validate_service_host_valid() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.export_resolved.service_host = Some("https://cms.example.com/".to_owned());
        assert!(config.validate().is_ok());
    }
}
