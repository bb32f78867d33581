//! Environment variable expansion for configuration strings.

use crate::ConfigError;

/// Expand `${VAR}` and `${VAR:-default}` references in a string.
///
/// Strings without a `${` sequence are returned unchanged, so bare `$VAR`
/// text survives as written.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }

    shellexpand::env_with_context(value, |var| -> Result<Option<String>, LookupError> {
        std::env::var(var).map(Some).map_err(|_| LookupError {
            var_name: var.to_owned(),
        })
    })
    .map(std::borrow::Cow::into_owned)
    .map_err(|e| ConfigError::EnvVar {
        field: field.to_owned(),
        message: format!("${{{0}}} not set", e.cause.var_name),
    })
}

/// Variable lookup failure carried through shellexpand.
struct LookupError {
    var_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_store_path() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("DOCBRIDGE_TEST_DATA_DIR", "/var/lib/cms");
        }
        let result = expand_env("${DOCBRIDGE_TEST_DATA_DIR}/site.sqlite", "store.path").unwrap();
        assert_eq!(result, "/var/lib/cms/site.sqlite");
        unsafe {
            std::env::remove_var("DOCBRIDGE_TEST_DATA_DIR");
        }
    }

    #[test]
    fn test_expand_default_when_unset() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("DOCBRIDGE_TEST_UNSET_HOST");
        }
        let result = expand_env(
            "${DOCBRIDGE_TEST_UNSET_HOST:-https://cms.local}",
            "export.service_host",
        )
        .unwrap();
        assert_eq!(result, "https://cms.local");
    }

    #[test]
    fn test_expand_missing_var_reports_field() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::remove_var("DOCBRIDGE_TEST_MISSING");
        }
        let err = expand_env("${DOCBRIDGE_TEST_MISSING}", "store.path").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVar { .. }));
        let message = err.to_string();
        assert!(message.contains("DOCBRIDGE_TEST_MISSING"));
        assert!(message.contains("store.path"));
    }

    #[test]
    fn test_literal_unchanged() {
        assert_eq!(
            expand_env("cms.sqlite", "store.path").unwrap(),
            "cms.sqlite"
        );
        assert_eq!(expand_env("$HOME/db", "store.path").unwrap(), "$HOME/db");
    }
}
