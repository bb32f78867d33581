//! Doxygen naming conventions.

use std::sync::LazyLock;

use regex::Regex;

/// Header titles such as `CloudMouse::Core Class Reference`.
static REFERENCE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>.+?)\s+(?:Class|Struct|Union|Interface|Namespace|File|Module|Enum)\s+(?:Template\s+)?Reference$",
    )
    .expect("invalid reference title regex")
});

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("invalid slug regex"));

/// Compound prefixes Doxygen puts in front of generated file names.
const COMPOUND_PREFIXES: &[&str] = &["class", "struct", "namespace", "union", "interface"];

/// Split a reference header title into its qualified name segments.
///
/// `"CloudMouse::Hardware::LEDManager Class Reference"` yields
/// `["CloudMouse", "Hardware", "LEDManager"]`. Titles that are not reference
/// titles yield `None`.
pub(crate) fn qualified_name(header_title: &str) -> Option<Vec<String>> {
    let caps = REFERENCE_TITLE.captures(header_title.trim())?;
    let segments: Vec<String> = caps["name"]
        .split("::")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .collect();
    (!segments.is_empty()).then_some(segments)
}

/// Simplified alias of a generated file name.
///
/// Strips the compound prefix, the namespace part up to the last `_1_1`,
/// and the `_8h` header suffix, unescapes `__`, lowercases and appends
/// `.html`: `classCloudMouse_1_1Core.html` becomes `core.html`.
pub fn alias(file_name: &str) -> Option<String> {
    let stem = file_name
        .strip_suffix(".html")
        .or_else(|| file_name.strip_suffix(".htm"))?;

    let stem = COMPOUND_PREFIXES
        .iter()
        .find_map(|prefix| {
            let rest = stem.strip_prefix(prefix)?;
            // `class_foo` is a plain name, `class__foo` escapes `class_foo`
            let plain_underscore = rest.starts_with('_') && !rest.starts_with("__");
            (!rest.is_empty() && !plain_underscore).then_some(rest)
        })
        .unwrap_or(stem);
    let stem = stem.rsplit_once("_1_1").map_or(stem, |(_, name)| name);
    let stem = stem.strip_suffix("_8h").unwrap_or(stem);

    let name = stem.replace("__", "_").to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(format!("{name}.html"))
}

/// URL slug of a display name: lowercase, non-alphanumeric runs become `-`.
pub fn slugify(name: &str) -> String {
    NON_SLUG
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_qualified_name_nested() {
        assert_eq!(
            qualified_name("CloudMouse::Hardware::LEDManager Class Reference"),
            Some(vec![
                "CloudMouse".to_owned(),
                "Hardware".to_owned(),
                "LEDManager".to_owned()
            ])
        );
    }

    #[test]
    fn test_qualified_name_template_and_namespace() {
        assert_eq!(
            qualified_name("  Utils::Buffer< T > Class Template Reference "),
            Some(vec!["Utils".to_owned(), "Buffer< T >".to_owned()])
        );
        assert_eq!(
            qualified_name("CloudMouse Namespace Reference"),
            Some(vec!["CloudMouse".to_owned()])
        );
    }

    #[test]
    fn test_qualified_name_plain_title() {
        assert_eq!(qualified_name("Getting Started"), None);
    }

    #[test]
    fn test_alias_compound() {
        assert_eq!(
            alias("classCloudMouse_1_1Core.html").as_deref(),
            Some("core.html")
        );
        assert_eq!(
            alias("structCloudMouse_1_1Hardware_1_1LEDEvent.html").as_deref(),
            Some("ledevent.html")
        );
        assert_eq!(
            alias("namespaceCloudMouse_1_1Network.html").as_deref(),
            Some("network.html")
        );
    }

    #[test]
    fn test_alias_escaped_underscore_and_header() {
        assert_eq!(
            alias("classLGFX__ILI9488.html").as_deref(),
            Some("lgfx_ili9488.html")
        );
        assert_eq!(
            alias("DeviceConfig_8h.html").as_deref(),
            Some("deviceconfig.html")
        );
    }

    #[test]
    fn test_alias_plain_names() {
        assert_eq!(alias("class_bar.html").as_deref(), Some("class_bar.html"));
        assert_eq!(alias("Core.htm").as_deref(), Some("core.html"));
        assert_eq!(alias("class.html").as_deref(), Some("class.html"));
        assert_eq!(alias("image.png"), None);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Core System"), "core-system");
        assert_eq!(slugify("  Hardware / I2C  "), "hardware-i2c");
        assert_eq!(slugify("LGFX_ILI9488"), "lgfx-ili9488");
    }
}
