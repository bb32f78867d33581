//! Path helpers for slash-separated page locations.

/// Compute a relative path from one page location to another (RFC 3986).
///
/// Both arguments are slash-separated paths without a leading slash. The last
/// segment of `from` is the current document, so the base directory is
/// everything before it.
///
/// # Examples
///
/// ```
/// use docbridge_core::relative_path;
///
/// assert_eq!(relative_path("core/01_a.md", "core/02_b.md"), "02_b.md");
/// assert_eq!(relative_path("core/01_a.md", "net/03_c.md"), "../net/03_c.md");
/// assert_eq!(relative_path("01_a.md", "core/events/01_e.md"), "core/events/01_e.md");
/// ```
pub fn relative_path(from: &str, to: &str) -> String {
    let from_segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    // Trailing slash means the document is empty and all segments are the directory.
    let from_dir = if from.ends_with('/') || from_segs.is_empty() {
        &from_segs[..]
    } else {
        &from_segs[..from_segs.len() - 1]
    };

    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = "../".repeat(from_dir.len() - common);
    let result = format!("{ups}{}", to_segs[common..].join("/"));
    if result.is_empty() {
        "./".to_owned()
    } else {
        result
    }
}

/// Resolve a relative reference against the directory of `base`.
///
/// Returns `None` when the reference climbs above the root.
pub(crate) fn join_relative(base: &str, reference: &str) -> Option<String> {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();

    for segment in reference.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    Some(segments.join("/"))
}

/// Whether `href` starts with a URI scheme such as `https:` or `mailto:`.
pub(crate) fn has_scheme(href: &str) -> bool {
    let Some((scheme, _)) = href.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_sibling_category() {
        assert_eq!(
            relative_path("foo-category/01_class_foo.md", "bar-category/03_class_bar.md"),
            "../bar-category/03_class_bar.md"
        );
    }

    #[test]
    fn test_relative_path_same_directory() {
        assert_eq!(relative_path("core/01_a.md", "core/01_a.md"), "01_a.md");
    }

    #[test]
    fn test_relative_path_deep_to_shallow() {
        assert_eq!(
            relative_path("cloudmouse/hardware/02_led.md", "01_index.md"),
            "../../01_index.md"
        );
    }

    #[test]
    fn test_relative_path_empty_target() {
        assert_eq!(relative_path("a/b", ""), "../");
        assert_eq!(relative_path("", ""), "./");
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(
            join_relative("hardware/led.html", "../core/bus.html").as_deref(),
            Some("core/bus.html")
        );
        assert_eq!(
            join_relative("led.html", "./bus.html").as_deref(),
            Some("bus.html")
        );
        assert_eq!(join_relative("led.html", "../bus.html"), None);
    }

    #[test]
    fn test_has_scheme() {
        assert!(has_scheme("https://example.com"));
        assert!(has_scheme("mailto:dev@example.com"));
        assert!(has_scheme("cms://page/3"));
        assert!(!has_scheme("class_bar.html#method"));
        assert!(!has_scheme("dir/file.html"));
        assert!(!has_scheme("1abc:x"));
        assert!(!has_scheme("a b:c"));
    }
}
