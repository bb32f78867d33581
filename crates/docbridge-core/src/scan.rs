//! Directory scanning for input and output trees.

use std::fs;
use std::path::Path;

/// Collect files under `root` whose extension is one of `extensions`.
///
/// Returns slash-separated paths relative to `root`, sorted. Hidden files and
/// directories are skipped. A missing or unreadable directory yields nothing.
pub(crate) fn scan_files(root: &Path, extensions: &[&str]) -> Vec<String> {
    let mut files = Vec::new();
    scan_directory(root, "", extensions, &mut files);
    files.sort();
    files
}

fn scan_directory(dir: &Path, prefix: &str, extensions: &[&str], files: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };

    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let relative = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };

        let path = entry.path();
        if entry.file_type().is_ok_and(|t| t.is_dir()) {
            scan_directory(&path, &relative, extensions, files);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        {
            files.push(relative);
        }
    }
}

/// HTML files under `root`.
pub(crate) fn scan_html(root: &Path) -> Vec<String> {
    scan_files(root, &["html", "htm"])
}
