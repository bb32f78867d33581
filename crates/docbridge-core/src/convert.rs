//! Store-free conversions.
//!
//! [`convert_file`] and [`convert_dir`] turn raw HTML into Markdown with the
//! exporter's body conversion; links are passed through unchanged.
//! [`clean_directory`] normalizes a generated directory into cleaned HTML
//! pages plus an `index.html` listing that [`crate::parse_index`] reads back.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::html::{escape_attr, escape_text};
use crate::markdown;
use crate::normalizer::Normalizer;
use crate::page::Page;
use crate::report::{ConvertReport, PageIssue};
use crate::scan::scan_html;

/// Name of the listing written by [`clean_directory`].
pub const INDEX_FILE: &str = "index.html";

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

fn require_dir(dir: &Path) -> Result<(), Error> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "input directory {} does not exist",
            dir.display()
        )))
    }
}

/// Convert one HTML file to Markdown.
///
/// # Errors
///
/// Returns [`Error::Io`] if the input cannot be read as UTF-8 or the output
/// cannot be written.
pub fn convert_file(input: &Path, output: &Path) -> Result<(), Error> {
    let html = fs::read_to_string(input).map_err(|e| Error::io(input, e))?;
    let mut markdown = markdown::convert(&html);
    markdown.push('\n');
    write_file(output, &markdown)?;
    tracing::debug!(input = %input.display(), output = %output.display(), "Converted file");
    Ok(())
}

/// Convert every HTML file under `input` into a mirrored `.md` tree.
///
/// Files that fail are reported as skipped.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `input` is not a directory.
pub fn convert_dir(input: &Path, output: &Path) -> Result<ConvertReport, Error> {
    require_dir(input)?;
    let files = scan_html(input);
    tracing::info!(files = files.len(), input = %input.display(), "Converting directory");

    let mut report = ConvertReport::default();
    for file in files {
        let target = output.join(Path::new(&file).with_extension("md"));
        match convert_file(&input.join(&file), &target) {
            Ok(()) => report.written.push(target),
            Err(err) => {
                tracing::warn!(file, error = %err, "Skipping file");
                report.skipped.push(PageIssue {
                    source: file,
                    reason: err.to_string(),
                });
            }
        }
    }
    Ok(report)
}

/// Normalize a generated directory into cleaned HTML pages.
///
/// Each page is written to `{category names}/{uri}.html` under `output`, and
/// an [`INDEX_FILE`] listing with every page's title and abstract is written
/// at the root. Malformed documents and pages that would overwrite an
/// earlier one are reported as skipped.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `input` is not a directory and
/// [`Error::Io`] if the listing cannot be written.
pub fn clean_directory(
    input: &Path,
    output: &Path,
    normalizer: &Normalizer,
) -> Result<ConvertReport, Error> {
    require_dir(input)?;
    let files = scan_html(input);
    tracing::info!(files = files.len(), input = %input.display(), "Cleaning directory");

    let mut report = ConvertReport::default();
    let mut listed: Vec<(String, Page)> = Vec::new();

    for file in files {
        let path = input.join(&file);
        let normalized = fs::read(&path)
            .map_err(|e| Error::io(&path, e))
            .and_then(|raw| normalizer.normalize(&raw, &file));
        let page = match normalized {
            Ok(mut normalized) => {
                normalized.restore_lead();
                normalized.page
            }
            Err(err) => {
                tracing::warn!(file, error = %err, "Skipping document");
                report.skipped.push(PageIssue {
                    source: file,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let mut relative = page.category_path.join("/");
        relative.push('/');
        relative.push_str(&page.uri);
        relative.push_str(".html");
        if listed.iter().any(|(existing, _)| *existing == relative) {
            report.skipped.push(PageIssue {
                source: file,
                reason: format!("duplicate output {relative}"),
            });
            continue;
        }

        let target = output.join(&relative);
        match write_file(&target, &cleaned_document(&page)) {
            Ok(()) => {
                report.written.push(target);
                listed.push((relative, page));
            }
            Err(err) => report.skipped.push(PageIssue {
                source: file,
                reason: err.to_string(),
            }),
        }
    }

    listed.sort_by(|(a, _), (b, _)| a.cmp(b));
    let index_path: PathBuf = output.join(INDEX_FILE);
    write_file(&index_path, &index_listing(&listed))?;
    report.written.push(index_path);
    Ok(report)
}

fn cleaned_document(page: &Page) -> String {
    let mut title = String::new();
    escape_text(&page.title, &mut title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n</head>\n\
         <body>\n<div class=\"contents\">\n<h1>{title}</h1>\n{}\n</div>\n</body>\n</html>\n",
        page.body
    )
}

fn index_listing(pages: &[(String, Page)]) -> String {
    let mut out = String::from("<!DOCTYPE html>\n<html>\n<body>\n<ul>\n");
    for (relative, page) in pages {
        out.push_str("<li><a href=\"");
        escape_attr(relative, &mut out);
        out.push_str("\">");
        escape_text(&page.title, &mut out);
        out.push_str("</a>");
        if !page.abstract_text.is_empty() {
            out.push_str(" - ");
            escape_text(&page.abstract_text, &mut out);
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n</body>\n</html>\n");
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::importer::parse_index;

    const DOXYGEN_PAGE: &str = r#"<html><head><script>x()</script></head><body>
<div id="nav-tree"><a href="index.html">Main</a></div>
<div class="header"><div class="title">CloudMouse::Core::EventBus Class Reference</div></div>
<div class="contents"><p>Thread-safe <b>messaging</b> &amp; events.</p>
<div class="fragment"><div class="line">bus.emit(Event::Ready);</div></div></div>
</body></html>"#;

    #[test]
    fn test_convert_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("page.html");
        let output = dir.path().join("out/page.md");
        fs::write(&input, "<h2>Setup</h2><p>Call <code>init()</code>.</p>").unwrap();

        convert_file(&input, &output).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "## Setup\n\nCall `init()`.\n"
        );
    }

    #[test]
    fn test_convert_dir_mirrors_tree() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        fs::create_dir_all(input.join("core")).unwrap();
        fs::write(input.join("a.html"), "<p>A <a href=\"b.html\">b</a></p>").unwrap();
        fs::write(input.join("core/b.html"), "<p>B</p>").unwrap();
        fs::write(input.join("core/bad.html"), [0xff, 0xfe]).unwrap();
        let output = dir.path().join("out");

        let report = convert_dir(&input, &output).unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].source, "core/bad.html");
        assert_eq!(
            fs::read_to_string(output.join("a.md")).unwrap(),
            "A [b](b.html)\n"
        );
        assert!(output.join("core/b.md").is_file());
    }

    #[test]
    fn test_convert_dir_missing_input() {
        let err = convert_dir(Path::new("/nonexistent/in"), Path::new("/tmp/out")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_clean_directory_writes_pages_and_listing() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("html");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("classCloudMouse_1_1Core_1_1EventBus.html"), DOXYGEN_PAGE).unwrap();
        fs::write(input.join("empty.html"), "<html><body></body></html>").unwrap();
        let output = dir.path().join("clean");

        let report = clean_directory(&input, &output, &Normalizer::default()).unwrap();

        assert_eq!(report.skipped.len(), 1);
        let page_path = output.join("CloudMouse/Core/classCloudMouse_1_1Core_1_1EventBus.html");
        let page = fs::read_to_string(&page_path).unwrap();
        assert!(page.contains("<h1>EventBus</h1>"));
        assert!(page.contains("bus.emit(Event::Ready);"));
        assert!(!page.contains("nav-tree"));
        assert!(!page.contains("<script"));

        let listing = fs::read_to_string(output.join(INDEX_FILE)).unwrap();
        let entries = parse_index(&listing);
        let entry = &entries["classCloudMouse_1_1Core_1_1EventBus"];
        assert_eq!(entry.title, "EventBus");
        assert_eq!(entry.abstract_text, "Thread-safe messaging & events.");
    }

    #[test]
    fn test_cleaned_page_normalizes_to_same_page() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("html");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("classCloudMouse_1_1Core_1_1EventBus.html"), DOXYGEN_PAGE).unwrap();
        let output = dir.path().join("clean");
        let normalizer = Normalizer::default();

        clean_directory(&input, &output, &normalizer).unwrap();

        let location = "CloudMouse/Core/classCloudMouse_1_1Core_1_1EventBus.html";
        let raw = fs::read(output.join(location)).unwrap();
        let page = normalizer.normalize(&raw, location).unwrap().page;
        assert_eq!(page.title, "EventBus");
        assert_eq!(page.category_path, vec!["CloudMouse", "Core"]);
        assert_eq!(page.abstract_text, "Thread-safe messaging & events.");
    }
}
