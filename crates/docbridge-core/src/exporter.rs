//! Export pipeline: stored page graph into a Markdown tree.
//!
//! Every page beneath the root category is written to
//! `{category dirs}/{NN}_{uri}.md`, where `NN` is the page's 1-based position
//! among its category's pages, zero-padded to two digits. Store markers and
//! absolute CMS URLs are rewritten to paths relative to the linking file.
//!
//! Exporting an unchanged store reproduces byte-identical files.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docbridge_store::{CategoryId, Store};
use regex::Regex;

use crate::category::{CategoryKey, CategoryTree};
use crate::error::Error;
use crate::html::clean_abstract;
use crate::links::{LinkIndex, TargetAddressing, rewrite};
use crate::markdown;
use crate::page::Page;
use crate::report::{ExportReport, PageIssue};
use crate::scan::scan_files;

/// Largest number of pages one category can hold with two-digit prefixes.
pub const MAX_PAGES_PER_CATEGORY: usize = 99;

static EXPORT_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<order>\d{2})_(?<uri>.+)\.md$").expect("invalid export file regex")
});

/// Settings for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Name of the root category whose descendants are exported.
    pub root_category: String,
    /// Base URL of the CMS; absolute links below it are resolved by page uri.
    pub service_host: Option<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("markdown"),
            root_category: "SDK".to_owned(),
            service_host: None,
        }
    }
}

/// Exports stored pages from a [`Store`] as Markdown files.
pub struct Exporter<'s, S: Store + ?Sized> {
    store: &'s S,
    options: ExportOptions,
}

impl<'s, S: Store + ?Sized> Exporter<'s, S> {
    pub fn new(store: &'s S, options: ExportOptions) -> Self {
        Self { store, options }
    }

    /// Run the export.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the root category is missing, a
    /// category holds more than [`MAX_PAGES_PER_CATEGORY`] pages, or two
    /// categories map to the same directory; nothing is written in any of
    /// these cases. Returns [`Error::Store`] if the store cannot be
    /// read and [`Error::Io`] if the output directory cannot be created.
    /// Files that fail to write are reported in the returned [`ExportReport`].
    pub fn run(&self) -> Result<ExportReport, Error> {
        let root = self.store.find_root(&self.options.root_category)?.ok_or_else(|| {
            Error::Configuration(format!(
                "root category \"{}\" does not exist in the store",
                self.options.root_category
            ))
        })?;

        let mut tree = CategoryTree::from_stored(&root, &self.store.categories()?);
        let mut pages = self.load_pages(&mut tree)?;
        tree.check_dirs()?;
        check_capacity(&tree)?;
        let order = assign_locations(&tree, &mut pages);

        let index = LinkIndex::build(&pages, TargetAddressing::RelativePath)
            .with_service_host(self.options.service_host.clone());

        let output_dir = &self.options.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;
        tracing::info!(pages = pages.len(), output = %output_dir.display(), "Exporting pages");

        let mut report = ExportReport::default();
        for index_in_pages in order {
            let page = &pages[index_in_pages];
            let outcome = rewrite(page, &index);
            let document = render_document(&page.title, &page.abstract_text, &outcome.body);
            report.unresolved_links.extend(outcome.unresolved);

            let path = output_dir.join(&page.location);
            match write_file(&path, &document) {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), "Wrote page");
                    report.written.push(path);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Page not written");
                    report.failed.push(PageIssue {
                        source: page.display_id(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            written = report.written.len(),
            failed = report.failed.len(),
            unresolved = report.unresolved_links.len(),
            "Export finished"
        );
        Ok(report)
    }

    /// Stored pages of the tree's categories, registered in the tree.
    fn load_pages(&self, tree: &mut CategoryTree) -> Result<Vec<Page>, Error> {
        let by_store_id: HashMap<CategoryId, CategoryKey> = tree
            .keys()
            .filter_map(|key| tree.get(key).store_id.map(|id| (id, key)))
            .collect();

        let mut pages = Vec::new();
        for stored in self.store.pages()? {
            let Some(&key) = by_store_id.get(&stored.category_id) else {
                continue;
            };
            tree.add_page(key, &stored.uri, Some(stored.order), pages.len());
            pages.push(Page {
                id: Some(stored.id),
                uri: stored.uri,
                order: Some(stored.order),
                title: stored.title,
                abstract_text: stored.abstract_text,
                body: stored.body,
                category_path: tree.path(key),
                location: String::new(),
            });
        }
        Ok(pages)
    }
}

/// Fail before any write if a category exceeds the two-digit prefix range.
fn check_capacity(tree: &CategoryTree) -> Result<(), Error> {
    for key in tree.keys() {
        let count = tree.pages_in_order(key).len();
        if count > MAX_PAGES_PER_CATEGORY {
            let node = tree.get(key);
            return Err(Error::Configuration(format!(
                "category \"{}\" holds {count} pages, file prefixes allow at most {MAX_PAGES_PER_CATEGORY}",
                node.name
            )));
        }
    }
    Ok(())
}

/// Set every page's output-relative `location`; returns page indices in
/// write order.
fn assign_locations(tree: &CategoryTree, pages: &mut [Page]) -> Vec<usize> {
    let mut order = Vec::with_capacity(pages.len());
    for key in tree.keys() {
        let dir = tree.dir(key);
        for (position, index) in tree.pages_in_order(key).into_iter().enumerate() {
            let page = &mut pages[index];
            let file = format!("{:02}_{}.md", position + 1, page.uri);
            page.location = if dir.is_empty() {
                file
            } else {
                format!("{dir}/{file}")
            };
            order.push(index);
        }
    }
    order
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}

/// Assemble one exported Markdown document.
///
/// `abstract_html` is reduced to plain text; the `### Abstract` section is
/// left out when it is empty. `body_html` is converted to Markdown.
pub fn render_document(title: &str, abstract_html: &str, body_html: &str) -> String {
    let mut document = format!("# {title}\n\n");
    let abstract_text = clean_abstract(abstract_html);
    if !abstract_text.is_empty() {
        document.push_str("### Abstract\n\n");
        document.push_str(&abstract_text);
        document.push_str("\n\n");
    }
    document.push_str(&markdown::convert(body_html));
    let len = document.trim_end().len();
    document.truncate(len);
    document.push('\n');
    document
}

/// One file of an exported tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// Directory names from the output root to the file.
    pub category_dirs: Vec<String>,
    /// 1-based position from the file prefix.
    pub order: u32,
    pub uri: String,
    /// Text of the leading `# ` heading.
    pub title: String,
}

/// Re-parse an exported tree.
///
/// Entries are sorted by directory, then order. Files not named
/// `{NN}_{uri}.md` are ignored.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `dir` is not a directory and
/// [`Error::Io`] if a file cannot be read.
pub fn read_export_tree(dir: &Path) -> Result<Vec<ExportEntry>, Error> {
    if !dir.is_dir() {
        return Err(Error::Configuration(format!(
            "export directory {} does not exist",
            dir.display()
        )));
    }

    let mut entries = Vec::new();
    for relative in scan_files(dir, &["md"]) {
        let (dirs, file_name) = match relative.rsplit_once('/') {
            Some((dirs, name)) => (dirs.split('/').map(str::to_owned).collect(), name),
            None => (Vec::new(), relative.as_str()),
        };
        let Some(caps) = EXPORT_FILE.captures(file_name) else {
            continue;
        };
        let Ok(order) = caps["order"].parse() else {
            continue;
        };

        let path = dir.join(&relative);
        let contents = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let title = contents
            .lines()
            .next()
            .and_then(|line| line.strip_prefix("# "))
            .unwrap_or_default()
            .to_owned();

        entries.push(ExportEntry {
            category_dirs: dirs,
            order,
            uri: caps["uri"].to_owned(),
            title,
        });
    }
    entries.sort_by(|a, b| {
        a.category_dirs
            .cmp(&b.category_dirs)
            .then(a.order.cmp(&b.order))
    });
    Ok(entries)
}
