//! Import pipeline: generated HTML directory into the store.
//!
//! # Pipeline
//!
//! 1. Check the root category and the input directory (fatal, nothing written).
//! 2. Normalize every document; malformed ones are skipped.
//! 3. Build the [`CategoryTree`] and materialize it in the store.
//! 4. Pass 1 creates or updates every page, bodies still unresolved.
//! 5. Pass 2 rewrites every allocated page's links to store markers.
//!
//! The store writes run inside [`Store::begin`]/[`Store::commit`]; a dry run
//! rolls everything back after the report is built.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use docbridge_store::{PageContent, Store, StoredCategory};
use scraper::{ElementRef, Html, Node};

use crate::category::CategoryTree;
use crate::error::Error;
use crate::html::{collapse_whitespace, collapsed_text};
use crate::links::{LinkIndex, TargetAddressing, rewrite};
use crate::normalizer::{Normalizer, NormalizerOptions, file_stem};
use crate::page::Page;
use crate::report::{ImportReport, PageIssue};
use crate::scan::scan_html;

/// Explicit assignment of source pages to a top-level category.
#[derive(Debug, Clone, Default)]
pub struct CategoryAssignment {
    pub name: String,
    pub description: Option<String>,
    /// Source file stems.
    pub pages: Vec<String>,
}

/// Settings for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub input_dir: PathBuf,
    /// Name of the pre-existing root category.
    pub root_category: String,
    /// Category for pages without hierarchy information.
    pub default_category: String,
    /// Title/abstract listing inside `input_dir`, not imported as a page.
    pub index_file: Option<String>,
    /// Language hint for converted code fragments.
    pub code_language: Option<String>,
    pub categories: Vec<CategoryAssignment>,
    /// Roll back all store writes at the end of the run.
    pub dry_run: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("html"),
            root_category: "SDK".to_owned(),
            default_category: "Reference".to_owned(),
            index_file: Some("index.html".to_owned()),
            code_language: None,
            categories: Vec::new(),
            dry_run: false,
        }
    }
}

/// Title and abstract override from the index listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub title: String,
    pub abstract_text: String,
}

/// Parse an index listing of `<li><a href="x.html">Title</a> - abstract</li>`
/// entries, keyed by the linked file stem.
pub fn parse_index(html: &str) -> HashMap<String, IndexEntry> {
    let document = Html::parse_document(html);
    let mut entries = HashMap::new();

    for li in document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "li")
    {
        let Some(link) = li
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a" && el.value().attr("href").is_some())
        else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let path = href.split('#').next().unwrap_or_default();
        let file_name = path.rsplit('/').next().unwrap_or_default();
        let stem = file_stem(file_name);
        if stem.is_empty() {
            continue;
        }

        let mut rest = String::new();
        for sibling in link.next_siblings() {
            match sibling.value() {
                Node::Text(text) => rest.push_str(text),
                Node::Element(element) if element.name() == "br" => rest.push(' '),
                Node::Element(_) => {
                    if let Some(el) = ElementRef::wrap(sibling) {
                        rest.extend(el.text());
                    }
                }
                _ => {}
            }
        }
        let abstract_text = collapse_whitespace(&rest);
        let abstract_text = abstract_text
            .trim_start_matches(|c: char| c == '-' || c == '\u{2013}' || c.is_whitespace())
            .to_owned();

        entries.insert(
            stem.to_owned(),
            IndexEntry {
                title: collapsed_text(link),
                abstract_text,
            },
        );
    }
    entries
}

/// Imports a directory of generated HTML into a [`Store`].
pub struct Importer<'s, S: Store + ?Sized> {
    store: &'s S,
    options: ImportOptions,
}

impl<'s, S: Store + ?Sized> Importer<'s, S> {
    pub fn new(store: &'s S, options: ImportOptions) -> Self {
        Self { store, options }
    }

    /// Run the import.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the root category is missing, the
    /// input directory does not exist or holds no HTML files, or two sibling
    /// categories would share an export directory. Returns
    /// [`Error::Store`] if the category hierarchy cannot be written; the run
    /// is rolled back in that case. Per-page failures are reported in the
    /// returned [`ImportReport`].
    pub fn run(&self) -> Result<ImportReport, Error> {
        let root = self.store.find_root(&self.options.root_category)?.ok_or_else(|| {
            Error::Configuration(format!(
                "root category \"{}\" does not exist in the store",
                self.options.root_category
            ))
        })?;

        let input_dir = &self.options.input_dir;
        if !input_dir.is_dir() {
            return Err(Error::Configuration(format!(
                "input directory {} does not exist",
                input_dir.display()
            )));
        }

        let index_file = self.options.index_file.as_deref();
        let files: Vec<String> = scan_html(input_dir)
            .into_iter()
            .filter(|f| Some(f.as_str()) != index_file)
            .collect();
        if files.is_empty() {
            return Err(Error::Configuration(format!(
                "no HTML files found in {}",
                input_dir.display()
            )));
        }

        let overrides = self.load_index()?;
        let mut report = ImportReport {
            dry_run: self.options.dry_run,
            ..ImportReport::default()
        };

        tracing::info!(files = files.len(), input = %input_dir.display(), "Normalizing documents");
        let normalized = self.normalize_all(&files, &overrides, &mut report);
        let (mut tree, mut pages) = self.build_tree(&root, normalized, &mut report);
        tree.check_dirs()?;

        self.store.begin()?;
        let result = self.write(&mut tree, &mut pages, &mut report);
        match result {
            Ok(()) if self.options.dry_run => {
                tracing::info!("Dry run, rolling back");
                self.store.rollback()?;
            }
            Ok(()) => self.store.commit()?,
            Err(err) => {
                if let Err(rollback) = self.store.rollback() {
                    tracing::error!(error = %rollback, "Rollback failed");
                }
                return Err(err);
            }
        }

        tracing::info!(
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            unresolved = report.unresolved_links.len(),
            "Import finished"
        );
        Ok(report)
    }

    fn load_index(&self) -> Result<HashMap<String, IndexEntry>, Error> {
        let Some(name) = &self.options.index_file else {
            return Ok(HashMap::new());
        };
        let path = self.options.input_dir.join(name);
        if !path.is_file() {
            return Ok(HashMap::new());
        }
        let html = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let entries = parse_index(&html);
        tracing::debug!(entries = entries.len(), path = %path.display(), "Loaded index listing");
        Ok(entries)
    }

    fn normalize_all(
        &self,
        files: &[String],
        overrides: &HashMap<String, IndexEntry>,
        report: &mut ImportReport,
    ) -> Vec<Page> {
        let category_overrides = self
            .options
            .categories
            .iter()
            .flat_map(|c| c.pages.iter().map(|p| (p.clone(), c.name.clone())))
            .collect();
        let normalizer = Normalizer::new(NormalizerOptions {
            default_category: self.options.default_category.clone(),
            code_language: self.options.code_language.clone(),
            category_overrides,
        });

        let mut pages = Vec::with_capacity(files.len());
        for file in files {
            let path = self.options.input_dir.join(file);
            let normalized = fs::read(&path)
                .map_err(|e| Error::io(&path, e))
                .and_then(|raw| normalizer.normalize(&raw, file));

            match normalized {
                Ok(mut normalized) => {
                    if let Some(entry) = overrides.get(&normalized.page.uri) {
                        if !entry.title.is_empty() {
                            normalized.page.title.clone_from(&entry.title);
                        }
                        if !entry.abstract_text.is_empty() {
                            normalized.override_abstract(&entry.abstract_text);
                        }
                    }
                    pages.push(normalized.page);
                }
                Err(err) => {
                    tracing::warn!(file, error = %err, "Skipping document");
                    report.skipped.push(PageIssue {
                        source: file.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        pages
    }

    /// Place pages into a tree; a second page with the same uri in a
    /// category is skipped.
    fn build_tree(
        &self,
        root: &StoredCategory,
        normalized: Vec<Page>,
        report: &mut ImportReport,
    ) -> (CategoryTree, Vec<Page>) {
        let mut tree = CategoryTree::new(&root.name, Some(root.id));
        let mut pages = Vec::with_capacity(normalized.len());

        for page in normalized {
            let key = tree.get_or_create(&page.category_path);
            if tree.add_page(key, &page.uri, page.order, pages.len()) {
                pages.push(page);
            } else {
                tracing::warn!(file = %page.location, uri = %page.uri, "Duplicate page uri in category");
                report.skipped.push(PageIssue {
                    source: page.location.clone(),
                    reason: format!(
                        "duplicate uri \"{}\" in category {}",
                        page.uri,
                        page.category_path.join("/")
                    ),
                });
            }
        }

        for assignment in &self.options.categories {
            if let Some(key) = tree.find(std::slice::from_ref(&assignment.name)) {
                tree.get_mut(key).description.clone_from(&assignment.description);
            }
        }
        (tree, pages)
    }

    fn write(
        &self,
        tree: &mut CategoryTree,
        pages: &mut [Page],
        report: &mut ImportReport,
    ) -> Result<(), Error> {
        self.materialize_categories(tree, report)?;
        self.allocate(tree, pages, report);

        let index = LinkIndex::build(pages, TargetAddressing::InternalId);
        tracing::info!(targets = index.len(), "Relinking pages");
        self.relink(pages, &index, report);
        Ok(())
    }

    /// Find or create every category beneath the root.
    fn materialize_categories(
        &self,
        tree: &mut CategoryTree,
        report: &mut ImportReport,
    ) -> Result<(), Error> {
        let keys: Vec<_> = tree.keys().filter(|k| *k != tree.root()).collect();
        for key in keys {
            let Some(parent_id) = tree.parent(key).and_then(|p| tree.get(p).store_id) else {
                continue;
            };
            let node = tree.get(key);
            let stored = match self.store.find_category(parent_id, &node.name)? {
                Some(existing) => existing,
                None => {
                    let created = self.store.insert_category(
                        parent_id,
                        &node.name,
                        &node.uri,
                        node.description.as_deref(),
                    )?;
                    tracing::debug!(name = %created.name, id = created.id, "Created category");
                    report.categories_created += 1;
                    created
                }
            };

            let node = tree.get_mut(key);
            node.store_id = Some(stored.id);
            node.uri = stored.uri;
            node.order = Some(stored.order);
        }
        Ok(())
    }

    /// Pass 1: give every page its store id.
    fn allocate(&self, tree: &CategoryTree, pages: &mut [Page], report: &mut ImportReport) {
        tracing::info!(pages = pages.len(), "Allocating pages");
        for key in tree.keys() {
            let Some(category_id) = tree.get(key).store_id else {
                continue;
            };
            for index in tree.pages_in_order(key) {
                let page = &mut pages[index];
                let content = PageContent {
                    title: &page.title,
                    abstract_text: &page.abstract_text,
                    body: &page.body,
                };

                let result = match self.store.find_page(category_id, &page.uri) {
                    Ok(Some(existing)) => self
                        .store
                        .update_page(existing.id, content)
                        .map(|()| (existing, false)),
                    Ok(None) => self
                        .store
                        .insert_page(category_id, &page.uri, content)
                        .map(|created| (created, true)),
                    Err(err) => Err(err),
                };

                match result {
                    Ok((stored, created)) => {
                        if created {
                            report.pages_created += 1;
                        } else {
                            report.pages_updated += 1;
                        }
                        tracing::debug!(file = %page.location, id = stored.id, created, "Stored page");
                        page.id = Some(stored.id);
                        page.order = Some(stored.order);
                    }
                    Err(source) => {
                        let err = Error::StoreWrite {
                            page: page.display_id(),
                            source,
                        };
                        tracing::warn!(error = %err, "Page not stored");
                        report.failed.push(PageIssue {
                            source: page.location.clone(),
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
    }

    /// Pass 2: rewrite links of every allocated page.
    fn relink(&self, pages: &[Page], index: &LinkIndex, report: &mut ImportReport) {
        for page in pages {
            let Some(id) = page.id else {
                continue;
            };
            let outcome = rewrite(page, index);
            if outcome.body != page.body
                && let Err(source) = self.store.update_page_body(id, &outcome.body)
            {
                let err = Error::StoreWrite {
                    page: page.display_id(),
                    source,
                };
                tracing::warn!(error = %err, "Page not relinked");
                report.failed.push(PageIssue {
                    source: page.location.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
            report.unresolved_links.extend(outcome.unresolved);
            report.processed.push(page.location.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use docbridge_store::{MockStore, SqliteStore};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::links::marker;

    fn write(dir: &Path, name: &str, html: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, html).unwrap();
    }

    fn page_html(title: &str, body: &str) -> String {
        format!("<html><body><h1>{title}</h1>{body}</body></html>")
    }

    fn corpus() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "Foo Category/class_foo.html",
            &page_html(
                "Foo",
                r#"<p>Foo does things.</p><p>See <a href="../Bar Category/class_bar.html#method">Bar</a>.</p>"#,
            ),
        );
        write(
            dir.path(),
            "Bar Category/class_bar.html",
            &page_html(
                "Bar",
                r#"<p>Bar links <a href="../Foo Category/class_foo.html">back</a> and <a href="gone.html">away</a>.</p>"#,
            ),
        );
        dir
    }

    fn options(dir: &Path) -> ImportOptions {
        ImportOptions {
            input_dir: dir.to_path_buf(),
            ..ImportOptions::default()
        }
    }

    #[test]
    fn test_import_stores_pages_and_relinks() {
        let dir = corpus();
        let store = MockStore::new().with_root("SDK");

        let report = Importer::new(&store, options(dir.path())).run().unwrap();

        assert_eq!(report.pages_created, 2);
        assert_eq!(report.categories_created, 2);
        assert_eq!(report.processed.len(), 2);
        assert!(report.skipped.is_empty());
        assert_eq!(report.unresolved_links.len(), 1);
        assert_eq!(report.unresolved_links[0].token, "gone.html");

        let pages = store.pages().unwrap();
        let bar = pages.iter().find(|p| p.uri == "class_bar").unwrap();
        let foo = pages.iter().find(|p| p.uri == "class_foo").unwrap();
        assert_eq!(foo.title, "Foo");
        assert_eq!(foo.abstract_text, "Foo does things.");
        assert!(!foo.body.contains("Foo does things."));
        assert!(
            foo.body
                .contains(&format!(r#"href="{}#method""#, marker(bar.id)))
        );
        assert!(bar.body.contains(&format!(r#"href="{}""#, marker(foo.id))));
        assert!(!bar.body.contains("gone.html"));
        assert!(bar.body.contains("and away."));
    }

    #[test]
    fn test_reimport_reuses_ids() {
        let dir = corpus();
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_root("SDK").unwrap();

        Importer::new(&store, options(dir.path())).run().unwrap();
        let first = store.pages().unwrap();
        let categories = store.categories().unwrap().len();

        let report = Importer::new(&store, options(dir.path())).run().unwrap();
        let second = store.pages().unwrap();

        assert_eq!(report.pages_created, 0);
        assert_eq!(report.pages_updated, 2);
        assert_eq!(report.categories_created, 0);
        assert_eq!(store.categories().unwrap().len(), categories);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_root_is_configuration_error() {
        let dir = corpus();
        let store = MockStore::new().with_root("Other");

        let err = Importer::new(&store, options(dir.path())).run().unwrap_err();

        assert!(matches!(err, Error::Configuration(ref m) if m.contains("SDK")));
        assert_eq!(store.categories().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_input_is_configuration_error() {
        let store = MockStore::new().with_root("SDK");
        let err = Importer::new(&store, options(Path::new("/nonexistent/html")))
            .run()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_empty_input_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "index.html", "<ul></ul>");
        let store = MockStore::new().with_root("SDK");

        let err = Importer::new(&store, options(dir.path())).run().unwrap_err();

        assert!(matches!(err, Error::Configuration(ref m) if m.contains("no HTML files")));
    }

    #[test]
    fn test_malformed_and_duplicate_documents_are_skipped() {
        let dir = corpus();
        write(dir.path(), "broken.html", "<html><body>  </body></html>");
        fs::write(dir.path().join("binary.html"), [0xff, 0xfe, 0x00]).unwrap();
        let mut opts = options(dir.path());
        opts.categories = vec![CategoryAssignment {
            name: "Foo Category".to_owned(),
            description: Some("Foo things".to_owned()),
            pages: vec!["class_foo".to_owned()],
        }];
        write(
            dir.path(),
            "class_foo.html",
            &page_html("Shadow", "<p>Same uri, same category.</p>"),
        );
        let store = MockStore::new().with_root("SDK");

        let report = Importer::new(&store, opts).run().unwrap();

        let skipped: Vec<_> = report.skipped.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(
            skipped,
            vec!["binary.html", "broken.html", "class_foo.html"]
        );
        assert_eq!(report.processed.len(), 2);
        let foo_category = store
            .categories()
            .unwrap()
            .into_iter()
            .find(|c| c.name == "Foo Category")
            .unwrap();
        assert_eq!(foo_category.description.as_deref(), Some("Foo things"));
    }

    #[test]
    fn test_store_failure_skips_page_in_both_passes() {
        let dir = corpus();
        let store = MockStore::new()
            .with_root("SDK")
            .with_failing_page("class_bar");

        let report = Importer::new(&store, options(dir.path())).run().unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].source, "Bar Category/class_bar.html");
        assert_eq!(report.processed, vec!["Foo Category/class_foo.html"]);
        // Link to the failed page degrades to text.
        assert_eq!(report.unresolved_links.len(), 1);
        let pages = store.pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert!(!pages[0].body.contains("<a"));
    }

    #[test]
    fn test_index_listing_overrides_title_and_abstract() {
        let dir = corpus();
        write(
            dir.path(),
            "index.html",
            r#"<ul><li><a href="Foo Category/class_foo.html">Foo Widget</a> - Widget driver.</li></ul>"#,
        );
        let store = MockStore::new().with_root("SDK");

        let report = Importer::new(&store, options(dir.path())).run().unwrap();

        assert_eq!(report.processed.len(), 2);
        let foo = store
            .pages()
            .unwrap()
            .into_iter()
            .find(|p| p.uri == "class_foo")
            .unwrap();
        assert_eq!(foo.title, "Foo Widget");
        assert_eq!(foo.abstract_text, "Widget driver.");
        // The lead paragraph is no longer the abstract, so it stays in the body.
        assert!(foo.body.starts_with("<p>Foo does things.</p>"), "{}", foo.body);
    }

    #[test]
    fn test_dry_run_rolls_back() {
        let dir = corpus();
        let store = SqliteStore::open_in_memory().unwrap();
        store.create_root("SDK").unwrap();
        let mut opts = options(dir.path());
        opts.dry_run = true;

        let report = Importer::new(&store, opts).run().unwrap();

        assert!(report.dry_run);
        assert_eq!(report.pages_created, 2);
        assert!(store.pages().unwrap().is_empty());
        assert_eq!(store.categories().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_index() {
        let entries = parse_index(
            "<ul>\n<li><a href=\"led.html\">LED Manager</a> - LED control<br/>and feedback</li>\n\
             <li><a href=\"dir/bus.html#x\">Bus</a></li>\n<li>No link</li></ul>",
        );

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries["led"],
            IndexEntry {
                title: "LED Manager".to_owned(),
                abstract_text: "LED control and feedback".to_owned(),
            }
        );
        assert_eq!(entries["bus"].abstract_text, "");
    }

    #[test]
    fn test_colliding_category_dirs_abort_before_writes() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "Core System/intro.html", &page_html("First", "<p>First text</p>"));
        write(dir.path(), "core-system/intro.html", &page_html("Second", "<p>Second text</p>"));
        let store = MockStore::new().with_root("SDK");

        let err = Importer::new(&store, options(dir.path())).run().unwrap_err();

        assert!(matches!(err, Error::Configuration(ref m) if m.contains("core-system")));
        assert_eq!(store.categories().unwrap().len(), 1);
        assert!(store.pages().unwrap().is_empty());
    }
}
