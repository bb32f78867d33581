//! End-to-end import → export → re-parse over a small corpus.

use std::fs;
use std::path::Path;

use docbridge_core::{
    ExportEntry, ExportOptions, Exporter, ImportOptions, Importer, marker, read_export_tree,
};
use docbridge_store::{PageContent, SqliteStore, Store};
use pretty_assertions::assert_eq;
use regex::Regex;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, html: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, html).unwrap();
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title}</title>\
         <script src=\"jquery.js\"></script></head><body>\
         <div id=\"nav-tree\"><a href=\"index.html\">Main</a></div>\
         <div class=\"contents\"><h1>{title}</h1>{body}</div></body></html>"
    )
}

/// Foo links forward to Bar, the third page of its category.
fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(
        root,
        "Foo Category/class_foo.html",
        &page(
            "Foo",
            r#"<p>The foo.</p><p>Calls <a href="../Bar Category/class_bar.html#method">Bar::method</a>.</p>"#,
        ),
    );
    write(
        root,
        "Bar Category/class_aardvark.html",
        &page("Aardvark", r#"<p>First.</p><p><a href="class_alpha.html">next</a></p>"#),
    );
    write(
        root,
        "Bar Category/class_alpha.html",
        &page("Alpha", "<p>Second.</p><pre><code class=\"language-cpp\">int x;</code></pre>"),
    );
    write(
        root,
        "Bar Category/class_bar.html",
        &page(
            "Bar",
            r#"<p>Third.</p><h2 id="method">method</h2><p>Back to <a href="../Foo Category/class_foo.html">Foo</a>, <a href="missing.html">nowhere</a>.</p>"#,
        ),
    );
    dir
}

fn sdk_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.create_root("SDK").unwrap();
    store
}

fn import(store: &SqliteStore, input: &Path) -> docbridge_core::ImportReport {
    let options = ImportOptions {
        input_dir: input.to_path_buf(),
        ..ImportOptions::default()
    };
    Importer::new(store, options).run().unwrap()
}

fn export(store: &SqliteStore, output: &Path) -> docbridge_core::ExportReport {
    let options = ExportOptions {
        output_dir: output.to_path_buf(),
        ..ExportOptions::default()
    };
    Exporter::new(store, options).run().unwrap()
}

#[test]
fn test_forward_link_survives_both_migrations() {
    let input = corpus();
    let output = TempDir::new().unwrap();
    let store = sdk_store();

    import(&store, input.path());

    let pages = store.pages().unwrap();
    let foo = pages.iter().find(|p| p.uri == "class_foo").unwrap();
    let bar = pages.iter().find(|p| p.uri == "class_bar").unwrap();
    assert_eq!(foo.title, "Foo");
    assert!(foo.body.contains(&format!("{}#method", marker(bar.id))));

    export(&store, output.path());

    let markdown = fs::read_to_string(output.path().join("foo-category/01_class_foo.md")).unwrap();
    assert_eq!(
        markdown,
        "# Foo\n\n### Abstract\n\nThe foo.\n\n\
         Calls [Bar::method](../bar-category/03_class_bar.md#method).\n"
    );
}

#[test]
fn test_reimport_creates_no_rows_and_reuses_ids() {
    let input = corpus();
    let store = sdk_store();

    let first = import(&store, input.path());
    let ids: Vec<_> = store.pages().unwrap().iter().map(|p| (p.id, p.uri.clone())).collect();
    let categories = store.categories().unwrap();

    let second = import(&store, input.path());

    assert_eq!(first.pages_created, 4);
    assert_eq!(second.pages_created, 0);
    assert_eq!(second.categories_created, 0);
    assert_eq!(second.pages_updated, 4);
    assert_eq!(
        store.pages().unwrap().iter().map(|p| (p.id, p.uri.clone())).collect::<Vec<_>>(),
        ids
    );
    assert_eq!(store.categories().unwrap(), categories);
}

#[test]
fn test_dangling_links_are_counted_and_degraded() {
    let input = corpus();
    let output = TempDir::new().unwrap();
    let store = sdk_store();

    let report = import(&store, input.path());

    assert_eq!(report.unresolved_links.len(), 1);
    assert_eq!(report.unresolved_links[0].page, "Bar Category/class_bar.html");
    assert_eq!(report.unresolved_links[0].token, "missing.html");

    let export_report = export(&store, output.path());
    assert!(export_report.unresolved_links.is_empty());
    let bar = fs::read_to_string(output.path().join("bar-category/03_class_bar.md")).unwrap();
    assert!(bar.contains("[Foo](../foo-category/01_class_foo.md), nowhere."));
}

#[test]
fn test_every_relative_link_points_to_an_exported_file() {
    let input = corpus();
    let output = TempDir::new().unwrap();
    let store = sdk_store();
    import(&store, input.path());
    let report = export(&store, output.path());

    let link = Regex::new(r"\]\((?<target>[^)#]+\.md)(?:#[^)]*)?\)").unwrap();
    let mut checked = 0;
    for file in &report.written {
        let markdown = fs::read_to_string(file).unwrap();
        for caps in link.captures_iter(&markdown) {
            let target = file.parent().unwrap().join(&caps["target"]);
            assert!(target.is_file(), "{} links to missing {}", file.display(), target.display());
            checked += 1;
        }
    }
    assert_eq!(checked, 3);
}

#[test]
fn test_export_tree_round_trips_ordering() {
    let input = corpus();
    let output = TempDir::new().unwrap();
    let store = sdk_store();
    import(&store, input.path());
    export(&store, output.path());

    let entries = read_export_tree(output.path()).unwrap();

    let entry = |dir: &str, order, uri: &str, title: &str| ExportEntry {
        category_dirs: vec![dir.to_owned()],
        order,
        uri: uri.to_owned(),
        title: title.to_owned(),
    };
    assert_eq!(
        entries,
        vec![
            entry("bar-category", 1, "class_aardvark", "Aardvark"),
            entry("bar-category", 2, "class_alpha", "Alpha"),
            entry("bar-category", 3, "class_bar", "Bar"),
            entry("foo-category", 1, "class_foo", "Foo"),
        ]
    );

    // Stored order agrees with the re-parsed order.
    let categories = store.categories().unwrap();
    let bar_category = categories.iter().find(|c| c.uri == "bar-category").unwrap();
    let stored: Vec<_> = store
        .pages()
        .unwrap()
        .into_iter()
        .filter(|p| p.category_id == bar_category.id)
        .map(|p| p.uri)
        .collect();
    assert_eq!(stored, vec!["class_aardvark", "class_alpha", "class_bar"]);
}

#[test]
fn test_reexport_is_byte_identical() {
    let input = corpus();
    let store = sdk_store();
    import(&store, input.path());
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    let a = export(&store, first.path());
    let b = export(&store, second.path());

    assert_eq!(a.written.len(), 4);
    for (left, right) in a.written.iter().zip(&b.written) {
        assert_eq!(
            left.strip_prefix(first.path()).unwrap(),
            right.strip_prefix(second.path()).unwrap()
        );
        assert_eq!(fs::read(left).unwrap(), fs::read(right).unwrap());
    }

    // Re-importing unchanged input does not change the export either.
    import(&store, input.path());
    let third = TempDir::new().unwrap();
    let c = export(&store, third.path());
    for (left, right) in a.written.iter().zip(&c.written) {
        assert_eq!(fs::read(left).unwrap(), fs::read(right).unwrap());
    }
}

#[test]
fn test_padding_is_two_digits_up_to_99_pages() {
    let store = sdk_store();
    let root = store.find_root("SDK").unwrap().unwrap();
    let category = store.insert_category(root.id, "Big", "big", None).unwrap();
    let content = PageContent {
        title: "Page",
        abstract_text: "",
        body: "<p>x</p>",
    };
    for i in 0..99 {
        store.insert_page(category.id, &format!("p{i}"), content).unwrap();
    }
    let output = TempDir::new().unwrap();

    let report = export(&store, output.path());

    let prefix = Regex::new(r"^\d{2}_p\d+\.md$").unwrap();
    assert_eq!(report.written.len(), 99);
    for file in &report.written {
        let name = file.file_name().unwrap().to_string_lossy();
        assert!(prefix.is_match(&name), "unexpected file name {name}");
    }
    assert!(output.path().join("big/99_p98.md").is_file());

    store.insert_page(category.id, "p99", content).unwrap();
    let overflow = TempDir::new().unwrap();
    let target = overflow.path().join("out");
    let err = Exporter::new(
        &store,
        ExportOptions {
            output_dir: target.clone(),
            ..ExportOptions::default()
        },
    )
    .run()
    .unwrap_err();

    assert!(matches!(err, docbridge_core::Error::Configuration(_)));
    assert!(!target.exists());
}
