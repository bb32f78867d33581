//! Documentation link-graph transformer.
//!
//! Moves API reference documentation through three representations while
//! keeping every cross-document link valid:
//!
//! 1. Doxygen-generated HTML, addressed by file name
//! 2. A CMS [`Store`](docbridge_store::Store), addressed by page id
//! 3. A Markdown tree, addressed by relative file path
//!
//! # Architecture
//!
//! - [`Normalizer`]: strips generator chrome and extracts title, abstract and
//!   category path from one document
//! - [`LinkIndex`] and [`rewrite`]: map link tokens between address spaces
//!   selected by [`TargetAddressing`]
//! - [`CategoryTree`]: per-run category hierarchy with deterministic ordering
//! - [`Importer`]: normalize, allocate pages, then relink (two passes)
//! - [`Exporter`]: relink to relative paths and write `{NN}_{uri}.md` files
//!
//! Store-free conversions live in [`convert_file`], [`convert_dir`] and
//! [`clean_directory`].
//!
//! # Example
//!
//! ```ignore
//! use docbridge_core::{ExportOptions, Exporter, ImportOptions, Importer};
//! use docbridge_store::SqliteStore;
//!
//! let store = SqliteStore::open("docbridge.sqlite")?;
//! let report = Importer::new(&store, ImportOptions::default()).run()?;
//! println!("{} pages imported", report.processed.len());
//! Exporter::new(&store, ExportOptions::default()).run()?;
//! ```

mod category;
mod convert;
mod doxygen;
mod error;
mod exporter;
mod html;
mod importer;
mod links;
pub mod markdown;
mod normalizer;
mod page;
mod report;
mod scan;
mod util;

pub use category::{CategoryKey, CategoryNode, CategoryTree, Child};
pub use convert::{INDEX_FILE, clean_directory, convert_dir, convert_file};
pub use doxygen::{alias, slugify};
pub use error::Error;
pub use exporter::{
    ExportEntry, ExportOptions, Exporter, MAX_PAGES_PER_CATEGORY, read_export_tree,
    render_document,
};
pub use html::clean_abstract;
pub use importer::{CategoryAssignment, ImportOptions, Importer, IndexEntry, parse_index};
pub use links::{LinkIndex, MARKER_PREFIX, RewriteOutcome, TargetAddressing, marker, rewrite};
pub use normalizer::{Normalizer, NormalizerOptions};
pub use page::{LinkReference, NormalizedPage, Page};
pub use report::{ConvertReport, ExportReport, ImportReport, PageIssue, UnresolvedLink};
pub use util::relative_path;
