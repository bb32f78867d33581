//! Destination store abstraction for docbridge.
//!
//! This crate provides a [`Store`] trait for the relational CMS that
//! imports write into and exports read from. This enables:
//!
//! - **Unit testing** of the pipelines without a database
//! - **Clean separation** between link-graph logic and persistence
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Store`] trait with keyed lookups, inserts and updates for categories and pages
//! - [`SqliteStore`] backed by a single SQLite file with schema migrations
//! - [`MockStore`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use docbridge_store::{SqliteStore, Store};
//!
//! let store = SqliteStore::open("docbridge.sqlite")?;
//! let root = store.create_root("SDK")?;
//! for page in store.pages()? {
//!     println!("{}: {}", page.uri, page.title);
//! }
//! ```

mod migrations;
#[cfg(feature = "mock")]
mod mock;
mod sqlite;
mod store;

#[cfg(feature = "mock")]
pub use mock::MockStore;
pub use sqlite::SqliteStore;
pub use store::{
    CategoryId, PageContent, PageId, Store, StoreError, StoreErrorKind, StoredCategory, StoredPage,
};
