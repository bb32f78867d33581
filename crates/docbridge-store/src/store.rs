//! Store trait and error types.
//!
//! Provides the [`Store`] trait through which the importer and exporter talk
//! to the destination CMS, along with [`StoreError`] for unified error
//! handling across backends.
//!
//! # Keys
//!
//! Categories are keyed by `(parent, name)` and pages by `(category, uri)`.
//! Backends enforce both keys; callers look records up by key before
//! inserting so that repeated runs never create duplicates.

use std::path::PathBuf;

/// Store-assigned category identity.
pub type CategoryId = i64;

/// Store-assigned page identity.
pub type PageId = i64;

/// Category row as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCategory {
    pub id: CategoryId,
    /// `None` only for root categories.
    pub parent_id: Option<CategoryId>,
    pub name: String,
    /// Slug used as the export directory name.
    pub uri: String,
    pub description: Option<String>,
    /// Position among siblings, assigned on insert.
    pub order: u32,
}

/// Page row as held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPage {
    pub id: PageId,
    pub category_id: CategoryId,
    pub uri: String,
    /// Position among sibling pages, assigned on insert.
    pub order: u32,
    pub title: String,
    pub abstract_text: String,
    pub body: String,
}

/// Mutable page fields written by imports.
#[derive(Debug, Clone, Copy)]
pub struct PageContent<'a> {
    pub title: &'a str,
    pub abstract_text: &'a str,
    pub body: &'a str,
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// Record does not exist.
    NotFound,
    /// Record with the same key already exists.
    AlreadyExists,
    /// Stored data cannot be decoded.
    InvalidData,
    /// Backend is busy, locked or unreachable.
    Unavailable,
    /// Other/unknown error category.
    Other,
}

/// Store error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StoreError {
    /// Semantic error category.
    pub kind: StoreErrorKind,
    /// Database location (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Sqlite", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create a new store error.
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            path: None,
            backend: None,
            source: None,
        }
    }

    /// Attach database location.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StoreErrorKind::NotFound => "Not found",
            StoreErrorKind::AlreadyExists => "Already exists",
            StoreErrorKind::InvalidData => "Invalid data",
            StoreErrorKind::Unavailable => "Unavailable",
            StoreErrorKind::Other => "Error",
        };
        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }
        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }
        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Destination content store.
///
/// Exposes the create/read/update operations the import and export
/// pipelines need. Backends assign ids and sibling order on insert; callers
/// never choose either.
///
/// `begin`/`commit`/`rollback` bracket a whole run. Backends that cannot
/// undo writes keep the default no-op implementations.
pub trait Store {
    /// Find a root category (no parent) by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be queried.
    fn find_root(&self, name: &str) -> Result<Option<StoredCategory>, StoreError>;

    /// Find a child category of `parent` by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be queried.
    fn find_category(
        &self,
        parent: CategoryId,
        name: &str,
    ) -> Result<Option<StoredCategory>, StoreError>;

    /// Insert a child category under `parent`, placed after its siblings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] with [`StoreErrorKind::AlreadyExists`] if a
    /// sibling with the same name exists.
    fn insert_category(
        &self,
        parent: CategoryId,
        name: &str,
        uri: &str,
        description: Option<&str>,
    ) -> Result<StoredCategory, StoreError>;

    /// All categories, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be queried.
    fn categories(&self) -> Result<Vec<StoredCategory>, StoreError>;

    /// Find a page by `(category, uri)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be queried.
    fn find_page(&self, category: CategoryId, uri: &str)
    -> Result<Option<StoredPage>, StoreError>;

    /// Insert a page into `category`, placed after its sibling pages.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] with [`StoreErrorKind::AlreadyExists`] if the
    /// category already holds a page with this `uri`.
    fn insert_page(
        &self,
        category: CategoryId,
        uri: &str,
        content: PageContent<'_>,
    ) -> Result<StoredPage, StoreError>;

    /// Overwrite title, abstract and body of an existing page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::NotFound`] if no page has this id.
    fn update_page(&self, id: PageId, content: PageContent<'_>) -> Result<(), StoreError>;

    /// Overwrite only the body of an existing page.
    ///
    /// # Errors
    ///
    /// Returns [`StoreErrorKind::NotFound`] if no page has this id.
    fn update_page_body(&self, id: PageId, body: &str) -> Result<(), StoreError>;

    /// All pages, ordered by category then sibling order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be queried.
    fn pages(&self) -> Result<Vec<StoredPage>, StoreError>;

    /// Start a unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend refuses to open a transaction.
    fn begin(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Persist everything written since [`Store::begin`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the commit fails.
    fn commit(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// Discard everything written since [`Store::begin`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the rollback fails.
    fn rollback(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
