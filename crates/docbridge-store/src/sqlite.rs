//! SQLite store backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};

use crate::migrations::apply_migrations;
use crate::store::{
    CategoryId, PageContent, PageId, Store, StoreError, StoreErrorKind, StoredCategory, StoredPage,
};

const BACKEND: &str = "Sqlite";

const CATEGORY_COLUMNS: &str = "id, parent_id, name, uri, description, ord";
const PAGE_COLUMNS: &str = "id, category_id, uri, ord, title, abstract, body";

/// Store backed by a single SQLite database file.
///
/// The schema is created or migrated on open. All methods run on the one
/// connection held by the store, so `begin`/`rollback` cover every write made
/// in between.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) a database file and apply pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the file cannot be opened or migrated.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| StoreError::from(e).with_path(path))?;
        let store = Self::bootstrap(conn).map_err(|e| e.with_path(path))?;
        tracing::info!(path = %path.display(), "Opened store");
        Ok(Self {
            path: Some(path.to_path_buf()),
            ..store
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(mut conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(Duration::from_secs(5))?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn, path: None })
    }

    /// Database file location, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Return the root category named `name`, creating it if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the insert fails.
    pub fn create_root(&self, name: &str) -> Result<StoredCategory, StoreError> {
        if let Some(existing) = self.find_root(name)? {
            return Ok(existing);
        }
        self.insert_category_row(None, name, "", None)
    }

    fn insert_category_row(
        &self,
        parent: Option<CategoryId>,
        name: &str,
        uri: &str,
        description: Option<&str>,
    ) -> Result<StoredCategory, StoreError> {
        let order: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(ord) + 1, 0) FROM categories WHERE parent_id IS ?1",
            params![parent],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO categories (parent_id, name, uri, description, ord)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![parent, name, uri, description, order],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, name, order, "Inserted category");
        Ok(StoredCategory {
            id,
            parent_id: parent,
            name: name.to_owned(),
            uri: uri.to_owned(),
            description: description.map(str::to_owned),
            order,
        })
    }

    fn query_categories(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredCategory>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories {filter}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, category_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn query_pages(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<StoredPage>, StoreError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages {filter}");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params, page_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn require_updated(&self, changed: usize, id: PageId) -> Result<(), StoreError> {
        if changed == 0 {
            let mut err = StoreError::new(StoreErrorKind::NotFound)
                .with_backend(BACKEND)
                .with_source(MissingPage(id));
            if let Some(path) = &self.path {
                err = err.with_path(path);
            }
            return Err(err);
        }
        Ok(())
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCategory> {
    Ok(StoredCategory {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        uri: row.get(3)?,
        description: row.get(4)?,
        order: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<StoredPage> {
    Ok(StoredPage {
        id: row.get(0)?,
        category_id: row.get(1)?,
        uri: row.get(2)?,
        order: row.get(3)?,
        title: row.get(4)?,
        abstract_text: row.get(5)?,
        body: row.get(6)?,
    })
}

impl Store for SqliteStore {
    fn find_root(&self, name: &str) -> Result<Option<StoredCategory>, StoreError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories
             WHERE parent_id IS NULL AND name = ?1 ORDER BY id LIMIT 1"
        );
        Ok(self
            .conn
            .query_row(&sql, params![name], category_from_row)
            .optional()?)
    }

    fn find_category(
        &self,
        parent: CategoryId,
        name: &str,
    ) -> Result<Option<StoredCategory>, StoreError> {
        let sql = format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE parent_id = ?1 AND name = ?2"
        );
        Ok(self
            .conn
            .query_row(&sql, params![parent, name], category_from_row)
            .optional()?)
    }

    fn insert_category(
        &self,
        parent: CategoryId,
        name: &str,
        uri: &str,
        description: Option<&str>,
    ) -> Result<StoredCategory, StoreError> {
        self.insert_category_row(Some(parent), name, uri, description)
    }

    fn categories(&self) -> Result<Vec<StoredCategory>, StoreError> {
        self.query_categories("ORDER BY id", [])
    }

    fn find_page(
        &self,
        category: CategoryId,
        uri: &str,
    ) -> Result<Option<StoredPage>, StoreError> {
        let sql = format!("SELECT {PAGE_COLUMNS} FROM pages WHERE category_id = ?1 AND uri = ?2");
        Ok(self
            .conn
            .query_row(&sql, params![category, uri], page_from_row)
            .optional()?)
    }

    fn insert_page(
        &self,
        category: CategoryId,
        uri: &str,
        content: PageContent<'_>,
    ) -> Result<StoredPage, StoreError> {
        let order: u32 = self.conn.query_row(
            "SELECT COALESCE(MAX(ord) + 1, 0) FROM pages WHERE category_id = ?1",
            params![category],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO pages (category_id, uri, ord, title, abstract, body)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                category,
                uri,
                order,
                content.title,
                content.abstract_text,
                content.body
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(id, uri, order, "Inserted page");
        Ok(StoredPage {
            id,
            category_id: category,
            uri: uri.to_owned(),
            order,
            title: content.title.to_owned(),
            abstract_text: content.abstract_text.to_owned(),
            body: content.body.to_owned(),
        })
    }

    fn update_page(&self, id: PageId, content: PageContent<'_>) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE pages SET title = ?2, abstract = ?3, body = ?4 WHERE id = ?1",
            params![id, content.title, content.abstract_text, content.body],
        )?;
        self.require_updated(changed, id)
    }

    fn update_page_body(&self, id: PageId, body: &str) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE pages SET body = ?2 WHERE id = ?1",
            params![id, body],
        )?;
        self.require_updated(changed, id)
    }

    fn pages(&self) -> Result<Vec<StoredPage>, StoreError> {
        self.query_pages("ORDER BY category_id, ord, id", [])
    }

    fn begin(&self) -> Result<(), StoreError> {
        Ok(self.conn.execute_batch("BEGIN")?)
    }

    fn commit(&self) -> Result<(), StoreError> {
        Ok(self.conn.execute_batch("COMMIT")?)
    }

    fn rollback(&self) -> Result<(), StoreError> {
        Ok(self.conn.execute_batch("ROLLBACK")?)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        let kind = match &err {
            rusqlite::Error::QueryReturnedNoRows => StoreErrorKind::NotFound,
            rusqlite::Error::SqliteFailure(failure, _) => match failure.code {
                ErrorCode::ConstraintViolation => StoreErrorKind::AlreadyExists,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen => {
                    StoreErrorKind::Unavailable
                }
                ErrorCode::DatabaseCorrupt | ErrorCode::NotADatabase => {
                    StoreErrorKind::InvalidData
                }
                _ => StoreErrorKind::Other,
            },
            rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
            | rusqlite::Error::InvalidColumnType(..) => StoreErrorKind::InvalidData,
            _ => StoreErrorKind::Other,
        };
        Self::new(kind).with_backend(BACKEND).with_source(err)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no page with id {0}")]
struct MissingPage(PageId);
