//! Mock store implementation for testing.
//!
//! Provides [`MockStore`] for unit testing the pipelines without SQLite.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::store::{
    CategoryId, PageContent, PageId, Store, StoreError, StoreErrorKind, StoredCategory, StoredPage,
};

/// In-memory store for testing.
///
/// Mirrors the SQLite backend's key and ordering rules. Use the builder
/// methods to seed a root category or make writes for given page uris fail.
///
/// # Example
///
/// ```ignore
/// use docbridge_store::{MockStore, Store};
///
/// let store = MockStore::new().with_root("SDK");
/// let root = store.find_root("SDK").unwrap().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockStore {
    categories: RwLock<Vec<StoredCategory>>,
    pages: RwLock<Vec<StoredPage>>,
    failing_uris: RwLock<HashSet<String>>,
    snapshot: RwLock<Option<(Vec<StoredCategory>, Vec<StoredPage>)>>,
}

impl MockStore {
    /// Create a new empty mock store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a root category.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_root(self, name: impl Into<String>) -> Self {
        {
            let mut categories = self.categories.write().unwrap();
            let id = next_id(categories.iter().map(|c| c.id));
            categories.push(StoredCategory {
                id,
                parent_id: None,
                name: name.into(),
                uri: String::new(),
                description: None,
                order: 0,
            });
        }
        self
    }

    /// Make every insert or update of a page with this uri fail.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_page(self, uri: impl Into<String>) -> Self {
        self.failing_uris.write().unwrap().insert(uri.into());
        self
    }

    fn check_writable(&self, uri: &str) -> Result<(), StoreError> {
        if self.failing_uris.read().unwrap().contains(uri) {
            return Err(StoreError::new(StoreErrorKind::Unavailable).with_backend("Mock"));
        }
        Ok(())
    }

    fn update_with(&self, id: PageId, apply: impl FnOnce(&mut StoredPage)) -> Result<(), StoreError> {
        let mut pages = self.pages.write().unwrap();
        let page = pages
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::new(StoreErrorKind::NotFound).with_backend("Mock"))?;
        self.check_writable(&page.uri)?;
        apply(page);
        Ok(())
    }
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn next_order(orders: impl Iterator<Item = u32>) -> u32 {
    orders.max().map_or(0, |max| max + 1)
}

impl Store for MockStore {
    fn find_root(&self, name: &str) -> Result<Option<StoredCategory>, StoreError> {
        Ok(self
            .categories
            .read()
            .unwrap()
            .iter()
            .find(|c| c.parent_id.is_none() && c.name == name)
            .cloned())
    }

    fn find_category(
        &self,
        parent: CategoryId,
        name: &str,
    ) -> Result<Option<StoredCategory>, StoreError> {
        Ok(self
            .categories
            .read()
            .unwrap()
            .iter()
            .find(|c| c.parent_id == Some(parent) && c.name == name)
            .cloned())
    }

    fn insert_category(
        &self,
        parent: CategoryId,
        name: &str,
        uri: &str,
        description: Option<&str>,
    ) -> Result<StoredCategory, StoreError> {
        let mut categories = self.categories.write().unwrap();
        let siblings = || categories.iter().filter(|c| c.parent_id == Some(parent));
        if siblings().any(|c| c.name == name) {
            return Err(StoreError::new(StoreErrorKind::AlreadyExists).with_backend("Mock"));
        }
        let category = StoredCategory {
            id: next_id(categories.iter().map(|c| c.id)),
            parent_id: Some(parent),
            name: name.to_owned(),
            uri: uri.to_owned(),
            description: description.map(str::to_owned),
            order: next_order(siblings().map(|c| c.order)),
        };
        categories.push(category.clone());
        Ok(category)
    }

    fn categories(&self) -> Result<Vec<StoredCategory>, StoreError> {
        Ok(self.categories.read().unwrap().clone())
    }

    fn find_page(
        &self,
        category: CategoryId,
        uri: &str,
    ) -> Result<Option<StoredPage>, StoreError> {
        Ok(self
            .pages
            .read()
            .unwrap()
            .iter()
            .find(|p| p.category_id == category && p.uri == uri)
            .cloned())
    }

    fn insert_page(
        &self,
        category: CategoryId,
        uri: &str,
        content: PageContent<'_>,
    ) -> Result<StoredPage, StoreError> {
        self.check_writable(uri)?;
        let mut pages = self.pages.write().unwrap();
        let siblings = || pages.iter().filter(|p| p.category_id == category);
        if siblings().any(|p| p.uri == uri) {
            return Err(StoreError::new(StoreErrorKind::AlreadyExists).with_backend("Mock"));
        }
        let page = StoredPage {
            id: next_id(pages.iter().map(|p| p.id)),
            category_id: category,
            uri: uri.to_owned(),
            order: next_order(siblings().map(|p| p.order)),
            title: content.title.to_owned(),
            abstract_text: content.abstract_text.to_owned(),
            body: content.body.to_owned(),
        };
        pages.push(page.clone());
        Ok(page)
    }

    fn update_page(&self, id: PageId, content: PageContent<'_>) -> Result<(), StoreError> {
        self.update_with(id, |page| {
            content.title.clone_into(&mut page.title);
            content.abstract_text.clone_into(&mut page.abstract_text);
            content.body.clone_into(&mut page.body);
        })
    }

    fn update_page_body(&self, id: PageId, body: &str) -> Result<(), StoreError> {
        self.update_with(id, |page| body.clone_into(&mut page.body))
    }

    fn pages(&self) -> Result<Vec<StoredPage>, StoreError> {
        let mut pages = self.pages.read().unwrap().clone();
        pages.sort_by_key(|p| (p.category_id, p.order, p.id));
        Ok(pages)
    }

    fn begin(&self) -> Result<(), StoreError> {
        let categories = self.categories.read().unwrap().clone();
        let pages = self.pages.read().unwrap().clone();
        *self.snapshot.write().unwrap() = Some((categories, pages));
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.snapshot.write().unwrap().take();
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        if let Some((categories, pages)) = self.snapshot.write().unwrap().take() {
            *self.categories.write().unwrap() = categories;
            *self.pages.write().unwrap() = pages;
        }
        Ok(())
    }
}
