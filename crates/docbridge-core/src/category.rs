//! Category hierarchy for one run.
//!
//! # Architecture
//!
//! Categories are stored in a flat `Vec` with parent/children relationships
//! tracked by indices, rooted at the single SDK category. The tree is rebuilt
//! per run from normalized pages (import) or stored rows (export) and
//! discarded afterwards; the store is the source of truth.

use std::cmp::Ordering;
use std::collections::HashMap;

use docbridge_store::{CategoryId, StoredCategory};

use crate::doxygen::slugify;
use crate::error::Error;

/// Index of a category node in its [`CategoryTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryKey(usize);

/// One category node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub name: String,
    /// Directory name in exported trees.
    pub uri: String,
    pub description: Option<String>,
    /// Declared position among sibling categories.
    pub order: Option<u32>,
    /// Store identity once materialized.
    pub store_id: Option<CategoryId>,
    parent: Option<CategoryKey>,
    children: Vec<CategoryKey>,
    pages: Vec<PageSlot>,
}

/// Page membership entry. `index` points into the caller's page list.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PageSlot {
    uri: String,
    order: Option<u32>,
    index: usize,
}

/// Child of a category in publishing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Child {
    Category(CategoryKey),
    /// Index into the page list the tree was filled from.
    Page(usize),
}

/// Declared order first, undeclared last, ties broken by `key`.
fn by_order_then(a: (Option<u32>, &str), b: (Option<u32>, &str)) -> Ordering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.1.cmp(b.1))
}

/// Arena-backed category tree.
#[derive(Debug, Clone)]
pub struct CategoryTree {
    nodes: Vec<CategoryNode>,
    /// `(parent, name)` lookup.
    by_name: HashMap<(CategoryKey, String), CategoryKey>,
}

impl CategoryTree {
    /// Create a tree holding only the root category.
    pub fn new(root_name: &str, root_id: Option<CategoryId>) -> Self {
        Self {
            nodes: vec![CategoryNode {
                name: root_name.to_owned(),
                uri: String::new(),
                description: None,
                order: None,
                store_id: root_id,
                parent: None,
                children: Vec::new(),
                pages: Vec::new(),
            }],
            by_name: HashMap::new(),
        }
    }

    /// Rebuild the subtree of stored categories beneath `root`.
    ///
    /// Categories not descending from `root` are ignored.
    pub fn from_stored(root: &StoredCategory, categories: &[StoredCategory]) -> Self {
        let mut tree = Self::new(&root.name, Some(root.id));
        let mut by_parent: HashMap<CategoryId, Vec<&StoredCategory>> = HashMap::new();
        for category in categories {
            if let Some(parent) = category.parent_id {
                by_parent.entry(parent).or_default().push(category);
            }
        }

        let mut queue = vec![(tree.root(), root.id)];
        while let Some((key, id)) = queue.pop() {
            let Some(children) = by_parent.get(&id) else {
                continue;
            };
            for stored in children {
                let child = tree.insert_child(key, &stored.name);
                let node = &mut tree.nodes[child.0];
                node.uri.clone_from(&stored.uri);
                node.description.clone_from(&stored.description);
                node.order = Some(stored.order);
                node.store_id = Some(stored.id);
                queue.push((child, stored.id));
            }
        }
        tree
    }

    pub fn root(&self) -> CategoryKey {
        CategoryKey(0)
    }

    pub fn get(&self, key: CategoryKey) -> &CategoryNode {
        &self.nodes[key.0]
    }

    pub fn get_mut(&mut self, key: CategoryKey) -> &mut CategoryNode {
        &mut self.nodes[key.0]
    }

    pub fn parent(&self, key: CategoryKey) -> Option<CategoryKey> {
        self.nodes[key.0].parent
    }

    /// Number of categories including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All category keys in creation order; parents precede their children.
    pub fn keys(&self) -> impl Iterator<Item = CategoryKey> + use<> {
        (0..self.nodes.len()).map(CategoryKey)
    }

    /// Return the category at `path` beneath the root, creating missing nodes.
    ///
    /// Repeated calls with the same path return the same key.
    pub fn get_or_create(&mut self, path: &[String]) -> CategoryKey {
        path.iter()
            .fold(self.root(), |parent, name| self.insert_child(parent, name))
    }

    /// Look up the category at `path` without creating it.
    pub fn find(&self, path: &[String]) -> Option<CategoryKey> {
        path.iter().try_fold(self.root(), |parent, name| {
            self.by_name.get(&(parent, name.clone())).copied()
        })
    }

    fn insert_child(&mut self, parent: CategoryKey, name: &str) -> CategoryKey {
        if let Some(existing) = self.by_name.get(&(parent, name.to_owned())) {
            return *existing;
        }
        let key = CategoryKey(self.nodes.len());
        self.nodes.push(CategoryNode {
            name: name.to_owned(),
            uri: slugify(name),
            description: None,
            order: None,
            store_id: None,
            parent: Some(parent),
            children: Vec::new(),
            pages: Vec::new(),
        });
        self.nodes[parent.0].children.push(key);
        self.by_name.insert((parent, name.to_owned()), key);
        key
    }

    /// Register a page in `category`.
    ///
    /// Returns `false` without changing the tree if the category already
    /// holds a page with this `uri`.
    pub fn add_page(
        &mut self,
        category: CategoryKey,
        uri: &str,
        order: Option<u32>,
        index: usize,
    ) -> bool {
        let pages = &mut self.nodes[category.0].pages;
        if pages.iter().any(|p| p.uri == uri) {
            return false;
        }
        pages.push(PageSlot {
            uri: uri.to_owned(),
            order,
            index,
        });
        true
    }

    /// Children of `category`: sub-categories first, then pages.
    ///
    /// Each group is sorted by declared order (undeclared last), ties broken
    /// by name for categories and by `uri` for pages.
    pub fn children_in_order(&self, category: CategoryKey) -> Vec<Child> {
        let node = &self.nodes[category.0];

        let mut categories: Vec<CategoryKey> = node.children.clone();
        categories.sort_by(|a, b| {
            let (a, b) = (&self.nodes[a.0], &self.nodes[b.0]);
            by_order_then((a.order, &a.name), (b.order, &b.name))
        });

        let mut pages: Vec<&PageSlot> = node.pages.iter().collect();
        pages.sort_by(|a, b| by_order_then((a.order, &a.uri), (b.order, &b.uri)));

        categories
            .into_iter()
            .map(Child::Category)
            .chain(pages.into_iter().map(|p| Child::Page(p.index)))
            .collect()
    }

    /// Page indices of `category` in publishing order.
    pub fn pages_in_order(&self, category: CategoryKey) -> Vec<usize> {
        self.children_in_order(category)
            .into_iter()
            .filter_map(|child| match child {
                Child::Page(index) => Some(index),
                Child::Category(_) => None,
            })
            .collect()
    }

    /// Category names from beneath the root down to `key`.
    pub fn path(&self, key: CategoryKey) -> Vec<String> {
        self.lineage(key)
            .map(|k| self.nodes[k.0].name.clone())
            .collect()
    }

    /// Slash-joined directory of `key` relative to the root, empty for the root.
    pub fn dir(&self, key: CategoryKey) -> String {
        self.lineage(key)
            .map(|k| self.nodes[k.0].uri.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Check that every category maps to its own output directory.
    ///
    /// A category whose `uri` is empty would write into its parent's
    /// directory, and sibling categories sharing a `uri` would write into the
    /// same one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] naming the offending categories.
    pub fn check_dirs(&self) -> Result<(), Error> {
        for key in self.keys() {
            let node = &self.nodes[key.0];
            let mut seen: HashMap<&str, &str> = HashMap::new();
            for &child_key in &node.children {
                let child = &self.nodes[child_key.0];
                if child.uri.is_empty() {
                    return Err(Error::Configuration(format!(
                        "category \"{}\" has no usable directory name",
                        self.path(child_key).join("/")
                    )));
                }
                if let Some(other) = seen.insert(&child.uri, &child.name) {
                    return Err(Error::Configuration(format!(
                        "categories \"{other}\" and \"{}\" under \"{}\" share directory \"{}\"",
                        child.name, node.name, child.uri
                    )));
                }
            }
        }
        Ok(())
    }

    /// Keys from beneath the root down to `key`.
    fn lineage(&self, key: CategoryKey) -> impl Iterator<Item = CategoryKey> + use<> {
        let mut keys = Vec::new();
        let mut current = key;
        while let Some(parent) = self.nodes[current.0].parent {
            keys.push(current);
            current = parent;
        }
        keys.into_iter().rev()
    }
}
