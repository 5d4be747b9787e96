//! Scope and store resolution
//!
//! Entries live in two scope directories. The merged view lets the local
//! scope shadow the global one; writes always target a single scope and
//! overwrite the whole category document.

mod document;
mod paths;

pub use document::{CategoryDocument, DocumentStore, YamlDocumentStore};
pub use paths::{ScopePaths, GLOBAL_DIR_ENV, LOCAL_DIR_NAME};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::category::{Category, ConfigScope};
use crate::entry::CategoryEntry;
use crate::error::{AssetError, Result};

/// Keyed entries of one category plus their explicit display order
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryStore {
    category: Category,
    entries: HashMap<String, CategoryEntry>,
    order: Vec<String>,
}

impl CategoryStore {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Build from a loaded document, repairing the order list: names without
    /// a record are dropped, records missing from the list are appended sorted.
    pub fn from_document(
        category: Category,
        scope: ConfigScope,
        document: CategoryDocument,
    ) -> Result<Self> {
        let mut entries = HashMap::with_capacity(document.records.len());
        for (name, record) in document.records {
            let entry = CategoryEntry::from_record(&name, category, scope, record)?;
            entries.insert(name, entry);
        }

        let mut order = Vec::with_capacity(entries.len());
        if category.is_ordered() {
            let mut seen = HashSet::new();
            for name in document.order {
                if entries.contains_key(&name) && seen.insert(name.clone()) {
                    order.push(name);
                }
            }
            let mut rest: Vec<String> = entries
                .keys()
                .filter(|name| !seen.contains(*name))
                .cloned()
                .collect();
            rest.sort();
            order.extend(rest);
        } else {
            order.extend(entries.keys().cloned());
            order.sort();
        }

        Ok(Self {
            category,
            entries,
            order,
        })
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&CategoryEntry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut CategoryEntry> {
        self.entries.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Keyed view used by the name resolver
    pub fn entries(&self) -> &HashMap<String, CategoryEntry> {
        &self.entries
    }

    /// Names in display order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Entries in display order
    pub fn iter(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.order.iter().filter_map(|name| self.entries.get(name))
    }

    /// Insert or replace an entry. A replaced entry keeps its position; a new
    /// one is appended (ordered categories) or placed by name.
    pub fn insert(&mut self, entry: CategoryEntry) -> Option<CategoryEntry> {
        let name = entry.name.clone();
        let previous = self.entries.insert(name.clone(), entry);
        if previous.is_none() {
            if self.category.is_ordered() {
                self.order.push(name);
            } else {
                let pos = self.order.partition_point(|n| n < &name);
                self.order.insert(pos, name);
            }
        }
        previous
    }

    pub fn remove(&mut self, name: &str) -> Option<CategoryEntry> {
        let removed = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    fn to_records(&self) -> Vec<(String, crate::entry::EntryRecord)> {
        self.iter()
            .map(|entry| (entry.name.clone(), entry.to_record()))
            .collect()
    }
}

/// Loads and writes category stores across the two scopes
pub struct StoreResolver<D: DocumentStore = YamlDocumentStore> {
    paths: ScopePaths,
    documents: D,
}

impl StoreResolver<YamlDocumentStore> {
    pub fn new(paths: ScopePaths) -> Self {
        Self::with_documents(paths, YamlDocumentStore)
    }
}

impl<D: DocumentStore> StoreResolver<D> {
    pub fn with_documents(paths: ScopePaths, documents: D) -> Self {
        Self { paths, documents }
    }

    /// Directory backing a scope
    pub fn scope_dir(&self, scope: ConfigScope) -> &Path {
        self.paths.dir(scope)
    }

    /// Load one scope without merging. Fails with `NoDocuments` when the
    /// scope has no document for the category.
    pub fn load_single(&self, scope: ConfigScope, category: Category) -> Result<CategoryStore> {
        let document = self.documents.load(self.scope_dir(scope), category)?;
        CategoryStore::from_document(category, scope, document)
    }

    /// Like [`load_single`](Self::load_single) but an absent document yields
    /// an empty store
    pub fn load_single_tolerant(
        &self,
        scope: ConfigScope,
        category: Category,
    ) -> Result<CategoryStore> {
        match self.load_single(scope, category) {
            Err(AssetError::NoDocuments { path }) => {
                tracing::trace!("No {} document at {}", category.plural(), path.display());
                Ok(CategoryStore::new(category))
            }
            other => other,
        }
    }

    /// Merged view: local entries shadow global ones of the same name. Order
    /// is the local order followed by global names not already present.
    pub fn load_merged(&self, category: Category) -> Result<CategoryStore> {
        let global = self.load_single_tolerant(ConfigScope::Global, category)?;
        let local = self.load_single_tolerant(ConfigScope::Local, category)?;
        Ok(merge_scopes(global, local))
    }

    /// Merged views of every category
    pub fn load_all_merged(&self) -> Result<Vec<CategoryStore>> {
        Category::ALL
            .iter()
            .map(|category| self.load_merged(*category))
            .collect()
    }

    /// Overwrite the scope's whole category document with `store`
    pub fn write(&self, scope: ConfigScope, store: &CategoryStore) -> Result<()> {
        self.documents
            .write(self.scope_dir(scope), store.category(), &store.to_records())
    }
}

fn merge_scopes(global: CategoryStore, local: CategoryStore) -> CategoryStore {
    let category = local.category;
    let mut order = local.order;
    let mut entries = global.entries;

    let present: HashSet<String> = order.iter().cloned().collect();
    order.extend(
        global
            .order
            .into_iter()
            .filter(|name| !present.contains(name)),
    );
    entries.extend(local.entries);

    if !category.is_ordered() {
        order.sort();
    }

    CategoryStore {
        category,
        entries,
        order,
    }
}
