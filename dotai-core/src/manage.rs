//! Manual entry management: create, edit and remove within one scope

use crate::category::{Category, ConfigScope};
use crate::entry::{CategoryEntry, EntryEdit};
use crate::error::{AssetError, Result};
use crate::resolve::{resolve_all, resolve_one};
use crate::store::{DocumentStore, StoreResolver};

/// Result of an edit
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub entry: CategoryEntry,
    /// The entry was registry-installed and is now manually authored
    pub origin_cleared: bool,
}

/// Add a manually authored entry. Refuses to replace an existing entry of the
/// same name in the target scope.
pub fn create_entry<D: DocumentStore>(
    stores: &StoreResolver<D>,
    scope: ConfigScope,
    entry: CategoryEntry,
) -> Result<()> {
    let mut store = stores.load_single_tolerant(scope, entry.category)?;
    if store.contains(&entry.name) {
        return Err(AssetError::Validation(format!(
            "{} '{}' already exists in the {} scope; use edit to change it",
            entry.category, entry.name, scope
        )));
    }

    tracing::debug!("Adding {} '{}' to {} scope", entry.category, entry.name, scope);
    let mut entry = entry;
    entry.scope = scope;
    store.insert(entry);
    stores.write(scope, &store)
}

/// Apply `edit` to the single entry of `scope` matching `query`
pub fn edit_entry<D: DocumentStore>(
    stores: &StoreResolver<D>,
    scope: ConfigScope,
    category: Category,
    query: &str,
    edit: EntryEdit,
) -> Result<EditOutcome> {
    if edit.is_empty() {
        return Err(AssetError::Validation(
            "Nothing to change: pass a new source, --description or --tag".to_string(),
        ));
    }

    let mut store = stores.load_single(scope, category)?;
    let name = resolve_one(store.entries(), category.as_str(), query)?
        .0
        .to_string();

    let entry = store
        .get_mut(&name)
        .ok_or_else(|| AssetError::not_found(category.as_str(), query))?;
    let origin_cleared = entry.apply_edit(edit);
    let entry = entry.clone();

    stores.write(scope, &store)?;
    Ok(EditOutcome {
        entry,
        origin_cleared,
    })
}

/// Names in `scope` a removal of `query` would delete
pub fn removal_candidates<D: DocumentStore>(
    stores: &StoreResolver<D>,
    scope: ConfigScope,
    category: Category,
    query: &str,
) -> Result<Vec<String>> {
    let store = stores.load_single(scope, category)?;
    let names = resolve_all(store.entries(), category.as_str(), query)?;
    Ok(names.into_iter().map(str::to_string).collect())
}

/// Delete the named entries from `scope` and write the document back.
/// Returns the removed entries in the order given.
pub fn remove_entries<D: DocumentStore>(
    stores: &StoreResolver<D>,
    scope: ConfigScope,
    category: Category,
    names: &[String],
) -> Result<Vec<CategoryEntry>> {
    let mut store = stores.load_single(scope, category)?;

    let mut removed = Vec::with_capacity(names.len());
    for name in names {
        match store.remove(name) {
            Some(entry) => removed.push(entry),
            None => return Err(AssetError::not_found(category.as_str(), name)),
        }
    }

    stores.write(scope, &store)?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ContentSource;
    use crate::store::ScopePaths;
    use tempfile::TempDir;

    fn stores(temp_dir: &TempDir) -> StoreResolver {
        StoreResolver::new(ScopePaths::new(
            temp_dir.path().join("global"),
            temp_dir.path().join("local"),
        ))
    }

    fn context(name: &str, file: &str) -> CategoryEntry {
        CategoryEntry::new_manual(
            name,
            Category::Context,
            ConfigScope::Local,
            ContentSource::File(file.to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_create_refuses_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        let stores = stores(&temp_dir);

        create_entry(&stores, ConfigScope::Local, context("readme", "README.md")).unwrap();
        let err = create_entry(&stores, ConfigScope::Local, context("readme", "OTHER.md"))
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));

        // Same name in the other scope is allowed
        create_entry(&stores, ConfigScope::Global, context("readme", "GLOBAL.md")).unwrap();
        let global = stores
            .load_single(ConfigScope::Global, Category::Context)
            .unwrap();
        assert_eq!(global.get("readme").unwrap().scope, ConfigScope::Global);
    }

    #[test]
    fn test_create_appends_to_order() {
        let temp_dir = TempDir::new().unwrap();
        let stores = stores(&temp_dir);
        for name in ["zeta", "alpha", "mid"] {
            create_entry(&stores, ConfigScope::Local, context(name, "x.md")).unwrap();
        }
        let store = stores
            .load_single(ConfigScope::Local, Category::Context)
            .unwrap();
        assert_eq!(store.names(), ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_edit_resolves_query_and_clears_origin() {
        let temp_dir = TempDir::new().unwrap();
        let stores = stores(&temp_dir);
        let mut installed = context("docs/architecture", "ARCH.md");
        installed.origin = "assets/docs/architecture@v1.0.0".to_string();
        create_entry(&stores, ConfigScope::Local, installed).unwrap();

        let outcome = edit_entry(
            &stores,
            ConfigScope::Local,
            Category::Context,
            "ARCH",
            EntryEdit {
                content: Some(ContentSource::File("NEW.md".to_string())),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(outcome.origin_cleared);
        assert_eq!(outcome.entry.name, "docs/architecture");

        let store = stores
            .load_single(ConfigScope::Local, Category::Context)
            .unwrap();
        assert!(store.get("docs/architecture").unwrap().is_manual());
    }

    #[test]
    fn test_edit_requires_changes_and_documents() {
        let temp_dir = TempDir::new().unwrap();
        let stores = stores(&temp_dir);

        let empty = edit_entry(
            &stores,
            ConfigScope::Local,
            Category::Context,
            "x",
            EntryEdit::default(),
        );
        assert!(matches!(empty, Err(AssetError::Validation(_))));

        let missing = edit_entry(
            &stores,
            ConfigScope::Local,
            Category::Context,
            "x",
            EntryEdit {
                description: Some("d".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(missing, Err(AssetError::NoDocuments { .. })));
    }

    #[test]
    fn test_remove_all_candidates_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let stores = stores(&temp_dir);
        for name in ["golang/review/code", "readme", "golang/review/architecture"] {
            create_entry(&stores, ConfigScope::Local, context(name, "x.md")).unwrap();
        }

        let names =
            removal_candidates(&stores, ConfigScope::Local, Category::Context, "review").unwrap();
        assert_eq!(
            names,
            vec!["golang/review/architecture", "golang/review/code"]
        );

        let removed = remove_entries(&stores, ConfigScope::Local, Category::Context, &names).unwrap();
        assert_eq!(removed.len(), 2);

        let store = stores
            .load_single(ConfigScope::Local, Category::Context)
            .unwrap();
        assert_eq!(store.names(), ["readme"]);

        let err =
            remove_entries(&stores, ConfigScope::Local, Category::Context, &names).unwrap_err();
        assert!(err.is_not_found());
    }
}
