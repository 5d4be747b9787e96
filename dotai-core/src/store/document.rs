//! Category document persistence
//!
//! Each scope directory holds one YAML document per category:
//!
//! ```yaml
//! roles:
//!   golang/review/architecture:
//!     description: Reviews Go architecture
//!     origin: github.com/dotai/assets/roles/golang/review/architecture@v0.1.0
//!     prompt: ...
//! order:
//!   - golang/review/architecture
//! ```
//!
//! The `order` key is only written for ordered categories (roles, contexts).

use serde_yaml_ng::{Mapping, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::category::Category;
use crate::entry::EntryRecord;
use crate::error::{AssetError, Result};

const ORDER_KEY: &str = "order";

/// Raw contents of one category document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryDocument {
    pub records: HashMap<String, EntryRecord>,
    /// Persisted insertion order (empty for unordered categories)
    pub order: Vec<String>,
}

/// Load/write collaborator for category documents
pub trait DocumentStore {
    /// Load the category document from a scope directory.
    ///
    /// Fails with [`AssetError::NoDocuments`] when the directory or the
    /// document is absent, so callers can tell "nothing here" apart from
    /// unreadable or malformed documents.
    fn load(&self, dir: &Path, category: Category) -> Result<CategoryDocument>;

    /// Overwrite the whole category document. `records` is written in
    /// `order` sequence.
    fn write(
        &self,
        dir: &Path,
        category: Category,
        records: &[(String, EntryRecord)],
    ) -> Result<()>;
}

/// YAML files on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlDocumentStore;

impl YamlDocumentStore {
    pub fn document_path(dir: &Path, category: Category) -> PathBuf {
        dir.join(category.file_name())
    }

    /// Parse a category document from its YAML text
    pub fn parse(path: &Path, category: Category, content: &str) -> Result<CategoryDocument> {
        let parse_err = |source| AssetError::Parse {
            path: path.to_path_buf(),
            source,
        };

        if content.trim().is_empty() {
            return Ok(CategoryDocument::default());
        }

        let root: Mapping = serde_yaml_ng::from_str(content).map_err(parse_err)?;

        let records = match root.get(category.plural()) {
            Some(Value::Null) | None => HashMap::new(),
            Some(value) => serde_yaml_ng::from_value(value.clone()).map_err(parse_err)?,
        };

        let order = match root.get(ORDER_KEY) {
            Some(value) if category.is_ordered() && !value.is_null() => {
                serde_yaml_ng::from_value(value.clone()).map_err(parse_err)?
            }
            _ => Vec::new(),
        };

        Ok(CategoryDocument { records, order })
    }

    /// Render a category document
    pub fn render(category: Category, records: &[(String, EntryRecord)]) -> Result<String> {
        let mut entries = Mapping::new();
        for (name, record) in records {
            let value = serde_yaml_ng::to_value(record).map_err(|e| {
                AssetError::invalid_entry(name.clone(), format!("cannot serialize: {e}"))
            })?;
            entries.insert(Value::String(name.clone()), value);
        }

        let mut root = Mapping::new();
        root.insert(
            Value::String(category.plural().to_string()),
            Value::Mapping(entries),
        );
        if category.is_ordered() {
            let order = records
                .iter()
                .map(|(name, _)| Value::String(name.clone()))
                .collect();
            root.insert(Value::String(ORDER_KEY.to_string()), Value::Sequence(order));
        }

        serde_yaml_ng::to_string(&root).map_err(|e| {
            AssetError::invalid_entry(category.plural(), format!("cannot serialize: {e}"))
        })
    }
}

impl DocumentStore for YamlDocumentStore {
    fn load(&self, dir: &Path, category: Category) -> Result<CategoryDocument> {
        let path = Self::document_path(dir, category);
        if !dir.is_dir() || !path.is_file() {
            return Err(AssetError::NoDocuments { path });
        }

        let content = std::fs::read_to_string(&path).map_err(|source| AssetError::Io {
            path: path.clone(),
            source,
        })?;

        let document = Self::parse(&path, category, &content)?;
        tracing::debug!(
            "Loaded {} {} from {}",
            document.records.len(),
            category.plural(),
            path.display()
        );
        Ok(document)
    }

    fn write(
        &self,
        dir: &Path,
        category: Category,
        records: &[(String, EntryRecord)],
    ) -> Result<()> {
        let path = Self::document_path(dir, category);
        let io_err = |source| AssetError::Io {
            path: path.clone(),
            source,
        };

        let content = Self::render(category, records)?;

        std::fs::create_dir_all(dir).map_err(io_err)?;

        // Write beside the target, then rename over it
        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(content.as_bytes()).map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        tracing::debug!(
            "Wrote {} {} to {}",
            records.len(),
            category.plural(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn prompt_record(prompt: &str) -> EntryRecord {
        EntryRecord {
            prompt: Some(prompt.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_document_is_no_documents() {
        let temp_dir = TempDir::new().unwrap();
        let err = YamlDocumentStore
            .load(temp_dir.path(), Category::Role)
            .unwrap_err();
        assert!(matches!(err, AssetError::NoDocuments { .. }));

        let err = YamlDocumentStore
            .load(&temp_dir.path().join("absent"), Category::Role)
            .unwrap_err();
        assert!(matches!(err, AssetError::NoDocuments { .. }));
    }

    #[test]
    fn test_malformed_document_is_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("roles.yaml"), "roles: [unclosed").unwrap();

        let err = YamlDocumentStore
            .load(temp_dir.path(), Category::Role)
            .unwrap_err();
        assert!(matches!(err, AssetError::Parse { .. }));
    }

    #[test]
    fn test_write_then_load_keeps_order() {
        let temp_dir = TempDir::new().unwrap();
        let records = vec![
            ("zeta".to_string(), prompt_record("z")),
            ("alpha".to_string(), prompt_record("a")),
        ];

        YamlDocumentStore
            .write(temp_dir.path(), Category::Context, &records)
            .unwrap();
        let doc = YamlDocumentStore
            .load(temp_dir.path(), Category::Context)
            .unwrap();

        assert_eq!(doc.order, vec!["zeta", "alpha"]);
        assert_eq!(doc.records.len(), 2);
        assert_eq!(doc.records["alpha"].prompt.as_deref(), Some("a"));
    }

    #[test]
    fn test_unordered_category_has_no_order_key() {
        let records = vec![("claude".to_string(), prompt_record("x"))];
        let rendered = YamlDocumentStore::render(Category::Agent, &records).unwrap();
        assert!(rendered.starts_with("agents:"));
        assert!(!rendered.contains("order:"));
    }

    #[test]
    fn test_empty_document_parses_empty() {
        let doc =
            YamlDocumentStore::parse(Path::new("roles.yaml"), Category::Role, "\n").unwrap();
        assert!(doc.records.is_empty());
        assert!(doc.order.is_empty());

        let doc = YamlDocumentStore::parse(Path::new("roles.yaml"), Category::Role, "roles:\n")
            .unwrap();
        assert!(doc.records.is_empty());
    }
}
