//! Catalog index parsing
//!
//! The index.yaml file lists every installable asset in a registry, grouped
//! by category, with its module path and current version.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::category::Category;
use crate::entry::Origin;
use crate::error::{AssetError, Result};

/// API version written by registry tooling
pub const INDEX_API_VERSION: &str = "dotai.dev/v1";

/// Serialized form of the index (index.yaml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexDocument {
    #[serde(default)]
    api_version: String,

    #[serde(default)]
    kind: String,

    /// When the index was generated
    #[serde(default)]
    generated: String,

    /// Base location for asset documents; defaults to the index's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,

    #[serde(default)]
    agents: BTreeMap<String, CatalogRecord>,

    #[serde(default)]
    roles: BTreeMap<String, CatalogRecord>,

    #[serde(default)]
    contexts: BTreeMap<String, CatalogRecord>,

    #[serde(default)]
    tasks: BTreeMap<String, CatalogRecord>,
}

/// One asset as written in the index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogRecord {
    /// Remote package path
    module: String,

    /// Semantic version, may be empty
    #[serde(default)]
    version: String,

    #[serde(default)]
    description: String,

    #[serde(default)]
    tags: Vec<String>,

    /// Explicit download location for the asset document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

/// A remote registry record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub category: Category,
    pub name: String,
    pub module: String,
    pub version: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CatalogEntry {
    pub fn new(category: Category, name: &str, module: &str, version: &str) -> Self {
        Self {
            category,
            name: name.to_string(),
            module: module.to_string(),
            version: version.to_string(),
            description: String::new(),
            tags: Vec::new(),
            url: None,
        }
    }

    /// Origin recorded on entries installed from this record
    pub fn origin(&self) -> Origin {
        Origin::new(self.module.clone(), self.version.clone())
    }

    /// `category/name`, unique across the index
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }

    /// Truncate description to first line
    pub fn short_description(&self) -> &str {
        self.description
            .lines()
            .next()
            .unwrap_or(&self.description)
            .trim()
    }

    pub fn tags_display(&self) -> String {
        self.tags.join(", ")
    }
}

/// One fetched registry snapshot. Immutable; a new fetch builds a new index.
#[derive(Debug, Clone, Default)]
pub struct CatalogIndex {
    generated: String,
    base_url: Option<String>,
    entries: BTreeMap<Category, BTreeMap<String, CatalogEntry>>,
    fingerprint: String,
}

impl CatalogIndex {
    /// Parse index from YAML string; the fingerprint is the content digest
    pub fn from_yaml(content: &str) -> Result<Self> {
        let document: IndexDocument = serde_yaml_ng::from_str(content).map_err(|e| {
            AssetError::Validation(format!("Failed to parse catalog index YAML: {e}"))
        })?;

        if !document.kind.is_empty() && document.kind != "AssetIndex" {
            return Err(AssetError::Validation(format!(
                "Invalid index kind '{}'. Expected 'AssetIndex'",
                document.kind
            )));
        }
        if !document.api_version.is_empty() && document.api_version != INDEX_API_VERSION {
            tracing::warn!(
                "Catalog index apiVersion '{}' differs from '{}'",
                document.api_version,
                INDEX_API_VERSION
            );
        }

        let mut entries = BTreeMap::new();
        for category in Category::ALL {
            let records = match category {
                Category::Agent => &document.agents,
                Category::Role => &document.roles,
                Category::Context => &document.contexts,
                Category::Task => &document.tasks,
            };
            let by_name: BTreeMap<String, CatalogEntry> = records
                .iter()
                .map(|(name, record)| {
                    let entry = CatalogEntry {
                        category,
                        name: name.clone(),
                        module: record.module.clone(),
                        version: record.version.clone(),
                        description: record.description.clone(),
                        tags: record.tags.clone(),
                        url: record.url.clone(),
                    };
                    (name.clone(), entry)
                })
                .collect();
            entries.insert(category, by_name);
        }

        Ok(Self {
            generated: document.generated,
            base_url: document.base_url,
            entries,
            fingerprint: fingerprint(content.as_bytes()),
        })
    }

    /// Build an index directly from entries (no backing document)
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            index
                .entries
                .entry(entry.category)
                .or_default()
                .insert(entry.name.clone(), entry);
        }
        index
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn generated(&self) -> &str {
        &self.generated
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&CatalogEntry> {
        self.entries.get(&category).and_then(|m| m.get(name))
    }

    /// Flat list: categories in display order, names sorted
    pub fn all_entries(&self) -> Vec<&CatalogEntry> {
        self.entries.values().flat_map(|m| m.values()).collect()
    }

    /// Total number of assets
    pub fn len(&self) -> usize {
        self.entries.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Content digest used as the index fingerprint
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
}

#[cfg(test)]
mod index_tests {
    use super::*;

    fn sample_index_yaml() -> &'static str {
        r#"
apiVersion: dotai.dev/v1
kind: AssetIndex
generated: "2026-01-10T00:00:00Z"
baseUrl: https://assets.example.dev
roles:
  golang/review/architecture:
    module: github.com/dotai/assets/roles/golang/review/architecture
    version: v0.2.0
    description: Reviews Go package architecture
    tags: [golang, review]
  golang/review/code:
    module: github.com/dotai/assets/roles/golang/review/code
    version: v0.1.3
    description: |
      Line-by-line Go code review
      with a second line
    tags: [golang, review]
agents:
  claude:
    module: github.com/dotai/assets/agents/claude
    version: v1.0.0
    description: Anthropic Claude CLI
    tags: [anthropic]
tasks:
  cwd/dotai/create-role:
    module: github.com/dotai/assets/tasks/create-role
    description: Create a role
"#
    }

    #[test]
    fn test_parse_index() {
        let index = CatalogIndex::from_yaml(sample_index_yaml()).unwrap();
        assert_eq!(index.len(), 4);
        assert_eq!(index.base_url(), Some("https://assets.example.dev"));
        assert!(index.fingerprint().starts_with("sha256:"));

        let task = index.get(Category::Task, "cwd/dotai/create-role").unwrap();
        assert_eq!(task.version, "");
        assert_eq!(task.category, Category::Task);
        assert!(index.get(Category::Role, "cwd/dotai/create-role").is_none());
    }

    #[test]
    fn test_all_entries_order() {
        let index = CatalogIndex::from_yaml(sample_index_yaml()).unwrap();
        let names: Vec<String> = index
            .all_entries()
            .iter()
            .map(|e| e.qualified_name())
            .collect();
        assert_eq!(
            names,
            vec![
                "agent/claude",
                "role/golang/review/architecture",
                "role/golang/review/code",
                "task/cwd/dotai/create-role",
            ]
        );
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = CatalogIndex::from_yaml(sample_index_yaml()).unwrap();
        let b = CatalogIndex::from_yaml(sample_index_yaml()).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());

        let changed = sample_index_yaml().replace("v0.2.0", "v0.3.0");
        let c = CatalogIndex::from_yaml(&changed).unwrap();
        assert_ne!(a.fingerprint(), c.fingerprint());
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let err = CatalogIndex::from_yaml("kind: Rulebook\n").unwrap_err();
        assert!(err.to_string().contains("AssetIndex"));
    }

    #[test]
    fn test_entry_helpers() {
        let index = CatalogIndex::from_yaml(sample_index_yaml()).unwrap();
        let code = index.get(Category::Role, "golang/review/code").unwrap();
        assert_eq!(code.short_description(), "Line-by-line Go code review");
        assert_eq!(code.tags_display(), "golang, review");
        assert_eq!(
            code.origin().to_string(),
            "github.com/dotai/assets/roles/golang/review/code@v0.1.3"
        );
    }
}
