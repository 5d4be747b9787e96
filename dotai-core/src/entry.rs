//! Stored configuration entries
//!
//! A [`CategoryEntry`] is the in-memory view of one record from a category
//! document. The on-disk shape is [`EntryRecord`]; conversion between the two
//! enforces the single-content-source invariant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::category::{Category, ConfigScope};
use crate::error::{AssetError, Result};

/// Where an entry's content comes from. Exactly one per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    File(String),
    Command(String),
    Prompt(String),
}

impl ContentSource {
    /// Build from the three optional fields, requiring exactly one of them
    pub fn from_fields(
        name: &str,
        file: Option<String>,
        command: Option<String>,
        prompt: Option<String>,
    ) -> Result<Self> {
        let mut sources: Vec<ContentSource> = [
            file.map(ContentSource::File),
            command.map(ContentSource::Command),
            prompt.map(ContentSource::Prompt),
        ]
        .into_iter()
        .flatten()
        .collect();

        match sources.len() {
            1 => Ok(sources.remove(0)),
            0 => Err(AssetError::invalid_entry(
                name,
                "one of file, command or prompt is required",
            )),
            n => Err(AssetError::invalid_entry(
                name,
                format!("only one of file, command or prompt may be set (found {n})"),
            )),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ContentSource::File(_) => "file",
            ContentSource::Command(_) => "command",
            ContentSource::Prompt(_) => "prompt",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            ContentSource::File(v) | ContentSource::Command(v) | ContentSource::Prompt(v) => v,
        }
    }
}

/// Provenance of a registry-installed entry (`module@version`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub module: String,
    pub version: String,
}

impl Origin {
    pub fn new(module: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            version: version.into(),
        }
    }

    /// Parse an origin string. Empty means manually authored.
    ///
    /// The version follows the last `@`, so module paths containing `@`
    /// are still split correctly.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.rsplit_once('@') {
            Some((module, version)) => Some(Self::new(module, version)),
            None => Some(Self::new(raw, "")),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            f.write_str(&self.module)
        } else {
            write!(f, "{}@{}", self.module, self.version)
        }
    }
}

/// On-disk record for one entry of a category document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub origin: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Category-specific fields the engine does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml_ng::Value>,
}

/// A stored configuration item
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEntry {
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    /// Display order is preserved; matching ignores it
    pub tags: Vec<String>,
    /// Scope the entry was loaded from
    pub scope: ConfigScope,
    /// Empty when manually authored, else `module@version`
    pub origin: String,
    pub content: ContentSource,
    pub extra: BTreeMap<String, serde_yaml_ng::Value>,
}

/// Field replacements applied by an edit
#[derive(Debug, Clone, Default)]
pub struct EntryEdit {
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub content: Option<ContentSource>,
}

impl EntryEdit {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.tags.is_none() && self.content.is_none()
    }
}

impl CategoryEntry {
    /// Create a manually authored entry
    pub fn new_manual(
        name: &str,
        category: Category,
        scope: ConfigScope,
        content: ContentSource,
    ) -> Result<Self> {
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            category,
            description: None,
            tags: Vec::new(),
            scope,
            origin: String::new(),
            content,
            extra: BTreeMap::new(),
        })
    }

    pub fn from_record(
        name: &str,
        category: Category,
        scope: ConfigScope,
        record: EntryRecord,
    ) -> Result<Self> {
        let content = ContentSource::from_fields(name, record.file, record.command, record.prompt)?;
        Ok(Self {
            name: name.to_string(),
            category,
            description: record.description.filter(|d| !d.trim().is_empty()),
            tags: record.tags,
            scope,
            origin: record.origin,
            content,
            extra: record.extra,
        })
    }

    pub fn to_record(&self) -> EntryRecord {
        let (mut file, mut command, mut prompt) = (None, None, None);
        match &self.content {
            ContentSource::File(v) => file = Some(v.clone()),
            ContentSource::Command(v) => command = Some(v.clone()),
            ContentSource::Prompt(v) => prompt = Some(v.clone()),
        }
        EntryRecord {
            description: self.description.clone(),
            tags: self.tags.clone(),
            origin: self.origin.clone(),
            file,
            command,
            prompt,
            extra: self.extra.clone(),
        }
    }

    pub fn is_manual(&self) -> bool {
        self.origin.trim().is_empty()
    }

    pub fn parsed_origin(&self) -> Option<Origin> {
        Origin::parse(&self.origin)
    }

    /// Version recorded in the origin, if the entry came from the registry
    pub fn installed_version(&self) -> Option<String> {
        self.parsed_origin().map(|o| o.version)
    }

    pub fn description_or_empty(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    /// Apply an edit in place. Returns true when the origin was cleared.
    ///
    /// Replacing the content with a different value turns the entry into a
    /// manually authored one; description and tag edits keep the origin.
    pub fn apply_edit(&mut self, edit: EntryEdit) -> bool {
        if let Some(description) = edit.description {
            self.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(tags) = edit.tags {
            self.tags = tags;
        }

        let mut origin_cleared = false;
        if let Some(content) = edit.content {
            if content != self.content {
                origin_cleared = !self.origin.is_empty();
                self.origin.clear();
                self.content = content;
            }
        }

        if origin_cleared {
            tracing::debug!(
                "Cleared origin of {} '{}' after content edit",
                self.category,
                self.name
            );
        }
        origin_cleared
    }
}

/// Names are map keys in the category document; `/` separates hierarchy levels
pub fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AssetError::Validation("Entry name is required".to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(AssetError::Validation(format!(
            "Entry name '{name}' must not contain whitespace"
        )));
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return Err(AssetError::Validation(format!(
            "Entry name '{name}' has an empty path segment"
        )));
    }
    Ok(())
}
