//! Asset engine error types with clear, actionable messages

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the engine
pub type Result<T> = std::result::Result<T, AssetError>;

/// Errors produced by the asset resolution engine
#[derive(Error, Debug)]
pub enum AssetError {
    /// No candidates for a name or a search
    #[error("{0}")]
    NotFound(String),

    /// Several candidates matched at the same tier
    #[error("{kind} matching {query:?} is ambiguous, candidates:\n{}", bullet_list(.candidates))]
    Ambiguous {
        kind: String,
        query: String,
        candidates: Vec<String>,
    },

    /// Bad user input: short query, malformed pattern, bad selection
    #[error("{0}")]
    Validation(String),

    /// An interactive prompt was needed but stdin is not a terminal
    #[error("Interactive selection requires a terminal.\n\nUse a more specific query or the full category/name.")]
    TerminalRequired,

    /// The registry could not be reached or returned garbage
    #[error("Registry unavailable ({location}): {message}")]
    Transport { location: String, message: String },

    /// The scope directory or category document does not exist
    #[error("No documents present at {}", .path.display())]
    NoDocuments { path: PathBuf },

    /// Failed to read or write a document
    #[error("Failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A document exists but is not valid YAML for its schema
    #[error("Failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    /// A stored or fetched entry violates an entry invariant
    #[error("Invalid entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    /// Aggregated per-item failures from a sequential batch
    #[error("{} of the requested items failed:\n{}", .0.len(), failure_list(.0))]
    Batch(Vec<ItemFailure>),
}

/// One failed item of a batch operation
#[derive(Debug)]
pub struct ItemFailure {
    /// The query or name the failure belongs to
    pub item: String,
    pub error: AssetError,
}

impl AssetError {
    pub fn not_found(kind: &str, query: &str) -> Self {
        AssetError::NotFound(format!("{kind} matching {query:?} not found"))
    }

    pub fn transport(location: impl Into<String>, message: impl ToString) -> Self {
        AssetError::Transport {
            location: location.into(),
            message: message.to_string(),
        }
    }

    pub fn invalid_entry(name: impl Into<String>, reason: impl Into<String>) -> Self {
        AssetError::InvalidEntry {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Registry failures are recoverable during search and fatal during install
    pub fn is_transport(&self) -> bool {
        matches!(self, AssetError::Transport { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AssetError::NotFound(_) | AssetError::NoDocuments { .. }
        )
    }

    /// Collapse a list of failures: none is success, one is returned as is
    pub fn from_failures(mut failures: Vec<ItemFailure>) -> Result<()> {
        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0).error),
            _ => Err(AssetError::Batch(failures)),
        }
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|c| format!("  - {c}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn failure_list(failures: &[ItemFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {}: {}", f.item, f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = AssetError::Ambiguous {
            kind: "role".to_string(),
            query: "review".to_string(),
            candidates: vec![
                "golang/review/architecture".to_string(),
                "golang/review/code".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"review\""));
        assert!(msg.contains("  - golang/review/architecture"));
        assert!(msg.contains("  - golang/review/code"));
    }

    #[test]
    fn test_from_failures() {
        assert!(AssetError::from_failures(Vec::new()).is_ok());

        let single = AssetError::from_failures(vec![ItemFailure {
            item: "a".to_string(),
            error: AssetError::not_found("asset", "a"),
        }])
        .unwrap_err();
        assert!(single.is_not_found());

        let batch = AssetError::from_failures(vec![
            ItemFailure {
                item: "a".to_string(),
                error: AssetError::not_found("asset", "a"),
            },
            ItemFailure {
                item: "b".to_string(),
                error: AssetError::transport("https://x", "timed out"),
            },
        ])
        .unwrap_err();
        let msg = batch.to_string();
        assert!(msg.starts_with("2 of the requested items failed"));
        assert!(msg.contains("a: asset matching \"a\" not found"));
        assert!(msg.contains("b: Registry unavailable"));
    }
}
