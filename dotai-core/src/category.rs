//! Asset categories and configuration scopes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AssetError;

/// A partition of configuration entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Agent,
    Role,
    Context,
    Task,
}

impl Category {
    /// All categories in display order
    pub const ALL: [Category; 4] = [
        Category::Agent,
        Category::Role,
        Category::Context,
        Category::Task,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Agent => "agent",
            Category::Role => "role",
            Category::Context => "context",
            Category::Task => "task",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            Category::Agent => "agents",
            Category::Role => "roles",
            Category::Context => "contexts",
            Category::Task => "tasks",
        }
    }

    /// Document file holding this category inside a scope directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Category::Agent => "agents.yaml",
            Category::Role => "roles.yaml",
            Category::Context => "contexts.yaml",
            Category::Task => "tasks.yaml",
        }
    }

    /// Roles and contexts persist an explicit insertion order
    pub fn is_ordered(&self) -> bool {
        match self {
            Category::Role | Category::Context => true,
            Category::Agent | Category::Task => false,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == lower || c.plural() == lower)
            .ok_or_else(|| {
                AssetError::Validation(format!(
                    "Unknown category '{s}'. Valid categories: agent, role, context, task"
                ))
            })
    }
}

/// Where a configuration entry lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    Global,
    Local,
}

impl ConfigScope {
    pub fn from_local_flag(local: bool) -> Self {
        if local {
            ConfigScope::Local
        } else {
            ConfigScope::Global
        }
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Global => f.write_str("global"),
            ConfigScope::Local => f.write_str("local"),
        }
    }
}
