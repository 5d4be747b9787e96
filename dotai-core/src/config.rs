//! Engine settings (`settings.yaml`)
//!
//! Settings are read from the global scope, then the local scope (local keys
//! win), then the `DOTAI_ASSETS_INDEX` environment variable.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::category::ConfigScope;
use crate::error::{AssetError, Result};
use crate::store::ScopePaths;

/// Settings file name inside a scope directory
pub const SETTINGS_FILE: &str = "settings.yaml";

/// Environment override for the catalog index location
pub const ASSETS_INDEX_ENV: &str = "DOTAI_ASSETS_INDEX";

/// Default registry index location
pub const DEFAULT_INDEX_URL: &str = "https://assets.dotai.dev/index.yaml";

/// Contents of one `settings.yaml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Catalog index location override (URL or filesystem path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets_index: Option<String>,

    /// Default registry index URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
}

impl Settings {
    /// Load one settings file; a missing file yields defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml_ng::from_str(&content).map_err(|source| AssetError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and layer both scopes plus the environment override
    pub fn load(paths: &ScopePaths) -> Result<Self> {
        let global = Self::load_from_path(&paths.dir(ConfigScope::Global).join(SETTINGS_FILE))?;
        let local = Self::load_from_path(&paths.dir(ConfigScope::Local).join(SETTINGS_FILE))?;

        let mut settings = global.overlay(local);
        if let Some(index) = std::env::var(ASSETS_INDEX_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            debug!("Using {} = {}", ASSETS_INDEX_ENV, index);
            settings.assets_index = Some(index);
        }
        Ok(settings)
    }

    /// Keys set in `other` replace ours
    pub fn overlay(self, other: Settings) -> Settings {
        Settings {
            assets_index: other.assets_index.or(self.assets_index),
            registry_url: other.registry_url.or(self.registry_url),
        }
    }

    /// Where to fetch the catalog index from
    pub fn index_location(&self) -> &str {
        self.assets_index
            .as_deref()
            .or(self.registry_url.as_deref())
            .unwrap_or(DEFAULT_INDEX_URL)
    }
}
