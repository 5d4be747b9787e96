//! Scope directory discovery
//!
//! Resolution order for the global directory:
//! 1. CLI override (if provided)
//! 2. `DOTAI_GLOBAL_DIR` environment variable
//! 3. Platform-specific user config directory
//!
//! The local directory is always `.dotai` under the working directory.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::category::ConfigScope;
use crate::error::{AssetError, Result};

/// Environment override for the global scope directory
pub const GLOBAL_DIR_ENV: &str = "DOTAI_GLOBAL_DIR";

/// Name of the local scope directory inside a project
pub const LOCAL_DIR_NAME: &str = ".dotai";

/// Directories backing the two configuration scopes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopePaths {
    pub global: PathBuf,
    pub local: PathBuf,
}

impl ScopePaths {
    pub fn new(global: PathBuf, local: PathBuf) -> Self {
        Self { global, local }
    }

    /// Discover scope directories for the given working directory
    pub fn discover(global_override: Option<PathBuf>, cwd: &Path) -> Result<Self> {
        let global = match global_override {
            Some(path) => {
                if !path.is_absolute() {
                    return Err(AssetError::Validation(format!(
                        "Global directory must be absolute (got: {})",
                        path.display()
                    )));
                }
                debug!("Using global directory override: {}", path.display());
                path
            }
            None => match std::env::var_os(GLOBAL_DIR_ENV).filter(|v| !v.is_empty()) {
                Some(dir) => {
                    debug!("Using {} = {:?}", GLOBAL_DIR_ENV, dir);
                    PathBuf::from(dir)
                }
                None => Self::platform_config_dir()?,
            },
        };

        Ok(Self {
            global,
            local: cwd.join(LOCAL_DIR_NAME),
        })
    }

    pub fn dir(&self, scope: ConfigScope) -> &Path {
        match scope {
            ConfigScope::Global => &self.global,
            ConfigScope::Local => &self.local,
        }
    }

    /// Registry index cache lives under the global scope
    pub fn cache_dir(&self) -> PathBuf {
        self.global.join("cache")
    }

    fn platform_config_dir() -> Result<PathBuf> {
        directories::ProjectDirs::from("dev", "dotai", "dotai")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("dotai")))
            .ok_or_else(|| {
                AssetError::Validation("Could not determine config directory".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_must_be_absolute() {
        let err = ScopePaths::discover(Some(PathBuf::from("relative/dir")), Path::new("/tmp"))
            .unwrap_err();
        assert!(err.to_string().contains("must be absolute"));
    }

    #[test]
    fn test_override_and_local_dir() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global");
        let paths = ScopePaths::discover(Some(global.clone()), temp_dir.path()).unwrap();

        assert_eq!(paths.dir(ConfigScope::Global), global.as_path());
        assert_eq!(paths.local, temp_dir.path().join(".dotai"));
        assert_eq!(paths.cache_dir(), global.join("cache"));
    }
}
