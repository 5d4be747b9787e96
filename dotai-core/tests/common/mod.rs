//! Shared fixtures for the integration tests

#![allow(dead_code)]

use anyhow::Result;
use dotai_core::store::{ScopePaths, StoreResolver};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

pub const INDEX: &str = r#"
apiVersion: dotai.dev/v1
kind: AssetIndex
generated: "2026-01-01T00:00:00Z"
agents:
  claude:
    module: agents/claude
    version: v1.0.0
    description: Anthropic CLI agent
    tags: [anthropic]
roles:
  golang/review/architecture:
    module: roles/golang/review/architecture
    version: v1.2.0
    description: Reviews Go package architecture
    tags: [golang, review]
  golang/review/code:
    module: roles/golang/review/code
    version: v1.0.0
    description: Line-by-line Go code review
    tags: [golang, review]
contexts:
  project/readme:
    module: contexts/project/readme
    version: v0.3.0
    description: Include the project README
    tags: [docs]
tasks:
  cwd/dotai/create-role:
    module: tasks/cwd/dotai/create-role
    version: ""
    description: Create a role for the current project
    tags: [dotai]
"#;

const ASSETS: &[(&str, &str)] = &[
    ("agents/claude/v1.0.0.yaml", "command: claude\nmodel: large\n"),
    (
        "roles/golang/review/architecture/v1.2.0.yaml",
        "prompt: You review Go package architecture.\n",
    ),
    (
        "roles/golang/review/code/v1.0.0.yaml",
        "prompt: You review Go code line by line.\n",
    ),
    ("contexts/project/readme/v0.3.0.yaml", "file: README.md\n"),
    (
        "tasks/cwd/dotai/create-role/latest.yaml",
        "prompt: Create a role for this repository.\n",
    ),
];

/// Write a filesystem registry (index plus asset documents) under `root`.
/// Returns the index path.
pub fn write_registry(root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(root)?;
    let index = root.join("index.yaml");
    fs::write(&index, INDEX)?;

    for (relative, content) in ASSETS {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(index)
}

/// Scope directories inside `root`
pub fn scope_paths(root: &Path) -> ScopePaths {
    ScopePaths::new(root.join("global"), root.join("project").join(".dotai"))
}

pub fn stores(root: &Path) -> StoreResolver {
    StoreResolver::new(scope_paths(root))
}
