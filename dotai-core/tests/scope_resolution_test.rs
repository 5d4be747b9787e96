//! Scope discovery, settings layering and name resolution over real documents

mod common;

use anyhow::Result;
use dotai_core::config::{Settings, ASSETS_INDEX_ENV, SETTINGS_FILE};
use dotai_core::entry::{CategoryEntry, ContentSource, EntryEdit};
use dotai_core::manage::{create_entry, edit_entry, remove_entries, removal_candidates};
use dotai_core::resolve::{resolve_all, resolve_one};
use dotai_core::store::{ScopePaths, GLOBAL_DIR_ENV, LOCAL_DIR_NAME};
use dotai_core::{AssetError, Category, ConfigScope};
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use tempfile::TempDir;

fn task(name: &str, prompt: &str) -> CategoryEntry {
    CategoryEntry::new_manual(
        name,
        Category::Task,
        ConfigScope::Local,
        ContentSource::Prompt(prompt.to_string()),
    )
    .unwrap()
}

#[test]
#[serial]
fn test_discover_prefers_flag_then_env() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cwd = temp_dir.path().join("work");
    let from_env = temp_dir.path().join("env-global");
    let from_flag = temp_dir.path().join("flag-global");

    env::set_var(GLOBAL_DIR_ENV, &from_env);
    let paths = ScopePaths::discover(None, &cwd)?;
    assert_eq!(paths.global, from_env);
    assert_eq!(paths.local, cwd.join(LOCAL_DIR_NAME));

    let paths = ScopePaths::discover(Some(from_flag.clone()), &cwd)?;
    assert_eq!(paths.global, from_flag);
    env::remove_var(GLOBAL_DIR_ENV);

    let relative = ScopePaths::discover(Some("relative/dir".into()), &cwd);
    assert!(matches!(relative, Err(AssetError::Validation(_))));
    Ok(())
}

#[test]
#[serial]
fn test_settings_layering() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let paths = common::scope_paths(temp_dir.path());
    std::fs::create_dir_all(&paths.global)?;
    std::fs::create_dir_all(&paths.local)?;

    std::fs::write(
        paths.global.join(SETTINGS_FILE),
        "registry_url: https://mirror.example/index.yaml\nassets_index: /global/index.yaml\n",
    )?;
    std::fs::write(paths.local.join(SETTINGS_FILE), "assets_index: ./vendor/index.yaml\n")?;

    env::remove_var(ASSETS_INDEX_ENV);
    let settings = Settings::load(&paths)?;
    assert_eq!(settings.index_location(), "./vendor/index.yaml");
    assert_eq!(
        settings.registry_url.as_deref(),
        Some("https://mirror.example/index.yaml")
    );

    env::set_var(ASSETS_INDEX_ENV, "/env/index.yaml");
    let settings = Settings::load(&paths)?;
    assert_eq!(settings.assets_index.as_deref(), Some("/env/index.yaml"));
    env::remove_var(ASSETS_INDEX_ENV);
    Ok(())
}

#[test]
fn test_local_shadows_global_for_resolution() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let stores = common::stores(temp_dir.path());

    create_entry(&stores, ConfigScope::Global, task("cwd/dotai/create-role", "global"))?;
    create_entry(&stores, ConfigScope::Global, task("golang/review/architecture", "a"))?;
    create_entry(&stores, ConfigScope::Local, task("golang/review/code", "c"))?;
    create_entry(&stores, ConfigScope::Local, task("cwd/dotai/create-role", "local"))?;

    let merged = stores.load_merged(Category::Task)?;
    let (name, entry) = resolve_one(merged.entries(), "task", "CREATE-ROLE")?;
    assert_eq!(name, "cwd/dotai/create-role");
    assert_eq!(entry.content.value(), "local");
    assert_eq!(entry.scope, ConfigScope::Local);

    let err = resolve_one(merged.entries(), "task", "review").unwrap_err();
    assert_eq!(
        err.to_string(),
        "task matching \"review\" is ambiguous, candidates:\n  - golang/review/architecture\n  - golang/review/code"
    );
    assert_eq!(
        resolve_all(merged.entries(), "task", "golang.review.code")?,
        vec!["golang/review/code"]
    );
    Ok(())
}

#[test]
fn test_edit_and_remove_round_trip_preserves_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let stores = common::stores(temp_dir.path());

    for (name, file) in [("readme", "README.md"), ("agents", "AGENTS.md"), ("arch", "ARCH.md")] {
        let entry = CategoryEntry::new_manual(
            name,
            Category::Context,
            ConfigScope::Local,
            ContentSource::File(file.to_string()),
        )?;
        create_entry(&stores, ConfigScope::Local, entry)?;
    }

    edit_entry(
        &stores,
        ConfigScope::Local,
        Category::Context,
        "agents",
        EntryEdit {
            description: Some("Agent instructions".to_string()),
            tags: Some(vec!["docs".to_string()]),
            content: None,
        },
    )?;

    let names = removal_candidates(&stores, ConfigScope::Local, Category::Context, "readme")?;
    remove_entries(&stores, ConfigScope::Local, Category::Context, &names)?;

    let store = stores.load_single(ConfigScope::Local, Category::Context)?;
    assert_eq!(store.names(), ["agents", "arch"]);
    let agents = store.get("agents").unwrap();
    assert_eq!(agents.description.as_deref(), Some("Agent instructions"));
    assert_eq!(agents.tags, vec!["docs"]);
    Ok(())
}
