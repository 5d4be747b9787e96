//! Per-invocation state shared by all commands

use anyhow::{Context as _, Result};
use std::io::{BufReader, IsTerminal, Stderr, Stdin};
use std::path::PathBuf;

use dotai_core::catalog::{FetchPolicy, Registry};
use dotai_core::config::Settings;
use dotai_core::prompt::Prompter;
use dotai_core::store::{ScopePaths, StoreResolver};

pub type TerminalPrompter = Prompter<BufReader<Stdin>, Stderr>;

pub struct AppContext {
    pub paths: ScopePaths,
    pub settings: Settings,
    pub stores: StoreResolver,
}

impl AppContext {
    pub fn load(global_dir: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        let paths = ScopePaths::discover(global_dir, &cwd)?;
        tracing::debug!(
            "Scopes: global={} local={}",
            paths.global.display(),
            paths.local.display()
        );

        let settings = Settings::load(&paths)?;
        let stores = StoreResolver::new(paths.clone());
        Ok(Self {
            paths,
            settings,
            stores,
        })
    }

    pub fn registry(&self) -> Result<Registry> {
        let location = self.settings.index_location();
        tracing::debug!("Catalog index location: {}", location);
        let registry = Registry::new(location)
            .with_context(|| format!("Failed to set up registry for {location}"))?;
        Ok(registry.with_cache_dir(self.paths.cache_dir()))
    }

    /// Prompts read stdin and write to stderr so stdout stays parseable
    pub fn prompter(&self) -> TerminalPrompter {
        let stdin = std::io::stdin();
        let interactive = stdin.is_terminal();
        Prompter::new(BufReader::new(stdin), std::io::stderr(), interactive)
    }
}

/// `--refresh` / `--offline` flags shared by catalog commands
#[derive(clap::Args, Debug, Clone, Copy, Default)]
pub struct FetchArgs {
    /// Force refresh of catalog index (bypass cache)
    #[clap(long, conflicts_with = "offline")]
    pub refresh: bool,

    /// Use the cached catalog index without network access
    #[clap(long)]
    pub offline: bool,
}

impl FetchArgs {
    pub fn policy(&self) -> FetchPolicy {
        if self.refresh {
            FetchPolicy::Refresh
        } else if self.offline {
            FetchPolicy::Offline
        } else {
            FetchPolicy::Validate
        }
    }
}
