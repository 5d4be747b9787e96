//! dotai assets CLI commands
//!
//! Search the registry catalog, install assets into a scope and update
//! registry-installed entries.

use anyhow::Result;
use clap::Subcommand;
use std::collections::HashMap;
use std::io::Write;
use tabled::Tabled;

use dotai_core::catalog::{clear_cache, RegistryTransport};
use dotai_core::install::{decide, InstallAction, InstallOptions, InstallOutcome, Installer};
use dotai_core::resolve::resolve_all;
use dotai_core::search::{parse_tags, search, SearchResult};
use dotai_core::{Category, ConfigScope};

use crate::context::{AppContext, FetchArgs};
use crate::output::{truncate, Output};

/// Assets subcommand for searching and installing registry assets
#[derive(Subcommand, Debug)]
pub enum AssetsCommand {
    /// Search the catalog and the installed entries
    Search {
        /// Search terms (all must match; regex allowed)
        query: Vec<String>,

        /// Only entries carrying these tags (comma-separated)
        #[clap(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        /// Show module and tag columns
        #[clap(long)]
        verbose: bool,

        /// Output results as JSON
        #[clap(long)]
        json: bool,

        #[clap(flatten)]
        fetch: FetchArgs,
    },

    /// Install assets from the catalog
    Add {
        /// Asset queries, e.g. `code-review` or `role/golang/review/code`
        #[clap(required = true)]
        queries: Vec<String>,

        /// Install into the local scope instead of the global one
        #[clap(long)]
        local: bool,

        /// Only consider assets carrying these tags (comma-separated)
        #[clap(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        /// Replace manually authored entries without asking
        #[clap(long, short)]
        yes: bool,

        #[clap(flatten)]
        fetch: FetchArgs,
    },

    /// Update registry-installed entries to their catalog version
    Update {
        /// Names to update (updates all outdated entries if omitted)
        names: Vec<String>,

        /// Only look at the local scope
        #[clap(long)]
        local: bool,

        /// Show what would be updated without making changes
        #[clap(long)]
        dry_run: bool,

        #[clap(flatten)]
        fetch: FetchArgs,
    },

    /// Remove cached catalog indexes
    ClearCache,
}

impl AssetsCommand {
    pub async fn execute<O: Write, E: Write>(
        self,
        ctx: &AppContext,
        out: &mut Output<O, E>,
    ) -> Result<()> {
        match self {
            AssetsCommand::Search {
                query,
                tags,
                verbose,
                json,
                fetch,
            } => {
                let registry = ctx.registry()?;
                let index = match registry.fetch_index(fetch.policy()).await {
                    Ok(index) => Some(index),
                    Err(e) if e.is_transport() => {
                        tracing::warn!("Catalog unavailable: {}", e);
                        out.warn(format!("{e}\nShowing installed entries only."))?;
                        None
                    }
                    Err(e) => return Err(e.into()),
                };
                let request = SearchRequest {
                    query: query.join(" "),
                    tags: parse_tags(&tags),
                    verbose,
                    json,
                };
                execute_search(ctx, index.as_ref(), &request, out)
            }
            AssetsCommand::Add {
                queries,
                local,
                tags,
                yes,
                fetch,
            } => {
                let options = InstallOptions {
                    scope: ConfigScope::from_local_flag(local),
                    tags: parse_tags(&tags),
                    assume_yes: yes,
                };
                execute_add(ctx, &queries, &options, fetch, out).await
            }
            AssetsCommand::Update {
                names,
                local,
                dry_run,
                fetch,
            } => execute_update(ctx, &names, local, dry_run, fetch, out).await,
            AssetsCommand::ClearCache => {
                let removed = clear_cache(&ctx.paths.cache_dir())?;
                out.line(format!("Removed {removed} cached index file(s)."))
            }
        }
    }
}

struct SearchRequest {
    query: String,
    tags: Vec<String>,
    verbose: bool,
    json: bool,
}

/// Table row for catalog search results
#[derive(Tabled)]
struct CatalogRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Verbose table row for catalog search results
#[derive(Tabled)]
struct CatalogDetailRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Module")]
    module: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Table row for matching installed entries
#[derive(Tabled)]
struct InstalledRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn execute_search<O: Write, E: Write>(
    ctx: &AppContext,
    index: Option<&dotai_core::catalog::CatalogIndex>,
    request: &SearchRequest,
    out: &mut Output<O, E>,
) -> Result<()> {
    let stores = ctx.stores.load_all_merged()?;
    let by_category: HashMap<Category, _> = stores.iter().map(|s| (s.category(), s)).collect();

    let catalog_hits = match index {
        Some(index) => search(
            &SearchResult::from_index(index),
            &request.query,
            &request.tags,
        )?,
        None => Vec::new(),
    };
    let local_hits = search(
        &SearchResult::from_stores(&stores),
        &request.query,
        &request.tags,
    )?;

    let status_of = |result: &SearchResult| -> String {
        result
            .catalog_entry()
            .and_then(|entry| {
                by_category
                    .get(&entry.category)
                    .and_then(|store| decide(store, entry).status())
            })
            .unwrap_or_default()
    };

    if request.json {
        let catalog: Vec<serde_json::Value> = catalog_hits
            .iter()
            .filter_map(|r| {
                let entry = r.catalog_entry()?;
                Some(serde_json::json!({
                    "category": entry.category,
                    "name": entry.name,
                    "module": entry.module,
                    "version": entry.version,
                    "description": entry.description,
                    "tags": entry.tags,
                    "status": status_of(r),
                }))
            })
            .collect();
        let installed: Vec<serde_json::Value> = local_hits
            .iter()
            .map(|r| {
                serde_json::json!({
                    "category": r.category,
                    "name": r.name,
                    "description": r.description(),
                    "tags": r.tags(),
                })
            })
            .collect();
        return out.json(&serde_json::json!({
            "catalog": catalog,
            "installed": installed,
        }));
    }

    if catalog_hits.is_empty() && local_hits.is_empty() {
        return out.line("No assets found.");
    }

    if !catalog_hits.is_empty() {
        out.line(format!("Found {} catalog asset(s):\n", catalog_hits.len()))?;
        if request.verbose {
            let rows: Vec<CatalogDetailRow> = catalog_hits
                .iter()
                .filter_map(|r| {
                    let entry = r.catalog_entry()?;
                    Some(CatalogDetailRow {
                        name: entry.qualified_name(),
                        version: entry.version.clone(),
                        status: status_of(r),
                        module: entry.module.clone(),
                        tags: entry.tags_display(),
                        description: entry.short_description().to_string(),
                    })
                })
                .collect();
            out.table(&rows)?;
        } else {
            let rows: Vec<CatalogRow> = catalog_hits
                .iter()
                .filter_map(|r| {
                    let entry = r.catalog_entry()?;
                    Some(CatalogRow {
                        name: entry.qualified_name(),
                        version: entry.version.clone(),
                        status: status_of(r),
                        description: truncate(entry.short_description(), 50),
                    })
                })
                .collect();
            out.table(&rows)?;
        }
    }

    if !local_hits.is_empty() {
        if !catalog_hits.is_empty() {
            out.blank()?;
        }
        out.line(format!("Matching installed entries ({}):\n", local_hits.len()))?;
        let rows: Vec<InstalledRow> = stores
            .iter()
            .flat_map(|store| store.iter())
            .filter(|entry| {
                local_hits
                    .iter()
                    .any(|hit| hit.category == entry.category && hit.name == entry.name)
            })
            .map(|entry| InstalledRow {
                name: format!("{}/{}", entry.category, entry.name),
                scope: entry.scope.to_string(),
                origin: entry.origin.clone(),
                description: truncate(entry.description_or_empty(), 50),
            })
            .collect();
        out.table(&rows)?;
    }

    Ok(())
}

async fn execute_add<O: Write, E: Write>(
    ctx: &AppContext,
    queries: &[String],
    options: &InstallOptions,
    fetch: FetchArgs,
    out: &mut Output<O, E>,
) -> Result<()> {
    let registry = ctx.registry()?;
    out.status("Fetching catalog index...")?;
    let installer = Installer::connect(&registry, &ctx.stores, fetch.policy()).await?;

    let mut prompter = ctx.prompter();
    let report = installer
        .install_queries(queries, options, &mut prompter)
        .await;

    for outcome in &report.outcomes {
        print_outcome(outcome, options.scope, out)?;
    }
    if report.installed_count() > 0 {
        out.line(format!(
            "\n{} asset(s) installed into the {} scope.",
            report.installed_count(),
            options.scope
        ))?;
    }

    report.finish()?;
    Ok(())
}

fn print_outcome<O: Write, E: Write>(
    outcome: &InstallOutcome,
    scope: ConfigScope,
    out: &mut Output<O, E>,
) -> Result<()> {
    let name = outcome.candidate.qualified_name();
    let version = match outcome.candidate.version.as_str() {
        "" => "latest",
        v => v,
    };

    match outcome.decision.action {
        InstallAction::Install => out.line(format!("Installed {name} ({version}) into {scope} scope")),
        InstallAction::SkipManualWarn if outcome.installed => {
            out.warn(format!("{name} was manually authored and has been replaced"))?;
            out.line(format!("Installed {name} ({version}) into {scope} scope"))
        }
        InstallAction::SkipManualWarn => {
            out.line(format!("Kept manually authored {name}"))
        }
        InstallAction::SkipCurrent => out.line(format!(
            "{name} is already installed ({})",
            outcome.decision.installed_version.as_deref().unwrap_or(version)
        )),
        InstallAction::SkipOutdated => out.line(format!(
            "{name} is already installed, {}; run 'dotai assets update' to upgrade",
            outcome.decision.status().unwrap_or_default()
        )),
    }
}

/// Registry-installed entries keyed by `category/name`
fn installed_from_registry(
    ctx: &AppContext,
    scope: Option<ConfigScope>,
) -> Result<HashMap<String, ()>> {
    let stores = match scope {
        Some(scope) => Category::ALL
            .into_iter()
            .map(|category| ctx.stores.load_single_tolerant(scope, category))
            .collect::<dotai_core::Result<Vec<_>>>()?,
        None => ctx.stores.load_all_merged()?,
    };

    Ok(stores
        .iter()
        .flat_map(|store| store.iter())
        .filter(|entry| !entry.is_manual())
        .map(|entry| (format!("{}/{}", entry.category, entry.name), ()))
        .collect())
}

/// Table row for update preview
#[derive(Tabled)]
struct UpdateRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Current")]
    current: String,
    #[tabled(rename = "Latest")]
    latest: String,
}

async fn execute_update<O: Write, E: Write>(
    ctx: &AppContext,
    names: &[String],
    local: bool,
    dry_run: bool,
    fetch: FetchArgs,
    out: &mut Output<O, E>,
) -> Result<()> {
    let registry = ctx.registry()?;
    out.status("Fetching catalog index...")?;
    let installer = Installer::connect(&registry, &ctx.stores, fetch.policy()).await?;

    let scope = local.then_some(ConfigScope::Local);
    let mut outdated = installer.outdated(scope)?;

    if !names.is_empty() {
        let keyed: HashMap<String, usize> = outdated
            .iter()
            .enumerate()
            .map(|(i, o)| (o.candidate.qualified_name(), i))
            .collect();
        let installed = installed_from_registry(ctx, scope)?;
        let mut wanted = Vec::new();
        for name in names {
            match resolve_all(&keyed, "outdated asset", name) {
                Ok(keys) => {
                    for key in keys {
                        if !wanted.contains(&keyed[key]) {
                            wanted.push(keyed[key]);
                        }
                    }
                }
                Err(e) if e.is_not_found() => {
                    for key in resolve_all(&installed, "installed asset", name)? {
                        out.line(format!("{key} is already up to date."))?;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }
        outdated = wanted.into_iter().map(|i| outdated[i].clone()).collect();
    }

    if outdated.is_empty() {
        return out.line("All installed assets are up to date.");
    }

    let rows: Vec<UpdateRow> = outdated
        .iter()
        .map(|o| UpdateRow {
            name: o.candidate.qualified_name(),
            scope: o.installed.scope.to_string(),
            current: o.installed_version(),
            latest: o.candidate.version.clone(),
        })
        .collect();
    out.line("Updates available:\n")?;
    out.table(&rows)?;

    if dry_run {
        return out.line("\n--dry-run: No changes made.");
    }

    let report = installer.update(&outdated).await;
    out.line(format!(
        "\nUpdate complete. {} asset(s) updated.",
        report.installed_count()
    ))?;
    report.finish()?;
    Ok(())
}
