//! Install decisions and the catalog installer
//!
//! [`decide`] compares one catalog candidate against the merged store and
//! picks an action. Registry-installed entries are never upgraded by an
//! install; [`Installer::update`] is the explicit upgrade path.

use std::io::{BufRead, Write};

use crate::catalog::{CatalogEntry, CatalogIndex, FetchPolicy, RegistryTransport};
use crate::category::{Category, ConfigScope};
use crate::entry::{CategoryEntry, EntryRecord};
use crate::error::{AssetError, ItemFailure, Result};
use crate::prompt::Prompter;
use crate::search::{has_all_tags, search, SearchResult};
use crate::store::{CategoryStore, DocumentStore, StoreResolver, YamlDocumentStore};

/// What to do with a catalog candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallAction {
    /// Nothing by that name is stored yet
    Install,
    /// A manually authored entry will be overwritten after a warning
    SkipManualWarn,
    /// Installed from the registry at the candidate's version or newer
    SkipCurrent,
    /// Installed from the registry at an older version
    SkipOutdated,
}

impl InstallAction {
    /// True when the candidate gets written to the store
    pub fn proceeds(&self) -> bool {
        matches!(self, InstallAction::Install | InstallAction::SkipManualWarn)
    }
}

/// An action plus the versions it was decided from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub action: InstallAction,
    /// Version parsed from the stored origin
    pub installed_version: Option<String>,
    pub candidate_version: String,
    /// Scope of the existing entry, if any
    pub scope: Option<ConfigScope>,
}

impl Decision {
    /// Short status for listings, `None` when nothing is installed
    pub fn status(&self) -> Option<String> {
        let installed = self.installed_version.as_deref().unwrap_or("");
        match self.action {
            InstallAction::Install => None,
            InstallAction::SkipManualWarn => Some("manual".to_string()),
            InstallAction::SkipCurrent => Some("installed".to_string()),
            InstallAction::SkipOutdated => Some(format!(
                "outdated ({} → {})",
                display_version(installed),
                display_version(&self.candidate_version)
            )),
        }
    }
}

fn display_version(version: &str) -> &str {
    if version.is_empty() {
        "latest"
    } else {
        version
    }
}

/// Decide how to treat `candidate` given the merged store of its category
pub fn decide(store: &CategoryStore, candidate: &CatalogEntry) -> Decision {
    let mut decision = Decision {
        action: InstallAction::Install,
        installed_version: None,
        candidate_version: candidate.version.clone(),
        scope: None,
    };

    let Some(existing) = store.get(&candidate.name) else {
        return decision;
    };
    decision.scope = Some(existing.scope);

    let Some(origin) = existing.parsed_origin() else {
        decision.action = InstallAction::SkipManualWarn;
        return decision;
    };

    decision.action = if is_newer(&candidate.version, &origin.version) {
        InstallAction::SkipOutdated
    } else {
        InstallAction::SkipCurrent
    };
    decision.installed_version = Some(origin.version);
    decision
}

fn parse_version(raw: &str) -> Option<semver::Version> {
    let raw = raw.trim();
    semver::Version::parse(raw.strip_prefix('v').unwrap_or(raw)).ok()
}

/// True when `candidate` is a newer version than `installed`.
///
/// Versions compare semantically (a leading `v` is ignored). When either side
/// is not a semantic version, any difference counts as newer. An empty
/// candidate version is never newer.
pub fn is_newer(candidate: &str, installed: &str) -> bool {
    if candidate.trim().is_empty() {
        return false;
    }
    match (parse_version(candidate), parse_version(installed)) {
        (Some(c), Some(i)) => c > i,
        _ => candidate.trim() != installed.trim(),
    }
}

/// Options for [`Installer::install_queries`]
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Scope to write installed entries into
    pub scope: ConfigScope,
    /// Tag filters applied to every query
    pub tags: Vec<String>,
    /// Overwrite manually authored entries without asking
    pub assume_yes: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            scope: ConfigScope::Global,
            tags: Vec::new(),
            assume_yes: false,
        }
    }
}

/// The result of handling one catalog candidate
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub candidate: CatalogEntry,
    pub decision: Decision,
    /// True when the entry was written
    pub installed: bool,
}

/// Outcomes and per-item failures of a batch
#[derive(Debug, Default)]
pub struct InstallReport {
    pub outcomes: Vec<InstallOutcome>,
    pub failures: Vec<ItemFailure>,
}

impl InstallReport {
    pub fn installed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.installed).count()
    }

    /// Collapse the failures into the batch result
    pub fn finish(self) -> Result<()> {
        AssetError::from_failures(self.failures)
    }
}

/// A registry-installed entry with a newer catalog version
#[derive(Debug, Clone)]
pub struct OutdatedEntry {
    pub installed: CategoryEntry,
    pub candidate: CatalogEntry,
}

impl OutdatedEntry {
    pub fn installed_version(&self) -> String {
        self.installed.installed_version().unwrap_or_default()
    }
}

/// Installs catalog entries into a scope. Holds one index snapshot shared by
/// every query of an invocation.
pub struct Installer<'a, T: RegistryTransport + ?Sized, D: DocumentStore = YamlDocumentStore> {
    transport: &'a T,
    stores: &'a StoreResolver<D>,
    index: CatalogIndex,
}

impl<'a, T: RegistryTransport + ?Sized, D: DocumentStore> Installer<'a, T, D> {
    pub fn new(transport: &'a T, stores: &'a StoreResolver<D>, index: CatalogIndex) -> Self {
        Self {
            transport,
            stores,
            index,
        }
    }

    /// Fetch the index once and build an installer around it
    pub async fn connect(
        transport: &'a T,
        stores: &'a StoreResolver<D>,
        policy: FetchPolicy,
    ) -> Result<Self> {
        let index = transport.fetch_index(policy).await?;
        tracing::debug!(
            "Loaded catalog index with {} assets ({}, generated {})",
            index.len(),
            index.fingerprint(),
            index.generated()
        );
        Ok(Self::new(transport, stores, index))
    }

    pub fn index(&self) -> &CatalogIndex {
        &self.index
    }

    /// Decide for `candidate` against the current merged store
    pub fn decide(&self, candidate: &CatalogEntry) -> Result<Decision> {
        let store = self.stores.load_merged(candidate.category)?;
        Ok(decide(&store, candidate))
    }

    /// Catalog entries matching `query` and `tags`, narrowed to one when the
    /// query names a single entry exactly. Tag filters apply to every form
    /// of query.
    pub fn candidates(&self, query: &str, tags: &[String]) -> Result<Vec<CatalogEntry>> {
        let query = query.trim();
        if let Some(entry) = self.exact_entry(query) {
            if has_all_tags(&entry.tags, tags) {
                return Ok(vec![entry.clone()]);
            }
            tracing::debug!("{} lacks the requested tags {:?}", query, tags);
            return Ok(Vec::new());
        }

        let results = search(&SearchResult::from_index(&self.index), query, tags)?;
        let mut found: Vec<CatalogEntry> = results
            .iter()
            .filter_map(|r| r.catalog_entry().cloned())
            .collect();

        let exact: Vec<&CatalogEntry> = found.iter().filter(|e| e.name == query).collect();
        if exact.len() == 1 {
            let entry = exact[0].clone();
            found = vec![entry];
        }
        Ok(found)
    }

    /// `category/name` lookup
    fn exact_entry(&self, query: &str) -> Option<&CatalogEntry> {
        let (category, name) = query.split_once('/')?;
        let category: Category = category.parse().ok()?;
        self.index.get(category, name)
    }

    /// Install every query in argument order. A failing query does not stop
    /// the ones after it; failures are collected in the report.
    pub async fn install_queries<R: BufRead, W: Write>(
        &self,
        queries: &[String],
        options: &InstallOptions,
        prompter: &mut Prompter<R, W>,
    ) -> InstallReport {
        let mut report = InstallReport::default();

        for query in queries {
            let selected = match self.select_candidates(query, options, prompter) {
                Ok(selected) => selected,
                Err(error) => {
                    tracing::debug!("Query {:?} failed: {}", query, error);
                    report.failures.push(ItemFailure {
                        item: query.clone(),
                        error,
                    });
                    continue;
                }
            };

            if selected.is_empty() {
                tracing::debug!("Selection for {:?} cancelled", query);
                continue;
            }

            for candidate in selected {
                match self.apply(candidate, options, prompter).await {
                    Ok(outcome) => report.outcomes.push(outcome),
                    Err(error) => report.failures.push(ItemFailure {
                        item: query.clone(),
                        error,
                    }),
                }
            }
        }

        report
    }

    fn select_candidates<R: BufRead, W: Write>(
        &self,
        query: &str,
        options: &InstallOptions,
        prompter: &mut Prompter<R, W>,
    ) -> Result<Vec<CatalogEntry>> {
        let found = self.candidates(query, &options.tags)?;
        match found.len() {
            0 => Err(AssetError::not_found("asset", query)),
            1 => Ok(found),
            _ => {
                let labels: Vec<String> = found
                    .iter()
                    .map(|e| format!("{}  {}", e.qualified_name(), e.short_description()))
                    .collect();
                let names: Vec<String> = found.iter().map(CatalogEntry::qualified_name).collect();
                let picked = prompter.select("asset", &labels, &names)?;
                Ok(picked.into_iter().map(|i| found[i].clone()).collect())
            }
        }
    }

    async fn apply<R: BufRead, W: Write>(
        &self,
        candidate: CatalogEntry,
        options: &InstallOptions,
        prompter: &mut Prompter<R, W>,
    ) -> Result<InstallOutcome> {
        let decision = self.decide(&candidate)?;

        let proceed = match decision.action {
            InstallAction::SkipManualWarn => {
                tracing::warn!(
                    "Overwriting manually authored {} '{}'",
                    candidate.category,
                    candidate.name
                );
                if options.assume_yes || !prompter.is_interactive() {
                    true
                } else {
                    prompter.confirm(
                        &format!(
                            "Replace manually authored {} '{}'?",
                            candidate.category, candidate.name
                        ),
                        true,
                    )?
                }
            }
            action => action.proceeds(),
        };

        if proceed {
            self.install_entry(&candidate, options.scope).await?;
        }

        Ok(InstallOutcome {
            candidate,
            decision,
            installed: proceed,
        })
    }

    /// Fetch the asset document, stamp its origin and write it into `scope`
    pub async fn install_entry(
        &self,
        candidate: &CatalogEntry,
        scope: ConfigScope,
    ) -> Result<CategoryEntry> {
        let bytes = self
            .transport
            .fetch_asset_content(&self.index, candidate)
            .await?;

        let mut record: EntryRecord = serde_yaml_ng::from_slice(&bytes).map_err(|e| {
            AssetError::invalid_entry(&candidate.name, format!("asset document is not valid YAML: {e}"))
        })?;
        record.origin = candidate.origin().to_string();
        if record.description.is_none() && !candidate.description.is_empty() {
            record.description = Some(candidate.description.clone());
        }
        if record.tags.is_empty() {
            record.tags = candidate.tags.clone();
        }

        let entry = CategoryEntry::from_record(&candidate.name, candidate.category, scope, record)?;

        let mut store = self.stores.load_single_tolerant(scope, candidate.category)?;
        store.insert(entry.clone());
        self.stores.write(scope, &store)?;

        tracing::info!(
            "Installed {} '{}' ({}) into {} scope",
            candidate.category,
            candidate.name,
            entry.origin,
            scope
        );
        Ok(entry)
    }

    /// Registry-installed entries with a newer catalog version. `None` looks
    /// at the merged view of both scopes.
    pub fn outdated(&self, scope: Option<ConfigScope>) -> Result<Vec<OutdatedEntry>> {
        let mut outdated = Vec::new();

        for category in Category::ALL {
            let store = match scope {
                Some(scope) => self.stores.load_single_tolerant(scope, category)?,
                None => self.stores.load_merged(category)?,
            };

            for entry in store.iter() {
                let Some(origin) = entry.parsed_origin() else {
                    continue;
                };
                let Some(candidate) = self.index.get(category, &entry.name) else {
                    tracing::debug!("{} '{}' is no longer in the catalog", category, entry.name);
                    continue;
                };
                if candidate.module != origin.module {
                    tracing::debug!(
                        "{} '{}' moved from {} to {}",
                        category,
                        entry.name,
                        origin.module,
                        candidate.module
                    );
                }
                if is_newer(&candidate.version, &origin.version) {
                    outdated.push(OutdatedEntry {
                        installed: entry.clone(),
                        candidate: candidate.clone(),
                    });
                }
            }
        }

        Ok(outdated)
    }

    /// Reinstall each entry at its catalog version, in the scope it lives in
    pub async fn update(&self, targets: &[OutdatedEntry]) -> InstallReport {
        let mut report = InstallReport::default();

        for target in targets {
            let decision = Decision {
                action: InstallAction::SkipOutdated,
                installed_version: target.installed.installed_version(),
                candidate_version: target.candidate.version.clone(),
                scope: Some(target.installed.scope),
            };

            match self
                .install_entry(&target.candidate, target.installed.scope)
                .await
            {
                Ok(_) => report.outcomes.push(InstallOutcome {
                    candidate: target.candidate.clone(),
                    decision,
                    installed: true,
                }),
                Err(error) => report.failures.push(ItemFailure {
                    item: target.candidate.qualified_name(),
                    error,
                }),
            }
        }

        report
    }
}
