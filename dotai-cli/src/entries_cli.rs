//! Per-category entry commands (`dotai role list`, `dotai task new`, ...)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::io::Write;
use tabled::Tabled;

use dotai_core::entry::{CategoryEntry, ContentSource, EntryEdit};
use dotai_core::error::{AssetError, ItemFailure};
use dotai_core::manage::{create_entry, edit_entry, remove_entries, removal_candidates};
use dotai_core::resolve::resolve_one;
use dotai_core::search::parse_tags;
use dotai_core::{Category, ConfigScope};

use crate::context::AppContext;
use crate::output::{truncate, Output};

/// Content source flags; at most one may be given
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Inline prompt text
    #[clap(long, group = "source")]
    pub prompt: Option<String>,

    /// Path to a file with the content
    #[clap(long, group = "source")]
    pub file: Option<String>,

    /// Command whose output is the content
    #[clap(long, group = "source")]
    pub command: Option<String>,
}

impl SourceArgs {
    fn is_empty(&self) -> bool {
        self.prompt.is_none() && self.file.is_none() && self.command.is_none()
    }

    fn into_source(self, name: &str) -> Result<ContentSource, AssetError> {
        ContentSource::from_fields(name, self.file, self.command, self.prompt)
    }
}

#[derive(Subcommand, Debug)]
pub enum EntryCommand {
    /// List entries of both scopes (local shadows global)
    List {
        /// Show tags and content columns
        #[clap(long)]
        verbose: bool,
    },

    /// Show one entry
    Show {
        /// Entry name (exact, substring or pattern)
        name: String,
    },

    /// Create a manually authored entry
    New {
        name: String,

        #[clap(flatten)]
        source: SourceArgs,

        #[clap(long)]
        description: Option<String>,

        /// Tags (comma-separated)
        #[clap(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        /// Write to the local scope instead of the global one
        #[clap(long)]
        local: bool,
    },

    /// Change an existing entry
    Edit {
        /// Entry name (exact, substring or pattern)
        name: String,

        #[clap(flatten)]
        source: SourceArgs,

        #[clap(long)]
        description: Option<String>,

        /// Replace the tags (comma-separated)
        #[clap(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        #[clap(long)]
        local: bool,
    },

    /// Remove entries; a name matching several entries removes all of them
    Remove {
        #[clap(required = true)]
        names: Vec<String>,

        #[clap(long)]
        local: bool,

        /// Do not ask before removing several matches
        #[clap(long, short)]
        yes: bool,
    },
}

/// Table row for entry listings
#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "Description")]
    description: String,
}

/// Verbose table row for entry listings
#[derive(Tabled)]
struct EntryDetailRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Scope")]
    scope: String,
    #[tabled(rename = "Origin")]
    origin: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Content")]
    content: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl EntryCommand {
    pub fn execute<O: Write, E: Write>(
        self,
        category: Category,
        ctx: &AppContext,
        out: &mut Output<O, E>,
    ) -> Result<()> {
        match self {
            EntryCommand::List { verbose } => execute_list(category, ctx, verbose, out),
            EntryCommand::Show { name } => execute_show(category, ctx, &name, out),
            EntryCommand::New {
                name,
                source,
                description,
                tags,
                local,
            } => {
                let scope = ConfigScope::from_local_flag(local);
                let content = source.into_source(&name)?;
                let mut entry = CategoryEntry::new_manual(&name, category, scope, content)?;
                entry.description = description.filter(|d| !d.trim().is_empty());
                entry.tags = parse_tags(&tags);

                create_entry(&ctx.stores, scope, entry)?;
                out.line(format!("Added {category} '{name}' to the {scope} scope"))
            }
            EntryCommand::Edit {
                name,
                source,
                description,
                tags,
                local,
            } => {
                let scope = ConfigScope::from_local_flag(local);
                let content = if source.is_empty() {
                    None
                } else {
                    Some(source.into_source(&name)?)
                };
                let edit = EntryEdit {
                    description,
                    tags: (!tags.is_empty()).then(|| parse_tags(&tags)),
                    content,
                };

                let outcome = edit_entry(&ctx.stores, scope, category, &name, edit)?;
                if outcome.origin_cleared {
                    out.warn(format!(
                        "{category} '{}' no longer matches its registry origin and is now manually authored",
                        outcome.entry.name
                    ))?;
                }
                out.line(format!(
                    "Updated {category} '{}' in the {scope} scope",
                    outcome.entry.name
                ))
            }
            EntryCommand::Remove { names, local, yes } => {
                execute_remove(category, ctx, &names, ConfigScope::from_local_flag(local), yes, out)
            }
        }
    }
}

fn execute_list<O: Write, E: Write>(
    category: Category,
    ctx: &AppContext,
    verbose: bool,
    out: &mut Output<O, E>,
) -> Result<()> {
    let store = ctx.stores.load_merged(category)?;
    if store.is_empty() {
        out.line(format!("No {} configured.", category.plural()))?;
        return out.line(format!(
            "\nRun 'dotai {category} new' or 'dotai assets add' to add one."
        ));
    }

    if verbose {
        let rows: Vec<EntryDetailRow> = store
            .iter()
            .map(|entry| EntryDetailRow {
                name: entry.name.clone(),
                scope: entry.scope.to_string(),
                origin: entry.origin.clone(),
                tags: entry.tags.join(", "),
                content: format!(
                    "{}: {}",
                    entry.content.kind(),
                    truncate(entry.content.value(), 40)
                ),
                description: entry.description_or_empty().to_string(),
            })
            .collect();
        out.table(&rows)
    } else {
        let rows: Vec<EntryRow> = store
            .iter()
            .map(|entry| EntryRow {
                name: entry.name.clone(),
                scope: entry.scope.to_string(),
                source: entry.content.kind().to_string(),
                origin: entry.origin.clone(),
                description: truncate(entry.description_or_empty(), 50),
            })
            .collect();
        out.table(&rows)
    }
}

fn execute_show<O: Write, E: Write>(
    category: Category,
    ctx: &AppContext,
    name: &str,
    out: &mut Output<O, E>,
) -> Result<()> {
    let store = ctx.stores.load_merged(category)?;
    let (_, entry) = resolve_one(store.entries(), category.as_str(), name)?;

    out.line(format!("{category}: {}", entry.name))?;
    out.line(format!("  Scope:       {}", entry.scope))?;
    if let Some(description) = &entry.description {
        out.line(format!("  Description: {description}"))?;
    }
    if !entry.tags.is_empty() {
        out.line(format!("  Tags:        {}", entry.tags.join(", ")))?;
    }
    match entry.parsed_origin() {
        Some(origin) => out.line(format!("  Origin:      {origin}"))?,
        None => out.line("  Origin:      (manually authored)")?,
    }
    out.line(format!(
        "  {:<12} {}",
        format!("{}:", capitalize(entry.content.kind())),
        entry.content.value()
    ))?;

    for (key, value) in &entry.extra {
        let rendered = serde_yaml_ng::to_string(value)
            .map(|v| v.trim_end().to_string())
            .unwrap_or_default();
        out.line(format!("  {key}: {rendered}"))?;
    }
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn execute_remove<O: Write, E: Write>(
    category: Category,
    ctx: &AppContext,
    names: &[String],
    scope: ConfigScope,
    yes: bool,
    out: &mut Output<O, E>,
) -> Result<()> {
    let mut prompter = ctx.prompter();
    let mut failures = Vec::new();

    for query in names {
        let result = removal_candidates(&ctx.stores, scope, category, query).and_then(|found| {
            if found.len() > 1 && !yes {
                let question = format!(
                    "Remove {} {}: {}?",
                    found.len(),
                    category.plural(),
                    found.join(", ")
                );
                if !prompter.confirm(&question, false)? {
                    return Ok(Vec::new());
                }
            }
            remove_entries(&ctx.stores, scope, category, &found)
        });

        match result {
            Ok(removed) if removed.is_empty() => out.line(format!("Nothing removed for '{query}'"))?,
            Ok(removed) => {
                for entry in removed {
                    out.line(format!(
                        "Removed {category} '{}' from the {scope} scope",
                        entry.name
                    ))?;
                }
            }
            Err(error) => failures.push(ItemFailure {
                item: query.clone(),
                error,
            }),
        }
    }

    AssetError::from_failures(failures)?;
    Ok(())
}
