//! dotai - layered agents, roles, contexts and tasks for coding agents
//!
//! Entry point: parses arguments, sets up logging and dispatches to the
//! assets and per-category commands.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dotai_core::Category;

mod assets_cli;
mod context;
mod entries_cli;
mod output;

use assets_cli::AssetsCommand;
use context::AppContext;
use entries_cli::EntryCommand;
use output::Output;

/// Log levels
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "dotai",
    about = "Manage agents, roles, contexts and tasks across global and project scopes",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Emit logs as JSON (to stderr)
    #[clap(long, global = true)]
    log_json: bool,

    /// Override the global configuration directory (absolute path)
    #[clap(long, global = true, env = "DOTAI_GLOBAL_DIR")]
    global_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search and install assets from the registry
    Assets {
        #[clap(subcommand)]
        command: AssetsCommand,
    },

    /// Manage agents
    Agent {
        #[clap(subcommand)]
        command: EntryCommand,
    },

    /// Manage roles
    Role {
        #[clap(subcommand)]
        command: EntryCommand,
    },

    /// Manage contexts
    Context {
        #[clap(subcommand)]
        command: EntryCommand,
    },

    /// Manage tasks
    Task {
        #[clap(subcommand)]
        command: EntryCommand,
    },
}

fn initialize_tracing(log_level: LogLevel, json: bool) {
    // RUST_LOG wins over --log-level when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_filter_directive()));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(cli.log_level, cli.log_json);

    let ctx = AppContext::load(cli.global_dir)?;
    let mut out = Output::stdio();

    match cli.command {
        Command::Assets { command } => command.execute(&ctx, &mut out).await,
        Command::Agent { command } => command.execute(Category::Agent, &ctx, &mut out),
        Command::Role { command } => command.execute(Category::Role, &ctx, &mut out),
        Command::Context { command } => command.execute(Category::Context, &ctx, &mut out),
        Command::Task { command } => command.execute(Category::Task, &ctx, &mut out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_assets_add_flags() {
        let cli = Cli::try_parse_from([
            "dotai", "assets", "add", "review", "role/go", "--local", "--tag", "golang,review",
            "--yes", "--offline",
        ])
        .unwrap();

        match cli.command {
            Command::Assets {
                command:
                    AssetsCommand::Add {
                        queries,
                        local,
                        tags,
                        yes,
                        fetch,
                    },
            } => {
                assert_eq!(queries, vec!["review", "role/go"]);
                assert!(local && yes);
                assert_eq!(tags, vec!["golang", "review"]);
                assert_eq!(fetch.policy(), dotai_core::catalog::FetchPolicy::Offline);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_refresh_conflicts_with_offline() {
        let result = Cli::try_parse_from([
            "dotai", "assets", "search", "review", "--refresh", "--offline",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_add_requires_query() {
        assert!(Cli::try_parse_from(["dotai", "assets", "add"]).is_err());
    }

    #[test]
    fn test_new_rejects_two_sources() {
        let result = Cli::try_parse_from([
            "dotai", "role", "new", "reviewer", "--prompt", "x", "--file", "y.md",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "dotai",
            "task",
            "remove",
            "create-role",
            "--yes",
            "--log-level",
            "debug",
            "--global-dir",
            "/tmp/dotai",
        ])
        .unwrap();

        assert!(matches!(cli.log_level, LogLevel::Debug));
        assert_eq!(cli.global_dir, Some(PathBuf::from("/tmp/dotai")));
        assert!(matches!(
            cli.command,
            Command::Task {
                command: EntryCommand::Remove { yes: true, .. }
            }
        ));
    }
}
