//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Afirmador: run arithmetic assertions embedded in markdown documents
#[derive(Parser, Debug)]
#[command(name = "afirmador")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover and run all assertions once
    Run(RunArgs),

    /// Run once, then re-run automatically whenever a document changes
    Watch(WatchArgs),

    /// List discovered documents and their assertions without running
    List(ListArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Workspace directory to scan
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Glob selecting assertion documents
    #[arg(short, long, default_value = "**/*.md")]
    pub pattern: String,

    /// Collect per-line coverage
    #[arg(long)]
    pub coverage: bool,

    /// Emit run events as JSON lines instead of styled text
    #[arg(long)]
    pub json: bool,

    /// Node ids to exclude, relative to DIR (repeatable), e.g. "notes.md#L4"
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Workspace directory to scan and watch
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Glob selecting assertion documents
    #[arg(short, long, default_value = "**/*.md")]
    pub pattern: String,

    /// Collect per-line coverage on every run
    #[arg(long)]
    pub coverage: bool,

    /// Debounce window for change batches, in milliseconds
    #[arg(long, default_value = "300")]
    pub debounce: u64,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Workspace directory to scan
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Glob selecting assertion documents
    #[arg(short, long, default_value = "**/*.md")]
    pub pattern: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_defaults() {
        let cli = Cli::parse_from(["afirmador", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.dir, PathBuf::from("."));
                assert_eq!(args.pattern, "**/*.md");
                assert!(!args.coverage);
                assert!(!args.json);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn test_excludes_are_repeatable() {
        let cli = Cli::parse_from(["afirmador", "run", "-x", "a.md#L1", "-x", "a.md#L2"]);
        match cli.command {
            Commands::Run(args) => assert_eq!(args.exclude.len(), 2),
            other => panic!("expected run, got {other:?}"),
        }
    }
}
