//! Afirmador: CLI for running arithmetic assertions in markdown documents
//!
//! ## Usage
//!
//! ```bash
//! afirmador run docs/              # Run every assertion once
//! afirmador run --coverage --json  # Machine-readable events + coverage
//! afirmador watch docs/            # Re-run automatically on change
//! afirmador list docs/             # Show the discovered tree
//! ```

mod commands;
mod error;
mod output;

use afirmar::{
    DocChangeKind, DocPattern, DocWatcher, Engine, FsSource, JsonLinesReporter, NodeId,
    NodeKind, RunProfile, RunRequest, WatchScope, WatchSettings,
};
use clap::Parser;
use commands::{Cli, Commands, ListArgs, RunArgs, WatchArgs};
use console::style;
use error::CliResult;
use output::{print_summary, CliReporter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Run(args) => run_once(&args, cli.quiet),
        Commands::Watch(args) => run_watch(&args, cli.quiet),
        Commands::List(args) => run_list(&args).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Canonical workspace root, so watcher paths and document ids agree
fn workspace_root(dir: &Path) -> CliResult<PathBuf> {
    Ok(std::fs::canonicalize(dir)?)
}

fn run_once(args: &RunArgs, quiet: bool) -> CliResult<bool> {
    let root = workspace_root(&args.dir)?;
    let mut engine = Engine::new(FsSource::new(&root));
    let documents = engine.discover(&DocPattern::new(&args.pattern))?;
    tracing::info!(documents, "workspace scanned");

    let mut request = RunRequest::everything()
        .with_profile(RunProfile { coverage: args.coverage });
    for raw in &args.exclude {
        request = request.excluding(resolve_exclude(engine.source(), raw));
    }

    if args.json {
        let mut reporter = JsonLinesReporter::new(std::io::stdout());
        let handle = engine.request_run(request, &mut reporter);
        return Ok(handle.all_passed());
    }

    let mut reporter = CliReporter::new(quiet);
    let handle = engine.request_run(request, &mut reporter);
    if !quiet {
        print_summary(&reporter, &handle);
    }
    Ok(handle.all_passed())
}

/// Resolve a workspace-relative exclude argument ("notes.md#L4") to the
/// absolute identity the tree uses. Absolute ids pass through.
fn resolve_exclude(source: &FsSource, raw: &str) -> NodeId {
    match raw.rsplit_once("#L") {
        Some((doc, line)) if !doc.is_empty() && line.chars().all(|c| c.is_ascii_digit()) => {
            NodeId::parse(&format!("{}#L{line}", source.document_id(doc)))
        }
        _ => NodeId::document(&source.document_id(raw)),
    }
}

fn run_watch(args: &WatchArgs, quiet: bool) -> CliResult<bool> {
    let root = workspace_root(&args.dir)?;
    let pattern = DocPattern::new(&args.pattern);
    let mut engine = Engine::new(FsSource::new(&root));
    engine.discover(&pattern)?;

    let profile = RunProfile { coverage: args.coverage };
    engine.watch(WatchScope::All, profile);

    // Initial full run before entering the change loop.
    let mut reporter = CliReporter::new(quiet);
    let handle = engine.request_run(
        RunRequest::everything().with_profile(profile),
        &mut reporter,
    );
    if !quiet {
        print_summary(&reporter, &handle);
    }

    let mut watcher = DocWatcher::new(
        WatchSettings::new(&root, &pattern).with_debounce(args.debounce),
    );
    watcher.start()?;
    if !quiet {
        println!(
            "\n{} {} (Ctrl-C to stop)",
            style("watching").cyan().bold(),
            root.display()
        );
    }

    loop {
        if let Some(changes) = watcher.check_changes() {
            for change in changes {
                if change.kind == DocChangeKind::Deleted {
                    tracing::info!(document = %change.id, "document removed");
                    engine.document_removed(&change.id);
                    continue;
                }
                let mut reporter = CliReporter::new(quiet);
                if let Some(handle) = engine.document_changed(&change.id, &mut reporter) {
                    if !quiet {
                        print_summary(&reporter, &handle);
                    }
                }
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

fn run_list(args: &ListArgs) -> CliResult<()> {
    let root = workspace_root(&args.dir)?;
    let mut engine = Engine::new(FsSource::new(&root));
    engine.discover(&DocPattern::new(&args.pattern))?;

    let documents: Vec<_> = engine.tree().documents().to_vec();
    for doc in documents {
        println!("{}", style(&doc).bold());
        let root_id = NodeId::document(&doc);
        print_children(&mut engine, &root_id, 1)?;
    }
    Ok(())
}

fn print_children(
    engine: &mut Engine<FsSource>,
    id: &NodeId,
    indent: usize,
) -> CliResult<()> {
    let children = engine.resolve_children(id)?;
    for child in children {
        let Some(node) = engine.node(&child) else {
            continue;
        };
        let line = node.range.line;
        let label = match &node.kind {
            NodeKind::Section { name, depth } => {
                format!("{} {}", "#".repeat(*depth as usize), name)
            }
            _ => node.label(),
        };
        println!("{:indent$}L{line}: {label}", "", indent = indent * 2);
        if !node.is_assertion() {
            print_children(engine, &child, indent + 1)?;
        }
    }
    Ok(())
}
