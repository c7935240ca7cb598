//! Afirmar: arithmetic assertion discovery and execution for prose documents
//!
//! Afirmar (Spanish: "to assert") finds lightweight arithmetic assertions
//! embedded in markdown-style documents (lines of the form `A op B = C`),
//! organizes them into a document → section → assertion hierarchy that
//! mirrors heading structure, and executes them on demand with per-line
//! coverage and a continuous mode that replays runs when a source
//! document changes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     AFIRMAR Architecture                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  change event ──► ContinuousRegistry ─┐                          │
//! │                                       ▼                          │
//! │  DocumentSource ──► AssertionTree ──► Engine (scheduler) ──►     │
//! │        ▲                 ▲                │            RunReporter│
//! │        │           AssertionScanner      └──► DocumentCoverage   │
//! │   FsSource / MemorySource                                        │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one logical thread; assertions are never executed
//! in parallel and cancellation is advisory, polled once per queue item.
//!
//! # Example
//!
//! ```
//! use afirmar::{DocPattern, Engine, MemorySource, NullReporter, RunRequest};
//!
//! let mut source = MemorySource::new();
//! source.insert("sums.md", "# A\n2+2=4\n## B\n3*3=9\n2+2=5\n");
//!
//! let mut engine = Engine::new(source);
//! engine.discover(&DocPattern::default()).unwrap();
//!
//! let handle = engine.request_run(RunRequest::everything(), &mut NullReporter);
//! assert!(!handle.all_passed());
//! ```

#![warn(missing_docs)]

mod coverage;
mod engine;
mod parser;
mod reporter;
mod result;
mod run;
mod source;
mod tree;
mod watch;

#[cfg(feature = "watch")]
mod fswatch;

pub use coverage::{CoverageSlot, DocumentCoverage};
pub use engine::Engine;
pub use parser::{AssertionCheck, AssertionScanner, Operator, ParseEvent, TextRange};
pub use reporter::{
    JsonLinesReporter, NullReporter, RecordingReporter, ReportEvent, RunReporter,
};
pub use result::{AfirmarError, AfirmarResult};
pub use run::{CancellationToken, Outcome, RunHandle, RunProfile, RunRequest, RunScope};
pub use source::{DocPattern, DocumentSource, FsSource, MemorySource};
pub use tree::{AssertionTree, DocumentId, Node, NodeId, NodeKind};
pub use watch::{ContinuousRegistry, SubscriptionId, WatchScope};

#[cfg(feature = "watch")]
pub use fswatch::{DocChange, DocChangeKind, DocWatcher, WatchSettings};
