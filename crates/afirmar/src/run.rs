//! Run protocol types
//!
//! A run is one execution instance: a depth-first, source-order queue of
//! assertions processed strictly sequentially, with an advisory
//! cancellation flag polled once per queue item. The types here describe
//! the request going in and the handle coming back; the scheduler itself
//! lives on [`crate::engine::Engine`].

use crate::coverage::{CoverageSlot, DocumentCoverage};
use crate::tree::{DocumentId, NodeId};
use crate::watch::SubscriptionId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// What a run covers: everything, or an explicit node set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    /// Every document currently in the tree
    All,
    /// An explicit set of nodes, expanded depth-first
    Nodes(Vec<NodeId>),
}

/// Execution profile reused by continuous replays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunProfile {
    /// Whether per-line coverage is collected
    pub coverage: bool,
}

impl RunProfile {
    /// Profile with coverage collection enabled
    #[must_use]
    pub const fn with_coverage() -> Self {
        Self { coverage: true }
    }
}

/// Shared advisory cancellation flag.
///
/// Setting it never interrupts an in-flight evaluation; it prevents any
/// further queued item from starting.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an unset token
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// One run request
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Scope to expand
    pub scope: RunScope,
    /// Nodes excluded together with their whole subtree
    pub exclusions: HashSet<NodeId>,
    /// Execution profile
    pub profile: RunProfile,
    /// Whether this request also registers for continuous re-runs
    pub continuous: bool,
    /// Cancellation flag, shared with the requester
    pub cancellation: CancellationToken,
}

impl RunRequest {
    /// Request covering everything, default profile
    #[must_use]
    pub fn everything() -> Self {
        Self {
            scope: RunScope::All,
            exclusions: HashSet::new(),
            profile: RunProfile::default(),
            continuous: false,
            cancellation: CancellationToken::new(),
        }
    }

    /// Request scoped to explicit nodes
    #[must_use]
    pub fn nodes(ids: Vec<NodeId>) -> Self {
        Self {
            scope: RunScope::Nodes(ids),
            ..Self::everything()
        }
    }

    /// Set the profile
    #[must_use]
    pub const fn with_profile(mut self, profile: RunProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Add an exclusion
    #[must_use]
    pub fn excluding(mut self, id: NodeId) -> Self {
        self.exclusions.insert(id);
        self
    }

    /// Use an externally held cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Mark the request continuous
    #[must_use]
    pub const fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }
}

/// Outcome of one queued assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Evaluated and held
    Passed,
    /// Evaluated and did not hold
    Failed,
    /// Not evaluated: cancellation was requested before its turn
    Skipped,
}

/// Completed-run handle: per-assertion outcomes in execution order plus
/// the coverage tables for on-demand detail
#[derive(Debug, Clone)]
pub struct RunHandle {
    /// Run identity
    pub run_id: Uuid,
    /// (assertion, outcome) pairs in queue order
    pub outcomes: Vec<(NodeId, Outcome)>,
    /// Continuous registrations made by this request (empty otherwise);
    /// cancel them via [`crate::engine::Engine::cancel_watch`]
    pub subscriptions: Vec<SubscriptionId>,
    pub(crate) coverage: BTreeMap<DocumentId, DocumentCoverage>,
}

impl RunHandle {
    /// Whether every evaluated assertion passed (skips don't fail a run)
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|(_, o)| *o != Outcome::Failed)
    }

    /// Count of a given outcome
    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    /// Documents that contributed coverage in this run
    pub fn covered_documents(&self) -> impl Iterator<Item = &DocumentId> {
        self.coverage.keys()
    }

    /// Detailed per-line coverage for one document, on demand
    #[must_use]
    pub fn detailed_coverage(&self, doc: &DocumentId) -> Option<Vec<CoverageSlot>> {
        self.coverage
            .get(doc)
            .map(|table| table.slots().copied().collect())
    }

    /// Summary (covered, total) for one document
    #[must_use]
    pub fn coverage_summary(&self, doc: &DocumentId) -> Option<(usize, usize)> {
        self.coverage
            .get(doc)
            .map(|table| (table.covered(), table.total()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_request_builder() {
        let excluded = NodeId::line(&DocumentId::new("d.md"), 2);
        let request = RunRequest::everything()
            .with_profile(RunProfile::with_coverage())
            .excluding(excluded.clone())
            .continuous();

        assert_eq!(request.scope, RunScope::All);
        assert!(request.profile.coverage);
        assert!(request.exclusions.contains(&excluded));
        assert!(request.continuous);
    }

    #[test]
    fn test_handle_counters() {
        let doc = DocumentId::new("d.md");
        let handle = RunHandle {
            run_id: Uuid::new_v4(),
            outcomes: vec![
                (NodeId::line(&doc, 0), Outcome::Passed),
                (NodeId::line(&doc, 1), Outcome::Failed),
                (NodeId::line(&doc, 2), Outcome::Skipped),
            ],
            subscriptions: Vec::new(),
            coverage: BTreeMap::new(),
        };

        assert!(!handle.all_passed());
        assert_eq!(handle.count(Outcome::Passed), 1);
        assert_eq!(handle.count(Outcome::Skipped), 1);
        assert!(handle.coverage_summary(&doc).is_none());
    }
}
