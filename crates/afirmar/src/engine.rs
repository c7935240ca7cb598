//! Engine: discovery, synchronization, and the execution scheduler
//!
//! The engine ties the pieces together on one logical thread: it seeds
//! the tree from a [`DocumentSource`], keeps editor-buffer overlays that
//! take precedence over on-disk text, resynchronizes documents on
//! change, expands run requests depth-first into a flat assertion queue,
//! executes the queue sequentially, and replays continuous registrations
//! when a document changes.
//!
//! Synchronization is best-effort: an unreadable document keeps its
//! previous children and its resolution state, and the failure is logged
//! rather than surfaced. The worst case anywhere in the engine is a tree
//! that lags the true document state until the next successful sync, or
//! a missing coverage table.

use crate::coverage::DocumentCoverage;
use crate::parser::AssertionCheck;
use crate::reporter::RunReporter;
use crate::result::AfirmarResult;
use crate::run::{Outcome, RunHandle, RunRequest, RunScope};
use crate::source::{DocPattern, DocumentSource};
use crate::tree::{AssertionTree, DocumentId, Node, NodeId, NodeKind};
use crate::watch::{ContinuousRegistry, SubscriptionId, WatchScope};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use uuid::Uuid;

/// One queued leaf assertion with its execution context
#[derive(Debug, Clone)]
struct QueueItem {
    id: NodeId,
    check: AssertionCheck,
    line: u32,
    document: DocumentId,
}

/// The discovery/synchronization engine and execution scheduler
#[derive(Debug)]
pub struct Engine<S: DocumentSource> {
    source: S,
    tree: AssertionTree,
    overlays: HashMap<DocumentId, String>,
    registry: ContinuousRegistry,
}

impl<S: DocumentSource> Engine<S> {
    /// Create an engine over a document source
    pub fn new(source: S) -> Self {
        Self {
            source,
            tree: AssertionTree::new(),
            overlays: HashMap::new(),
            registry: ContinuousRegistry::new(),
        }
    }

    /// The tree query surface (documents, node lookup)
    #[must_use]
    pub fn tree(&self) -> &AssertionTree {
        &self.tree
    }

    /// The underlying document source
    #[must_use]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Seed the tree with every document matching `pattern`.
    ///
    /// New documents are observed unresolved; documents already in the
    /// tree are untouched. Returns how many documents the tree now holds.
    pub fn discover(&mut self, pattern: &DocPattern) -> AfirmarResult<usize> {
        for id in self.source.enumerate(pattern)? {
            self.tree.insert_unresolved(id);
        }
        Ok(self.tree.documents().len())
    }

    /// Document text as the engine currently sees it: an open editor
    /// buffer takes precedence over the source.
    pub fn read_text(&self, doc: &DocumentId) -> AfirmarResult<String> {
        match self.overlays.get(doc) {
            Some(text) => Ok(text.clone()),
            None => self.source.read_text(doc),
        }
    }

    /// A document was opened in an editor; its buffer shadows the source
    pub fn document_opened(&mut self, doc: DocumentId, text: impl Into<String>) {
        let text = text.into();
        self.tree.insert_unresolved(doc.clone());
        self.tree.sync_document(&doc, &text);
        self.overlays.insert(doc, text);
    }

    /// An open document's buffer changed
    pub fn document_edited(&mut self, doc: DocumentId, text: impl Into<String>) {
        self.document_opened(doc, text);
    }

    /// An editor buffer was closed; on-disk state applies again
    pub fn document_closed(&mut self, doc: &DocumentId) {
        self.overlays.remove(doc);
        self.synchronize(doc);
    }

    /// A document became unreachable (deleted); drop its subtree
    pub fn document_removed(&mut self, doc: &DocumentId) {
        self.overlays.remove(doc);
        self.tree.remove_document(doc);
    }

    /// Best-effort structural resync of one document.
    ///
    /// On a read failure the previous children and resolution state are
    /// kept unchanged; the error is logged and swallowed.
    pub fn synchronize(&mut self, doc: &DocumentId) {
        match self.read_text(doc) {
            Ok(text) => {
                self.tree.sync_document(doc, &text);
                debug!(document = %doc, "synchronized");
            }
            Err(e) => warn!(document = %doc, error = %e, "synchronization skipped"),
        }
    }

    /// Resolve a node's children on demand, forcing a parse for an
    /// unresolved document.
    pub fn resolve_children(&mut self, id: &NodeId) -> AfirmarResult<Vec<NodeId>> {
        let node = self
            .tree
            .node(id)
            .ok_or_else(|| crate::result::AfirmarError::UnknownNode {
                id: id.as_str().to_string(),
            })?;

        if matches!(node.kind, NodeKind::Document { resolved: false }) {
            let doc = node.document.clone();
            self.synchronize(&doc);
        }

        Ok(self
            .tree
            .node(id)
            .map(|node| node.children.clone())
            .unwrap_or_default())
    }

    /// Record a continuous registration directly
    pub fn watch(&mut self, scope: WatchScope, profile: crate::run::RunProfile) -> SubscriptionId {
        self.registry.watch(scope, profile)
    }

    /// Cancel a continuous registration
    pub fn cancel_watch(&mut self, id: SubscriptionId) {
        self.registry.cancel(id);
    }

    /// A document changed on disk or was created.
    ///
    /// Resynchronizes its subtree, then replays the continuous
    /// registrations affected by the change (if any) as one normal run
    /// through the same reporter path.
    pub fn document_changed(
        &mut self,
        doc: &DocumentId,
        reporter: &mut dyn RunReporter,
    ) -> Option<RunHandle> {
        self.tree.insert_unresolved(doc.clone());
        self.synchronize(doc);

        let (scope, profile) = self.registry.request_for_change(doc)?;
        debug!(document = %doc, "replaying continuous registrations");
        let request = match scope {
            RunScope::All => RunRequest::everything(),
            RunScope::Nodes(ids) => RunRequest::nodes(ids),
        }
        .with_profile(profile);
        Some(self.request_run(request, reporter))
    }

    /// Execute one run request.
    ///
    /// Expansion is depth-first over a snapshot of each node's child
    /// list, pruning excluded subtrees and lazily resolving unresolved
    /// documents. The resulting queue of leaf assertions is processed
    /// strictly in order with a cancellation check before each item. One
    /// coverage summary per covered document is reported at run end, in
    /// document order. A
    /// continuous request additionally registers its scope for replay;
    /// the registrations are returned on the handle.
    pub fn request_run(
        &mut self,
        request: RunRequest,
        reporter: &mut dyn RunReporter,
    ) -> RunHandle {
        let run_id = Uuid::new_v4();
        debug!(%run_id, "run accepted");

        let subscriptions = if request.continuous {
            self.register_continuous(&request)
        } else {
            Vec::new()
        };

        let roots: Vec<NodeId> = match &request.scope {
            RunScope::All => self.tree.documents().iter().map(NodeId::document).collect(),
            RunScope::Nodes(ids) => ids.clone(),
        };

        let mut coverage: BTreeMap<DocumentId, DocumentCoverage> = BTreeMap::new();
        let mut queue: Vec<QueueItem> = Vec::new();
        for id in &roots {
            self.expand(id, &request, &mut coverage, &mut queue, reporter);
        }

        let mut outcomes = Vec::with_capacity(queue.len());
        for item in &queue {
            reporter.on_output_line(&format!("Running {}", item.id));

            let outcome = if request.cancellation.is_cancelled() {
                reporter.on_skipped(&item.id);
                Outcome::Skipped
            } else {
                reporter.on_started(&item.id);
                let outcome = match item.check.evaluate() {
                    Ok(()) => {
                        reporter.on_passed(&item.id);
                        Outcome::Passed
                    }
                    Err(message) => {
                        reporter.on_failed(&item.id, &message);
                        Outcome::Failed
                    }
                };
                if let Some(table) = coverage.get_mut(&item.document) {
                    table.record_hit(item.line);
                }
                outcome
            };
            outcomes.push((item.id.clone(), outcome));

            reporter.on_output_line(&format!("Completed {}", item.id));
        }

        for (doc, table) in &coverage {
            reporter.on_coverage_summary(doc, table.covered(), table.total());
        }
        reporter.on_ended(run_id);
        debug!(%run_id, assertions = outcomes.len(), "run ended");

        RunHandle {
            run_id,
            outcomes,
            subscriptions,
            coverage,
        }
    }

    fn register_continuous(&mut self, request: &RunRequest) -> Vec<SubscriptionId> {
        match &request.scope {
            RunScope::All => vec![self.registry.watch(WatchScope::All, request.profile)],
            RunScope::Nodes(ids) => ids
                .iter()
                .map(|id| {
                    self.registry
                        .watch(WatchScope::Node(id.clone()), request.profile)
                })
                .collect(),
        }
    }

    /// Depth-first expansion of one scope node into the queue
    fn expand(
        &mut self,
        id: &NodeId,
        request: &RunRequest,
        coverage: &mut BTreeMap<DocumentId, DocumentCoverage>,
        queue: &mut Vec<QueueItem>,
        reporter: &mut dyn RunReporter,
    ) {
        if request.exclusions.contains(id) {
            return;
        }
        let Some(node) = self.tree.node(id) else {
            warn!(node = %id, "scope node not in tree, skipping");
            return;
        };
        let document = node.document.clone();

        // Lazy resolution: an unresolved document is parsed before its
        // children are read, never eagerly.
        if matches!(node.kind, NodeKind::Document { resolved: false }) {
            self.synchronize(&document);
        }
        let Some(node) = self.tree.node(id) else {
            return;
        };

        if let NodeKind::Assertion { check } = &node.kind {
            queue.push(QueueItem {
                id: id.clone(),
                check: *check,
                line: node.range.line,
                document: document.clone(),
            });
            reporter.on_enqueued(id);
        } else {
            // Snapshot the child list: a change notification arriving
            // mid-run must not mutate the structure we iterate.
            let children = node.children.clone();
            for child in &children {
                self.expand(child, request, coverage, queue, reporter);
            }
        }

        if request.profile.coverage && !coverage.contains_key(&document) {
            match self.read_text(&document) {
                Ok(text) => {
                    coverage.insert(document, DocumentCoverage::from_text(&text));
                }
                // Unreadable document: it simply contributes no coverage.
                Err(e) => warn!(document = %document, error = %e, "no coverage for document"),
            }
        }
    }
}

impl<S: DocumentSource> Engine<S> {
    /// Convenience lookup on the tree
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.tree.node(id)
    }
}
