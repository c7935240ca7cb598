//! Continuous-Run Registry
//!
//! Records which run requests are continuous (their scope plus chosen
//! profile), keyed by a specific node or the sentinel "all". On a
//! change notification it determines which recorded requests are
//! affected and yields the single run request to replay.

use crate::run::{RunProfile, RunScope};
use crate::tree::{DocumentId, NodeId};
use uuid::Uuid;

/// Key of a continuous-run registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchScope {
    /// Re-run everything on any change
    All,
    /// Re-run one node when its owning document changes
    Node(NodeId),
}

/// Handle for cancelling one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

#[derive(Debug, Clone)]
struct WatchEntry {
    id: SubscriptionId,
    scope: WatchScope,
    profile: RunProfile,
}

/// Registry of continuous-run registrations, in registration order
#[derive(Debug, Clone, Default)]
pub struct ContinuousRegistry {
    entries: Vec<WatchEntry>,
}

impl ContinuousRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a continuous registration; the handle cancels it
    pub fn watch(&mut self, scope: WatchScope, profile: RunProfile) -> SubscriptionId {
        let id = SubscriptionId(Uuid::new_v4());
        self.entries.push(WatchEntry { id, scope, profile });
        id
    }

    /// Remove a registration
    pub fn cancel(&mut self, id: SubscriptionId) {
        self.entries.retain(|entry| entry.id != id);
    }

    /// Number of live registrations
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no registrations exist
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The single run to replay for a change to `doc`, if any.
    ///
    /// An "all" registration wins outright and replays everything with
    /// its profile (last-registered "all" wins). Otherwise every node
    /// registration owned by `doc` is combined into one scope; ties on
    /// profile resolve last-registered-wins, since one profile drives
    /// one invocation.
    #[must_use]
    pub fn request_for_change(&self, doc: &DocumentId) -> Option<(RunScope, RunProfile)> {
        if let Some(entry) = self
            .entries
            .iter()
            .rev()
            .find(|entry| entry.scope == WatchScope::All)
        {
            return Some((RunScope::All, entry.profile));
        }

        let mut include = Vec::new();
        let mut profile = None;
        for entry in &self.entries {
            if let WatchScope::Node(id) = &entry.scope {
                if id.document_id() == *doc {
                    include.push(id.clone());
                    profile = Some(entry.profile);
                }
            }
        }

        profile.map(|profile| (RunScope::Nodes(include), profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(name: &str) -> DocumentId {
        DocumentId::new(name)
    }

    #[test]
    fn test_all_registration_wins() {
        let mut registry = ContinuousRegistry::new();
        registry.watch(
            WatchScope::Node(NodeId::line(&doc("a.md"), 1)),
            RunProfile::default(),
        );
        registry.watch(WatchScope::All, RunProfile::with_coverage());

        let (scope, profile) = registry.request_for_change(&doc("a.md")).unwrap();
        assert_eq!(scope, RunScope::All);
        assert!(profile.coverage);
    }

    #[test]
    fn test_node_registrations_combine_into_one_scope() {
        let mut registry = ContinuousRegistry::new();
        let first = NodeId::line(&doc("a.md"), 1);
        let second = NodeId::line(&doc("a.md"), 4);
        registry.watch(WatchScope::Node(first.clone()), RunProfile::default());
        registry.watch(
            WatchScope::Node(second.clone()),
            RunProfile::with_coverage(),
        );

        let (scope, profile) = registry.request_for_change(&doc("a.md")).unwrap();
        assert_eq!(scope, RunScope::Nodes(vec![first, second]));
        // Last-registered profile drives the combined invocation.
        assert!(profile.coverage);
    }

    #[test]
    fn test_unrelated_document_yields_nothing() {
        let mut registry = ContinuousRegistry::new();
        registry.watch(
            WatchScope::Node(NodeId::line(&doc("a.md"), 1)),
            RunProfile::default(),
        );

        assert!(registry.request_for_change(&doc("b.md")).is_none());
    }

    #[test]
    fn test_cancel_removes_registration() {
        let mut registry = ContinuousRegistry::new();
        let id = registry.watch(WatchScope::All, RunProfile::default());
        assert_eq!(registry.len(), 1);

        registry.cancel(id);
        assert!(registry.is_empty());
        assert!(registry.request_for_change(&doc("a.md")).is_none());
    }

    #[test]
    fn test_document_node_registration_matches_its_document() {
        let mut registry = ContinuousRegistry::new();
        let node = NodeId::document(&doc("a.md"));
        registry.watch(WatchScope::Node(node.clone()), RunProfile::default());

        let (scope, _) = registry.request_for_change(&doc("a.md")).unwrap();
        assert_eq!(scope, RunScope::Nodes(vec![node]));
    }
}
