//! Tree Synchronizer
//!
//! Owns the persistent node hierarchy (document → section → assertion)
//! and reconciles a document's subtree against a fresh parse of its
//! current text. Node identities are plain values: the core never stores
//! host-side handles, hosts map a [`NodeId`] to whatever object
//! represents it on their side.
//!
//! Identity has two layers:
//! - [`NodeId`] is the structural key, `<document>` for a document node
//!   and `<document>#L<line>` (0-based line) for sections and assertions.
//! - [`Node::uid`] is the instance identity. Re-synchronizing keeps the
//!   `uid` of every node whose source line is unchanged, so pass/fail
//!   state and continuous-run registrations held against it stay valid.
//!   A line whose content changed gets a fresh `uid` under the same key.

use crate::parser::{AssertionCheck, AssertionScanner, ParseEvent, TextRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identity of one source document (normalized location string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document identity
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identity as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DocumentId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Structural identity of one node in the tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Identity of a document node
    #[must_use]
    pub fn document(doc: &DocumentId) -> Self {
        Self(doc.as_str().to_string())
    }

    /// Identity of the section or assertion node on `line` of `doc`
    #[must_use]
    pub fn line(doc: &DocumentId, line: u32) -> Self {
        Self(format!("{doc}#L{line}"))
    }

    /// Parse an identity from its string form (`<doc>` or `<doc>#L<line>`)
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(raw.to_string())
    }

    /// The identity as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document this node belongs to
    #[must_use]
    pub fn document_id(&self) -> DocumentId {
        match self.0.rsplit_once("#L") {
            Some((doc, line)) if !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit()) => {
                DocumentId::new(doc)
            }
            _ => DocumentId::new(self.0.clone()),
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Variant-specific payload of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// A source document; `resolved` is false until its first parse
    Document {
        /// Whether the document has been parsed at least once
        resolved: bool,
    },
    /// A heading and everything nested under it
    Section {
        /// Display name (heading title)
        name: String,
        /// Nesting depth, larger = more nested
        depth: u32,
    },
    /// One arithmetic equality check (leaf)
    Assertion {
        /// The parsed check
        check: AssertionCheck,
    },
}

/// One node of the document/section/assertion hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Structural identity
    pub id: NodeId,
    /// Instance identity, stable across re-parses of an unchanged line
    pub uid: Uuid,
    /// Owning document
    pub document: DocumentId,
    /// Source range (zero for document nodes)
    pub range: TextRange,
    /// Variant payload
    pub kind: NodeKind,
    /// Direct children in source order (always empty for assertions)
    pub children: Vec<NodeId>,
}

impl Node {
    /// Whether this is an assertion leaf
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self.kind, NodeKind::Assertion { .. })
    }

    /// The assertion payload, if this is an assertion node
    #[must_use]
    pub const fn check(&self) -> Option<&AssertionCheck> {
        match &self.kind {
            NodeKind::Assertion { check } => Some(check),
            _ => None,
        }
    }

    /// Whether this is a document node that has been parsed
    #[must_use]
    pub const fn is_resolved_document(&self) -> bool {
        matches!(self.kind, NodeKind::Document { resolved: true })
    }

    /// Human-readable label for reporting
    #[must_use]
    pub fn label(&self) -> String {
        match &self.kind {
            NodeKind::Document { .. } => self.document.to_string(),
            NodeKind::Section { name, .. } => name.clone(),
            NodeKind::Assertion { check } => check.to_string(),
        }
    }
}

/// The persistent hierarchy of all observed documents
#[derive(Debug, Default)]
pub struct AssertionTree {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<DocumentId>,
    scanner: AssertionScanner,
}

impl AssertionTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All observed documents, in observation order
    #[must_use]
    pub fn documents(&self) -> &[DocumentId] {
        &self.roots
    }

    /// Look up a node by identity
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Register a document first observed but not yet parsed.
    ///
    /// Idempotent: an already-known document (resolved or not) is left
    /// untouched.
    pub fn insert_unresolved(&mut self, doc: DocumentId) {
        let id = NodeId::document(&doc);
        if self.nodes.contains_key(&id) {
            return;
        }
        self.nodes.insert(
            id.clone(),
            Node {
                id,
                uid: Uuid::new_v4(),
                document: doc.clone(),
                range: TextRange::new(0, 0, 0),
                kind: NodeKind::Document { resolved: false },
                children: Vec::new(),
            },
        );
        self.roots.push(doc);
    }

    /// Drop a document and its entire subtree (deleted / unreachable)
    pub fn remove_document(&mut self, doc: &DocumentId) {
        self.nodes.retain(|_, node| node.document != *doc);
        self.roots.retain(|root| root != doc);
    }

    /// Whether a document node exists and has been parsed
    #[must_use]
    pub fn is_resolved(&self, doc: &DocumentId) -> bool {
        self.node(&NodeId::document(doc))
            .is_some_and(Node::is_resolved_document)
    }

    /// Reconcile `doc`'s subtree against a fresh parse of `text`.
    ///
    /// Nodes whose source line is unchanged keep their `uid`; new lines
    /// get new nodes; stale nodes are dropped. Nesting follows the
    /// heading depth stack: a heading closes every open section of
    /// equal-or-shallower depth. Running this twice on identical text
    /// changes nothing.
    pub fn sync_document(&mut self, doc: &DocumentId, text: &str) {
        self.insert_unresolved(doc.clone());
        let root_id = NodeId::document(doc);

        // Detach the previous subtree; unchanged lines are re-adopted below.
        let stale: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| node.document == *doc && node.id != root_id)
            .map(|node| node.id.clone())
            .collect();
        let mut previous: HashMap<NodeId, Node> = stale
            .into_iter()
            .filter_map(|id| self.nodes.remove(&id).map(|node| (id, node)))
            .collect();

        let events: Vec<ParseEvent> = self.scanner.scan(text).collect();

        let mut children_of: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut built: Vec<Node> = Vec::new();
        let mut stack: Vec<(NodeId, u32)> = Vec::new();

        for event in events {
            let range = event.range();
            let id = NodeId::line(doc, range.line);

            let (kind, depth) = match event {
                ParseEvent::Heading { name, depth, .. } => {
                    while stack.last().is_some_and(|&(_, open)| open >= depth) {
                        stack.pop();
                    }
                    (NodeKind::Section { name, depth }, Some(depth))
                }
                ParseEvent::Assertion { check, .. } => (NodeKind::Assertion { check }, None),
            };

            // Reuse rule: same structural key, same payload, same range.
            let uid = previous
                .remove(&id)
                .filter(|old| old.kind == kind && old.range == range)
                .map_or_else(Uuid::new_v4, |old| old.uid);

            let parent = stack
                .last()
                .map_or_else(|| root_id.clone(), |(open, _)| open.clone());
            children_of.entry(parent).or_default().push(id.clone());

            built.push(Node {
                id: id.clone(),
                uid,
                document: doc.clone(),
                range,
                kind,
                children: Vec::new(),
            });

            if let Some(depth) = depth {
                stack.push((id, depth));
            }
        }

        for mut node in built {
            node.children = children_of.remove(&node.id).unwrap_or_default();
            self.nodes.insert(node.id.clone(), node);
        }

        if let Some(root) = self.nodes.get_mut(&root_id) {
            root.children = children_of.remove(&root_id).unwrap_or_default();
            root.kind = NodeKind::Document { resolved: true };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Operator;

    const SAMPLE: &str = "# A\n2+2=4\n## B\n3*3=9\n2+2=5\n";

    fn doc() -> DocumentId {
        DocumentId::new("sample.md")
    }

    fn synced(text: &str) -> AssertionTree {
        let mut tree = AssertionTree::new();
        tree.sync_document(&doc(), text);
        tree
    }

    mod node_id_tests {
        use super::*;

        #[test]
        fn test_line_id_round_trips_document() {
            let id = NodeId::line(&doc(), 7);
            assert_eq!(id.as_str(), "sample.md#L7");
            assert_eq!(id.document_id(), doc());
        }

        #[test]
        fn test_document_id_of_document_node() {
            let id = NodeId::document(&doc());
            assert_eq!(id.document_id(), doc());
        }
    }

    mod sync_tests {
        use super::*;

        #[test]
        fn test_sample_tree_shape() {
            let tree = synced(SAMPLE);
            let root = tree.node(&NodeId::document(&doc())).unwrap();
            assert!(root.is_resolved_document());
            assert_eq!(root.children, vec![NodeId::line(&doc(), 0)]);

            let section_a = tree.node(&NodeId::line(&doc(), 0)).unwrap();
            assert_eq!(
                section_a.kind,
                NodeKind::Section {
                    name: "A".to_string(),
                    depth: 1
                }
            );
            assert_eq!(
                section_a.children,
                vec![NodeId::line(&doc(), 1), NodeId::line(&doc(), 2)]
            );

            let section_b = tree.node(&NodeId::line(&doc(), 2)).unwrap();
            assert_eq!(
                section_b.children,
                vec![NodeId::line(&doc(), 3), NodeId::line(&doc(), 4)]
            );
            let failing = tree.node(&NodeId::line(&doc(), 4)).unwrap();
            assert_eq!(
                failing.check(),
                Some(&AssertionCheck {
                    left: 2,
                    op: Operator::Add,
                    right: 2,
                    expected: 5
                })
            );
        }

        #[test]
        fn test_equal_depth_heading_closes_scope() {
            let tree = synced("# A\n1+1=2\n# C\n2+2=4\n");
            let root = tree.node(&NodeId::document(&doc())).unwrap();
            assert_eq!(
                root.children,
                vec![NodeId::line(&doc(), 0), NodeId::line(&doc(), 2)]
            );
            let section_c = tree.node(&NodeId::line(&doc(), 2)).unwrap();
            assert_eq!(section_c.children, vec![NodeId::line(&doc(), 3)]);
        }

        #[test]
        fn test_shallower_heading_closes_deeper_scopes() {
            let tree = synced("# A\n### Deep\n1+1=2\n## Mid\n2+2=4\n");
            let section_a = tree.node(&NodeId::line(&doc(), 0)).unwrap();
            assert_eq!(
                section_a.children,
                vec![NodeId::line(&doc(), 1), NodeId::line(&doc(), 3)]
            );
        }

        #[test]
        fn test_assertion_before_any_heading_attaches_to_root() {
            let tree = synced("1+1=2\n# A\n");
            let root = tree.node(&NodeId::document(&doc())).unwrap();
            assert_eq!(root.children[0], NodeId::line(&doc(), 0));
        }

        #[test]
        fn test_children_lie_within_section_scope() {
            let tree = synced(SAMPLE);
            // Every child of a section starts after the heading line and
            // before the next equal-or-shallower heading.
            let section_b = tree.node(&NodeId::line(&doc(), 2)).unwrap();
            for child in &section_b.children {
                let line = tree.node(child).unwrap().range.line;
                assert!(line > 2 && line < 5);
            }
        }
    }

    mod identity_tests {
        use super::*;

        #[test]
        fn test_sync_is_idempotent() {
            let mut tree = synced(SAMPLE);
            let before: Vec<(NodeId, Uuid)> = {
                let root = tree.node(&NodeId::document(&doc())).unwrap();
                let mut pairs = vec![(root.id.clone(), root.uid)];
                for line in 0..5 {
                    let node = tree.node(&NodeId::line(&doc(), line)).unwrap();
                    pairs.push((node.id.clone(), node.uid));
                }
                pairs
            };

            tree.sync_document(&doc(), SAMPLE);

            for (id, uid) in before {
                assert_eq!(tree.node(&id).unwrap().uid, uid, "uid changed for {id}");
            }
        }

        #[test]
        fn test_unchanged_lines_keep_uid_when_sibling_edited() {
            let mut tree = synced("# A\n2+2=4\n3+3=6\n");
            let kept = tree.node(&NodeId::line(&doc(), 1)).unwrap().uid;

            tree.sync_document(&doc(), "# A\n2+2=4\n3+3=7\n");

            assert_eq!(tree.node(&NodeId::line(&doc(), 1)).unwrap().uid, kept);
        }

        #[test]
        fn test_changed_line_gets_fresh_uid() {
            let mut tree = synced("# A\n2+2=4\n");
            let old = tree.node(&NodeId::line(&doc(), 1)).unwrap().uid;

            tree.sync_document(&doc(), "# A\n2+2=5\n");

            assert_ne!(tree.node(&NodeId::line(&doc(), 1)).unwrap().uid, old);
        }

        #[test]
        fn test_insert_above_reassigns_line_identity() {
            // Accepted approximation: identity is keyed by line number, so
            // inserting a line above shifts the key and the uid.
            let mut tree = synced("2+2=4\n");
            let old = tree.node(&NodeId::line(&doc(), 0)).unwrap().uid;

            tree.sync_document(&doc(), "# New heading\n2+2=4\n");

            let shifted = tree.node(&NodeId::line(&doc(), 1)).unwrap();
            assert!(shifted.is_assertion());
            assert_ne!(shifted.uid, old);
        }

        #[test]
        fn test_stale_nodes_are_removed() {
            let mut tree = synced(SAMPLE);
            tree.sync_document(&doc(), "# A\n2+2=4\n");

            assert!(tree.node(&NodeId::line(&doc(), 4)).is_none());
            assert!(tree.node(&NodeId::line(&doc(), 2)).is_none());
        }
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn test_insert_unresolved_is_idempotent() {
            let mut tree = AssertionTree::new();
            tree.insert_unresolved(doc());
            let uid = tree.node(&NodeId::document(&doc())).unwrap().uid;
            tree.insert_unresolved(doc());

            assert_eq!(tree.documents().len(), 1);
            assert_eq!(tree.node(&NodeId::document(&doc())).unwrap().uid, uid);
            assert!(!tree.is_resolved(&doc()));
        }

        #[test]
        fn test_sync_marks_resolved() {
            let tree = synced("1+1=2\n");
            assert!(tree.is_resolved(&doc()));
        }

        #[test]
        fn test_remove_document_drops_subtree() {
            let mut tree = synced(SAMPLE);
            tree.remove_document(&doc());

            assert!(tree.documents().is_empty());
            assert!(tree.node(&NodeId::document(&doc())).is_none());
            assert!(tree.node(&NodeId::line(&doc(), 0)).is_none());
        }
    }
}
