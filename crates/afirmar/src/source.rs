//! Document sources
//!
//! The host boundary for reading and enumerating assertion documents.
//! The engine only ever talks to a [`DocumentSource`]; the shipped
//! implementations cover the two host shapes: a workspace on disk
//! ([`FsSource`]) and an in-memory collection ([`MemorySource`], used by
//! editor-driven hosts and tests).

use crate::result::{AfirmarError, AfirmarResult};
use crate::tree::DocumentId;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

/// Glob pattern over `/`-separated document paths (supports `**`, `*`, `?`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPattern {
    pattern: String,
}

impl Default for DocPattern {
    fn default() -> Self {
        Self::new("**/*.md")
    }
}

impl DocPattern {
    /// Create a pattern from a glob string
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }

    /// The raw glob string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Check whether a path matches this pattern
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        let pattern_parts: Vec<&str> = self.pattern.split('/').collect();
        let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        Self::match_parts(&pattern_parts, &path_parts)
    }

    fn match_parts(pattern_parts: &[&str], path_parts: &[&str]) -> bool {
        let Some((first, rest)) = pattern_parts.split_first() else {
            return path_parts.is_empty();
        };

        if *first == "**" {
            // ** matches zero or more path segments
            if rest.is_empty() {
                return true;
            }
            return (0..=path_parts.len()).any(|i| Self::match_parts(rest, &path_parts[i..]));
        }

        match path_parts.split_first() {
            Some((segment, remaining)) if Self::match_segment(first, segment) => {
                Self::match_parts(rest, remaining)
            }
            _ => false,
        }
    }

    fn match_segment(pattern: &str, segment: &str) -> bool {
        let mut pattern_chars = pattern.chars().peekable();
        let mut segment_chars = segment.chars();

        while let Some(p) = pattern_chars.next() {
            match p {
                '*' => {
                    if pattern_chars.peek().is_none() {
                        return true;
                    }
                    let remaining: String = pattern_chars.collect();
                    let remaining_segment: String = segment_chars.collect();
                    return (0..=remaining_segment.len())
                        .any(|i| Self::match_segment(&remaining, &remaining_segment[i..]));
                }
                '?' => {
                    if segment_chars.next().is_none() {
                        return false;
                    }
                }
                c => {
                    if segment_chars.next() != Some(c) {
                        return false;
                    }
                }
            }
        }

        segment_chars.next().is_none()
    }
}

/// A provider of document text and workspace enumeration
pub trait DocumentSource {
    /// Read the full text of one document
    fn read_text(&self, id: &DocumentId) -> AfirmarResult<String>;

    /// Enumerate all documents matching the pattern, in stable order
    fn enumerate(&self, pattern: &DocPattern) -> AfirmarResult<Vec<DocumentId>>;
}

/// Filesystem-backed source rooted at a workspace directory
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    /// Create a source rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The workspace root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Identity of a document addressed relative to the root.
    ///
    /// Produces the same id [`enumerate`](DocumentSource::enumerate)
    /// would for that file, whether or not it exists yet.
    #[must_use]
    pub fn document_id(&self, relative: impl AsRef<Path>) -> DocumentId {
        DocumentId::new(normalize_path(&self.root.join(relative)))
    }

    fn walk(
        dir: &Path,
        root: &Path,
        pattern: &DocPattern,
        found: &mut Vec<DocumentId>,
    ) -> AfirmarResult<()> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                Self::walk(&path, root, pattern, found)?;
            } else {
                let relative = path.strip_prefix(root).unwrap_or(&path);
                if pattern.matches(&normalize_path(relative)) {
                    found.push(DocumentId::new(normalize_path(&path)));
                }
            }
        }
        Ok(())
    }
}

/// Render a path with `/` separators for pattern matching and identity.
/// The root component is a bare `/`, not a segment of its own.
pub(crate) fn normalize_path(path: &Path) -> String {
    let mut out = String::new();
    for component in path.components() {
        match component {
            Component::RootDir => out.push('/'),
            c => {
                if !out.is_empty() && !out.ends_with('/') {
                    out.push('/');
                }
                out.push_str(&c.as_os_str().to_string_lossy());
            }
        }
    }
    out
}

impl DocumentSource for FsSource {
    fn read_text(&self, id: &DocumentId) -> AfirmarResult<String> {
        let path = Path::new(id.as_str());
        std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AfirmarError::DocumentNotFound {
                    id: id.as_str().to_string(),
                }
            } else {
                AfirmarError::Io(e)
            }
        })
    }

    fn enumerate(&self, pattern: &DocPattern) -> AfirmarResult<Vec<DocumentId>> {
        let mut found = Vec::new();
        Self::walk(&self.root, &self.root, pattern, &mut found)?;
        Ok(found)
    }
}

/// In-memory source holding documents in a sorted map
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    docs: BTreeMap<DocumentId, String>,
}

impl MemorySource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a document
    pub fn insert(&mut self, id: impl Into<DocumentId>, text: impl Into<String>) {
        self.docs.insert(id.into(), text.into());
    }

    /// Remove a document
    pub fn remove(&mut self, id: &DocumentId) {
        self.docs.remove(id);
    }
}

impl DocumentSource for MemorySource {
    fn read_text(&self, id: &DocumentId) -> AfirmarResult<String> {
        self.docs
            .get(id)
            .cloned()
            .ok_or_else(|| AfirmarError::DocumentNotFound {
                id: id.as_str().to_string(),
            })
    }

    fn enumerate(&self, pattern: &DocPattern) -> AfirmarResult<Vec<DocumentId>> {
        Ok(self
            .docs
            .keys()
            .filter(|id| pattern.matches(id.as_str()))
            .cloned()
            .collect())
    }
}
