//! Filesystem change stream for continuous mode
//!
//! notify-backed watcher feeding [`crate::engine::Engine::document_changed`]
//! and [`crate::engine::Engine::document_removed`]. Raw events are
//! filtered through the document glob, debounced, and deduplicated by
//! path before being handed to the engine.

use crate::result::{AfirmarError, AfirmarResult};
use crate::source::{normalize_path, DocPattern};
use crate::tree::DocumentId;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};

/// Configuration for the document watcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Glob selecting the documents of interest, matched against paths
    /// relative to the root they changed under
    pub pattern: String,
    /// Directories to watch recursively
    pub roots: Vec<PathBuf>,
    /// Debounce duration in milliseconds
    pub debounce_ms: u64,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            pattern: DocPattern::default().as_str().to_string(),
            roots: vec![PathBuf::from(".")],
            debounce_ms: 300,
        }
    }
}

impl WatchSettings {
    /// Settings watching `root` with the given document glob
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, pattern: &DocPattern) -> Self {
        Self {
            pattern: pattern.as_str().to_string(),
            roots: vec![root.into()],
            debounce_ms: 300,
        }
    }

    /// Set the debounce duration
    #[must_use]
    pub const fn with_debounce(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }
}

/// Kind of document change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocChangeKind {
    /// Document was created
    Created,
    /// Document content changed
    Modified,
    /// Document was deleted
    Deleted,
}

impl DocChangeKind {
    fn from_event(kind: EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Access(_) | EventKind::Any | EventKind::Other => None,
        }
    }
}

/// One debounced document change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocChange {
    /// Identity of the changed document
    pub id: DocumentId,
    /// What happened to it
    pub kind: DocChangeKind,
}

/// Watcher over the workspace's assertion documents
pub struct DocWatcher {
    settings: WatchSettings,
    pattern: DocPattern,
    watcher: Option<RecommendedWatcher>,
    receiver: Option<Receiver<Result<Event, notify::Error>>>,
    last_trigger: Option<Instant>,
    pending: Vec<DocChange>,
}

impl DocWatcher {
    /// Create a watcher (not started)
    #[must_use]
    pub fn new(settings: WatchSettings) -> Self {
        let pattern = DocPattern::new(settings.pattern.clone());
        Self {
            settings,
            pattern,
            watcher: None,
            receiver: None,
            last_trigger: None,
            pending: Vec::new(),
        }
    }

    /// Start watching the configured roots
    pub fn start(&mut self) -> AfirmarResult<()> {
        let (tx, rx) = channel();

        let config = Config::default().with_poll_interval(Duration::from_millis(100));
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                // Receiver may have been dropped on stop.
                let _ = tx.send(res);
            },
            config,
        )
        .map_err(|e| AfirmarError::WatchError {
            message: format!("failed to create watcher: {e}"),
        })?;

        for root in &self.settings.roots {
            if root.exists() {
                watcher
                    .watch(root, RecursiveMode::Recursive)
                    .map_err(|e| AfirmarError::WatchError {
                        message: format!("failed to watch {}: {e}", root.display()),
                    })?;
            }
        }

        self.watcher = Some(watcher);
        self.receiver = Some(rx);
        Ok(())
    }

    /// Stop watching
    pub fn stop(&mut self) {
        self.watcher = None;
        self.receiver = None;
    }

    /// Whether the watcher is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// Drain pending changes (non-blocking, debounced, deduplicated).
    ///
    /// Returns `None` until the debounce window has elapsed or when
    /// nothing relevant changed.
    pub fn check_changes(&mut self) -> Option<Vec<DocChange>> {
        let receiver = self.receiver.as_ref()?;
        let now = Instant::now();

        while let Ok(result) = receiver.try_recv() {
            let Ok(event) = result else { continue };
            let Some(kind) = DocChangeKind::from_event(event.kind) else {
                continue;
            };
            for path in event.paths {
                if self.matches_document(&path) {
                    self.pending.push(DocChange {
                        id: DocumentId::new(normalize_path(&path)),
                        kind,
                    });
                }
            }
        }

        if self.pending.is_empty() {
            return None;
        }

        let elapsed = self.last_trigger.map_or(true, |last| {
            now.duration_since(last).as_millis() >= u128::from(self.settings.debounce_ms)
        });
        if !elapsed {
            return None;
        }

        self.last_trigger = Some(now);
        let drained = std::mem::take(&mut self.pending);

        // Keep the last change per document; a delete following a modify
        // must win.
        let mut deduped: Vec<DocChange> = Vec::new();
        for change in drained {
            if let Some(existing) = deduped.iter_mut().find(|c| c.id == change.id) {
                *existing = change;
            } else {
                deduped.push(change);
            }
        }
        Some(deduped)
    }

    /// Match an event path against the glob the same way enumeration
    /// does: relative to the watch root that produced it.
    fn matches_document(&self, path: &Path) -> bool {
        let relative = self
            .settings
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        self.pattern.matches(&normalize_path(relative))
    }
}

impl std::fmt::Debug for DocWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocWatcher")
            .field("settings", &self.settings)
            .field("is_running", &self.is_running())
            .field("pending", &self.pending.len())
            .finish()
    }
}
