//! Run reporters
//!
//! Streaming callbacks through which a run reports progress back to its
//! host: enqueue/start/skip/pass/fail per assertion, free-form output
//! lines, and one coverage summary per document at run end.

use crate::tree::{DocumentId, NodeId};
use serde::{Deserialize, Serialize};
use std::io::Write;
use uuid::Uuid;

/// Streaming run callbacks. All methods default to no-ops so hosts only
/// implement what they present.
pub trait RunReporter {
    /// An assertion entered the run queue
    fn on_enqueued(&mut self, _id: &NodeId) {}

    /// An assertion is about to be evaluated
    fn on_started(&mut self, _id: &NodeId) {}

    /// An assertion was skipped because cancellation was requested
    fn on_skipped(&mut self, _id: &NodeId) {}

    /// An assertion evaluated and held
    fn on_passed(&mut self, _id: &NodeId) {}

    /// An assertion evaluated and did not hold
    fn on_failed(&mut self, _id: &NodeId, _message: &str) {}

    /// A free-form output line from the run
    fn on_output_line(&mut self, _text: &str) {}

    /// End-of-run coverage summary for one document
    fn on_coverage_summary(&mut self, _doc: &DocumentId, _covered: usize, _total: usize) {}

    /// The run ended; no further events will be reported
    fn on_ended(&mut self, _run_id: Uuid) {}
}

/// Reporter that discards all events
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl RunReporter for NullReporter {}

/// A single reported event, as captured by [`RecordingReporter`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReportEvent {
    /// Assertion entered the queue
    Enqueued {
        /// Node identity
        id: NodeId,
    },
    /// Assertion started
    Started {
        /// Node identity
        id: NodeId,
    },
    /// Assertion skipped
    Skipped {
        /// Node identity
        id: NodeId,
    },
    /// Assertion passed
    Passed {
        /// Node identity
        id: NodeId,
    },
    /// Assertion failed
    Failed {
        /// Node identity
        id: NodeId,
        /// Diagnostic message
        message: String,
    },
    /// Output line
    Output {
        /// Line text
        text: String,
    },
    /// Coverage summary for one document
    CoverageSummary {
        /// Document identity
        doc: DocumentId,
        /// Slots executed at least once
        covered: usize,
        /// Total slots
        total: usize,
    },
    /// Run ended
    Ended {
        /// Run identity
        run_id: Uuid,
    },
}

/// Reporter that records every event in order (tests, event capture)
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    /// Captured events in report order
    pub events: Vec<ReportEvent>,
}

impl RecordingReporter {
    /// Create an empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of events matching a predicate, in order
    pub fn ids<F: Fn(&ReportEvent) -> Option<&NodeId>>(&self, select: F) -> Vec<NodeId> {
        self.events.iter().filter_map(|e| select(e).cloned()).collect()
    }

    /// Started-assertion ids in order
    #[must_use]
    pub fn started(&self) -> Vec<NodeId> {
        self.ids(|e| match e {
            ReportEvent::Started { id } => Some(id),
            _ => None,
        })
    }

    /// Skipped-assertion ids in order
    #[must_use]
    pub fn skipped(&self) -> Vec<NodeId> {
        self.ids(|e| match e {
            ReportEvent::Skipped { id } => Some(id),
            _ => None,
        })
    }

    /// Enqueued-assertion ids in order
    #[must_use]
    pub fn enqueued(&self) -> Vec<NodeId> {
        self.ids(|e| match e {
            ReportEvent::Enqueued { id } => Some(id),
            _ => None,
        })
    }
}

impl RunReporter for RecordingReporter {
    fn on_enqueued(&mut self, id: &NodeId) {
        self.events.push(ReportEvent::Enqueued { id: id.clone() });
    }

    fn on_started(&mut self, id: &NodeId) {
        self.events.push(ReportEvent::Started { id: id.clone() });
    }

    fn on_skipped(&mut self, id: &NodeId) {
        self.events.push(ReportEvent::Skipped { id: id.clone() });
    }

    fn on_passed(&mut self, id: &NodeId) {
        self.events.push(ReportEvent::Passed { id: id.clone() });
    }

    fn on_failed(&mut self, id: &NodeId, message: &str) {
        self.events.push(ReportEvent::Failed {
            id: id.clone(),
            message: message.to_string(),
        });
    }

    fn on_output_line(&mut self, text: &str) {
        self.events.push(ReportEvent::Output {
            text: text.to_string(),
        });
    }

    fn on_coverage_summary(&mut self, doc: &DocumentId, covered: usize, total: usize) {
        self.events.push(ReportEvent::CoverageSummary {
            doc: doc.clone(),
            covered,
            total,
        });
    }

    fn on_ended(&mut self, run_id: Uuid) {
        self.events.push(ReportEvent::Ended { run_id });
    }
}

/// Reporter that writes each event as one JSON line
#[derive(Debug)]
pub struct JsonLinesReporter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesReporter<W> {
    /// Create a reporter writing to `writer`
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the reporter, returning the writer
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, event: &ReportEvent) {
        // A broken pipe on the report stream must not abort the run.
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(self.writer, "{json}");
        }
    }
}

impl<W: Write> RunReporter for JsonLinesReporter<W> {
    fn on_enqueued(&mut self, id: &NodeId) {
        self.emit(&ReportEvent::Enqueued { id: id.clone() });
    }

    fn on_started(&mut self, id: &NodeId) {
        self.emit(&ReportEvent::Started { id: id.clone() });
    }

    fn on_skipped(&mut self, id: &NodeId) {
        self.emit(&ReportEvent::Skipped { id: id.clone() });
    }

    fn on_passed(&mut self, id: &NodeId) {
        self.emit(&ReportEvent::Passed { id: id.clone() });
    }

    fn on_failed(&mut self, id: &NodeId, message: &str) {
        self.emit(&ReportEvent::Failed {
            id: id.clone(),
            message: message.to_string(),
        });
    }

    fn on_output_line(&mut self, text: &str) {
        self.emit(&ReportEvent::Output {
            text: text.to_string(),
        });
    }

    fn on_coverage_summary(&mut self, doc: &DocumentId, covered: usize, total: usize) {
        self.emit(&ReportEvent::CoverageSummary {
            doc: doc.clone(),
            covered,
            total,
        });
    }

    fn on_ended(&mut self, run_id: Uuid) {
        self.emit(&ReportEvent::Ended { run_id });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_reporter_preserves_order() {
        let mut reporter = RecordingReporter::new();
        let id = NodeId::line(&DocumentId::new("d.md"), 0);
        reporter.on_enqueued(&id);
        reporter.on_started(&id);
        reporter.on_passed(&id);

        assert_eq!(
            reporter.events,
            vec![
                ReportEvent::Enqueued { id: id.clone() },
                ReportEvent::Started { id: id.clone() },
                ReportEvent::Passed { id },
            ]
        );
    }

    #[test]
    fn test_json_lines_reporter_emits_one_line_per_event() {
        let mut reporter = JsonLinesReporter::new(Vec::new());
        let id = NodeId::line(&DocumentId::new("d.md"), 3);
        reporter.on_started(&id);
        reporter.on_failed(&id, "Expected 2 + 2 = 5 but got 4");

        let out = String::from_utf8(reporter.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"started\""));
        assert!(lines[1].contains("got 4"));
    }
}
