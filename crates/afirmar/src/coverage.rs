//! Coverage Tracker
//!
//! Per-document, per-line execution bookkeeping for a single run. One
//! slot exists per non-blank source line; blank lines get no slot. Slots
//! live for the duration of one run and are reported once at run end.

use serde::{Deserialize, Serialize};

/// Execution bookkeeping for one source line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageSlot {
    /// Covered line number (0-based)
    pub line: u32,
    /// Times an assertion on this line was executed (raw, not clamped)
    pub executed: u64,
}

/// Per-line coverage table for one document within one run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentCoverage {
    // Indexed by line number; None for blank lines.
    slots: Vec<Option<CoverageSlot>>,
}

impl DocumentCoverage {
    /// Build one slot per non-blank line of `text`
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            slots: text
                .lines()
                .enumerate()
                .map(|(line_no, line)| {
                    if line.trim().is_empty() {
                        None
                    } else {
                        Some(CoverageSlot {
                            line: line_no as u32,
                            executed: 0,
                        })
                    }
                })
                .collect(),
        }
    }

    /// Record one execution on `line`, if it has a slot
    pub fn record_hit(&mut self, line: u32) {
        if let Some(Some(slot)) = self.slots.get_mut(line as usize) {
            slot.executed += 1;
        }
    }

    /// Number of slots executed at least once
    #[must_use]
    pub fn covered(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.executed > 0)
            .count()
    }

    /// Total number of slots (non-blank lines)
    #[must_use]
    pub fn total(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Individual line entries, for detailed reporting on demand
    pub fn slots(&self) -> impl Iterator<Item = &CoverageSlot> {
        self.slots.iter().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_get_no_slot() {
        let coverage = DocumentCoverage::from_text("1+1=2\n\n   \n2+2=4\n");
        assert_eq!(coverage.total(), 2);
        let lines: Vec<u32> = coverage.slots().map(|s| s.line).collect();
        assert_eq!(lines, vec![0, 3]);
    }

    #[test]
    fn test_record_hit_and_covered() {
        let mut coverage = DocumentCoverage::from_text("1+1=2\n\n2+2=4\n");
        coverage.record_hit(0);
        assert_eq!(coverage.covered(), 1);
        assert_eq!(coverage.total(), 2);
    }

    #[test]
    fn test_hit_on_blank_line_is_ignored() {
        let mut coverage = DocumentCoverage::from_text("1+1=2\n\n");
        coverage.record_hit(1);
        coverage.record_hit(99);
        assert_eq!(coverage.covered(), 0);
    }

    #[test]
    fn test_raw_count_is_preserved() {
        let mut coverage = DocumentCoverage::from_text("1+1=2\n");
        coverage.record_hit(0);
        coverage.record_hit(0);
        let slot = coverage.slots().next().unwrap();
        assert_eq!(slot.executed, 2);
        // Coverage percentage still counts the line once.
        assert_eq!(coverage.covered(), 1);
    }

    #[test]
    fn test_empty_text() {
        let coverage = DocumentCoverage::from_text("");
        assert_eq!(coverage.total(), 0);
        assert_eq!(coverage.covered(), 0);
    }
}
