//! Styled terminal reporting for runs

use afirmar::{DocumentId, NodeId, RunHandle, RunReporter};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use uuid::Uuid;

/// Reporter printing one styled line per assertion, with a progress bar
#[derive(Debug)]
pub struct CliReporter {
    progress: Option<ProgressBar>,
    enqueued: u64,
    quiet: bool,
    /// Failure diagnostics collected for the end-of-run summary
    pub failures: Vec<(NodeId, String)>,
    /// Coverage summaries in report order
    pub coverage: Vec<(DocumentId, usize, usize)>,
}

impl CliReporter {
    /// Create a reporter; `quiet` suppresses per-assertion output
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            progress: None,
            enqueued: 0,
            quiet,
            failures: Vec::new(),
            coverage: Vec::new(),
        }
    }

    fn bar(&mut self) -> Option<&ProgressBar> {
        if self.quiet {
            return None;
        }
        if self.progress.is_none() {
            let pb = ProgressBar::new(self.enqueued);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            self.progress = Some(pb);
        }
        self.progress.as_ref()
    }

    fn println(&self, line: &str) {
        if self.quiet {
            return;
        }
        match &self.progress {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
    }
}

impl RunReporter for CliReporter {
    fn on_enqueued(&mut self, _id: &NodeId) {
        self.enqueued += 1;
    }

    fn on_started(&mut self, id: &NodeId) {
        if let Some(pb) = self.bar() {
            pb.set_message(id.as_str().to_string());
        }
    }

    fn on_skipped(&mut self, id: &NodeId) {
        self.println(&format!("{} {id}", style("-").yellow()));
        if let Some(pb) = self.bar() {
            pb.inc(1);
        }
    }

    fn on_passed(&mut self, id: &NodeId) {
        self.println(&format!("{} {id}", style("✓").green()));
        if let Some(pb) = self.bar() {
            pb.inc(1);
        }
    }

    fn on_failed(&mut self, id: &NodeId, message: &str) {
        self.println(&format!(
            "{} {id}: {message}",
            style("✗").red().bold()
        ));
        self.failures.push((id.clone(), message.to_string()));
        if let Some(pb) = self.bar() {
            pb.inc(1);
        }
    }

    fn on_coverage_summary(&mut self, doc: &DocumentId, covered: usize, total: usize) {
        self.coverage.push((doc.clone(), covered, total));
    }

    fn on_ended(&mut self, _run_id: Uuid) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

/// Print the end-of-run summary (and coverage table when collected)
pub fn print_summary(reporter: &CliReporter, handle: &RunHandle) {
    use afirmar::Outcome;

    let passed = handle.count(Outcome::Passed);
    let failed = handle.count(Outcome::Failed);
    let skipped = handle.count(Outcome::Skipped);

    let verdict = if failed == 0 {
        style("ok").green().bold()
    } else {
        style("FAILED").red().bold()
    };
    println!(
        "\nresult: {verdict}. {passed} passed; {failed} failed; {skipped} skipped"
    );

    if !reporter.coverage.is_empty() {
        println!("\ncoverage:");
        for (doc, covered, total) in &reporter.coverage {
            let percent = if *total == 0 {
                100.0
            } else {
                (*covered as f64 / *total as f64) * 100.0
            };
            println!("  {doc}: {covered}/{total} lines ({percent:.0}%)");
        }
    }
}
