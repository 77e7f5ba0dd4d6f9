//! Step outcomes and the end-of-run summary

use colored::Colorize;

use super::cleanup::CleanupReport;
use super::suite::SuiteState;
use crate::common::Error;

/// Outcome a step is expected to have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Success,
    /// Negative test: the CLI must reject the command
    Failure,
}

/// A finished step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub description: String,
    pub expected: Expectation,
    pub code: i32,
}

impl StepRecord {
    pub fn as_expected(&self) -> bool {
        match self.expected {
            Expectation::Success => self.code == 0,
            Expectation::Failure => self.code != 0,
        }
    }
}

/// Everything a completed run produced
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub steps: Vec<StepRecord>,
    pub cleanup: Vec<CleanupReport>,
    /// Set when a resource type could not be listed for cleanup
    pub cleanup_error: Option<Error>,
    pub state: SuiteState,
}

impl SuiteReport {
    /// Steps whose outcome differed from their expectation
    pub fn mismatches(&self) -> Vec<&StepRecord> {
        self.steps.iter().filter(|s| !s.as_expected()).collect()
    }

    /// Every step behaved as expected and no fixture resource was left behind
    pub fn passed(&self) -> bool {
        self.steps.iter().all(StepRecord::as_expected)
            && self.cleanup.iter().all(CleanupReport::is_clean)
            && self.cleanup_error.is_none()
    }

    pub fn print_summary(&self) {
        println!("\n{}", "Summary:".cyan());
        println!(
            "  {} of {} steps behaved as expected",
            self.steps.len() - self.mismatches().len(),
            self.steps.len()
        );

        for step in self.mismatches() {
            let expected = match step.expected {
                Expectation::Success => "success",
                Expectation::Failure => "failure",
            };
            println!(
                "  {} {} (expected {}, exit code {})",
                "✗".red(),
                step.description,
                expected,
                step.code
            );
        }

        for cleanup in &self.cleanup {
            print_cleanup(cleanup);
        }
        if let Some(e) = &self.cleanup_error {
            println!("  {} Cleanup aborted: {e}", "✗".red());
        }

        if self.passed() {
            println!("\n{} {}\n", "✓".green().bold(), "Suite Passed".green().bold());
        } else {
            println!("\n{} {}\n", "✗".red().bold(), "Suite Failed".red().bold());
        }
    }
}

/// One line per reconciled resource type
pub fn print_cleanup(cleanup: &CleanupReport) {
    let mark = if cleanup.is_clean() {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "  {} Cleanup {}: {} deleted, {} failed",
        mark,
        cleanup.resource,
        cleanup.deleted.len(),
        cleanup.failed.len()
    );
    for name in &cleanup.failed {
        println!("      left behind: {name}");
    }
}
