//! Presentation layer over plans and execution reports.
//!
//! All human-readable printing lives here, as a thin rendering of the
//! core's plan and report objects. Nothing in this module decides what
//! happens to the filesystem.

use crate::executor::{ExecutionReport, OperationState, RunStatus};
use crate::journal::UndoReport;
use crate::plan::{OpKind, OperationPlan};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

/// Styled CLI output for the organizer.
pub struct Presenter;

impl Presenter {
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Lists every planned operation, one line per file.
    pub fn preview(plan: &OperationPlan, dry_run: bool) {
        let header = if dry_run {
            format!("DRY RUN: {} planned operation(s):", plan.len())
        } else {
            format!("{} planned operation(s):", plan.len())
        };
        println!("\n{}", header.bold());

        for op in plan.operations() {
            let verb = match op.kind {
                OpKind::Rename => "rename",
                OpKind::Move => "move",
            };
            println!(
                " - {} {} → {}",
                verb,
                op.source.display(),
                op.destination.display()
            );
        }
    }

    /// Per-bucket counts of planned destinations, sorted for stable
    /// output.
    pub fn plan_summary(plan: &OperationPlan) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for op in plan.operations() {
            let bucket = op
                .destination
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| ".".to_string());
            *counts.entry(bucket).or_insert(0) += 1;
        }

        println!("\n{}", "SUMMARY".bold());
        for (bucket, count) in &counts {
            let word = if *count == 1 { "file" } else { "files" };
            println!("  {}/: {} {}", bucket, count.to_string().green(), word);
        }
        println!(
            "  Total: {} {}",
            plan.len().to_string().green().bold(),
            if plan.len() == 1 { "file" } else { "files" }
        );
    }

    /// Renders the outcome of an execution run.
    pub fn execution_report(report: &ExecutionReport) {
        match report.status {
            RunStatus::Completed => {
                Self::success(&format!("Applied {} operation(s).", report.applied()));
            }
            RunStatus::DryRunCompleted => {
                let failures = report.failures().count();
                if failures == 0 {
                    Self::success(&format!(
                        "Dry run complete. {} operation(s) validated, no files were modified.",
                        report.validated()
                    ));
                } else {
                    Self::warning(&format!(
                        "Dry run complete. {} operation(s) validated, {} would fail:",
                        report.validated(),
                        failures
                    ));
                    for (op, error) in report.failures() {
                        eprintln!("   - {}: {}", op.source.display(), error);
                    }
                }
            }
            RunStatus::PartiallyFailed => {
                Self::error(&format!(
                    "Run stopped early: {} applied, {} not attempted.",
                    report.applied(),
                    report.not_attempted()
                ));
                for (op, error) in report.failures() {
                    eprintln!("   - {}: {}", op.source.display(), error);
                }
                eprintln!("Applied operations stay journaled; use --undo to revert them.");
            }
        }

        // Every step that did run, for the curious.
        for step in &report.steps {
            if let OperationState::Journaled = step.state {
                println!(
                    "   {} {} → {}",
                    "✓".green(),
                    step.operation.source.display(),
                    step.operation.destination.display()
                );
            }
        }
    }

    /// Renders the outcome of a reversal.
    pub fn undo_report(report: &UndoReport) {
        Self::success(&format!("Undo complete. Restored {} file(s).", report.reversed));
        for dir in &report.removed_dirs {
            println!("   Removed empty folder: {}", dir.display());
        }
    }

    /// Progress bar for live runs.
    pub fn progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }
}
