//! Command surface and run orchestration.
//!
//! This module owns the structured `Command` the tool consumes — whether
//! it came from argument parsing or from an external natural-language
//! translator — validates it, and drives the pipeline: snapshot the
//! directory, build the rule and plan, preview, execute, report. The
//! undo path goes straight to the journal.

use crate::config::FilterConfig;
use crate::executor::{self, RunStatus};
use crate::journal::{JournalError, JournalStore};
use crate::output::Presenter;
use crate::plan::{self, Action};
use crate::rule::{PatternRule, Rule};
use crate::translate::CommandTranslator;
use std::fs;
use std::path::{Path, PathBuf};

/// Grouping key for the sort action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Extension,
    Date,
}

/// What a run should do to the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
    /// Classify files into bucket subdirectories.
    Sort(SortKey),
    /// Rewrite filenames matching a pattern.
    Rename,
    /// Relocate matching files into a folder.
    Move,
}

/// A structured command, as produced by the argument parser or an
/// external translator. Both sources get identical validation.
#[derive(Debug, Clone)]
pub struct Command {
    /// Target directory to process.
    pub directory: PathBuf,
    /// Required unless `undo` is set.
    pub action: Option<CommandAction>,
    /// Regex for rename/move actions.
    pub pattern: Option<String>,
    /// Replacement template (rename) or destination folder (move).
    pub replacement: Option<String>,
    /// Preview without mutating.
    pub dry_run: bool,
    /// Revert the previous run; other intent fields are ignored.
    pub undo: bool,
}

/// Distinguishable end states of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    /// Some operations applied, some did not; details were reported.
    PartialFailure,
}

/// Validates and runs a command with default configuration lookup.
pub fn run_command(command: &Command) -> Result<RunOutcome, String> {
    run_command_with_config(command, None)
}

/// Validates and runs a command, loading filter rules from
/// `config_path` when given.
pub fn run_command_with_config(
    command: &Command,
    config_path: Option<&Path>,
) -> Result<RunOutcome, String> {
    validate(command)?;

    let store = JournalStore::for_directory(&command.directory);
    if command.undo {
        return undo_last_run(&store);
    }

    let filters = FilterConfig::load(config_path)
        .map_err(|e| e.to_string())?
        .compile()
        .map_err(|e| e.to_string())?;

    let entries =
        plan::snapshot_directory(&command.directory, &filters).map_err(|e| e.to_string())?;
    let (rule, action, destination_root) = resolve_intent(command)?;
    let plan =
        plan::build_plan(&entries, &rule, action, &destination_root).map_err(|e| e.to_string())?;

    if plan.is_empty() {
        Presenter::info("Nothing to do: no files matched.");
        return Ok(RunOutcome::Success);
    }

    Presenter::preview(&plan, command.dry_run);
    if command.dry_run {
        Presenter::plan_summary(&plan);
    }

    let report = if command.dry_run {
        executor::execute(plan, &store, true)
    } else {
        let bar = Presenter::progress_bar(plan.len() as u64);
        let report = executor::execute_with(plan, &store, false, |_| bar.inc(1));
        bar.finish_and_clear();
        report
    };

    Presenter::execution_report(&report);

    match report.status {
        RunStatus::Completed => Ok(RunOutcome::Success),
        RunStatus::DryRunCompleted => {
            if report.failures().count() == 0 {
                Ok(RunOutcome::Success)
            } else {
                Ok(RunOutcome::PartialFailure)
            }
        }
        RunStatus::PartiallyFailed => Ok(RunOutcome::PartialFailure),
    }
}

/// Runs a command obtained from an external translator.
///
/// The translated command gets the same validation as a direct one; a
/// translation failure is surfaced verbatim and never retried.
pub fn run_translated(
    translator: &dyn CommandTranslator,
    text: &str,
) -> Result<RunOutcome, String> {
    let command = translator.translate(text).map_err(|e| e.to_string())?;
    run_command(&command)
}

/// Checks a command before anything touches the filesystem.
fn validate(command: &Command) -> Result<(), String> {
    if !command.directory.is_dir() {
        return Err(format!(
            "Invalid directory: {} does not exist or is not a directory",
            command.directory.display()
        ));
    }
    // Readability probe; a directory we cannot list is as bad as a
    // missing one.
    fs::read_dir(&command.directory).map_err(|e| {
        format!(
            "Invalid directory: cannot read {}: {}",
            command.directory.display(),
            e
        )
    })?;

    if command.undo {
        return Ok(());
    }

    let Some(action) = command.action else {
        return Err("An action is required: sort, rename, or move".to_string());
    };

    match action {
        CommandAction::Sort(_) => Ok(()),
        CommandAction::Rename => {
            if command.pattern.is_none() || command.replacement.is_none() {
                Err("Both a pattern and a replacement are required for renaming".to_string())
            } else {
                Ok(())
            }
        }
        CommandAction::Move => {
            if command.pattern.is_none() || command.replacement.is_none() {
                Err("Both a pattern and a destination folder are required for moving".to_string())
            } else {
                Ok(())
            }
        }
    }
}

/// Builds the rule, action, and destination root for a validated
/// command. Pattern compilation failures surface here, before any plan
/// is built.
fn resolve_intent(command: &Command) -> Result<(Rule, Action, PathBuf), String> {
    let action = command
        .action
        .ok_or_else(|| "An action is required: sort, rename, or move".to_string())?;

    match action {
        CommandAction::Sort(SortKey::Extension) => {
            Ok((Rule::Extension, Action::Sort, command.directory.clone()))
        }
        CommandAction::Sort(SortKey::Date) => {
            Ok((Rule::Date, Action::Sort, command.directory.clone()))
        }
        CommandAction::Rename => {
            let pattern = command.pattern.as_deref().unwrap_or_default();
            let replacement = command.replacement.as_deref().unwrap_or_default();
            let rule = compile_pattern(pattern, replacement)?;
            Ok((rule, Action::Rename, command.directory.clone()))
        }
        CommandAction::Move => {
            let pattern = command.pattern.as_deref().unwrap_or_default();
            let folder = command.replacement.as_deref().unwrap_or_default();
            let rule = compile_pattern(pattern, "")?;
            Ok((rule, Action::Move, command.directory.join(folder)))
        }
    }
}

fn compile_pattern(pattern: &str, replacement: &str) -> Result<Rule, String> {
    PatternRule::new(pattern, replacement)
        .map(Rule::Pattern)
        .map_err(|e| e.to_string())
}

fn undo_last_run(store: &JournalStore) -> Result<RunOutcome, String> {
    match store.undo_last() {
        Ok(report) => {
            Presenter::undo_report(&report);
            Ok(RunOutcome::Success)
        }
        Err(JournalError::NothingToUndo) => Err("Nothing to undo".to_string()),
        Err(conflict @ JournalError::UndoConflict { .. }) => {
            Presenter::error(&conflict.to_string());
            Presenter::warning("The journal keeps the unreversed entries; fix the conflict and run --undo again.");
            Ok(RunOutcome::PartialFailure)
        }
        Err(e) => Err(e.to_string()),
    }
}
