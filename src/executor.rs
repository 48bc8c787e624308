//! Plan execution with journaled, reversible mutations.
//!
//! The executor consumes an operation plan and applies it strictly in
//! plan order. Each operation walks a small state machine:
//! validated, applied, journaled — or failed. A live run stops at the
//! first failure and reports the rest as not attempted; nothing is
//! retried or rolled back automatically. A dry run performs the full
//! validation pass over every operation without mutating anything.

use crate::journal::{JournalEntry, JournalError, JournalWriter, JournalStore};
use crate::plan::{Operation, OperationPlan};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Errors that stop an operation during execution.
#[derive(Debug)]
pub enum ExecError {
    /// The source file disappeared between planning and execution.
    SourceVanished { path: PathBuf },
    /// The resolved destination was taken by another process mid-run.
    DestinationOccupied { path: PathBuf },
    /// The filesystem refused the operation.
    PermissionDenied { path: PathBuf, source: io::Error },
    /// Failed to create the destination's parent directory.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// The rename call itself failed.
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
    /// The journal entry could not be persisted after the mutation.
    JournalWriteFailed { source: JournalError },
}

impl std::fmt::Display for ExecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceVanished { path } => {
                write!(f, "Source vanished: {}", path.display())
            }
            Self::DestinationOccupied { path } => {
                write!(f, "Destination already exists: {}", path.display())
            }
            Self::PermissionDenied { path, source } => {
                write!(f, "Permission denied for {}: {}", path.display(), source)
            }
            Self::DirectoryCreationFailed { path, source } => {
                write!(f, "Failed to create directory {}: {}", path.display(), source)
            }
            Self::RenameFailed { from, to, source } => {
                write!(
                    f,
                    "Failed to move {} to {}: {}",
                    from.display(),
                    to.display(),
                    source
                )
            }
            Self::JournalWriteFailed { source } => {
                write!(f, "Applied but not journaled: {}", source)
            }
        }
    }
}

impl std::error::Error for ExecError {}

/// Terminal state of one operation after a run.
#[derive(Debug)]
pub enum OperationState {
    /// Dry run only: validation passed, nothing was mutated.
    Validated,
    /// Mutation applied and its inverse journaled.
    Journaled,
    /// Validation or application failed.
    Failed(ExecError),
    /// A live run stopped before reaching this operation.
    NotAttempted,
}

/// How the run as a whole ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every operation applied and journaled.
    Completed,
    /// Stopped early; the report shows how far it got.
    PartiallyFailed,
    /// Validation-only pass finished without mutating.
    DryRunCompleted,
}

/// One operation with its terminal state.
#[derive(Debug)]
pub struct StepReport {
    pub operation: Operation,
    pub state: OperationState,
}

/// Full account of a run, one step per planned operation.
#[derive(Debug)]
pub struct ExecutionReport {
    pub status: RunStatus,
    pub steps: Vec<StepReport>,
}

impl ExecutionReport {
    /// Number of operations applied and journaled.
    pub fn applied(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.state, OperationState::Journaled))
            .count()
    }

    /// Number of operations that passed dry-run validation.
    pub fn validated(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.state, OperationState::Validated))
            .count()
    }

    /// Number of operations a live run never reached.
    pub fn not_attempted(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.state, OperationState::NotAttempted))
            .count()
    }

    /// The failed operations with their errors, in plan order.
    pub fn failures(&self) -> impl Iterator<Item = (&Operation, &ExecError)> {
        self.steps.iter().filter_map(|s| match &s.state {
            OperationState::Failed(e) => Some((&s.operation, e)),
            _ => None,
        })
    }
}

/// Executes a plan against the filesystem, or validates it in dry-run
/// mode. See [`execute_with`] for the reporting contract.
pub fn execute(plan: OperationPlan, store: &JournalStore, dry_run: bool) -> ExecutionReport {
    execute_with(plan, store, dry_run, |_| {})
}

/// Executes a plan, invoking `on_step` after each step settles.
///
/// Live runs apply operations in plan order, journaling each inverse
/// (append + flush) immediately after the rename succeeds and before
/// the next operation starts. The first failure ends the run. Dry runs
/// validate every operation and never open the journal.
pub fn execute_with(
    plan: OperationPlan,
    store: &JournalStore,
    dry_run: bool,
    mut on_step: impl FnMut(&StepReport),
) -> ExecutionReport {
    let operations = plan.into_operations();
    let mut steps = Vec::with_capacity(operations.len());
    let mut writer = store.writer();
    let mut stopped = false;

    let mut remaining = operations.into_iter();
    for operation in remaining.by_ref() {
        let state = match run_operation(&operation, &mut writer, dry_run) {
            Ok(state) => state,
            Err(error) => {
                let failed = OperationState::Failed(error);
                if !dry_run {
                    stopped = true;
                }
                failed
            }
        };
        let step = StepReport { operation, state };
        on_step(&step);
        steps.push(step);
        if stopped {
            break;
        }
    }
    for operation in remaining {
        let step = StepReport {
            operation,
            state: OperationState::NotAttempted,
        };
        on_step(&step);
        steps.push(step);
    }

    let status = if dry_run {
        RunStatus::DryRunCompleted
    } else if stopped {
        RunStatus::PartiallyFailed
    } else {
        RunStatus::Completed
    };

    ExecutionReport { status, steps }
}

fn run_operation(
    operation: &Operation,
    writer: &mut JournalWriter,
    dry_run: bool,
) -> Result<OperationState, ExecError> {
    validate(operation)?;
    if dry_run {
        return Ok(OperationState::Validated);
    }

    if let Some(parent) = operation.destination.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| ExecError::DirectoryCreationFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::rename(&operation.source, &operation.destination)
        .map_err(|e| classify_rename_error(operation, e))?;

    writer
        .record(JournalEntry::new(&operation.source, &operation.destination))
        .map_err(|e| ExecError::JournalWriteFailed { source: e })?;

    Ok(OperationState::Journaled)
}

fn validate(operation: &Operation) -> Result<(), ExecError> {
    if !operation.source.is_file() {
        return Err(ExecError::SourceVanished {
            path: operation.source.clone(),
        });
    }
    if operation.destination.exists() {
        return Err(ExecError::DestinationOccupied {
            path: operation.destination.clone(),
        });
    }
    Ok(())
}

fn classify_rename_error(operation: &Operation, error: io::Error) -> ExecError {
    match error.kind() {
        io::ErrorKind::PermissionDenied => ExecError::PermissionDenied {
            path: operation.source.clone(),
            source: error,
        },
        io::ErrorKind::NotFound => ExecError::SourceVanished {
            path: operation.source.clone(),
        },
        _ => ExecError::RenameFailed {
            from: operation.source.clone(),
            to: operation.destination.clone(),
            source: error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Action, build_plan, snapshot_directory};
    use crate::config::FilterConfig;
    use crate::rule::Rule;
    use std::fs;
    use tempfile::TempDir;

    fn sort_plan(dir: &TempDir) -> OperationPlan {
        let filters = FilterConfig::default().compile().unwrap();
        let entries = snapshot_directory(dir.path(), &filters).unwrap();
        build_plan(&entries, &Rule::Extension, Action::Sort, dir.path()).unwrap()
    }

    #[test]
    fn live_run_applies_and_journals_every_operation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let store = JournalStore::for_directory(dir.path());
        let report = execute(sort_plan(&dir), &store, false);

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.applied(), 2);
        assert!(dir.path().join("txt").join("a.txt").is_file());
        assert!(dir.path().join("txt").join("b.txt").is_file());
        assert_eq!(store.load_last_run().unwrap().len(), 2);
    }

    #[test]
    fn dry_run_validates_without_mutating_or_journaling() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let store = JournalStore::for_directory(dir.path());
        let report = execute(sort_plan(&dir), &store, true);

        assert_eq!(report.status, RunStatus::DryRunCompleted);
        assert_eq!(report.validated(), 1);
        assert!(dir.path().join("a.txt").is_file());
        assert!(!dir.path().join("txt").exists());
        assert!(!store.path().exists());
    }

    #[test]
    fn live_run_stops_at_first_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();
        fs::write(dir.path().join("c.txt"), "c").unwrap();

        let plan = sort_plan(&dir);
        // Simulate concurrent external modification after planning.
        fs::remove_file(dir.path().join("b.txt")).unwrap();

        let store = JournalStore::for_directory(dir.path());
        let report = execute(plan, &store, false);

        assert_eq!(report.status, RunStatus::PartiallyFailed);
        assert_eq!(report.applied(), 1);
        assert_eq!(report.not_attempted(), 1);
        let (failed_op, error) = report.failures().next().unwrap();
        assert!(failed_op.source.ends_with("b.txt"));
        assert!(matches!(error, ExecError::SourceVanished { .. }));

        // Only the applied prefix is journaled; c.txt was never touched.
        assert_eq!(store.load_last_run().unwrap().len(), 1);
        assert!(dir.path().join("c.txt").is_file());
    }

    #[test]
    fn destination_appearing_concurrently_fails_the_operation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();

        let plan = sort_plan(&dir);
        fs::create_dir(dir.path().join("txt")).unwrap();
        fs::write(dir.path().join("txt").join("a.txt"), "other").unwrap();

        let store = JournalStore::for_directory(dir.path());
        let report = execute(plan, &store, false);

        assert_eq!(report.status, RunStatus::PartiallyFailed);
        let (_, error) = report.failures().next().unwrap();
        assert!(matches!(error, ExecError::DestinationOccupied { .. }));
        // The original file is untouched.
        assert!(dir.path().join("a.txt").is_file());
    }

    #[test]
    fn dry_run_surfaces_validation_failures_for_every_operation() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "a").unwrap();
        fs::write(dir.path().join("b.txt"), "b").unwrap();

        let plan = sort_plan(&dir);
        fs::remove_file(dir.path().join("a.txt")).unwrap();

        let store = JournalStore::for_directory(dir.path());
        let report = execute(plan, &store, true);

        // Dry run keeps validating past the failure.
        assert_eq!(report.status, RunStatus::DryRunCompleted);
        assert_eq!(report.validated(), 1);
        assert_eq!(report.failures().count(), 1);
        assert!(!store.path().exists());
    }

    #[test]
    fn empty_plan_completes_without_touching_the_journal() {
        let dir = TempDir::new().unwrap();
        let store = JournalStore::for_directory(dir.path());
        let report = execute(sort_plan(&dir), &store, false);

        assert_eq!(report.status, RunStatus::Completed);
        assert!(report.steps.is_empty());
        assert!(!store.path().exists());
    }
}
