//! filesorter - plan-based file organization with dry-run and undo
//!
//! This library turns a high-level intent (sort by extension or date,
//! rename via pattern, move via pattern) into an ordered plan of
//! filesystem operations, executes the plan safely, and journals every
//! mutation's inverse so the last run can be reversed exactly.

pub mod cli;
pub mod config;
pub mod executor;
pub mod journal;
pub mod output;
pub mod plan;
pub mod rule;
pub mod translate;

pub use cli::{Command, CommandAction, RunOutcome, SortKey, run_command};
pub use config::{CompiledFilters, ConfigError, FilterConfig};
pub use executor::{ExecError, ExecutionReport, RunStatus, execute};
pub use journal::{JournalEntry, JournalError, JournalStore, UndoReport};
pub use plan::{
    Action, FileEntry, OpKind, Operation, OperationPlan, PlanError, build_plan,
    snapshot_directory,
};
pub use rule::{PatternRule, Rule};
pub use translate::{CommandTranslator, TranslationFailure};
