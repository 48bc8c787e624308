//! Operation planning over a directory snapshot.
//!
//! This module turns a directory listing plus one rule into an ordered,
//! collision-free list of filesystem operations. Planning never mutates
//! the filesystem: destinations are fully resolved here, so the executor
//! only has to apply them in order. Files are visited in lexical order,
//! which makes repeated runs over an unchanged directory produce
//! identical plans and makes collision resolution reproducible.

use crate::config::CompiledFilters;
use crate::rule::Rule;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Upper bound on collision suffix probing. With a deterministic
/// lowest-available-integer policy this cannot be reached in practice,
/// but the loop is still bounded.
const MAX_COLLISION_SUFFIX: u32 = 10_000;

/// Errors raised while snapshotting a directory or building a plan.
#[derive(Debug)]
pub enum PlanError {
    /// A regex pattern failed to compile.
    InvalidRule { pattern: String, reason: String },
    /// The target directory is missing or unreadable.
    InvalidDirectory {
        path: PathBuf,
        source: std::io::Error,
    },
    /// No free disambiguated name could be derived for a destination.
    CollisionUnresolvable { destination: PathBuf },
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRule { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            Self::InvalidDirectory { path, source } => {
                write!(f, "Invalid directory {}: {}", path.display(), source)
            }
            Self::CollisionUnresolvable { destination } => {
                write!(
                    f,
                    "Could not find a free name for {}",
                    destination.display()
                )
            }
        }
    }
}

impl std::error::Error for PlanError {}

/// Immutable snapshot of one file, taken once per run.
///
/// The snapshot is never refreshed mid-plan; if the file changes on disk
/// after this point, execution-time validation catches it.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// The file name component.
    pub file_name: String,
    /// Extension as found on disk, without the leading dot.
    pub extension: Option<String>,
    /// Last-modified timestamp.
    pub modified: SystemTime,
}

/// The high-level intent a plan is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Classify files into bucket subdirectories.
    Sort,
    /// Rewrite filenames in place via the pattern rule.
    Rename,
    /// Relocate matching files into a destination folder.
    Move,
}

/// The kind of filesystem mutation an operation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Rename,
    Move,
}

/// One atomic filesystem mutation with a fully resolved destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: OpKind,
    /// Must exist and be a regular file at plan time.
    pub source: PathBuf,
    /// Must not exist at execution time; collisions are resolved at plan
    /// time against both the disk and earlier operations in the plan.
    pub destination: PathBuf,
}

/// Ordered sequence of operations produced by one rule application over
/// one directory snapshot. Immutable once built, consumed exactly once
/// by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationPlan {
    operations: Vec<Operation>,
}

impl OperationPlan {
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Captures the file set of a directory's top level.
///
/// Only regular files are listed; subdirectories are never descended
/// into. Filter rules decide which files participate. The result is
/// sorted lexically by path so downstream planning is deterministic.
pub fn snapshot_directory(
    base_path: &Path,
    filters: &CompiledFilters,
) -> Result<Vec<FileEntry>, PlanError> {
    let entries = fs::read_dir(base_path).map_err(|e| PlanError::InvalidDirectory {
        path: base_path.to_path_buf(),
        source: e,
    })?;

    let mut snapshot = Vec::new();
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }
        let path = entry.path();
        if !filters.should_include(&path) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let file_name = entry.file_name().to_string_lossy().to_string();
        let extension = path.extension().map(|e| e.to_string_lossy().to_string());
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

        snapshot.push(FileEntry {
            path,
            file_name,
            extension,
            modified,
        });
    }

    snapshot.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(snapshot)
}

/// Builds an operation plan from a snapshot, a rule, and an action.
///
/// * `Sort` maps each file to `destination_root/<bucket>/<file_name>`.
/// * `Rename` rewrites the filename in place via the pattern rule.
/// * `Move` relocates matching files to `destination_root/<file_name>`.
///
/// Files the rule does not match are skipped, as are no-op mappings
/// where the destination equals the current path. An empty plan is
/// valid output, not an error.
pub fn build_plan(
    entries: &[FileEntry],
    rule: &Rule,
    action: Action,
    destination_root: &Path,
) -> Result<OperationPlan, PlanError> {
    let mut ordered: Vec<&FileEntry> = entries.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut operations = Vec::new();
    let mut claimed: HashSet<PathBuf> = HashSet::new();

    for entry in ordered {
        let proposed = match action {
            Action::Sort => {
                let Some(bucket) = rule.bucket_for(entry) else {
                    continue;
                };
                destination_root.join(bucket).join(&entry.file_name)
            }
            Action::Rename => {
                let Some(new_name) = rule.rename_target(&entry.file_name) else {
                    continue;
                };
                let Some(dir) = entry.path.parent() else {
                    continue;
                };
                dir.join(new_name)
            }
            Action::Move => {
                if !rule.matches(&entry.file_name) {
                    continue;
                }
                destination_root.join(&entry.file_name)
            }
        };

        if proposed == entry.path {
            continue;
        }

        let destination = resolve_collision(&proposed, &claimed, |p| p.exists())?;
        claimed.insert(destination.clone());
        operations.push(Operation {
            kind: if action == Action::Rename {
                OpKind::Rename
            } else {
                OpKind::Move
            },
            source: entry.path.clone(),
            destination,
        });
    }

    Ok(OperationPlan { operations })
}

/// Derives a non-colliding destination.
///
/// A destination is free when nothing on disk occupies it and no earlier
/// operation in the same plan has claimed it. Otherwise a numeric
/// disambiguator is inserted before the extension (`name (1).ext`,
/// `name (2).ext`, ...) at the lowest free integer, so identical inputs
/// always resolve identically and earlier files in plan order win the
/// unsuffixed name.
pub fn resolve_collision<F>(
    destination: &Path,
    claimed: &HashSet<PathBuf>,
    on_disk: F,
) -> Result<PathBuf, PlanError>
where
    F: Fn(&Path) -> bool,
{
    let is_free = |candidate: &Path| !on_disk(candidate) && !claimed.contains(candidate);

    if is_free(destination) {
        return Ok(destination.to_path_buf());
    }

    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let extension = destination.extension().map(|e| e.to_string_lossy().to_string());
    let parent = destination.parent().unwrap_or_else(|| Path::new(""));

    for n in 1..=MAX_COLLISION_SUFFIX {
        let candidate_name = match &extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        };
        let candidate = parent.join(candidate_name);
        if is_free(&candidate) {
            return Ok(candidate);
        }
    }

    Err(PlanError::CollisionUnresolvable {
        destination: destination.to_path_buf(),
    })
}
