//! Durable undo journal for executed operations.
//!
//! Every applied operation is recorded as the inverse pair needed to
//! reverse it. The journal is a JSON Lines file next to the organized
//! directory, one entry per line, appended and flushed after each
//! successful mutation so a crash mid-run never leaves a phantom entry
//! for an operation that did not happen. History is single-slot: the
//! first entry of a new live run truncates the previous run.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Journal file kept at the top of the organized directory.
pub const JOURNAL_FILE_NAME: &str = ".filesorter_journal.jsonl";

/// The inverse pair recorded for one executed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Where the file lived before the operation.
    pub source_original: PathBuf,
    /// Where the operation put it.
    pub destination_applied: PathBuf,
    /// RFC 3339 time at which the operation was journaled.
    pub timestamp: String,
}

impl JournalEntry {
    pub fn new(source: &Path, destination: &Path) -> Self {
        Self {
            source_original: source.to_path_buf(),
            destination_applied: destination.to_path_buf(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Errors raised by journal persistence and undo.
#[derive(Debug)]
pub enum JournalError {
    /// No journal run exists to undo.
    NothingToUndo,
    /// The filesystem changed since the journaled run; reversal stopped.
    ///
    /// The journal now holds exactly the unreversed remainder, so a
    /// retry resumes where this attempt stopped.
    UndoConflict {
        path: PathBuf,
        reason: String,
        reversed: usize,
        remaining: usize,
    },
    /// Failed to write or rewrite the journal file.
    WriteFailed { path: PathBuf, source: io::Error },
    /// Failed to read the journal file.
    ReadFailed { path: PathBuf, source: io::Error },
    /// Journal contents could not be decoded.
    InvalidFormat { reason: String },
}

impl std::fmt::Display for JournalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingToUndo => write!(f, "No previous run found to undo"),
            Self::UndoConflict {
                path,
                reason,
                reversed,
                remaining,
            } => {
                write!(
                    f,
                    "Undo stopped at {}: {} ({} reversed, {} remaining)",
                    path.display(),
                    reason,
                    reversed,
                    remaining
                )
            }
            Self::WriteFailed { path, source } => {
                write!(f, "Failed to write journal {}: {}", path.display(), source)
            }
            Self::ReadFailed { path, source } => {
                write!(f, "Failed to read journal {}: {}", path.display(), source)
            }
            Self::InvalidFormat { reason } => {
                write!(f, "Invalid journal format: {}", reason)
            }
        }
    }
}

impl std::error::Error for JournalError {}

/// Outcome of a reversal run.
#[derive(Debug)]
pub struct UndoReport {
    /// Number of entries moved back to their original location.
    pub reversed: usize,
    /// Destination directories removed because the reversal emptied them.
    pub removed_dirs: Vec<PathBuf>,
}

/// Path-addressed handle to the journal of one directory.
///
/// The store is an explicit value passed into the executor and the undo
/// path, never ambient state. It holds no open file itself; writers are
/// created per run.
#[derive(Debug, Clone)]
pub struct JournalStore {
    path: PathBuf,
}

impl JournalStore {
    /// The journal co-located with the directory it protects.
    pub fn for_directory(base_path: &Path) -> Self {
        Self {
            path: base_path.join(JOURNAL_FILE_NAME),
        }
    }

    /// A store at an explicit file path.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the writer for a run. The underlying file is only opened
    /// (truncating the previous run) once the first entry is recorded,
    /// so a run that never mutates leaves the prior journal undoable.
    pub fn writer(&self) -> JournalWriter {
        JournalWriter {
            path: self.path.clone(),
            file: None,
        }
    }

    /// Loads the most recent run, oldest entry first.
    pub fn load_last_run(&self) -> Result<Vec<JournalEntry>, JournalError> {
        if !self.path.exists() {
            return Err(JournalError::NothingToUndo);
        }
        let file = File::open(&self.path).map_err(|e| JournalError::ReadFailed {
            path: self.path.clone(),
            source: e,
        })?;

        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| JournalError::ReadFailed {
                path: self.path.clone(),
                source: e,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = serde_json::from_str(&line)
                .map_err(|e| JournalError::InvalidFormat { reason: e.to_string() })?;
            entries.push(entry);
        }

        if entries.is_empty() {
            return Err(JournalError::NothingToUndo);
        }
        Ok(entries)
    }

    /// Reverses the most recent run, newest entry first.
    ///
    /// Reverse order matters when operations had interdependent paths: a
    /// later rename may have used a disambiguated name only because an
    /// earlier operation had already vacated the plain one. On full
    /// success the journal is cleared and destination directories the
    /// reversal emptied are removed best-effort. On conflict the journal
    /// is rewritten to the unreversed remainder and the error reports
    /// how far the reversal got.
    pub fn undo_last(&self) -> Result<UndoReport, JournalError> {
        let entries = self.load_last_run()?;

        // Directories files are restored into must survive the cleanup
        // sweep even if they momentarily look empty.
        let protected: HashSet<PathBuf> = entries
            .iter()
            .filter_map(|e| e.source_original.parent().map(Path::to_path_buf))
            .collect();

        let mut reversed = 0usize;
        let mut vacated: HashSet<PathBuf> = HashSet::new();

        for (index, entry) in entries.iter().enumerate().rev() {
            if let Err(reason) = reverse_entry(entry) {
                let remainder = &entries[..=index];
                self.rewrite(remainder)?;
                return Err(JournalError::UndoConflict {
                    path: entry.destination_applied.clone(),
                    reason,
                    reversed,
                    remaining: remainder.len(),
                });
            }
            if let Some(parent) = entry.destination_applied.parent() {
                vacated.insert(parent.to_path_buf());
            }
            reversed += 1;
        }

        self.clear()?;

        let mut removed_dirs: Vec<PathBuf> = vacated
            .into_iter()
            .filter(|dir| !protected.contains(dir))
            .filter(|dir| fs::remove_dir(dir).is_ok())
            .collect();
        removed_dirs.sort();

        Ok(UndoReport {
            reversed,
            removed_dirs,
        })
    }

    /// Rewrites the journal to hold exactly `entries`, oldest first.
    fn rewrite(&self, entries: &[JournalEntry]) -> Result<(), JournalError> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| JournalError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        for entry in entries {
            write_entry_line(&mut file, entry, &self.path)?;
        }
        file.flush().map_err(|e| JournalError::WriteFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    fn clear(&self) -> Result<(), JournalError> {
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| JournalError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Append-only writer for the run currently executing.
#[derive(Debug)]
pub struct JournalWriter {
    path: PathBuf,
    file: Option<File>,
}

impl JournalWriter {
    /// Appends one entry and flushes it before returning, preserving the
    /// write-after-mutate ordering under crash. The first record
    /// truncates any prior run (single-slot history).
    pub fn record(&mut self, entry: JournalEntry) -> Result<(), JournalError> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&self.path)
                .map_err(|e| JournalError::WriteFailed {
                    path: self.path.clone(),
                    source: e,
                })?;
            self.file = Some(file);
        }
        if let Some(file) = self.file.as_mut() {
            write_entry_line(file, &entry, &self.path)?;
            file.flush().map_err(|e| JournalError::WriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

fn write_entry_line(
    file: &mut File,
    entry: &JournalEntry,
    path: &Path,
) -> Result<(), JournalError> {
    let mut line = serde_json::to_string(entry)
        .map_err(|e| JournalError::InvalidFormat { reason: e.to_string() })?;
    line.push('\n');
    file.write_all(line.as_bytes())
        .map_err(|e| JournalError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

fn reverse_entry(entry: &JournalEntry) -> Result<(), String> {
    if !entry.destination_applied.exists() {
        return Err("file is no longer at its applied destination".to_string());
    }
    if entry.source_original.exists() {
        return Err("another file now occupies the original location".to_string());
    }
    fs::rename(&entry.destination_applied, &entry.source_original)
        .map_err(|e| format!("failed to move back: {}", e))
}
