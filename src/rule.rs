//! Classification and pattern rules for planning file operations.
//!
//! A rule decides, per file, whether the file participates in a run and
//! which bucket or new name it maps to. Rules are pure functions over the
//! directory snapshot: they never touch the filesystem, so the same
//! snapshot and rule always produce the same answers.

use crate::plan::{FileEntry, PlanError};
use chrono::{DateTime, Local};
use regex::Regex;

/// Bucket name reserved for files without an extension.
pub const NO_EXTENSION_BUCKET: &str = "noext";

/// The single rule driving a run.
///
/// The rule set is small and fixed, so it is a closed enum dispatched by
/// `match` rather than an open trait.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Classify by lowercased filename extension.
    Extension,
    /// Classify by year-month of the last-modified time.
    Date,
    /// Match and rewrite filenames with a regex.
    Pattern(PatternRule),
}

/// A compiled filename pattern together with its replacement template.
///
/// The replacement supports capture-group references in the regex crate's
/// `$1` / `${name}` syntax.
#[derive(Debug, Clone)]
pub struct PatternRule {
    regex: Regex,
    replacement: String,
}

impl PatternRule {
    /// Compiles a pattern rule, rejecting invalid regex syntax.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, PlanError> {
        let regex = Regex::new(pattern).map_err(|e| PlanError::InvalidRule {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            regex,
            replacement: replacement.to_string(),
        })
    }

    /// Returns true if the pattern matches anywhere in the filename.
    pub fn is_match(&self, file_name: &str) -> bool {
        self.regex.is_match(file_name)
    }

    /// Rewrites `file_name` by replacing the first match with the
    /// replacement template, or `None` when the pattern does not match.
    pub fn rename_target(&self, file_name: &str) -> Option<String> {
        if !self.regex.is_match(file_name) {
            return None;
        }
        Some(
            self.regex
                .replace(file_name, self.replacement.as_str())
                .into_owned(),
        )
    }
}

impl Rule {
    /// Returns the classification bucket for a file.
    ///
    /// Only the classifying rules produce buckets; pattern rules drive
    /// rename/move destinations instead and return `None` here.
    pub fn bucket_for(&self, entry: &FileEntry) -> Option<String> {
        match self {
            Rule::Extension => Some(match &entry.extension {
                Some(ext) if !ext.is_empty() => ext.to_lowercase(),
                _ => NO_EXTENSION_BUCKET.to_string(),
            }),
            Rule::Date => {
                // %Y-%m keeps lexical and chronological order aligned.
                let modified: DateTime<Local> = entry.modified.into();
                Some(modified.format("%Y-%m").to_string())
            }
            Rule::Pattern(_) => None,
        }
    }

    /// Returns true if the file participates in the run under this rule.
    ///
    /// Classifying rules accept every file; pattern rules accept only
    /// matching filenames. A non-match excludes the file from the plan,
    /// it is never an error.
    pub fn matches(&self, file_name: &str) -> bool {
        match self {
            Rule::Pattern(pattern) => pattern.is_match(file_name),
            Rule::Extension | Rule::Date => true,
        }
    }

    /// Returns the rewritten filename for pattern rules, `None` otherwise.
    pub fn rename_target(&self, file_name: &str) -> Option<String> {
        match self {
            Rule::Pattern(pattern) => pattern.rename_target(file_name),
            Rule::Extension | Rule::Date => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn entry(name: &str, extension: Option<&str>, modified: SystemTime) -> FileEntry {
        FileEntry {
            path: PathBuf::from("/base").join(name),
            file_name: name.to_string(),
            extension: extension.map(|e| e.to_string()),
            modified,
        }
    }

    #[test]
    fn extension_bucket_is_lowercased() {
        let entry = entry("Report.PDF", Some("PDF"), SystemTime::now());
        assert_eq!(Rule::Extension.bucket_for(&entry), Some("pdf".to_string()));
    }

    #[test]
    fn missing_extension_maps_to_reserved_bucket() {
        let entry = entry("Makefile", None, SystemTime::now());
        assert_eq!(
            Rule::Extension.bucket_for(&entry),
            Some(NO_EXTENSION_BUCKET.to_string())
        );
    }

    #[test]
    fn date_bucket_is_year_month_of_mtime() {
        let modified = Local.with_ymd_and_hms(2023, 5, 17, 12, 30, 0).unwrap();
        let entry = entry("notes.txt", Some("txt"), modified.into());
        assert_eq!(Rule::Date.bucket_for(&entry), Some("2023-05".to_string()));
    }

    #[test]
    fn date_bucket_zero_pads_month() {
        let modified = Local.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let entry = entry("notes.txt", Some("txt"), modified.into());
        assert_eq!(Rule::Date.bucket_for(&entry), Some("2024-01".to_string()));
    }

    #[test]
    fn pattern_rename_replaces_first_match() {
        let rule = PatternRule::new("report", "summary").unwrap();
        assert_eq!(
            rule.rename_target("report_jan.txt"),
            Some("summary_jan.txt".to_string())
        );
    }

    #[test]
    fn pattern_rename_expands_capture_groups() {
        let rule = PatternRule::new(r"IMG_(\d+)", "photo_$1").unwrap();
        assert_eq!(
            rule.rename_target("IMG_1234.jpg"),
            Some("photo_1234.jpg".to_string())
        );
    }

    #[test]
    fn pattern_without_match_yields_none() {
        let rule = PatternRule::new("draft", "final").unwrap();
        assert_eq!(rule.rename_target("notes.txt"), None);
        assert!(!rule.is_match("notes.txt"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let result = PatternRule::new("[unclosed", "x");
        assert!(matches!(result, Err(PlanError::InvalidRule { .. })));
    }

    #[test]
    fn classifying_rules_match_everything() {
        assert!(Rule::Extension.matches("anything.bin"));
        assert!(Rule::Date.matches("anything.bin"));
    }

    #[test]
    fn pattern_rule_produces_no_bucket() {
        let rule = Rule::Pattern(PatternRule::new("x", "y").unwrap());
        let entry = entry("x.txt", Some("txt"), SystemTime::now());
        assert_eq!(rule.bucket_for(&entry), None);
    }
}
