//! File filtering and exclusion configuration.
//!
//! Controls which files a run may touch. Rules come from a TOML file and
//! are compiled once per run; the snapshot consults the compiled form
//! for every candidate file. The tool's own journal file is always
//! excluded so a run can never plan an operation over its own undo
//! state.
//!
//! # Configuration file format
//!
//! ```toml
//! include_hidden = false
//!
//! [exclude]
//! filenames = [".DS_Store", "Thumbs.db"]
//! extensions = ["tmp", "part"]
//! globs = ["*.lock"]
//! regex = ['^~\$']
//!
//! [include]
//! globs = []
//! ```

use crate::journal::JOURNAL_FILE_NAME;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors raised while loading or compiling filter configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    NotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    Invalid(String),
    /// A glob pattern failed to parse.
    InvalidGlob { pattern: String },
    /// A regex pattern failed to compile.
    InvalidRegex { pattern: String, reason: String },
    /// IO error while reading configuration.
    Io(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlob { pattern } => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegex { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::Io(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Filter rules as loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Whether dotfiles participate in runs. Defaults to false.
    #[serde(default)]
    pub include_hidden: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules that take files out of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames (e.g. ".DS_Store").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Extensions without the leading dot, matched case-insensitively.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Glob patterns matched against the full path.
    #[serde(default)]
    pub globs: Vec<String>,

    /// Regex patterns matched against the filename.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Whitelist rules that override every exclusion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub globs: Vec<String>,
}

impl FilterConfig {
    /// Loads configuration, falling back through the usual locations:
    /// an explicit path, `.filesorterrc.toml` in the current directory,
    /// `~/.config/filesorter/config.toml`, then built-in defaults.
    ///
    /// An explicitly-given path that cannot be read is an error; the
    /// fallback locations are simply skipped when absent.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local = PathBuf::from(".filesorterrc.toml");
        if local.exists() {
            return Self::load_from_file(&local);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("filesorter")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Compiles the rules into matchers, validating every pattern.
    pub fn compile(self) -> Result<CompiledFilters, ConfigError> {
        let exclude_globs = compile_globs(&self.exclude.globs)?;
        let include_globs = compile_globs(&self.include.globs)?;

        let exclude_regexes = self
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledFilters {
            include_hidden: self.include_hidden,
            exclude_filenames: self.exclude.filenames.into_iter().collect(),
            exclude_extensions: self
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
            exclude_globs,
            exclude_regexes,
            include_globs,
        })
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
            })
        })
        .collect()
}

/// Pre-compiled filter rules, one set per run.
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_globs: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_globs: Vec<Pattern>,
}

impl CompiledFilters {
    /// Decides whether a file participates in the run.
    ///
    /// The journal file is refused unconditionally. Otherwise include
    /// globs win over every exclusion, then hidden-file, filename,
    /// extension, glob, and regex exclusions apply in that order; a
    /// file nothing excludes is in.
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if file_name == JOURNAL_FILE_NAME {
            return false;
        }

        if self
            .include_globs
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return true;
        }

        if !self.include_hidden && file_name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }

        if let Some(ext) = file_path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext) {
                return false;
            }
        }

        if self
            .exclude_globs
            .iter()
            .any(|pattern| pattern.matches_path(file_path))
        {
            return false;
        }

        if self
            .exclude_regexes
            .iter()
            .any(|regex| regex.is_match(&file_name))
        {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(config: FilterConfig) -> CompiledFilters {
        config.compile().unwrap()
    }

    #[test]
    fn defaults_exclude_hidden_files() {
        let filters = compiled(FilterConfig::default());
        assert!(!filters.should_include(Path::new(".DS_Store")));
        assert!(filters.should_include(Path::new("photo.jpg")));
    }

    #[test]
    fn journal_file_is_always_excluded() {
        let config = FilterConfig {
            include_hidden: true,
            ..Default::default()
        };
        let filters = compiled(config);
        assert!(!filters.should_include(Path::new(JOURNAL_FILE_NAME)));
        assert!(!filters.should_include(&Path::new("/some/dir").join(JOURNAL_FILE_NAME)));
    }

    #[test]
    fn hidden_files_included_when_enabled() {
        let config = FilterConfig {
            include_hidden: true,
            ..Default::default()
        };
        assert!(compiled(config).should_include(Path::new(".gitignore")));
    }

    #[test]
    fn exact_filenames_are_excluded() {
        let config = FilterConfig {
            exclude: ExcludeRules {
                filenames: vec!["Thumbs.db".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let filters = compiled(config);
        assert!(!filters.should_include(Path::new("Thumbs.db")));
        assert!(filters.should_include(Path::new("image.jpg")));
    }

    #[test]
    fn extensions_match_case_insensitively() {
        let config = FilterConfig {
            exclude: ExcludeRules {
                extensions: vec!["tmp".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let filters = compiled(config);
        assert!(!filters.should_include(Path::new("scratch.tmp")));
        assert!(!filters.should_include(Path::new("scratch.TMP")));
        assert!(filters.should_include(Path::new("scratch.txt")));
    }

    #[test]
    fn globs_match_against_the_path() {
        let config = FilterConfig {
            exclude: ExcludeRules {
                globs: vec!["*.lock".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let filters = compiled(config);
        assert!(!filters.should_include(Path::new("Cargo.lock")));
        assert!(filters.should_include(Path::new("Cargo.toml")));
    }

    #[test]
    fn regex_matches_against_the_filename() {
        let config = FilterConfig {
            exclude: ExcludeRules {
                regex: vec![r"^~\$".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let filters = compiled(config);
        assert!(!filters.should_include(Path::new("~$report.docx")));
        assert!(filters.should_include(Path::new("report.docx")));
    }

    #[test]
    fn include_globs_override_exclusions() {
        let config = FilterConfig {
            include_hidden: false,
            include: IncludeRules {
                globs: vec![".keepme".to_string()],
            },
            ..Default::default()
        };
        let filters = compiled(config);
        assert!(filters.should_include(Path::new(".keepme")));
        assert!(!filters.should_include(Path::new(".other")));
    }

    #[test]
    fn invalid_regex_is_rejected_at_compile() {
        let config = FilterConfig {
            exclude: ExcludeRules {
                regex: vec!["[unclosed".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidRegex { .. })
        ));
    }

    #[test]
    fn invalid_glob_is_rejected_at_compile() {
        let config = FilterConfig {
            exclude: ExcludeRules {
                globs: vec!["[unclosed".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.compile(),
            Err(ConfigError::InvalidGlob { .. })
        ));
    }

    #[test]
    fn parses_documented_toml_shape() {
        let toml = r#"
            include_hidden = true

            [exclude]
            filenames = [".DS_Store"]
            extensions = ["tmp"]
            globs = ["*.lock"]

            [include]
            globs = ["important.*"]
        "#;
        let config: FilterConfig = toml::from_str(toml).unwrap();
        assert!(config.include_hidden);
        assert_eq!(config.exclude.filenames, vec![".DS_Store"]);
        assert_eq!(config.include.globs, vec!["important.*"]);
    }
}
