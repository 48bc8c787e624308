//! Boundary to an external natural-language command translator.
//!
//! Turning free text like "move all JPGs into a folder called photos"
//! into a structured command is an external capability. The engine only
//! consumes the command such a capability returns; it never reaches out
//! itself, and it runs fine with the capability absent. Translated
//! commands go through exactly the same validation as directly-supplied
//! ones.

use crate::cli::Command;

/// The translator could not produce a usable command.
///
/// Surfaced verbatim to the caller; translation is never retried.
#[derive(Debug, Clone)]
pub struct TranslationFailure {
    pub reason: String,
}

impl std::fmt::Display for TranslationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Translation failed: {}", self.reason)
    }
}

impl std::error::Error for TranslationFailure {}

/// An injected natural-language-to-command capability.
pub trait CommandTranslator {
    /// Turns free text into a structured command, or reports why it
    /// could not.
    fn translate(&self, text: &str) -> Result<Command, TranslationFailure>;
}
