//! Diagnostic severity levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much a diagnostic matters, ordered from least to most severe.
///
/// Only [`Error`](Severity::Error) means something was dropped from the
/// output; the layout is still produced.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, e.g. a search tier that fell back or a minor quality finding.
    Note,
    /// A degraded result the user should review.
    Warning,
    /// An input entry that had to be skipped.
    Error,
}

impl Severity {
    /// Returns `true` for [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Lowercase name used in rendered output and JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
