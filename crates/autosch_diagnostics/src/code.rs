//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The engine stage a diagnostic comes from, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Netlist and symbol input problems, prefixed with `I`.
    Input,
    /// Placement fallbacks, prefixed with `P`.
    Placement,
    /// Routing fallbacks, prefixed with `R`.
    Routing,
    /// Post-layout quality findings, prefixed with `Q`.
    Quality,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Input => 'I',
            Category::Placement => 'P',
            Category::Routing => 'R',
            Category::Quality => 'Q',
        }
    }
}

/// A diagnostic code: category prefix plus a zero-padded 3-digit number.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::new(Category::Input, 1).to_string(), "I001");
        assert_eq!(
            DiagnosticCode::new(Category::Routing, 204).to_string(),
            "R204"
        );
        assert_eq!(DiagnosticCode::new(Category::Quality, 42).to_string(), "Q042");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Placement, 101);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
