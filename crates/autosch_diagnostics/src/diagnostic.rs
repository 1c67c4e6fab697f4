//! Structured diagnostic messages.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a diagnostic is about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Subject {
    /// A component, by reference designator.
    Component {
        /// Reference designator (e.g. `U1`).
        reference: String,
    },
    /// A net, by name.
    Net {
        /// Net name.
        name: String,
    },
    /// One endpoint of a net.
    Pin {
        /// Reference designator of the owning component.
        reference: String,
        /// Pin number or name as written in the netlist.
        pin: String,
    },
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Component { reference } => write!(f, "component {reference}"),
            Subject::Net { name } => write!(f, "net {name}"),
            Subject::Pin { reference, pin } => write!(f, "pin {reference}.{pin}"),
        }
    }
}

/// A structured diagnostic message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The netlist element the diagnostic refers to, if any.
    pub subject: Option<Subject>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            subject: None,
            notes: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    /// Creates a new note diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, code, message)
    }

    /// Attaches the subject of this diagnostic.
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Shorthand for a component subject.
    pub fn on_component(self, reference: impl Into<String>) -> Self {
        self.with_subject(Subject::Component {
            reference: reference.into(),
        })
    }

    /// Shorthand for a net subject.
    pub fn on_net(self, name: impl Into<String>) -> Self {
        self.with_subject(Subject::Net { name: name.into() })
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    #[test]
    fn builder_methods() {
        let diag = Diagnostic::warning(
            DiagnosticCode::new(Category::Routing, 201),
            "net routed with labels only",
        )
        .on_net("SDA")
        .with_note("no path within the search budget");
        assert_eq!(diag.severity, Severity::Warning);
        assert_eq!(
            diag.subject,
            Some(Subject::Net {
                name: "SDA".into()
            })
        );
        assert_eq!(diag.notes.len(), 1);
    }

    #[test]
    fn subject_display() {
        let pin = Subject::Pin {
            reference: "U1".into(),
            pin: "7".into(),
        };
        assert_eq!(pin.to_string(), "pin U1.7");
        let comp = Subject::Component {
            reference: "R3".into(),
        };
        assert_eq!(comp.to_string(), "component R3");
    }

    #[test]
    fn serializes_subject_tag() {
        let diag = Diagnostic::error(DiagnosticCode::new(Category::Input, 2), "unknown ref")
            .on_component("Q9");
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["subject"]["kind"], "component");
        assert_eq!(json["severity"], "error");
    }
}
