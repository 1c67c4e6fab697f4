//! Diagnostic accumulator shared by the placement and routing passes.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Ledger {
    diagnostics: Vec<Diagnostic>,
    errors: usize,
    warnings: usize,
}

/// Collects diagnostics in emission order.
///
/// Passes only ever see `&DiagnosticSink`, so the sink is `Sync` and can be
/// handed to worker threads as-is.
#[derive(Default)]
pub struct DiagnosticSink {
    ledger: Mutex<Ledger>,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // Pushes are the only mutation, so a poisoned ledger is still whole.
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        let mut ledger = self.ledger();
        match diag.severity {
            Severity::Error => ledger.errors += 1,
            Severity::Warning => ledger.warnings += 1,
            Severity::Note => {}
        }
        ledger.diagnostics.push(diag);
    }

    /// Whether any input entry had to be dropped.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of error diagnostics so far.
    pub fn error_count(&self) -> usize {
        self.ledger().errors
    }

    /// Number of warning diagnostics so far.
    pub fn warning_count(&self) -> usize {
        self.ledger().warnings
    }

    /// Number of diagnostics carrying `code`, whatever their severity.
    pub fn count_of(&self, code: DiagnosticCode) -> usize {
        self.ledger()
            .diagnostics
            .iter()
            .filter(|d| d.code == code)
            .count()
    }

    /// A snapshot of everything emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.ledger().diagnostics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;

    const UNKNOWN_REF: DiagnosticCode = DiagnosticCode::new(Category::Input, 3);
    const LABEL_ONLY: DiagnosticCode = DiagnosticCode::new(Category::Routing, 201);

    #[test]
    fn empty_sink() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        assert!(sink.diagnostics().is_empty());
    }

    #[test]
    fn counts_by_severity_and_code() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::error(UNKNOWN_REF, "unknown reference"));
        sink.emit(Diagnostic::warning(LABEL_ONLY, "label only").on_net("SDA"));
        sink.emit(Diagnostic::warning(LABEL_ONLY, "label only").on_net("SCL"));
        sink.emit(Diagnostic::note(
            DiagnosticCode::new(Category::Placement, 101),
            "fallback",
        ));
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.warning_count(), 2);
        assert_eq!(sink.count_of(LABEL_ONLY), 2);
        assert_eq!(sink.count_of(DiagnosticCode::new(Category::Quality, 301)), 0);
        assert_eq!(sink.diagnostics().len(), 4);
    }

    #[test]
    fn keeps_emission_order() {
        let sink = DiagnosticSink::new();
        sink.emit(Diagnostic::warning(LABEL_ONLY, "first"));
        sink.emit(Diagnostic::error(UNKNOWN_REF, "second"));
        let messages: Vec<String> = sink.diagnostics().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, ["first", "second"]);
    }

    #[test]
    fn shared_across_threads() {
        let sink = DiagnosticSink::new();
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        sink.emit(Diagnostic::error(UNKNOWN_REF, "unknown reference"));
                    }
                });
            }
        });
        assert_eq!(sink.error_count(), 200);
        assert_eq!(sink.count_of(UNKNOWN_REF), 200);
    }
}
