//! Diagnostic creation, severity management, and rendering.
//!
//! The engine never aborts on bad input or failed searches. Instead it emits
//! structured [`Diagnostic`] messages into a [`DiagnosticSink`]: malformed
//! netlist entries, components that fell back to a random position, nets that
//! ended up label-only. [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Subject};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
