//! Netlist input: the serde document handed over by the netlist collaborator,
//! and its conversion into a validated [`Schematic`].
//!
//! Malformed entries never abort the conversion. Each one is recorded in the
//! [`ValidationReport`], emitted as a diagnostic, and skipped.

use crate::classify::{classify_connector, ClassifierTable, ComponentKind, Descriptor, NetClass};
use crate::geometry::{Point, Rotation};
use crate::ids::{InstanceId, NetId};
use crate::model::{Instance, Net, PinRef, Schematic, Symbol};
use autosch_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink, Subject};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

/// Component without a reference designator.
pub const MISSING_REFERENCE: DiagnosticCode = DiagnosticCode::new(Category::Input, 1);
/// Two components share a reference designator.
pub const DUPLICATE_REFERENCE: DiagnosticCode = DiagnosticCode::new(Category::Input, 2);
/// Net endpoint names an unknown component.
pub const UNKNOWN_REFERENCE: DiagnosticCode = DiagnosticCode::new(Category::Input, 3);
/// Net endpoint names a pin the symbol does not have.
pub const UNKNOWN_PIN: DiagnosticCode = DiagnosticCode::new(Category::Input, 4);
/// Net without any resolvable endpoint.
pub const EMPTY_NET: DiagnosticCode = DiagnosticCode::new(Category::Input, 5);
/// Net with a single resolvable endpoint.
pub const DEGENERATE_NET: DiagnosticCode = DiagnosticCode::new(Category::Input, 6);
/// Two nets share a name; their endpoints are merged.
pub const DUPLICATE_NET: DiagnosticCode = DiagnosticCode::new(Category::Input, 7);

/// Errors that prevent a netlist document from being read at all.
#[derive(Debug, Error)]
pub enum InputError {
    /// The document is not valid netlist JSON.
    #[error("invalid netlist document: {0}")]
    Json(#[from] serde_json::Error),
}

/// The netlist document.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetlistInput {
    /// Components in insertion order.
    #[serde(default)]
    pub components: Vec<ComponentInput>,
    /// Nets in insertion order.
    #[serde(default)]
    pub nets: Vec<NetInput>,
}

impl NetlistInput {
    /// Parses a JSON netlist document.
    pub fn from_json(text: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// One component entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentInput {
    /// Reference designator.
    #[serde(default)]
    pub reference: String,
    /// Value text.
    #[serde(default)]
    pub value: String,
    /// Library key of the symbol.
    #[serde(default)]
    pub symbol_key: Option<String>,
    /// Resolved symbol; a generic box is generated when absent.
    #[serde(default)]
    pub symbol: Option<Symbol>,
    /// Existing position (from a previous layout or a user move).
    #[serde(default)]
    pub position: Option<Point>,
    /// Existing rotation.
    #[serde(default)]
    pub rotation: Option<Rotation>,
}

/// One net entry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetInput {
    /// Net name.
    pub name: String,
    /// Endpoints in any order.
    #[serde(default)]
    pub endpoints: Vec<EndpointInput>,
}

/// One `(reference, pin)` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointInput {
    /// Reference designator of the component.
    pub reference: String,
    /// Pin number or name.
    pub pin: PinDesignator,
}

/// A pin given either as a bare number or as text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinDesignator {
    /// Numeric pin designator.
    Number(u32),
    /// Pin number or name as text.
    Text(String),
}

impl PinDesignator {
    fn as_number(&self) -> Option<u32> {
        match self {
            PinDesignator::Number(n) => Some(*n),
            PinDesignator::Text(t) => t.trim().parse().ok(),
        }
    }
}

impl fmt::Display for PinDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinDesignator::Number(n) => write!(f, "{n}"),
            PinDesignator::Text(t) => f.write_str(t),
        }
    }
}

/// A net endpoint that could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointIssue {
    /// Net the endpoint belongs to.
    pub net: String,
    /// Reference designator as written.
    pub reference: String,
    /// Pin as written.
    pub pin: String,
}

/// Structured result of input validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Number of components skipped for lacking a reference designator.
    pub missing_references: usize,
    /// Reference designators that appeared more than once; later copies skipped.
    pub duplicate_references: Vec<String>,
    /// Endpoints naming unknown components.
    pub unknown_references: Vec<EndpointIssue>,
    /// Endpoints naming pins the symbol does not have.
    pub unknown_pins: Vec<EndpointIssue>,
    /// Nets with no resolvable endpoint (skipped).
    pub empty_nets: Vec<String>,
    /// Nets with exactly one resolvable endpoint (kept, label or glyph only).
    pub degenerate_nets: Vec<String>,
    /// Net names that appeared more than once (endpoints merged).
    pub duplicate_nets: Vec<String>,
}

impl ValidationReport {
    /// Returns `true` when nothing was skipped or merged.
    pub fn is_clean(&self) -> bool {
        self.missing_references == 0
            && self.duplicate_references.is_empty()
            && self.unknown_references.is_empty()
            && self.unknown_pins.is_empty()
            && self.empty_nets.is_empty()
            && self.degenerate_nets.is_empty()
            && self.duplicate_nets.is_empty()
    }

    /// Total number of recorded problems.
    pub fn issue_count(&self) -> usize {
        self.missing_references
            + self.duplicate_references.len()
            + self.unknown_references.len()
            + self.unknown_pins.len()
            + self.empty_nets.len()
            + self.degenerate_nets.len()
            + self.duplicate_nets.len()
    }
}

/// Converts a netlist document into a [`Schematic`].
///
/// Components are classified with `classifier`. Components without a symbol
/// get a generic one sized to the pins their nets reference. Input positions
/// and rotations are kept as a starting point; placement overwrites them.
pub fn build_schematic(
    input: &NetlistInput,
    classifier: &ClassifierTable,
    sink: &DiagnosticSink,
) -> (Schematic, ValidationReport) {
    let mut report = ValidationReport::default();
    let mut schematic = Schematic::new();
    let referenced = referenced_pins(input);

    for comp in &input.components {
        let reference = comp.reference.trim();
        if reference.is_empty() {
            report.missing_references += 1;
            sink.emit(
                Diagnostic::error(MISSING_REFERENCE, "component without a reference designator")
                    .with_note(format!("value `{}`", comp.value)),
            );
            continue;
        }
        if schematic.find_instance(reference).is_some() {
            report.duplicate_references.push(reference.to_string());
            sink.emit(
                Diagnostic::error(DUPLICATE_REFERENCE, "duplicate reference designator")
                    .on_component(reference)
                    .with_note("only the first occurrence is placed"),
            );
            continue;
        }

        let symbol = match &comp.symbol {
            Some(symbol) => symbol.clone(),
            None => generated_symbol(referenced.get(reference)),
        };
        let descriptor = Descriptor::new(
            reference,
            &comp.value,
            comp.symbol_key.as_deref().unwrap_or(""),
            symbol.pins.len(),
        );
        let kind = classifier.classify(&descriptor);
        let connector = (kind == ComponentKind::Connector).then(|| classify_connector(&descriptor));

        schematic.add_instance(Instance {
            id: InstanceId::from_raw(0),
            reference: reference.to_string(),
            value: comp.value.clone(),
            symbol_key: comp.symbol_key.clone(),
            symbol,
            kind,
            connector,
            position: comp.position.unwrap_or_default(),
            rotation: comp.rotation.unwrap_or_default(),
            group: None,
        });
    }

    let mut merged: HashMap<String, usize> = HashMap::new();
    let mut pending: Vec<(String, Vec<PinRef>)> = Vec::new();
    for net in &input.nets {
        let name = net.name.trim().to_string();
        let mut endpoints = Vec::new();
        for ep in &net.endpoints {
            let issue = || EndpointIssue {
                net: name.clone(),
                reference: ep.reference.clone(),
                pin: ep.pin.to_string(),
            };
            let Some(id) = schematic.find_instance(ep.reference.trim()) else {
                report.unknown_references.push(issue());
                sink.emit(
                    Diagnostic::error(UNKNOWN_REFERENCE, "net endpoint names an unknown component")
                        .on_net(name.clone())
                        .with_note(format!("reference `{}`", ep.reference)),
                );
                continue;
            };
            let Some(pin) = schematic.instance(id).find_pin(&ep.pin.to_string()) else {
                report.unknown_pins.push(issue());
                sink.emit(
                    Diagnostic::error(UNKNOWN_PIN, "net endpoint names an unknown pin")
                        .with_subject(Subject::Pin {
                            reference: ep.reference.clone(),
                            pin: ep.pin.to_string(),
                        })
                        .with_note(format!("on net `{name}`")),
                );
                continue;
            };
            let pin_ref = PinRef { instance: id, pin };
            if !endpoints.contains(&pin_ref) {
                endpoints.push(pin_ref);
            }
        }

        match merged.get(&name).copied() {
            Some(slot) => {
                report.duplicate_nets.push(name.clone());
                sink.emit(
                    Diagnostic::warning(DUPLICATE_NET, "net name appears more than once")
                        .on_net(name.clone())
                        .with_note("endpoints are merged into the first occurrence"),
                );
                let existing = &mut pending[slot].1;
                for e in endpoints {
                    if !existing.contains(&e) {
                        existing.push(e);
                    }
                }
            }
            None => {
                merged.insert(name.clone(), pending.len());
                pending.push((name, endpoints));
            }
        }
    }

    for (name, endpoints) in pending {
        match endpoints.len() {
            0 => {
                report.empty_nets.push(name.clone());
                sink.emit(
                    Diagnostic::warning(EMPTY_NET, "net has no resolvable endpoints")
                        .on_net(name),
                );
                continue;
            }
            1 => {
                report.degenerate_nets.push(name.clone());
                sink.emit(
                    Diagnostic::warning(DEGENERATE_NET, "net has a single endpoint")
                        .on_net(name.clone())
                        .with_note("it is marked with a label or supply symbol only"),
                );
            }
            _ => {}
        }
        let class = NetClass::of(&name);
        schematic.add_net(Net {
            id: NetId::from_raw(0),
            name,
            class,
            endpoints,
        });
    }

    log::debug!(
        "built schematic: {} instances, {} nets, {} input issues",
        schematic.instance_count(),
        schematic.net_count(),
        report.issue_count()
    );
    (schematic, report)
}

/// Pin designators referenced by the nets, per reference designator.
fn referenced_pins(input: &NetlistInput) -> HashMap<&str, BTreeSet<String>> {
    let mut pins: HashMap<&str, BTreeSet<String>> = HashMap::new();
    for net in &input.nets {
        for ep in &net.endpoints {
            pins.entry(ep.reference.trim())
                .or_default()
                .insert(ep.pin.to_string().trim().to_string());
        }
    }
    pins
}

/// Largest pin count a generated symbol gets. Designators past it have no
/// pin and are reported as unknown.
pub const MAX_GENERATED_PINS: usize = 256;

/// Generic symbol covering every referenced pin, up to [`MAX_GENERATED_PINS`].
///
/// Numeric designators map to the pin with that number; textual ones are
/// attached as names to the next free pins.
fn generated_symbol(referenced: Option<&BTreeSet<String>>) -> Symbol {
    let Some(referenced) = referenced else {
        return Symbol::generic(2);
    };
    let numeric: Vec<u32> = referenced
        .iter()
        .filter_map(|p| PinDesignator::Text(p.clone()).as_number())
        .filter(|&n| (n as usize) <= MAX_GENERATED_PINS)
        .collect();
    let named: Vec<&String> = referenced
        .iter()
        .filter(|p| !p.chars().all(|c| c.is_ascii_digit()))
        .collect();
    let max_number = numeric.iter().copied().max().unwrap_or(0) as usize;
    let count = max_number
        .max(numeric.len() + named.len())
        .clamp(2, MAX_GENERATED_PINS);

    let mut symbol = Symbol::generic(count);
    let used: BTreeSet<usize> = numeric.iter().map(|n| *n as usize).collect();
    let mut free = (1..=count).filter(|n| !used.contains(n));
    for name in named {
        if let Some(number) = free.next() {
            symbol.pins[number - 1].name = name.clone();
        }
    }
    symbol
}
