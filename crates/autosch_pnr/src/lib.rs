//! Automatic placement and routing for schematic drawings.
//!
//! This crate takes a netlist (components with symbol shapes, nets as lists
//! of pin endpoints) and produces a readable schematic: every component gets
//! a grid-snapped position and rotation, every net gets orthogonal wires,
//! net labels or supply glyphs. The result is a [`Layout`] in absolute
//! canvas coordinates.
//!
//! # Pipeline
//!
//! 1. **Input**: validate the netlist and build a [`Schematic`]
//! 2. **Graph**: component connectivity weighted by shared nets
//! 3. **Patterns**: core, bypass caps, crystal, reset, repeated circuits
//! 4. **Place**: core first, then critical peripherals, arrays, IO
//!    clusters, functional clusters and edge connectors
//! 5. **Route**: supply nets, then signal nets, each by name
//! 6. **Quality**: read-only report on the finished placement
//!
//! Nothing in the pipeline fails on bad input: malformed entries, parts that
//! do not fit and nets that cannot be wired all end up as diagnostics and a
//! degraded but complete layout.
//!
//! # Usage
//!
//! ```ignore
//! use autosch_pnr::{place_and_route, NetlistInput};
//!
//! let input = NetlistInput::from_json(&text)?;
//! let layout = place_and_route(&input, &config, &sink)?;
//! println!("{} wires, quality {}", layout.wires.len(), layout.quality.level);
//! ```

#![warn(missing_docs)]

pub mod classify;
pub mod geometry;
pub mod graph;
pub mod ids;
pub mod input;
pub mod layout;
pub mod model;
pub mod patterns;
pub mod placement;
pub mod quality;
pub mod routing;

pub use classify::{ClassifierRule, ClassifierTable, ComponentKind, ConnectorClass, NetClass};
pub use geometry::{Point, Rect, Rotation, Side};
pub use graph::Connectivity;
pub use ids::{InstanceId, NetId};
pub use input::{build_schematic, InputError, NetlistInput, ValidationReport};
pub use layout::{Layout, Placement};
pub use model::{Instance, Net, PinRef, Schematic, Symbol, SymbolPin};
pub use patterns::LayoutPlan;
pub use quality::{QualityLevel, QualityReport};
pub use routing::{NetLabel, PowerSymbol, RouteStats, Routing, Wire};

use autosch_common::{AutoschResult, InternalError};
use autosch_config::EngineConfig;
use autosch_diagnostics::DiagnosticSink;

/// Places and routes `input` with the default classifier table.
pub fn place_and_route(
    input: &NetlistInput,
    config: &EngineConfig,
    sink: &DiagnosticSink,
) -> AutoschResult<Layout> {
    place_and_route_with(input, &ClassifierTable::default(), config, sink)
}

/// Places and routes `input`, classifying components with `classifier`.
///
/// Input positions only decide which power pin each bypass capacitor
/// serves and the order those capacitors are placed in; everything else
/// depends only on the netlist, the configuration and its seed.
pub fn place_and_route_with(
    input: &NetlistInput,
    classifier: &ClassifierTable,
    config: &EngineConfig,
    sink: &DiagnosticSink,
) -> AutoschResult<Layout> {
    // 1. Netlist → schematic
    let (mut schematic, validation) = build_schematic(input, classifier, sink);
    log::debug!(
        "input: {} components, {} nets, {} issues",
        schematic.instance_count(),
        schematic.net_count(),
        validation.issue_count()
    );

    // 2-4. Graph, patterns, placement
    let graph = Connectivity::build(&schematic);
    let plan = placement::place(&mut schematic, &graph, config, sink);
    check_placed(&schematic)?;

    // 5-6. Routing and quality
    Ok(finish(&schematic, &graph, &plan, config, sink, validation))
}

/// Routes `input` at the positions and rotations it already carries, using
/// the default classifier table.
///
/// This is the entry point after a user moved or rotated a part: write the
/// change into the input (see [`Layout::apply_to`]) and reroute. Routing is
/// always a full pass.
pub fn reroute(input: &NetlistInput, config: &EngineConfig, sink: &DiagnosticSink) -> AutoschResult<Layout> {
    reroute_with(input, &ClassifierTable::default(), config, sink)
}

/// [`reroute`] with a custom classifier table.
pub fn reroute_with(
    input: &NetlistInput,
    classifier: &ClassifierTable,
    config: &EngineConfig,
    sink: &DiagnosticSink,
) -> AutoschResult<Layout> {
    let (schematic, validation) = build_schematic(input, classifier, sink);
    check_placed(&schematic)?;
    let graph = Connectivity::build(&schematic);
    let core = patterns::choose_core(&schematic, &graph);
    let plan = LayoutPlan::analyze(&schematic, &graph, core);
    Ok(finish(&schematic, &graph, &plan, config, sink, validation))
}

fn finish(
    schematic: &Schematic,
    graph: &Connectivity,
    plan: &LayoutPlan,
    config: &EngineConfig,
    sink: &DiagnosticSink,
    validation: ValidationReport,
) -> Layout {
    let routing = routing::route(schematic, plan, config, sink);
    let quality = quality::validate(schematic, graph, plan, config);
    quality.emit_to(sink);
    let core = plan.primary.map(|id| schematic.instance(id).reference.clone());
    Layout::assemble(schematic, core, routing, quality, validation)
}

fn check_placed(schematic: &Schematic) -> AutoschResult<()> {
    match schematic
        .instances
        .iter()
        .find(|i| !(i.position.x.is_finite() && i.position.y.is_finite()))
    {
        Some(inst) => Err(InternalError::new(format!(
            "{} has a non-finite position",
            inst.reference
        ))),
        None => Ok(()),
    }
}
