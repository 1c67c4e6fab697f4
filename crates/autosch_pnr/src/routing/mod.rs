//! Net router.
//!
//! Routes one net at a time into a shared obstacle field: supply and ground
//! nets first, then signal nets, each group by name. Everything drawn is
//! added to the field at once, so the result depends on that order and is
//! reproducible for a given placement.
//!
//! Supply pins get a short stub ending in a supply or ground glyph; repeated
//! button and LED groups share one bus with a single glyph. Signal nets go
//! through local trunks, cluster buses and a global trunk before falling
//! back to pairwise connection; pieces that still cannot be joined get net
//! labels.

mod astar;
mod labels;
mod lanes;
mod obstacles;
mod paths;
mod power;
mod signal;
mod style;

pub use astar::SearchParams;
pub use labels::NetLabel;
pub use lanes::LaneTable;
pub use obstacles::{Exclude, Obstacle, ObstacleField, Owner};
pub use power::{PowerKind, PowerSymbol, POWER_LABELLED};
pub use signal::PARTIAL_NET;
pub use style::{net_style, NetStyle};

use crate::geometry::{simplify_path, snap, Point, Side};
use crate::ids::{InstanceId, NetId};
use crate::model::{PinRef, Schematic};
use crate::patterns::LayoutPlan;
use autosch_config::EngineConfig;
use autosch_diagnostics::DiagnosticSink;
use labels::{LabelAnchor, StubRange};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// A drawn polyline of one net.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    /// Net name.
    pub net: String,
    /// Orthogonal polyline.
    pub points: Vec<Point>,
    /// Stroke style.
    pub style: NetStyle,
}

/// Per-pass routing counters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteStats {
    /// Nets in the schematic.
    pub total_nets: usize,
    /// Nets fully connected by wires, trunks or power glyphs.
    pub wired_nets: usize,
    /// Nets that needed at least one label to stay connected.
    pub labelled_nets: usize,
    /// Nets without any placed endpoint.
    pub skipped_nets: usize,
    /// `wired / (total - skipped)`, or 1 when nothing was routable.
    pub success_rate: f64,
}

/// Everything the router drew.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Routing {
    /// Wires in drawing order.
    pub wires: Vec<Wire>,
    /// Net labels.
    pub labels: Vec<NetLabel>,
    /// Supply and ground glyphs.
    pub power_symbols: Vec<PowerSymbol>,
    /// Junction dots.
    pub junctions: Vec<Point>,
    /// Counters.
    pub stats: RouteStats,
}

impl Routing {
    /// Wires of the named net.
    pub fn wires_of<'a>(&'a self, net: &'a str) -> impl Iterator<Item = &'a Wire> + 'a {
        self.wires.iter().filter(move |w| w.net == net)
    }

    /// Labels of the named net.
    pub fn labels_of<'a>(&'a self, net: &'a str) -> impl Iterator<Item = &'a NetLabel> + 'a {
        self.labels.iter().filter(move |l| l.net == net)
    }
}

/// How a single net ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum NetOutcome {
    Wired,
    Labelled,
    Skipped,
}

/// A point a net has to reach: a pin with its escape stub, or a point on
/// an already drawn trunk of the same net.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Node {
    at: Point,
    stub: Point,
    side: Option<Side>,
    instance: Option<InstanceId>,
}

impl Node {
    fn on_trunk(at: Point) -> Self {
        Self {
            at,
            stub: at,
            side: None,
            instance: None,
        }
    }

    fn is_trunk_point(&self) -> bool {
        self.instance.is_none()
    }
}

/// State of one routing pass.
struct Router<'a> {
    schematic: &'a Schematic,
    config: &'a EngineConfig,
    sink: &'a DiagnosticSink,
    field: ObstacleField,
    lanes: LaneTable,
    styles: HashMap<NetId, NetStyle>,
    out: Routing,
}

impl<'a> Router<'a> {
    fn new(schematic: &'a Schematic, config: &'a EngineConfig, sink: &'a DiagnosticSink) -> Self {
        let clearance = config.placement.avoid_clearance + config.routing.route_clearance;
        Self {
            schematic,
            config,
            sink,
            field: ObstacleField::from_schematic(schematic, clearance, config.routing.wire_obstacle_width),
            lanes: LaneTable::new(config.routing.lane_max),
            styles: HashMap::new(),
            out: Routing::default(),
        }
    }

    fn grid(&self) -> f64 {
        self.config.canvas.grid
    }

    fn net_name(&self, net: NetId) -> &'a str {
        &self.schematic.net(net).name
    }

    /// Escape stub end of a pin: outward by the stub length, snapped on the
    /// moving axis.
    fn stub_end(&self, at: Point, side: Side, chip: bool) -> Point {
        let routing = &self.config.routing;
        let len = if chip { routing.ic_stub_length } else { routing.stub_length };
        let (dx, dy) = side.outward();
        let end = at.offset(dx * len, dy * len);
        if side.is_horizontal_exit() {
            Point::new(snap(end.x, self.grid()), end.y)
        } else {
            Point::new(end.x, snap(end.y, self.grid()))
        }
    }

    fn pin_node(&self, pin: PinRef) -> Option<Node> {
        let inst = self.schematic.instance(pin.instance);
        let at = inst.pin_position(pin.pin)?;
        let side = inst.pin_side(pin.pin);
        Some(Node {
            at,
            stub: self.stub_end(at, side, inst.is_chip()),
            side: Some(side),
            instance: Some(pin.instance),
        })
    }

    /// Nodes of every endpoint of `net` that has a position.
    fn pin_nodes(&self, net: NetId) -> Vec<(PinRef, Node)> {
        self.schematic
            .net(net)
            .endpoints
            .iter()
            .filter_map(|&pin| self.pin_node(pin).map(|n| (pin, n)))
            .collect()
    }

    fn style(&mut self, net: NetId) -> NetStyle {
        let net_ref = self.schematic.net(net);
        self.styles
            .entry(net)
            .or_insert_with(|| net_style(&net_ref.name, net_ref.class))
            .clone()
    }

    /// Draws a polyline of `net` and adds it to the obstacle field.
    fn emit(&mut self, net: NetId, points: &[Point]) {
        let points = simplify_path(points);
        if points.len() < 2 {
            return;
        }
        self.field.add_path(net, &points);
        let style = self.style(net);
        self.out.wires.push(Wire {
            net: self.net_name(net).to_string(),
            points,
            style,
        });
    }

    fn junction(&mut self, p: Point) {
        if !self.out.junctions.contains(&p) {
            self.out.junctions.push(p);
        }
    }

    fn label(&mut self, net: NetId, node: &Node) {
        let routing = &self.config.routing;
        let stubs = StubRange {
            min: routing.stub_length,
            max: routing.label_stub_max,
            step: self.grid(),
        };
        let anchor = LabelAnchor {
            at: node.at,
            side: node.side.unwrap_or(Side::Right),
            instance: node.instance,
        };
        let name = self.net_name(net);
        let label = labels::place_label(name, net, anchor, stubs, self.grid(), &mut self.field);
        if node.is_trunk_point() {
            self.junction(node.at);
        }
        self.out.labels.push(label);
    }

    fn search_params(&self) -> SearchParams {
        let routing = &self.config.routing;
        SearchParams {
            grid: self.grid(),
            width: self.config.canvas.width,
            height: self.config.canvas.height,
            turn_penalty: routing.turn_penalty,
            backwards_penalty: routing.backwards_penalty,
            max_iterations: routing.astar_max_iterations,
            time_limit: Duration::from_millis(routing.astar_time_limit_ms),
        }
    }
}

/// Nets in routing order: supply and ground nets by name, then signal nets
/// by name. Ties keep input order.
fn net_order(schematic: &Schematic) -> Vec<NetId> {
    let mut order: Vec<(bool, &str, NetId)> = schematic
        .nets
        .iter()
        .map(|n| (!n.class.is_supply(), n.name.as_str(), n.id))
        .collect();
    order.sort();
    order.into_iter().map(|(_, _, id)| id).collect()
}

/// Routes every net of a placed schematic.
///
/// `plan` supplies the repeated groups whose supply pins share a bus.
/// Unroutable connections never fail the pass; they end in labels and a
/// note in `sink`.
pub fn route(
    schematic: &Schematic,
    plan: &LayoutPlan,
    config: &EngineConfig,
    sink: &DiagnosticSink,
) -> Routing {
    let mut r = Router::new(schematic, config, sink);

    let on_bus = power::route_repeated_buses(&mut r, plan);

    let mut stats = RouteStats {
        total_nets: schematic.nets.len(),
        ..RouteStats::default()
    };
    for net in net_order(schematic) {
        let outcome = if schematic.net(net).class.is_supply() {
            power::route_supply_net(&mut r, net, &on_bus)
        } else {
            signal::route_signal_net(&mut r, net)
        };
        log::trace!("net {}: {outcome:?}", schematic.net(net).name);
        match outcome {
            NetOutcome::Wired => stats.wired_nets += 1,
            NetOutcome::Labelled => stats.labelled_nets += 1,
            NetOutcome::Skipped => stats.skipped_nets += 1,
        }
    }
    let routable = stats.total_nets - stats.skipped_nets;
    stats.success_rate = if routable == 0 {
        1.0
    } else {
        stats.wired_nets as f64 / routable as f64
    };
    log::debug!(
        "routing done: {} wired, {} labelled, {} skipped",
        stats.wired_nets,
        stats.labelled_nets,
        stats.skipped_nets
    );

    let mut out = r.out;
    out.stats = stats;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;
    use crate::model::test_support::{instance, schematic};

    fn placed(mut sch: Schematic, spots: &[(&str, f64, f64)]) -> Schematic {
        for &(reference, x, y) in spots {
            if let Some(id) = sch.find_instance(reference) {
                let inst = sch.instance_mut(id);
                inst.position = Point::new(x, y);
                inst.rotation = Rotation::R0;
            }
        }
        sch
    }

    #[test]
    fn nets_are_ordered_supply_first() {
        let sch = schematic(
            vec![instance("R1", "1k", 2), instance("R2", "1k", 2)],
            &[
                ("SIG", &[("R1", "1"), ("R2", "1")]),
                ("VCC", &[("R1", "2")]),
                ("GND", &[("R2", "2")]),
            ],
        );
        let names: Vec<_> = net_order(&sch).iter().map(|&n| sch.net(n).name.clone()).collect();
        assert_eq!(names, vec!["GND", "VCC", "SIG"]);
    }

    #[test]
    fn two_resistors_get_one_wire() {
        let sch = placed(
            schematic(
                vec![instance("R1", "1k", 2), instance("R2", "1k", 2)],
                &[("SIG", &[("R1", "2"), ("R2", "1")])],
            ),
            &[("R1", 200.0, 300.0), ("R2", 400.0, 300.0)],
        );
        let routing = route(&sch, &LayoutPlan::default(), &EngineConfig::default(), &DiagnosticSink::new());
        assert_eq!(routing.wires.len(), 1);
        assert!(routing.labels.is_empty());
        assert_eq!(routing.stats.wired_nets, 1);
        assert_eq!(routing.stats.success_rate, 1.0);
        assert_eq!(
            routing.wires[0].points,
            vec![Point::new(260.0, 310.0), Point::new(400.0, 310.0)]
        );
    }

    #[test]
    fn dangling_net_is_labelled() {
        let sch = placed(
            schematic(vec![instance("R1", "1k", 2)], &[("TP", &[("R1", "1")])]),
            &[("R1", 200.0, 300.0)],
        );
        let routing = route(&sch, &LayoutPlan::default(), &EngineConfig::default(), &DiagnosticSink::new());
        assert!(routing.wires.is_empty());
        assert_eq!(routing.labels_of("TP").count(), 1);
        assert_eq!(routing.stats.labelled_nets, 1);
    }

    #[test]
    fn supply_pins_get_glyphs() {
        let sch = placed(
            schematic(
                vec![instance("R1", "1k", 2)],
                &[("VCC", &[("R1", "1")]), ("GND", &[("R1", "2")])],
            ),
            &[("R1", 400.0, 400.0)],
        );
        let routing = route(&sch, &LayoutPlan::default(), &EngineConfig::default(), &DiagnosticSink::new());
        assert_eq!(routing.power_symbols.len(), 2);
        assert_eq!(routing.stats.wired_nets, 2);
        let vcc = routing.power_symbols.iter().find(|p| p.net == "VCC").unwrap();
        let gnd = routing.power_symbols.iter().find(|p| p.net == "GND").unwrap();
        assert_eq!(vcc.kind, PowerKind::Supply);
        assert_eq!(gnd.kind, PowerKind::Ground);
        assert!(vcc.at.y < gnd.at.y);
    }
}
