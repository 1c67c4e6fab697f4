//! Supply and ground nets: glyphs at the pins instead of long wires.

use super::obstacles::Exclude;
use super::{NetOutcome, Node, Router};
use crate::classify::NetClass;
use crate::geometry::{Point, Rect, Side};
use crate::ids::NetId;
use crate::model::PinRef;
use crate::patterns::{LayoutPlan, RepeatedGroup};
use autosch_diagnostics::{Category, Diagnostic, DiagnosticCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A supply pin that got a text label because no glyph fitted.
pub const POWER_LABELLED: DiagnosticCode = DiagnosticCode::new(Category::Routing, 202);

/// Offset of a repeated-group bus from the outermost tap.
const BUS_OFFSET: f64 = 20.0;
/// How far a bus runs past its first and last tap.
const BUS_OVERHANG: f64 = 5.0;
/// Extra stub lengths tried beyond the minimum.
const GLYPH_STUB_RANGE: f64 = 40.0;

/// Glyph drawn at the end of a supply stub.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerKind {
    /// Upward arrow for a supply rail.
    Supply,
    /// Ground bars.
    Ground,
}

impl PowerKind {
    fn of(class: NetClass) -> Self {
        if class == NetClass::Ground {
            PowerKind::Ground
        } else {
            PowerKind::Supply
        }
    }

    /// Box covered by the glyph anchored at `at`.
    pub fn rect_at(self, at: Point) -> Rect {
        match self {
            PowerKind::Supply => Rect::new(at.x - 8.0, at.y - 28.0, 16.0, 30.0),
            PowerKind::Ground => Rect::new(at.x - 12.0, at.y, 24.0, 30.0),
        }
    }
}

/// A placed supply or ground glyph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerSymbol {
    /// Net name.
    pub net: String,
    /// Glyph type.
    pub kind: PowerKind,
    /// Anchor point, where the stub ends.
    pub at: Point,
}

fn add_symbol(r: &mut Router<'_>, net: NetId, kind: PowerKind, at: Point) {
    r.field.add_annotation(kind.rect_at(at));
    r.out.power_symbols.push(PowerSymbol {
        net: r.net_name(net).to_string(),
        kind,
        at,
    });
}

#[derive(Clone, Copy, Debug)]
struct Tap {
    pin: PinRef,
    at: Point,
    side: Side,
}

/// Pins of the primary part of each member that sit on a net of `class`,
/// restricted to the net of the first one found.
fn bus_taps(r: &Router<'_>, group: &RepeatedGroup, class: NetClass) -> Option<(NetId, Vec<Tap>)> {
    let sch = r.schematic;
    let mut net = None;
    let mut taps = Vec::new();
    for member in &group.members {
        let Some(&part) = member.parts.first() else {
            continue;
        };
        let inst = sch.instance(part);
        let found = (0..inst.symbol.pins.len()).find_map(|pin| {
            let pin_ref = PinRef { instance: part, pin };
            sch.nets_of_pin(pin_ref)
                .iter()
                .copied()
                .find(|&n| sch.net(n).class == class && net.map_or(true, |want| want == n))
                .map(|n| (pin_ref, n))
        });
        if let Some((pin_ref, n)) = found {
            if let Some(at) = inst.pin_position(pin_ref.pin) {
                net.get_or_insert(n);
                taps.push(Tap {
                    pin: pin_ref,
                    at,
                    side: inst.pin_side(pin_ref.pin),
                });
            }
        }
    }
    net.map(|n| (n, taps))
}

/// Draws one shared bus per repeated button or LED group: buttons share
/// ground, LEDs share the supply. Returns the pins the buses serve; those
/// pins get no glyph of their own.
pub(super) fn route_repeated_buses(r: &mut Router<'_>, plan: &LayoutPlan) -> BTreeSet<PinRef> {
    let mut served = BTreeSet::new();
    for group in &plan.repeated {
        let class = if group.signature.is_button() {
            NetClass::Ground
        } else if group.signature.is_led() {
            NetClass::Power
        } else {
            continue;
        };
        let Some((net, taps)) = bus_taps(r, group, class) else {
            continue;
        };
        if taps.len() < 2 {
            continue;
        }
        if let Some(pins) = draw_bus(r, net, class, &taps) {
            log::debug!("{} bus for {} with {} taps", r.net_name(net), group.signature, pins.len());
            served.extend(pins);
        }
    }
    served
}

/// Draws a straight bus beside the taps, on the side they face when they
/// all face the same way, else left of or above them.
fn draw_bus(r: &mut Router<'_>, net: NetId, class: NetClass, taps: &[Tap]) -> Option<Vec<PinRef>> {
    let xs = taps.iter().map(|t| t.at.x);
    let ys = taps.iter().map(|t| t.at.y);
    let (min_x, max_x) = xs.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let (min_y, max_y) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let vertical = max_y - min_y > max_x - min_x;

    let all_face = |side: Side| taps.iter().all(|t| t.side == side);

    let bus = if vertical {
        let x = if all_face(Side::Right) {
            max_x + BUS_OFFSET
        } else {
            min_x - BUS_OFFSET
        };
        [Point::new(x, min_y - BUS_OVERHANG), Point::new(x, max_y + BUS_OVERHANG)]
    } else {
        let y = if all_face(Side::Bottom) {
            max_y + BUS_OFFSET
        } else {
            min_y - BUS_OFFSET
        };
        [Point::new(min_x - BUS_OVERHANG, y), Point::new(max_x + BUS_OVERHANG, y)]
    };
    let own = Exclude {
        net: Some(net),
        instances: Vec::new(),
    };
    if r.field.segment_blocked(bus[0], bus[1], &own) {
        log::debug!("{} bus blocked", r.net_name(net));
        return None;
    }

    let clear: Vec<(PinRef, Point, Point)> = taps
        .iter()
        .map(|t| {
            let end = if vertical {
                Point::new(bus[0].x, t.at.y)
            } else {
                Point::new(t.at.x, bus[0].y)
            };
            (t.pin, t.at, end)
        })
        .filter(|&(pin, at, end)| !r.field.segment_blocked(at, end, &Exclude::net_and(net, [pin.instance])))
        .collect();
    if clear.len() < 2 {
        return None;
    }

    r.emit(net, &bus);
    for &(_, at, end) in &clear {
        r.emit(net, &[at, end]);
        r.junction(end);
    }
    let kind = PowerKind::of(class);
    let anchor = match (vertical, kind) {
        (true, PowerKind::Supply) => bus[0],
        _ => bus[1],
    };
    add_symbol(r, net, kind, anchor);
    Some(clear.into_iter().map(|(pin, _, _)| pin).collect())
}

/// Tries a glyph stub from `node`: supply glyphs go up, ground glyphs down,
/// with a short horizontal jog when straight out is blocked.
fn place_glyph(r: &mut Router<'_>, net: NetId, node: &Node, chip: bool, kind: PowerKind) -> bool {
    let routing = &r.config.routing;
    let grid = r.grid();
    let min = if chip { routing.ic_power_stub } else { routing.power_stub };
    let dir = if kind == PowerKind::Supply { -1.0 } else { 1.0 };
    let exclude = Exclude::net_and(net, node.instance);
    let everything = Exclude::none();

    let mut len = min;
    while len <= min + GLYPH_STUB_RANGE {
        for dx in [0.0, -grid, grid, -2.0 * grid, 2.0 * grid] {
            let p1 = node.at;
            let p2 = p1.offset(dx, 0.0);
            let end = p2.offset(0.0, dir * len);
            if dx != 0.0 && r.field.segment_blocked(p1, p2, &exclude) {
                continue;
            }
            if r.field.segment_blocked(p2, end, &exclude) {
                continue;
            }
            if r.field.rect_blocked(&kind.rect_at(end), &everything) {
                continue;
            }
            r.emit(net, &[p1, p2, end]);
            add_symbol(r, net, kind, end);
            return true;
        }
        len += grid;
    }
    false
}

/// Gives every pin of a supply net a glyph, or a label where no glyph fits.
pub(super) fn route_supply_net(r: &mut Router<'_>, net: NetId, on_bus: &BTreeSet<PinRef>) -> NetOutcome {
    let nodes = r.pin_nodes(net);
    if nodes.is_empty() {
        return NetOutcome::Skipped;
    }
    let kind = PowerKind::of(r.schematic.net(net).class);
    let mut wired = false;
    for (pin, node) in nodes {
        if on_bus.contains(&pin) {
            wired = true;
            continue;
        }
        let chip = r.schematic.instance(pin.instance).is_chip();
        if place_glyph(r, net, &node, chip, kind) {
            wired = true;
        } else {
            let reference = r.schematic.instance(pin.instance).reference.clone();
            r.sink.emit(
                Diagnostic::note(POWER_LABELLED, "no room for a power symbol, pin labelled instead")
                    .on_component(reference)
                    .on_net(r.net_name(net)),
            );
            r.label(net, &node);
        }
    }
    if wired {
        NetOutcome::Wired
    } else {
        NetOutcome::Labelled
    }
}
