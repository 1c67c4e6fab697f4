//! Post-placement rotation pass for two-pin passives.

use super::session::{Fit, PlacementSession};
use crate::classify::ComponentKind;
use crate::geometry::{Point, Rotation};
use crate::ids::InstanceId;
use crate::model::PinRef;

fn is_two_pin_passive(kind: ComponentKind) -> bool {
    matches!(
        kind,
        ComponentKind::Resistor
            | ComponentKind::Capacitor
            | ComponentKind::Inductor
            | ComponentKind::Diode
            | ComponentKind::Led
    )
}

/// Summed Manhattan distance from the pins of `id` at `origin`/`rotation` to
/// every other endpoint on their nets.
fn wire_cost(s: &PlacementSession<'_>, id: InstanceId, origin: Point, rotation: Rotation) -> f64 {
    let sch = s.schematic();
    let inst = sch.instance(id);
    let mut cost = 0.0;
    for pin in 0..inst.symbol.pins.len() {
        let Some(at) = inst.pin_position_at(pin, origin, rotation) else {
            continue;
        };
        for &net in sch.nets_of_pin(PinRef { instance: id, pin }) {
            for e in &sch.net(net).endpoints {
                if e.instance == id {
                    continue;
                }
                if let Some(p) = sch.pin_position(*e) {
                    cost += at.manhattan(p);
                }
            }
        }
    }
    cost
}

/// Turns each two-pin passive to whichever of R0 and R90 shortens its
/// connections, keeping its centre and only where the turned rect is legal.
/// Returns the number of parts turned.
pub fn optimize_rotations(s: &mut PlacementSession<'_>) -> usize {
    let avoid = s.clearance();
    let candidates: Vec<InstanceId> = s
        .schematic()
        .instances
        .iter()
        .filter(|i| i.symbol.pins.len() == 2 && is_two_pin_passive(i.kind) && s.is_placed(i.id))
        .map(|i| i.id)
        .collect();

    let mut turned = 0;
    for id in candidates {
        let inst = s.schematic().instance(id);
        let current = inst.rotation;
        let other = match current {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R0,
            _ => continue,
        };
        let center = inst.center();
        let group = inst.group.clone();
        let (w, h) = inst.size_at(other);
        let origin = Point::new(center.x - w / 2.0, center.y - h / 2.0).snapped(s.grid());

        let before = wire_cost(s, id, inst.position, current);
        let after = wire_cost(s, id, origin, other);
        if after >= before {
            continue;
        }
        let rect = s.rect_at(id, origin, other);
        let fit = group.as_deref().map_or(Fit::Normal, Fit::SameGroup);
        if s.is_free(&rect, avoid, fit, Some(id)) {
            s.commit(id, origin, other, group.as_deref());
            turned += 1;
        }
    }
    log::debug!("rotation pass turned {turned} parts");
    turned
}
