//! Critical peripherals: decoupling capacitors, crystal groups and reset
//! networks, each kept within its distance limit of the owning pin.

use super::search::{near_core_side, near_position, place_pair};
use super::session::{Fit, PlacementSession};
use crate::geometry::{Point, Rotation, Side};
use crate::ids::InstanceId;
use crate::model::{side_of_point, PinRef};
use crate::patterns::{find_decoupling_caps, CrystalGroup, DecouplingCap, ResetCircuit};

/// Group tag for bypass capacitors.
pub const DECOUPLING_TAG: &str = "decoupling";
/// Group tag for crystal parts.
pub const CRYSTAL_TAG: &str = "crystal";
/// Group tag for reset parts.
pub const RESET_TAG: &str = "reset";

const DECAP_CLEARANCE: f64 = 1.0;
const DECAP_PIN_DISTANCE: f64 = 3.0;
const DECAP_RING_MAX: f64 = 30.0;
const CRYSTAL_MARGIN: f64 = 8.0;
const CRYSTAL_CAP_SPACING: f64 = 5.0;
const RESET_CLEARANCE: f64 = 2.0;
const RESET_SPACING: f64 = 3.0;

/// Places one bypass capacitor next to its power pin.
///
/// Tiers: perpendicular to the pin, parallel to it, a ring of up to 30
/// around it, then a scan along the owner's side.
pub fn place_decap(s: &mut PlacementSession<'_>, decap: &DecouplingCap) -> bool {
    let id = decap.cap;
    if s.is_placed(id) {
        return true;
    }
    let owner = s.schematic().instance(decap.target);
    let Some(pin) = owner.pin_position(decap.pin) else {
        return false;
    };
    let side = owner.pin_side(decap.pin);
    let tag = Some(DECOUPLING_TAG);
    let size = |s: &PlacementSession<'_>, r: Rotation| s.schematic().instance(id).size_at(r);

    let (w0, h0) = size(s, Rotation::R0);
    let (w9, h9) = size(s, Rotation::R90);
    let d = DECAP_PIN_DISTANCE;
    let mut tight: Vec<(Point, Rotation)> = Vec::new();
    match side {
        Side::Left | Side::Right => {
            let above = pin.y - h0 - d;
            tight.push((Point::new(pin.x - w0 / 2.0, above), Rotation::R0));
            tight.push((Point::new(pin.x - w0 / 2.0, pin.y + d), Rotation::R0));
            tight.push((Point::new(pin.x - w0 / 2.0 - 5.0, above), Rotation::R0));
            tight.push((Point::new(pin.x - w0 / 2.0 + 5.0, above), Rotation::R0));
        }
        Side::Top | Side::Bottom => {
            let left = pin.x - w9 - d;
            tight.push((Point::new(left, pin.y - h9 / 2.0), Rotation::R90));
            tight.push((Point::new(pin.x + d, pin.y - h9 / 2.0), Rotation::R90));
            tight.push((Point::new(left, pin.y - h9 / 2.0 - 5.0), Rotation::R90));
            tight.push((Point::new(left, pin.y - h9 / 2.0 + 5.0), Rotation::R90));
        }
    }
    for (origin, rotation) in tight {
        if s.try_at(id, origin, rotation, DECAP_CLEARANCE, Fit::Tight, tag) {
            return true;
        }
    }

    let parallel = match side {
        Side::Right => [
            (Point::new(pin.x + d, pin.y - h9 / 2.0), Rotation::R90),
            (Point::new(pin.x + d + 5.0, pin.y - h9 / 2.0), Rotation::R90),
        ],
        Side::Left => [
            (Point::new(pin.x - w9 - d, pin.y - h9 / 2.0), Rotation::R90),
            (Point::new(pin.x - w9 - d - 5.0, pin.y - h9 / 2.0), Rotation::R90),
        ],
        Side::Top => [
            (Point::new(pin.x - w0 / 2.0, pin.y - h0 - d), Rotation::R0),
            (Point::new(pin.x - w0 / 2.0, pin.y - h0 - d - 5.0), Rotation::R0),
        ],
        Side::Bottom => [
            (Point::new(pin.x - w0 / 2.0, pin.y + d), Rotation::R0),
            (Point::new(pin.x - w0 / 2.0, pin.y + d + 5.0), Rotation::R0),
        ],
    };
    let same = Fit::SameGroup(DECOUPLING_TAG);
    for (origin, rotation) in parallel {
        if s.try_at(id, origin, rotation, DECAP_CLEARANCE, same, tag) {
            return true;
        }
    }

    let mut r = d;
    while r <= DECAP_RING_MAX {
        let step = (360.0 / (2.0 * std::f64::consts::PI * r / 10.0)).min(30.0);
        let mut deg = 0.0;
        while deg < 360.0 {
            let rad = f64::to_radians(deg);
            let c = Point::new(pin.x + r * rad.cos(), pin.y + r * rad.sin());
            for rotation in [Rotation::R0, Rotation::R90] {
                let (w, h) = size(s, rotation);
                let origin = Point::new(c.x - w / 2.0, c.y - h / 2.0);
                if s.try_at(id, origin, rotation, DECAP_CLEARANCE, same, tag) {
                    return true;
                }
            }
            deg += step;
        }
        r += 3.0;
    }

    let max = s.config().placement.decap_max_distance;
    near_core_side(s, decap.target, side, &[pin], id, max, tag)
}

/// Detects and places the bypass capacitors of an already placed chip,
/// ranked on the drawing the session started from.
/// Returns how many were placed by one of the decoupling tiers.
pub fn place_chip_decaps(s: &mut PlacementSession<'_>, chip: InstanceId) -> usize {
    let decaps = find_decoupling_caps(s.drawn(), s.graph(), chip);
    let mut placed = 0;
    for d in &decaps {
        if !s.is_placed(d.cap) && place_decap(s, d) {
            placed += 1;
        }
    }
    placed
}

/// Places a crystal beside the core edge nearest its pins, with its load
/// capacitors on either side.
pub fn place_crystal_group(s: &mut PlacementSession<'_>, core: InstanceId, group: &CrystalGroup) -> bool {
    let crystal = group.crystal;
    if s.is_placed(crystal) {
        return true;
    }
    let core_inst = s.schematic().instance(core);
    let pins: Vec<Point> = group
        .core_pins
        .iter()
        .filter_map(|&p| core_inst.pin_position(p))
        .collect();
    let Some(center) = Point::centroid(pins.iter().copied()) else {
        return false;
    };
    let core_rect = core_inst.rect();
    let side = side_of_point(&core_rect, center);
    let (w, h) = s.schematic().instance(crystal).size_at(Rotation::R0);
    let origin = match side {
        Side::Bottom => Point::new(center.x - w / 2.0, core_rect.bottom() + CRYSTAL_MARGIN),
        Side::Right => Point::new(core_rect.right() + CRYSTAL_MARGIN, center.y - h / 2.0),
        Side::Top => Point::new(center.x - w / 2.0, core_rect.y - h - CRYSTAL_MARGIN),
        Side::Left => Point::new(core_rect.x - w - CRYSTAL_MARGIN, center.y - h / 2.0),
    };
    let avoid = s.clearance();
    let crystal_max = s.config().placement.crystal_max_distance;
    let tag = Some(CRYSTAL_TAG);
    let same = Fit::SameGroup(CRYSTAL_TAG);

    let placed = s.try_at(crystal, origin, Rotation::R0, avoid, same, tag)
        || near_position(s, crystal, center, crystal_max, RESET_CLEARANCE, CRYSTAL_TAG)
        || near_core_side(s, core, side, &pins, crystal, crystal_max, tag);
    if !placed {
        s.degraded(crystal, "crystal could not be placed next to the core");
        s.fallback(crystal, tag);
    }

    let xtal = s.schematic().instance(crystal).rect();
    for (idx, &cap) in group.capacitors.iter().enumerate() {
        if s.is_placed(cap) {
            continue;
        }
        let (cw, ch) = s.schematic().instance(cap).size_at(Rotation::R90);
        let origin = match side {
            Side::Top | Side::Bottom => {
                let x = if idx == 0 {
                    xtal.x - cw - CRYSTAL_CAP_SPACING
                } else {
                    xtal.right() + CRYSTAL_CAP_SPACING
                };
                Point::new(x, xtal.center().y)
            }
            Side::Left | Side::Right => {
                let y = if idx == 0 {
                    xtal.y - ch - CRYSTAL_CAP_SPACING
                } else {
                    xtal.bottom() + CRYSTAL_CAP_SPACING
                };
                Point::new(xtal.center().x - cw / 2.0, y)
            }
        };
        if !s.try_at(cap, origin, Rotation::R90, RESET_CLEARANCE, same, tag)
            && !near_position(s, cap, xtal.center(), crystal_max + 20.0, RESET_CLEARANCE, CRYSTAL_TAG)
        {
            s.degraded(cap, "crystal load capacitor placed away from the crystal");
            s.fallback(cap, tag);
        }
    }
    true
}

/// Places a reset network near its pin: as a pair when both parts exist,
/// otherwise (or when the pair does not fit) part by part. Every part that
/// lands is within the reset distance limit of the pin.
pub fn place_reset_circuit(s: &mut PlacementSession<'_>, core: InstanceId, circuit: &ResetCircuit) -> bool {
    let Some(pin) = s.schematic().pin_position(PinRef {
        instance: core,
        pin: circuit.pin,
    }) else {
        return false;
    };
    let max = s.config().placement.reset_max_distance;

    match (circuit.resistor, circuit.capacitor) {
        (Some(r), Some(c)) if !s.is_placed(r) && !s.is_placed(c) => {
            if place_pair(s, r, c, pin, max, RESET_SPACING, RESET_CLEARANCE, RESET_TAG) {
                return true;
            }
            s.degraded(r, "reset network placed part by part");
            let r_ok = near_position(s, r, pin, max, RESET_CLEARANCE, RESET_TAG);
            let c_ok = near_position(s, c, pin, max, RESET_CLEARANCE, RESET_TAG);
            for (id, ok) in [(r, r_ok), (c, c_ok)] {
                if !ok {
                    s.degraded(id, "reset part could not be placed near its pin");
                }
            }
            r_ok || c_ok
        }
        (r, c) => {
            let mut any = false;
            for id in r.into_iter().chain(c) {
                if s.is_placed(id) {
                    continue;
                }
                if near_position(s, id, pin, max, RESET_CLEARANCE, RESET_TAG) {
                    any = true;
                } else {
                    s.degraded(id, "reset part could not be placed near its pin");
                }
            }
            any
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Connectivity;
    use crate::model::test_support::{instance, schematic};
    use crate::patterns::{find_crystal_groups, find_decoupling_caps, find_reset_circuits};
    use autosch_config::EngineConfig;
    use autosch_diagnostics::DiagnosticSink;

    fn board() -> crate::model::Schematic {
        let mut u1 = instance("U1", "AT89C51", 40);
        u1.symbol.pins[8].name = "RST".into();
        schematic(
            vec![
                u1,
                instance("C1", "100n", 2),
                instance("Y1", "12MHz", 2),
                instance("C2", "22p", 2),
                instance("C3", "22p", 2),
                instance("R1", "10k", 2),
                instance("C4", "10u", 2),
            ],
            &[
                ("VCC", &[("U1", "40"), ("C1", "1"), ("R1", "2"), ("C4", "1")]),
                ("GND", &[("U1", "20"), ("C1", "2"), ("C2", "2"), ("C3", "2")]),
                ("X1", &[("U1", "19"), ("Y1", "1"), ("C2", "1")]),
                ("X2", &[("U1", "18"), ("Y1", "2"), ("C3", "1")]),
                ("RST", &[("U1", "9"), ("R1", "1"), ("C4", "2")]),
            ],
        )
    }

    #[test]
    fn critical_parts_stay_within_limits() {
        let mut sch = board();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        s.commit(u1, Point::new(720.0, 370.0), Rotation::R0, None);

        let decaps = find_decoupling_caps(s.schematic(), &g, u1);
        assert_eq!(decaps.len(), 1);
        assert!(place_decap(&mut s, &decaps[0]));
        let pin = s.schematic().instance(u1).pin_position(decaps[0].pin).unwrap();
        let cap = s.schematic().instance(decaps[0].cap).rect();
        assert!(cap.gap_to_point(pin) <= 25.0);

        let crystals = find_crystal_groups(s.schematic(), &g, u1);
        assert!(place_crystal_group(&mut s, u1, &crystals[0]));
        let core = s.schematic().instance(u1).rect();
        let xtal = s.schematic().instance(crystals[0].crystal).rect();
        assert!(core.gap_to_rect(&xtal) <= 30.0);
        for &c in &crystals[0].capacitors {
            assert!(s.is_placed(c));
        }

        let resets = find_reset_circuits(s.schematic(), &g, u1);
        assert!(place_reset_circuit(&mut s, u1, &resets[0]));
        let pin = s.schematic().instance(u1).pin_position(resets[0].pin).unwrap();
        for part in resets[0].parts() {
            let rect = s.schematic().instance(part).rect();
            assert!(rect.gap_to_point(pin) <= 35.0, "{rect:?} too far from {pin:?}");
        }
    }

    #[test]
    fn lone_reset_resistor_turns_to_fit_beside_the_chip() {
        let mut sch = board();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        s.commit(u1, Point::new(720.0, 370.0), Rotation::R0, None);

        let mut circuit = find_reset_circuits(s.schematic(), &g, u1).remove(0);
        circuit.capacitor = None;
        let r1 = circuit.resistor.unwrap();
        assert!(place_reset_circuit(&mut s, u1, &circuit));
        let pin = s.schematic().instance(u1).pin_position(circuit.pin).unwrap();
        let rect = s.schematic().instance(r1).rect();
        assert!(rect.gap_to_point(pin) <= 35.0);
        assert_eq!(s.schematic().instance(r1).rotation, Rotation::R90);
        assert_eq!(sink.count_of(crate::placement::DEGRADED_PERIPHERAL), 0);
    }
}
