//! Repeated sub-circuits laid out as evenly spaced arrays along a core edge.

use super::session::{Fit, PlacementSession};
use crate::geometry::{Point, Rect, Rotation, Side};
use crate::ids::InstanceId;
use crate::model::side_of_point;
use crate::patterns::RepeatedGroup;

const ARRAY_MARGIN: f64 = 35.0;
const UNIT_SPACING: f64 = 10.0;
const MARGIN_STEPS: usize = 8;
const AXIS_STEPS: usize = 30;

struct Part {
    id: InstanceId,
    rotation: Rotation,
    w: f64,
    h: f64,
}

/// Places every unit of `group` as one array, or nothing at all.
///
/// Each unit is one core pin's circuit with its primary part nearest the
/// core. Units sit at a uniform pitch so the array reads as a regular row or
/// column. Returns `false` when the array does not fit; the parts are then
/// left for the IO-cluster and functional phases.
pub fn place_repeated_group(
    s: &mut PlacementSession<'_>,
    core: InstanceId,
    index: usize,
    group: &RepeatedGroup,
) -> bool {
    let grid = s.grid();
    let up = |v: f64| (v / grid).ceil() * grid;
    let core_inst = s.schematic().instance(core);
    let core_rect = core_inst.rect();

    let members: Vec<_> = group
        .members
        .iter()
        .filter(|m| m.parts.iter().all(|&p| !s.is_placed(p)))
        .collect();
    if members.len() < 2 {
        return false;
    }
    let pins: Vec<Point> = members
        .iter()
        .filter_map(|m| core_inst.pin_position(m.pin))
        .collect();
    let Some(center) = Point::centroid(pins.iter().copied()) else {
        return false;
    };
    let side = side_of_point(&core_rect, center);
    let horizontal_units = matches!(side, Side::Left | Side::Right);

    let units: Vec<Vec<Part>> = members
        .iter()
        .map(|m| {
            m.parts
                .iter()
                .map(|&id| {
                    let inst = s.schematic().instance(id);
                    let rotation = if inst.symbol.pins.len() == 2 && !horizontal_units {
                        Rotation::R90
                    } else {
                        Rotation::R0
                    };
                    let (w, h) = inst.size_at(rotation);
                    Part { id, rotation, w, h }
                })
                .collect()
        })
        .collect();

    // Extent of a unit across the array axis sets the pitch.
    let pitch = up(units
        .iter()
        .flat_map(|u| u.iter().map(|p| if horizontal_units { p.h } else { p.w }))
        .fold(0.0, f64::max)
        + UNIT_SPACING);
    let span = pitch * units.len() as f64 - UNIT_SPACING;
    let axis_center = if horizontal_units { center.y } else { center.x };

    for m in 0..MARGIN_STEPS {
        let margin = ARRAY_MARGIN + UNIT_SPACING * m as f64;
        for a in 0..=AXIS_STEPS {
            for dir in [1.0, -1.0] {
                if a == 0 && dir < 0.0 {
                    continue;
                }
                let start = axis_center - span / 2.0 + dir * a as f64 * grid;
                let start = crate::geometry::snap(start, grid);
                let Some(layout) = layout_units(s, &units, side, &core_rect, margin, start, pitch) else {
                    continue;
                };
                for (i, unit) in layout.iter().enumerate() {
                    let tag = format!("repeat{index}_{i}");
                    for &(id, origin, rotation) in unit {
                        s.commit(id, origin, rotation, Some(&tag));
                    }
                }
                log::debug!(
                    "repeated group {} ({}): {} units on the {:?} side",
                    index,
                    group.signature,
                    units.len(),
                    side
                );
                return true;
            }
        }
    }
    log::debug!("repeated group {index} ({}) did not fit as an array", group.signature);
    false
}

type UnitLayout = Vec<(InstanceId, Point, Rotation)>;

/// Computes snapped origins for all units and checks them; `None` if any
/// part is blocked.
fn layout_units(
    s: &PlacementSession<'_>,
    units: &[Vec<Part>],
    side: Side,
    core: &Rect,
    margin: f64,
    start: f64,
    pitch: f64,
) -> Option<Vec<UnitLayout>> {
    let grid = s.grid();
    let avoid = s.clearance();
    let mut out = Vec::with_capacity(units.len());
    let mut taken: Vec<Rect> = Vec::new();

    for (i, unit) in units.iter().enumerate() {
        let lane = start + pitch * i as f64;
        let cross = unit
            .iter()
            .map(|p| if matches!(side, Side::Left | Side::Right) { p.h } else { p.w })
            .fold(0.0, f64::max);
        let mut cursor = match side {
            Side::Left => core.x - margin,
            Side::Right => core.right() + margin,
            Side::Top => core.y - margin,
            Side::Bottom => core.bottom() + margin,
        };
        let mut placed = Vec::with_capacity(unit.len());
        for p in unit {
            let origin = match side {
                Side::Left => {
                    let o = Point::new(cursor - p.w, lane + (cross - p.h) / 2.0);
                    cursor = o.x - UNIT_SPACING;
                    o
                }
                Side::Right => {
                    let o = Point::new(cursor, lane + (cross - p.h) / 2.0);
                    cursor += p.w + UNIT_SPACING;
                    o
                }
                Side::Top => {
                    let o = Point::new(lane + (cross - p.w) / 2.0, cursor - p.h);
                    cursor = o.y - UNIT_SPACING;
                    o
                }
                Side::Bottom => {
                    let o = Point::new(lane + (cross - p.w) / 2.0, cursor);
                    cursor += p.h + UNIT_SPACING;
                    o
                }
            }
            .snapped(grid);
            let rect = s.rect_at(p.id, origin, p.rotation);
            if !s.is_free(&rect, avoid, Fit::Normal, None) || taken.iter().any(|t| t.overlaps(&rect)) {
                return None;
            }
            taken.push(rect);
            placed.push((p.id, origin, p.rotation));
        }
        out.push(placed);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Connectivity;
    use crate::model::test_support::{instance, schematic};
    use crate::patterns::find_repeated_groups;
    use autosch_config::EngineConfig;
    use autosch_diagnostics::DiagnosticSink;
    use std::collections::BTreeSet;

    #[test]
    fn buttons_form_an_even_column() {
        let mut instances = vec![instance("U1", "ATMEGA", 28)];
        for i in 1..=4 {
            instances.push(instance(&format!("SW{i}"), "button", 2));
            instances.push(instance(&format!("R{i}"), "10k", 2));
        }
        // Pins 1, 3, 5, 7 are all on the left edge of the generic symbol.
        let mut sch = schematic(
            instances,
            &[
                ("B1", &[("U1", "1"), ("SW1", "1"), ("R1", "1")]),
                ("B2", &[("U1", "3"), ("SW2", "1"), ("R2", "1")]),
                ("B3", &[("U1", "5"), ("SW3", "1"), ("R3", "1")]),
                ("B4", &[("U1", "7"), ("SW4", "1"), ("R4", "1")]),
                ("GND", &[("SW1", "2"), ("SW2", "2"), ("SW3", "2"), ("SW4", "2")]),
                ("VCC", &[("R1", "2"), ("R2", "2"), ("R3", "2"), ("R4", "2")]),
            ],
        );
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let groups = find_repeated_groups(&sch, &g, u1, &BTreeSet::new());
        assert_eq!(groups.len(), 1);

        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        s.commit(u1, Point::new(720.0, 400.0), Rotation::R0, None);
        assert!(place_repeated_group(&mut s, u1, 0, &groups[0]));

        let ys: Vec<f64> = (1..=4)
            .map(|i| {
                let id = s.schematic().find_instance(&format!("SW{i}")).unwrap();
                s.schematic().instance(id).position.y
            })
            .collect();
        let pitch = ys[1] - ys[0];
        assert!(pitch > 0.0);
        assert!(ys.windows(2).all(|w| w[1] - w[0] == pitch));
        let sw1 = s.schematic().find_instance("SW1").unwrap();
        let r1 = s.schematic().find_instance("R1").unwrap();
        // Switch nearest the core, resistor further out.
        assert!(s.schematic().instance(sw1).position.x > s.schematic().instance(r1).position.x);
        assert_eq!(s.schematic().instance(sw1).group.as_deref(), Some("repeat0_0"));
    }
}
