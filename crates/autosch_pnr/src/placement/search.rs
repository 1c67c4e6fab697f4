//! Positional search primitives shared by the placement phases.
//!
//! Every search is bounded and deterministic. A search that finds nothing
//! returns `false` and leaves the session untouched, so callers can move on
//! to the next tier.

use super::session::{Fit, PlacementSession};
use crate::geometry::{Point, Rotation, Side};
use crate::ids::InstanceId;
use std::f64::consts::PI;

/// Rotation that lays the long axis of a `w`×`h` symbol along `side`.
pub fn rotation_for_side(w: f64, h: f64, side: Side) -> Rotation {
    let along = match side {
        Side::Left | Side::Right => h >= w,
        Side::Top | Side::Bottom => w >= h,
    };
    if along {
        Rotation::R0
    } else {
        Rotation::R90
    }
}

/// Top-left corner that centres `id` at `center` with the given rotation.
fn centred(s: &PlacementSession<'_>, id: InstanceId, center: Point, rotation: Rotation) -> Point {
    let (w, h) = s.schematic().instance(id).size_at(rotation);
    Point::new(center.x - w / 2.0, center.y - h / 2.0)
}

/// Circular sweep around `target`: radius grid..=max in grid steps, sixteen
/// angles per ring, upright before turned.
pub fn near_position(
    s: &mut PlacementSession<'_>,
    id: InstanceId,
    target: Point,
    max_distance: f64,
    clearance: f64,
    tag: &str,
) -> bool {
    let grid = s.grid();
    let mut r = grid;
    while r <= max_distance {
        for k in 0..16 {
            let angle = k as f64 * PI / 8.0;
            let center = Point::new(target.x + r * angle.cos(), target.y + r * angle.sin());
            for rotation in [Rotation::R0, Rotation::R90] {
                let origin = centred(s, id, center, rotation);
                if s.try_at(id, origin, rotation, clearance, Fit::SameGroup(tag), Some(tag)) {
                    return true;
                }
            }
        }
        r += grid;
    }
    false
}

/// Scans along one side of `owner`, starting at the median of `anchors` and
/// alternating outward, for both perpendicular orientations.
///
/// When `max_distance` is below 100 the candidate centre must also lie
/// within that distance of the owner's centre.
pub fn near_core_side(
    s: &mut PlacementSession<'_>,
    owner: InstanceId,
    side: Side,
    anchors: &[Point],
    id: InstanceId,
    max_distance: f64,
    group: Option<&str>,
) -> bool {
    if anchors.is_empty() {
        return false;
    }
    let grid = s.grid();
    let margin = s.config().placement.core_margin;
    let steps = s.config().placement.periph_scan_steps;
    let avoid = s.clearance();
    let core = s.schematic().instance(owner).rect();
    let core_center = core.center();

    let mut axis: Vec<f64> = anchors
        .iter()
        .map(|p| match side {
            Side::Left | Side::Right => p.y,
            Side::Top | Side::Bottom => p.x,
        })
        .collect();
    axis.sort_by(f64::total_cmp);
    let axis_center = crate::geometry::snap(axis[(axis.len() - 1) / 2], grid);

    let symbol = &s.schematic().instance(id).symbol;
    let first = rotation_for_side(symbol.width, symbol.height, side);
    let second = if first == Rotation::R0 { Rotation::R90 } else { Rotation::R0 };

    for rotation in [first, second] {
        let (w, h) = s.schematic().instance(id).size_at(rotation);
        for step in 0..steps {
            for dir in [1.0, -1.0] {
                let delta = step as f64 * grid * dir;
                let origin = match side {
                    Side::Left => Point::new(core.x - margin - w, axis_center + delta - h / 2.0),
                    Side::Right => Point::new(core.right() + margin, axis_center + delta - h / 2.0),
                    Side::Top => Point::new(axis_center + delta - w / 2.0, core.y - margin - h),
                    Side::Bottom => Point::new(axis_center + delta - w / 2.0, core.bottom() + margin),
                }
                .snapped(grid);
                if max_distance < 100.0 {
                    let c = Point::new(origin.x + w / 2.0, origin.y + h / 2.0);
                    if c.distance(core_center) > max_distance {
                        continue;
                    }
                }
                if s.try_at(id, origin, rotation, avoid, Fit::Normal, group) {
                    return true;
                }
            }
        }
    }
    false
}

/// Ring search: first legal spot on rings of the given radii around
/// `center`, angles in degrees.
#[allow(clippy::too_many_arguments)]
pub fn ring_search(
    s: &mut PlacementSession<'_>,
    id: InstanceId,
    center: Point,
    radii: &[f64],
    angles: &[f64],
    rotations: &[Rotation],
    clearance: f64,
    fit: Fit<'_>,
    group: Option<&str>,
) -> bool {
    for &r in radii {
        for &deg in angles {
            let rad = deg.to_radians();
            let c = Point::new(center.x + r * rad.cos(), center.y + r * rad.sin());
            for &rotation in rotations {
                let origin = centred(s, id, c, rotation);
                if s.try_at(id, origin, rotation, clearance, fit, group) {
                    return true;
                }
            }
        }
    }
    false
}

/// Places two parts as a unit near `anchor`: side-by-side, stacked, then
/// diagonal, each swept over widening rings with five anchor offsets.
///
/// Both rects must be free, clear of each other and no further than
/// `max_distance` from `anchor`; nothing is committed otherwise.
#[allow(clippy::too_many_arguments)]
pub fn place_pair(
    s: &mut PlacementSession<'_>,
    first: InstanceId,
    second: InstanceId,
    anchor: Point,
    max_distance: f64,
    spacing: f64,
    clearance: f64,
    tag: &str,
) -> bool {
    let grid = s.grid();
    let up = |v: f64| (v / grid).ceil() * grid;
    let (aw, ah) = s.schematic().instance(first).size_at(Rotation::R0);
    let (bw, bh) = s.schematic().instance(second).size_at(Rotation::R0);

    // (group width, group height, offset of the second part)
    let arrangements = [
        (aw + spacing + bw, ah.max(bh), Point::new(up(aw + spacing), 0.0)),
        (aw.max(bw), ah + spacing + bh, Point::new(0.0, up(ah + spacing))),
        (
            aw + spacing / 2.0 + bw / 2.0,
            ah + spacing / 2.0 + bh / 2.0,
            Point::new(up(aw / 2.0 + spacing / 2.0), up(ah / 2.0 + spacing / 2.0)),
        ),
    ];
    // (min radius, max radius, radius step, angle step)
    let strategies = [
        (5.0, 30.0_f64.min(max_distance), 3.0, 30.0),
        (30.0, 60.0_f64.min(max_distance), 5.0, 20.0),
        (60.0, max_distance, 8.0, 15.0),
    ];

    for (gw, gh, offset) in arrangements {
        let anchors = [
            Point::new(gw / 2.0, gh / 2.0),
            Point::new(0.0, 0.0),
            Point::new(gw, 0.0),
            Point::new(0.0, gh),
            Point::new(gw, gh),
        ];
        for (min_r, max_r, step_r, step_angle) in strategies {
            let mut r = min_r;
            while r <= max_r {
                let mut deg = 0.0;
                while deg < 360.0 {
                    let rad = f64::to_radians(deg);
                    for a in &anchors {
                        let origin = Point::new(
                            anchor.x + r * rad.cos() - a.x,
                            anchor.y + r * rad.sin() - a.y,
                        )
                        .snapped(grid);
                        let second_origin = origin.offset(offset.x, offset.y);
                        let ra = s.rect_at(first, origin, Rotation::R0);
                        let rb = s.rect_at(second, second_origin, Rotation::R0);
                        if ra.overlaps(&rb.inflate(clearance).shrink(1.0))
                            || ra.gap_to_point(anchor) > max_distance
                            || rb.gap_to_point(anchor) > max_distance
                        {
                            continue;
                        }
                        if s.is_free(&ra, clearance, Fit::SameGroup(tag), None)
                            && s.is_free(&rb, clearance, Fit::SameGroup(tag), None)
                        {
                            s.commit(first, origin, Rotation::R0, Some(tag));
                            s.commit(second, second_origin, Rotation::R0, Some(tag));
                            return true;
                        }
                    }
                    deg += step_angle;
                }
                r += step_r;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Connectivity;
    use crate::model::test_support::{instance, schematic};
    use crate::model::Schematic;
    use autosch_config::EngineConfig;
    use autosch_diagnostics::DiagnosticSink;

    fn parts() -> Schematic {
        schematic(
            vec![instance("U1", "MCU", 40), instance("R1", "10k", 2), instance("C1", "10u", 2)],
            &[],
        )
    }

    #[test]
    fn rotation_follows_side() {
        assert_eq!(rotation_for_side(60.0, 20.0, Side::Left), Rotation::R90);
        assert_eq!(rotation_for_side(60.0, 20.0, Side::Top), Rotation::R0);
        assert_eq!(rotation_for_side(20.0, 60.0, Side::Right), Rotation::R0);
    }

    #[test]
    fn near_position_stays_close() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let r1 = sch.find_instance("R1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        let target = Point::new(400.0, 400.0);
        assert!(near_position(&mut s, r1, target, 30.0, 2.0, "reset"));
        let c = s.schematic().instance(r1).center();
        assert!(c.distance(target) <= 30.0 + 10.0);
    }

    #[test]
    fn core_side_scan_lands_on_the_side() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let r1 = sch.find_instance("R1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        s.commit(u1, Point::new(700.0, 400.0), Rotation::R0, None);
        let anchor = s.schematic().instance(u1).pin_position(0).unwrap();
        assert!(near_core_side(&mut s, u1, Side::Left, &[anchor], r1, 100.0, None));
        let rect = s.schematic().instance(r1).rect();
        assert!(rect.right() <= 700.0 - 20.0);
        assert_eq!(s.schematic().instance(r1).rotation, Rotation::R90);
    }

    #[test]
    fn ring_search_takes_the_first_free_angle() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let r1 = sch.find_instance("R1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        let center = Point::new(700.0, 400.0);
        // Block the spot to the right of the centre.
        s.commit(u1, Point::new(780.0, 300.0), Rotation::R0, None);

        let radii = [100.0, 200.0];
        let found = ring_search(
            &mut s,
            r1,
            center,
            &radii,
            &[0.0, 180.0],
            &[Rotation::R0],
            4.0,
            Fit::Normal,
            Some("cluster0"),
        );
        assert!(found);
        let c = s.schematic().instance(r1).center();
        assert_eq!(c, Point::new(600.0, 400.0));
        assert_eq!(s.schematic().instance(r1).group.as_deref(), Some("cluster0"));
    }

    #[test]
    fn ring_search_reports_no_spot() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let r1 = sch.find_instance("R1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        let off = ring_search(
            &mut s,
            r1,
            Point::new(-500.0, -500.0),
            &[10.0],
            &[0.0, 90.0],
            &[Rotation::R0, Rotation::R90],
            4.0,
            Fit::Normal,
            None,
        );
        assert!(!off);
        assert!(!s.is_placed(r1));
    }

    #[test]
    fn pair_is_committed_together() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let r1 = sch.find_instance("R1").unwrap();
        let c1 = sch.find_instance("C1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        let anchor = Point::new(500.0, 500.0);
        assert!(place_pair(&mut s, r1, c1, anchor, 35.0, 3.0, 2.0, "reset"));
        let a = s.schematic().instance(r1).rect();
        let b = s.schematic().instance(c1).rect();
        assert!(!a.overlaps(&b));
        assert!(a.gap_to_point(anchor) <= 35.0 && b.gap_to_point(anchor) <= 35.0);
        assert_eq!(s.schematic().instance(c1).group.as_deref(), Some("reset"));
    }

    #[test]
    fn pair_on_a_chip_edge_keeps_both_parts_in_reach() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let r1 = sch.find_instance("R1").unwrap();
        let c1 = sch.find_instance("C1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        s.commit(u1, Point::new(720.0, 370.0), Rotation::R0, None);
        // Pin 9 sits on the left edge; side by side cannot reach it.
        let pin = s.schematic().instance(u1).pin_position(8).unwrap();
        assert_eq!(pin.x, 720.0);
        assert!(place_pair(&mut s, r1, c1, pin, 35.0, 3.0, 2.0, "reset"));
        for id in [r1, c1] {
            let rect = s.schematic().instance(id).rect();
            assert!(rect.gap_to_point(pin) <= 35.0, "{rect:?} too far from {pin:?}");
        }
    }

    #[test]
    fn pair_that_cannot_reach_commits_nothing() {
        let mut sch = parts();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let r1 = sch.find_instance("R1").unwrap();
        let c1 = sch.find_instance("C1").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        // Anchor in the canvas corner margin: every candidate is off canvas or out of reach.
        assert!(!place_pair(&mut s, r1, c1, Point::new(0.0, 0.0), 10.0, 3.0, 2.0, "reset"));
        assert_eq!(s.placed_count(), 0);
    }
}
