//! IO-cluster placement: the passives hanging off one core pin, laid out by
//! their series/parallel structure.

use super::search::near_position;
use super::session::{Fit, PlacementSession};
use crate::geometry::{Point, Rotation, Side};
use crate::ids::InstanceId;
use crate::patterns::{analyze_topology, ClusterLayout, IoCluster, Topology};

const PIN_DISTANCE: f64 = 15.0;
const PARALLEL_SPACING: f64 = 5.0;
const PARALLEL_STAGGER: f64 = 40.0;
const SERIES_SPACING: f64 = 8.0;
const SERIES_STAGGER: f64 = 30.0;
const TRUNK_STEP: f64 = 35.0;
const LEFTOVER_RADIUS: f64 = 80.0;

/// Places one IO cluster next to its core pin.
///
/// Members that no layout tier could place get a wider sweep around the pin
/// and finally the session fallback, so every member ends up placed.
pub fn place_io_cluster(s: &mut PlacementSession<'_>, core: InstanceId, cluster: &IoCluster) -> ClusterLayout {
    let core_inst = s.schematic().instance(core);
    let Some(pin) = core_inst.pin_position(cluster.pin) else {
        return ClusterLayout::Default;
    };
    let side = core_inst.pin_side(cluster.pin);
    let tag = format!("io{}", cluster.pin);
    let topology = analyze_topology(s.schematic(), s.graph(), &cluster.members);
    let layout = topology.layout(cluster.members.len());
    log::debug!(
        "io cluster {} ({} parts): {:?}",
        tag,
        cluster.members.len(),
        layout
    );

    match layout {
        ClusterLayout::Parallel => {
            place_parallel(s, &topology, pin, side, &tag);
            place_near_all(s, &topology.standalone, pin, 40.0, &tag);
        }
        ClusterLayout::Series => place_series(s, &topology, pin, side, &tag, true),
        ClusterLayout::Mixed => {
            place_parallel(s, &topology, pin, side, &tag);
            place_series(s, &topology, pin, side, &tag, false);
            place_near_all(s, &topology.standalone, pin, 50.0, &tag);
        }
        ClusterLayout::Single => place_near_all(s, &cluster.members, pin, 40.0, &tag),
        ClusterLayout::Default => place_trunk_and_branches(s, cluster, pin, side, &tag),
    }

    let avoid = s.clearance();
    for &m in &cluster.members {
        if !s.is_placed(m) && !near_position(s, m, pin, LEFTOVER_RADIUS, avoid, &tag) {
            s.fallback(m, Some(&tag));
        }
    }
    layout
}

fn place_near_all(s: &mut PlacementSession<'_>, parts: &[InstanceId], target: Point, radius: f64, tag: &str) {
    let avoid = s.clearance();
    for &p in parts {
        if !s.is_placed(p) {
            near_position(s, p, target, radius, avoid, tag);
        }
    }
}

/// Parallel parts stacked side by side, one stack per group, staggered
/// outward from the pin.
fn place_parallel(s: &mut PlacementSession<'_>, topology: &Topology, pin: Point, side: Side, tag: &str) {
    let avoid = s.clearance();
    let base = match side {
        Side::Left => Point::new(pin.x - PIN_DISTANCE - 30.0, pin.y),
        Side::Right => Point::new(pin.x + PIN_DISTANCE, pin.y),
        Side::Top => Point::new(pin.x, pin.y - PIN_DISTANCE - 30.0),
        Side::Bottom => Point::new(pin.x, pin.y + PIN_DISTANCE),
    };
    let vertical = matches!(side, Side::Left | Side::Right);
    let rotation = if vertical { Rotation::R90 } else { Rotation::R0 };

    for (g, group) in topology.parallel_groups.iter().enumerate() {
        let stagger = g as f64 * PARALLEL_STAGGER;
        let mut offset = 0.0;
        for &part in group {
            if s.is_placed(part) {
                continue;
            }
            let (w, h) = s.schematic().instance(part).size_at(rotation);
            let origin = if vertical {
                let o = Point::new(base.x + stagger, base.y + offset - h / 2.0);
                offset += h + PARALLEL_SPACING;
                o
            } else {
                let o = Point::new(base.x + offset - w / 2.0, base.y + stagger);
                offset += w + PARALLEL_SPACING;
                o
            };
            if !s.try_at(part, origin, rotation, avoid, Fit::Normal, Some(tag)) {
                near_position(s, part, pin, 50.0, avoid, tag);
            }
        }
    }
}

/// Series chains running outward from the pin, then loose series pairs.
fn place_series(
    s: &mut PlacementSession<'_>,
    topology: &Topology,
    pin: Point,
    side: Side,
    tag: &str,
    with_pairs: bool,
) {
    let avoid = s.clearance();
    let rotation = match side {
        Side::Left | Side::Right => Rotation::R0,
        Side::Top | Side::Bottom => Rotation::R90,
    };
    for (c, chain) in topology.serial_chains.iter().enumerate() {
        let stagger = c as f64 * SERIES_STAGGER;
        let mut cursor = match side {
            Side::Left => Point::new(pin.x - PIN_DISTANCE, pin.y + stagger),
            Side::Right => Point::new(pin.x + PIN_DISTANCE, pin.y + stagger),
            Side::Top => Point::new(pin.x + stagger, pin.y - PIN_DISTANCE),
            Side::Bottom => Point::new(pin.x + stagger, pin.y + PIN_DISTANCE),
        };
        for &part in chain {
            if s.is_placed(part) {
                continue;
            }
            let (w, h) = s.schematic().instance(part).size_at(rotation);
            let origin = match side {
                Side::Left => {
                    let o = Point::new(cursor.x - w, cursor.y - h / 2.0);
                    cursor.x -= w + SERIES_SPACING;
                    o
                }
                Side::Right => {
                    let o = Point::new(cursor.x, cursor.y - h / 2.0);
                    cursor.x += w + SERIES_SPACING;
                    o
                }
                Side::Top => {
                    let o = Point::new(cursor.x - w / 2.0, cursor.y - h);
                    cursor.y -= h + SERIES_SPACING;
                    o
                }
                Side::Bottom => {
                    let o = Point::new(cursor.x - w / 2.0, cursor.y);
                    cursor.y += h + SERIES_SPACING;
                    o
                }
            };
            if !s.try_at(part, origin, rotation, avoid, Fit::Normal, Some(tag)) {
                near_position(s, part, cursor, 30.0, avoid, tag);
            }
        }
    }

    if with_pairs {
        for &(a, b, _) in &topology.serial_pairs {
            if !s.is_placed(a) {
                near_position(s, a, pin, 40.0, avoid, tag);
            }
            if !s.is_placed(b) && s.is_placed(a) {
                let anchor = s.schematic().instance(a).center();
                near_position(s, b, anchor, 20.0, avoid, tag);
            }
        }
    }
}

/// Trunk parts step outward from the pin; branches sit near the trunk part
/// they connect to.
fn place_trunk_and_branches(s: &mut PlacementSession<'_>, cluster: &IoCluster, pin: Point, side: Side, tag: &str) {
    let (dx, dy) = side.outward();
    let mut last = pin;
    let mut anchors: Vec<(InstanceId, Point)> = Vec::new();
    for &part in &cluster.trunk {
        if s.is_placed(part) {
            continue;
        }
        let target = Point::new(last.x + dx * TRUNK_STEP, last.y + dy * TRUNK_STEP);
        if near_position(s, part, target, 25.0, 2.0, tag) {
            last = s.schematic().instance(part).center();
            anchors.push((part, last));
        }
    }
    for &part in &cluster.branches {
        if s.is_placed(part) {
            continue;
        }
        let graph = s.graph();
        let parent = graph
            .nets_of(part)
            .iter()
            .flat_map(|&n| s.schematic().net(n).instances())
            .find_map(|other| anchors.iter().find(|(a, _)| *a == other).map(|(_, p)| *p))
            .unwrap_or(pin);
        near_position(s, part, parent, 40.0, 2.0, tag);
    }
}
