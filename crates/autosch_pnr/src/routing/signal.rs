//! Signal nets.
//!
//! A net is reduced step by step. Pins on one side of one part are first
//! merged onto a short local trunk. Nodes that sit close together are then
//! joined by a bus bar and replaced by a single point on it. If three or more
//! points remain, a global trunk across the net is tried. Whatever is still
//! separate is connected pairwise, cheapest connection first, and groups that
//! cannot be reached get a net label each.

use super::astar;
use super::obstacles::Exclude;
use super::paths::{l_shape, shortcut, straight, z_shape};
use super::{NetOutcome, Node, Router};
use crate::geometry::{path_length, simplify_path, snap, Orientation, Point, Rect, Side};
use crate::ids::{InstanceId, NetId};
use autosch_config::LaneSpacingMode;
use autosch_diagnostics::{Category, Diagnostic, DiagnosticCode};
use std::collections::{BTreeMap, HashMap};

/// A signal net that could only be completed with labels.
pub const PARTIAL_NET: DiagnosticCode = DiagnosticCode::new(Category::Routing, 201);

/// Outward steps tried for a local trunk.
const LOCAL_TRUNK_STEPS: u32 = 10;
/// How far a cluster bus scan line runs past the outermost stubs.
const TRUNK_EXTRA: f64 = 12.0;
/// Aspect ratio above which a global trunk runs vertically.
const VERTICAL_TRUNK_RATIO: f64 = 1.2;

/// Routes one signal net.
pub(super) fn route_signal_net(r: &mut Router<'_>, net: NetId) -> NetOutcome {
    let nodes: Vec<Node> = r.pin_nodes(net).into_iter().map(|(_, n)| n).collect();
    match nodes.len() {
        0 => return NetOutcome::Skipped,
        1 => {
            r.label(net, &nodes[0]);
            return NetOutcome::Labelled;
        }
        _ => {}
    }
    let spacing = lane_spacing(r, &nodes);

    let nodes = local_trunks(r, net, nodes, spacing);
    let nodes = cluster_buses(r, net, nodes, spacing);
    if nodes.len() <= 1 {
        return NetOutcome::Wired;
    }
    if nodes.len() >= 3 && global_trunk(r, net, &nodes, spacing) {
        return NetOutcome::Wired;
    }
    connect_pairwise(r, net, nodes, spacing)
}

fn distinct_instances(nodes: &[Node]) -> Vec<InstanceId> {
    let mut out = Vec::new();
    for id in nodes.iter().filter_map(|n| n.instance) {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}

/// Lane pitch for a net: tight for nets whose parts sit close together.
fn lane_spacing(r: &Router<'_>, nodes: &[Node]) -> f64 {
    let routing = &r.config.routing;
    match routing.lane_spacing {
        LaneSpacingMode::Standard => routing.lane_spacing_standard,
        LaneSpacingMode::Compact => routing.lane_spacing_tight,
        LaneSpacingMode::Auto => {
            let positions: Vec<Point> = distinct_instances(nodes)
                .into_iter()
                .map(|id| r.schematic.instance(id).position)
                .collect();
            if positions.len() < 2 {
                return routing.lane_spacing_standard;
            }
            let (lo, hi) = bounds(&positions);
            if lo.distance(hi) < routing.net_locality_threshold {
                routing.lane_spacing_tight
            } else {
                routing.lane_spacing_standard
            }
        }
    }
}

/// Top-left and bottom-right corners of a point set.
fn bounds(points: &[Point]) -> (Point, Point) {
    points.iter().fold(
        (
            Point::new(f64::INFINITY, f64::INFINITY),
            Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        ),
        |(lo, hi), p| {
            (
                Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                Point::new(hi.x.max(p.x), hi.y.max(p.y)),
            )
        },
    )
}

fn axis_of(side: Side) -> Orientation {
    if side.is_horizontal_exit() {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    }
}

/// Draws a straight trunk and the stubs of `members` onto it, at
/// `trunk` on the axis perpendicular to `orientation`'s run. Returns the
/// attach points in member order.
fn draw_trunk(r: &mut Router<'_>, net: NetId, members: &[Node], orientation: Orientation, trunk: f64) -> Vec<Point> {
    let attach: Vec<Point> = members
        .iter()
        .map(|n| match orientation {
            Orientation::Vertical => Point::new(trunk, n.stub.y),
            Orientation::Horizontal => Point::new(n.stub.x, trunk),
        })
        .collect();
    let (lo, hi) = bounds(&attach);
    if lo != hi {
        r.emit(net, &[lo, hi]);
    }
    for (n, &a) in members.iter().zip(&attach) {
        r.emit(net, &[n.at, n.stub, a]);
        let inside = match orientation {
            Orientation::Vertical => a.y > lo.y && a.y < hi.y,
            Orientation::Horizontal => a.x > lo.x && a.x < hi.x,
        };
        if inside || n.is_trunk_point() {
            r.junction(a);
        }
    }
    attach
}

/// Merges pins leaving the same side of the same part onto a short trunk
/// just outside that side. Returns the untouched nodes followed by one trunk
/// point per merged group that still has to reach the rest of the net.
/// A group with no clear trunk line within reach is left unmerged.
fn local_trunks(r: &mut Router<'_>, net: NetId, nodes: Vec<Node>, spacing: f64) -> Vec<Node> {
    let mut buckets: BTreeMap<(InstanceId, Side), Vec<usize>> = BTreeMap::new();
    for (i, n) in nodes.iter().enumerate() {
        if let (Some(id), Some(side)) = (n.instance, n.side) {
            buckets.entry((id, side)).or_default().push(i);
        }
    }

    let grid = r.grid();
    let mut merged = vec![false; nodes.len()];
    let mut trunk_points = Vec::new();
    for ((id, side), members) in buckets {
        if members.len() < 2 {
            continue;
        }
        let mut group: Vec<Node> = members.iter().map(|&i| nodes[i]).collect();
        let orientation = if side.is_horizontal_exit() {
            group.sort_by(|a, b| a.at.y.total_cmp(&b.at.y));
            Orientation::Vertical
        } else {
            group.sort_by(|a, b| a.at.x.total_cmp(&b.at.x));
            Orientation::Horizontal
        };
        let (lo, hi) = bounds(&group.iter().map(|n| n.stub).collect::<Vec<_>>());
        let (dx, dy) = side.outward();
        let (base, dir) = match side {
            Side::Left => (lo.x, dx),
            Side::Right => (hi.x, dx),
            Side::Top => (lo.y, dy),
            Side::Bottom => (hi.y, dy),
        };
        let exclude = Exclude::net_and(net, [id]);
        let line = |c: f64| match orientation {
            Orientation::Vertical => (Point::new(c, snap(lo.y, grid)), Point::new(c, snap(hi.y, grid))),
            Orientation::Horizontal => (Point::new(snap(lo.x, grid), c), Point::new(snap(hi.x, grid), c)),
        };
        let coord = (1..LOCAL_TRUNK_STEPS)
            .map(|step| snap(base + dir * f64::from(step) * grid, grid))
            .find(|&c| {
                let (a, b) = line(c);
                !r.field.segment_blocked(a, b, &exclude)
            });
        let Some(coord) = coord else {
            log::debug!(
                "no clear local trunk beside {}; pins stay separate",
                r.schematic.instance(id).reference
            );
            continue;
        };
        let trunk = coord + r.lanes.offset(net, orientation, coord, spacing);

        let attach = draw_trunk(r, net, &group, orientation, trunk);
        for &i in &members {
            merged[i] = true;
        }

        let external: Vec<Point> = nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| !members.contains(i))
            .map(|(_, n)| n.at)
            .collect();
        if let Some(target) = Point::centroid(external) {
            let nearest = attach.iter().copied().fold(None, |best: Option<Point>, p| match best {
                Some(b) if b.distance(target) <= p.distance(target) => Some(b),
                _ => Some(p),
            });
            if let Some(p) = nearest {
                trunk_points.push(Node::on_trunk(p));
            }
        }
    }

    nodes
        .into_iter()
        .zip(merged)
        .filter(|(_, m)| !m)
        .map(|(n, _)| n)
        .chain(trunk_points)
        .collect()
}

/// Single-linkage clusters of nodes closer than `radius`, in discovery order.
fn proximity_clusters(nodes: &[Node], radius: f64) -> Vec<Vec<Node>> {
    let mut remaining: Vec<Node> = nodes.to_vec();
    let mut clusters = Vec::new();
    while !remaining.is_empty() {
        let mut cluster = vec![remaining.remove(0)];
        let mut cursor = 0;
        while cursor < cluster.len() {
            let member = cluster[cursor];
            let mut i = 0;
            while i < remaining.len() {
                if member.at.distance(remaining[i].at) < radius {
                    cluster.push(remaining.remove(i));
                } else {
                    i += 1;
                }
            }
            cursor += 1;
        }
        clusters.push(cluster);
    }
    clusters
}

/// Scans outward from `candidate` for a trunk line between `span.0` and
/// `span.1` that is clear, and that every stub can reach in a straight line.
fn scan_trunk_coord(
    r: &Router<'_>,
    net: NetId,
    orientation: Orientation,
    candidate: f64,
    span: (f64, f64),
    stubs: &[Node],
) -> Option<f64> {
    let grid = r.grid();
    let own = Exclude {
        net: Some(net),
        instances: Vec::new(),
    };
    (0..=r.config.routing.trunk_scan_steps)
        .flat_map(|k| {
            let off = f64::from(k) * grid;
            [off, -off]
        })
        .map(|off| snap(candidate + off, grid))
        .find(|&coord| {
            let (a, b) = match orientation {
                Orientation::Vertical => (Point::new(coord, span.0 - 1.0), Point::new(coord, span.1 + 1.0)),
                Orientation::Horizontal => (Point::new(span.0 - 1.0, coord), Point::new(span.1 + 1.0, coord)),
            };
            if r.field.segment_blocked(a, b, &own) {
                return false;
            }
            stubs.iter().all(|s| {
                let to = match orientation {
                    Orientation::Vertical => Point::new(coord, s.stub.y),
                    Orientation::Horizontal => Point::new(s.stub.x, coord),
                };
                !r.field
                    .segment_blocked(s.stub, to, &Exclude::net_and(net, s.instance))
            })
        })
}

/// Replaces every cluster of three or more nearby nodes by a bus bar and a
/// single point in its middle.
fn cluster_buses(r: &mut Router<'_>, net: NetId, nodes: Vec<Node>, spacing: f64) -> Vec<Node> {
    let grid = r.grid();
    let mut out = Vec::new();
    for cluster in proximity_clusters(&nodes, r.config.routing.local_cluster_radius) {
        if cluster.len() < 3 {
            out.extend(cluster);
            continue;
        }
        let stubs: Vec<Point> = cluster.iter().map(|n| n.stub).collect();
        let (lo, hi) = bounds(&stubs);
        let avg = Point::centroid(stubs.iter().copied()).unwrap_or(lo).snapped(grid);
        let orientation = if hi.x - lo.x > hi.y - lo.y {
            Orientation::Horizontal
        } else {
            Orientation::Vertical
        };
        let (candidate, span) = match orientation {
            Orientation::Horizontal => (avg.y, (lo.x - TRUNK_EXTRA, hi.x + TRUNK_EXTRA)),
            Orientation::Vertical => (avg.x, (lo.y - TRUNK_EXTRA, hi.y + TRUNK_EXTRA)),
        };
        let base = scan_trunk_coord(r, net, orientation, candidate, span, &[]).unwrap_or(candidate);
        let trunk = base + r.lanes.offset(net, orientation, base, spacing);
        draw_trunk(r, net, &cluster, orientation, trunk);
        let middle = match orientation {
            Orientation::Horizontal => Point::new(snap((lo.x + hi.x) / 2.0, grid), trunk),
            Orientation::Vertical => Point::new(trunk, snap((lo.y + hi.y) / 2.0, grid)),
        };
        log::trace!("{}: bus over {} nodes", r.net_name(net), cluster.len());
        out.push(Node::on_trunk(middle));
    }
    out
}

fn lower_median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    values.get(values.len().saturating_sub(1) / 2).copied().unwrap_or(0.0)
}

/// One straight trunk across the whole net, placed in the gap between the
/// parts on either side of the net's centre when there is one.
fn global_trunk(r: &mut Router<'_>, net: NetId, nodes: &[Node], spacing: f64) -> bool {
    let grid = r.grid();
    let mut bodies: Vec<Rect> = Vec::new();
    for id in distinct_instances(nodes) {
        bodies.push(r.schematic.instance(id).rect());
    }
    bodies.extend(
        nodes
            .iter()
            .filter(|n| n.is_trunk_point())
            .map(|n| Rect::new(n.at.x, n.at.y, 0.0, 0.0)),
    );

    let (lo, hi) = bounds(&bodies.iter().map(|b| Point::new(b.x, b.y)).collect::<Vec<_>>());
    let orientation = if hi.y - lo.y >= VERTICAL_TRUNK_RATIO * (hi.x - lo.x) {
        Orientation::Vertical
    } else {
        Orientation::Horizontal
    };

    let n = bodies.len() as f64;
    let (candidate, span) = match orientation {
        Orientation::Vertical => {
            let center = bodies.iter().map(|b| b.x).sum::<f64>() / n;
            let (near, far): (Vec<&Rect>, Vec<&Rect>) = bodies.iter().partition(|b| b.center().x < center);
            let candidate = if near.is_empty() || far.is_empty() {
                lower_median(nodes.iter().map(|n| n.stub.x).collect())
            } else {
                let edge = near.iter().map(|b| b.right()).fold(f64::NEG_INFINITY, f64::max);
                let other = far.iter().map(|b| b.x).fold(f64::INFINITY, f64::min);
                edge + (other - edge) / 2.0
            };
            let (slo, shi) = bounds(&nodes.iter().map(|n| n.stub).collect::<Vec<_>>());
            (candidate, (snap(slo.y, grid), snap(shi.y, grid)))
        }
        Orientation::Horizontal => {
            let center = bodies.iter().map(|b| b.y).sum::<f64>() / n;
            let (near, far): (Vec<&Rect>, Vec<&Rect>) = bodies.iter().partition(|b| b.center().y < center);
            let candidate = if near.is_empty() || far.is_empty() {
                lower_median(nodes.iter().map(|n| n.stub.y).collect())
            } else {
                let edge = near.iter().map(|b| b.bottom()).fold(f64::NEG_INFINITY, f64::max);
                let other = far.iter().map(|b| b.y).fold(f64::INFINITY, f64::min);
                edge + (other - edge) / 2.0
            };
            let (slo, shi) = bounds(&nodes.iter().map(|n| n.stub).collect::<Vec<_>>());
            (candidate, (snap(slo.x, grid), snap(shi.x, grid)))
        }
    };

    let Some(base) = scan_trunk_coord(r, net, orientation, candidate, span, nodes) else {
        log::trace!("{}: no clear global trunk", r.net_name(net));
        return false;
    };
    let shifted = base + r.lanes.offset(net, orientation, base, spacing);
    let trunk = if shifted != base && scan_trunk_coord(r, net, orientation, shifted, span, nodes) != Some(shifted) {
        base
    } else {
        shifted
    };
    draw_trunk(r, net, nodes, orientation, trunk);
    true
}

/// Cheapest obstacle-free path between two nodes: straight, one bend, two
/// bends, then a grid search. The path runs pin, stub, ..., stub, pin.
fn route_connection(r: &Router<'_>, net: NetId, a: &Node, b: &Node) -> Option<Vec<Point>> {
    let exclude = Exclude {
        net: Some(net),
        instances: Vec::new(),
    };
    let field = &r.field;
    let prefer = a.side.map_or(Orientation::Horizontal, axis_of);
    let core = straight(a.stub, b.stub, field, &exclude)
        .or_else(|| l_shape(a.stub, b.stub, prefer, field, &exclude))
        .or_else(|| z_shape(a.stub, b.stub, r.grid(), field, &exclude))
        .or_else(|| {
            astar::search(a.stub, b.stub, a.side.map(axis_of), field, &exclude, &r.search_params())
                .map(|p| shortcut(&p, field, &exclude))
        })?;
    let mut full = vec![a.at, a.stub];
    full.extend(core);
    full.extend([b.stub, b.at]);
    Some(simplify_path(&full))
}

/// Grows connected groups Prim-style: repeatedly draws the shortest
/// routable connection from the group to a node outside it. Groups that
/// cannot grow further are closed and each gets a label.
///
/// Wires of the net itself never block its own paths, so a connection
/// computed once stays valid for the whole net and is memoised.
fn connect_pairwise(r: &mut Router<'_>, net: NetId, nodes: Vec<Node>, spacing: f64) -> NetOutcome {
    let max_len = r.config.routing.max_wire_length;
    let own = Exclude {
        net: Some(net),
        instances: Vec::new(),
    };
    let mut memo: HashMap<(usize, usize), Option<Vec<Point>>> = HashMap::new();
    let mut remaining: Vec<usize> = (0..nodes.len()).collect();
    let mut groups: Vec<usize> = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining.remove(0);
        groups.push(seed);
        let mut connected = vec![seed];
        loop {
            let mut best: Option<(f64, usize, usize)> = None;
            for (pos, &target) in remaining.iter().enumerate() {
                for &source in &connected {
                    let path = memo
                        .entry((source, target))
                        .or_insert_with(|| route_connection(r, net, &nodes[source], &nodes[target]));
                    if let Some(path) = path {
                        let len = path_length(path);
                        if best.map_or(true, |b| len < b.0) {
                            best = Some((len, pos, source));
                        }
                    }
                }
            }
            let Some((len, pos, source)) = best else {
                break;
            };
            if len > max_len {
                break;
            }
            let target = remaining.remove(pos);
            let path = memo.remove(&(source, target)).flatten().unwrap_or_default();
            let shifted = r.lanes.offset_path(net, &path, spacing);
            let interior_blocked = shifted.len() >= 4 && r.field.path_blocked(&shifted[1..shifted.len() - 1], &own);
            r.emit(net, if interior_blocked { &path } else { &shifted });
            for end in [source, target] {
                if nodes[end].is_trunk_point() {
                    r.junction(nodes[end].at);
                }
            }
            connected.push(target);
        }
    }

    if groups.len() == 1 {
        return NetOutcome::Wired;
    }
    log::debug!("{}: {} unconnected groups, labelling", r.net_name(net), groups.len());
    r.sink.emit(
        Diagnostic::note(PARTIAL_NET, format!("net split into {} labelled groups", groups.len()))
            .on_net(r.net_name(net)),
    );
    for seed in groups {
        r.label(net, &nodes[seed]);
    }
    NetOutcome::Labelled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rotation;
    use crate::model::test_support::{instance, schematic};
    use crate::model::Schematic;
    use crate::patterns::LayoutPlan;
    use crate::routing::route;
    use autosch_config::EngineConfig;
    use autosch_diagnostics::DiagnosticSink;

    fn at(sch: &mut Schematic, reference: &str, x: f64, y: f64) {
        let id = sch.find_instance(reference).unwrap();
        let inst = sch.instance_mut(id);
        inst.position = Point::new(x, y);
        inst.rotation = Rotation::R0;
    }

    fn node(x: f64, y: f64) -> Node {
        Node::on_trunk(Point::new(x, y))
    }

    #[test]
    fn clusters_link_transitively() {
        let nodes = [node(0.0, 0.0), node(500.0, 0.0), node(100.0, 0.0), node(200.0, 0.0)];
        let clusters = proximity_clusters(&nodes, 120.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 3);
        assert_eq!(clusters[1][0].at, Point::new(500.0, 0.0));
    }

    #[test]
    fn same_side_pins_share_a_local_trunk() {
        // Pins 1 and 3 of U1 both leave on the left.
        let mut sch = schematic(
            vec![instance("U1", "MCU", 4), instance("R1", "1k", 2)],
            &[("EN", &[("U1", "1"), ("U1", "3"), ("R1", "2")])],
        );
        at(&mut sch, "U1", 400.0, 400.0);
        at(&mut sch, "R1", 200.0, 405.0);
        let sink = DiagnosticSink::new();
        let routing = route(&sch, &LayoutPlan::default(), &EngineConfig::default(), &sink);
        assert_eq!(routing.stats.wired_nets, 1);
        assert!(routing.labels.is_empty());
        assert!(!routing.junctions.is_empty());
        let vertical_trunk = routing
            .wires_of("EN")
            .any(|w| w.points.len() == 2 && w.points[0].x == w.points[1].x && w.points[0].x < 400.0);
        assert!(vertical_trunk);
    }

    #[test]
    fn blocked_local_trunk_leaves_pins_unmerged() {
        let mut sch = schematic(
            vec![instance("U1", "MCU", 4), instance("R1", "1k", 2), instance("U9", "wall", 0)],
            &[("EN", &[("U1", "1"), ("U1", "3"), ("R1", "2")])],
        );
        at(&mut sch, "U1", 400.0, 400.0);
        at(&mut sch, "R1", 420.0, 600.0);
        // Fills every trunk column left of the stubs.
        let wall = sch.find_instance("U9").unwrap();
        let w = sch.instance_mut(wall);
        w.symbol.width = 90.0;
        w.symbol.height = 200.0;
        w.position = Point::new(250.0, 300.0);
        let body = w.rect();

        let routing = route(&sch, &LayoutPlan::default(), &EngineConfig::default(), &DiagnosticSink::new());
        for wire in routing.wires_of("EN") {
            for seg in wire.points.windows(2) {
                assert!(!body.intersects_segment(seg[0], seg[1]), "{seg:?} crosses the wall");
            }
        }
        assert_eq!(routing.stats.skipped_nets, 0);
    }

    #[test]
    fn walled_off_pair_gets_two_labels() {
        let mut sch = schematic(
            vec![instance("R1", "1k", 2), instance("R2", "1k", 2), instance("U9", "wall", 0)],
            &[("SIG", &[("R1", "2"), ("R2", "1")])],
        );
        at(&mut sch, "R1", 100.0, 400.0);
        at(&mut sch, "R2", 1300.0, 400.0);
        let wall = sch.find_instance("U9").unwrap();
        let w = sch.instance_mut(wall);
        w.symbol.width = 40.0;
        w.symbol.height = 900.0;
        w.position = Point::new(700.0, 20.0);

        let mut config = EngineConfig::default();
        config.routing.astar_max_iterations = 50;
        let sink = DiagnosticSink::new();
        let routing = route(&sch, &LayoutPlan::default(), &config, &sink);
        assert!(routing.wires.is_empty());
        assert_eq!(routing.labels_of("SIG").count(), 2);
        assert_eq!(routing.stats.labelled_nets, 1);
        assert!(sink.diagnostics().iter().any(|d| d.code == PARTIAL_NET));
    }

    #[test]
    fn far_apart_pins_beyond_max_length_are_labelled() {
        let mut sch = schematic(
            vec![instance("R1", "1k", 2), instance("R2", "1k", 2)],
            &[("SIG", &[("R1", "2"), ("R2", "1")])],
        );
        at(&mut sch, "R1", 100.0, 100.0);
        at(&mut sch, "R2", 1300.0, 800.0);
        let routing = route(&sch, &LayoutPlan::default(), &EngineConfig::default(), &DiagnosticSink::new());
        assert!(routing.wires.is_empty());
        assert_eq!(routing.labels.len(), 2);
    }
}
