//! Connectors go last, onto the canvas edge that matches their role.

use super::session::{Fit, PlacementSession};
use crate::classify::{ComponentKind, ConnectorClass};
use crate::geometry::{Point, Rotation, Side};
use crate::ids::InstanceId;
use std::collections::BTreeMap;

/// Group tag shared by all edge-placed connectors.
pub const CONNECTOR_TAG: &str = "connector";

/// Preferred canvas edge for a connector class.
pub fn edge_for(class: ConnectorClass) -> Side {
    match class {
        ConnectorClass::Power | ConnectorClass::Input => Side::Left,
        ConnectorClass::Output => Side::Right,
        ConnectorClass::Comm | ConnectorClass::Io => Side::Bottom,
    }
}

fn alternatives(edge: Side) -> [Side; 2] {
    match edge {
        Side::Left => [Side::Top, Side::Bottom],
        Side::Right => [Side::Bottom, Side::Top],
        Side::Top => [Side::Left, Side::Right],
        Side::Bottom => [Side::Right, Side::Left],
    }
}

/// Places every unplaced connector along its edge, in class order and then
/// by reference, keeping `connector_spacing` between neighbours.
pub fn place_connectors(s: &mut PlacementSession<'_>) -> usize {
    let order = [
        ConnectorClass::Power,
        ConnectorClass::Input,
        ConnectorClass::Output,
        ConnectorClass::Comm,
        ConnectorClass::Io,
    ];
    let mut connectors: Vec<(usize, String, InstanceId)> = s
        .schematic()
        .instances
        .iter()
        .filter(|i| i.kind == ComponentKind::Connector && !s.is_placed(i.id))
        .map(|i| {
            let class = i.connector.unwrap_or(ConnectorClass::Io);
            let rank = order.iter().position(|c| *c == class).unwrap_or(order.len());
            (rank, i.reference.clone(), i.id)
        })
        .collect();
    connectors.sort();

    let mut used: BTreeMap<Side, Vec<(f64, f64)>> = BTreeMap::new();
    let count = connectors.len();
    for (_, reference, id) in connectors {
        let class = s.schematic().instance(id).connector.unwrap_or(ConnectorClass::Io);
        let edge = edge_for(class);
        let mut done = false;
        for side in std::iter::once(edge).chain(alternatives(edge)) {
            let spans = used.entry(side).or_default();
            if let Some(span) = spot_on_edge(s, id, side, spans) {
                spans.push(span);
                log::debug!("{reference}: {class:?} connector on the {side:?} edge");
                done = true;
                break;
            }
        }
        if !done {
            s.fallback(id, Some(CONNECTOR_TAG));
        }
    }
    count
}

/// Scans along `side` for the first position clear of both the placed parts
/// and the spans already used on that edge. Commits and returns the span.
fn spot_on_edge(
    s: &mut PlacementSession<'_>,
    id: InstanceId,
    side: Side,
    used: &[(f64, f64)],
) -> Option<(f64, f64)> {
    let canvas = s.config().canvas.clone();
    let spacing = s.config().placement.connector_spacing;
    let avoid = s.clearance();
    let grid = canvas.grid;
    let (w, h) = s.schematic().instance(id).size_at(Rotation::R0);
    let first = (canvas.edge_margin / grid).ceil() * grid;
    let last = |extent: f64, len: f64| ((extent - canvas.edge_margin - len) / grid).floor() * grid;

    let (fixed, along_len, along_max) = match side {
        Side::Left => (first, h, last(canvas.height, h)),
        Side::Right => (last(canvas.width, w), h, last(canvas.height, h)),
        Side::Top => (first, w, last(canvas.width, w)),
        Side::Bottom => (last(canvas.height, h), w, last(canvas.width, w)),
    };

    let mut along = first;
    while along <= along_max {
        let span = (along, along + along_len);
        let clear = used
            .iter()
            .all(|&(a, b)| span.1 + spacing <= a || span.0 >= b + spacing);
        if clear {
            let origin = if side.is_horizontal_exit() {
                Point::new(fixed, along)
            } else {
                Point::new(along, fixed)
            };
            let rect = s.rect_at(id, origin, Rotation::R0);
            if s.is_free(&rect, avoid, Fit::Normal, None) {
                s.commit(id, origin, Rotation::R0, Some(CONNECTOR_TAG));
                return Some(span);
            }
        }
        along += grid;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Connectivity;
    use crate::model::test_support::{instance, schematic};
    use autosch_config::EngineConfig;
    use autosch_diagnostics::DiagnosticSink;

    #[test]
    fn connectors_land_on_their_edges() {
        let mut sch = schematic(
            vec![
                instance("J1", "DC jack", 2),
                instance("J2", "motor", 4),
                instance("J3", "uart", 4),
                instance("J4", "power", 2),
            ],
            &[],
        );
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        assert_eq!(place_connectors(&mut s), 4);

        let pos = |r: &str| {
            let id = s.schematic().find_instance(r).unwrap();
            s.schematic().instance(id).rect()
        };
        let (j1, j2, j3, j4) = (pos("J1"), pos("J2"), pos("J3"), pos("J4"));
        assert_eq!(j1.x, 20.0);
        assert_eq!(j4.x, 20.0);
        assert!(j4.y >= j1.bottom() + 28.0);
        assert!(j2.right() >= 1500.0 - 30.0);
        assert!(j3.bottom() >= 950.0 - 30.0);
        assert_eq!(sink.warning_count(), 0);
    }
}
