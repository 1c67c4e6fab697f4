//! Functional clusters: whatever the structured phases left behind, grouped
//! by connectivity and packed around a seed near what they connect to.

use super::peripherals::place_chip_decaps;
use super::search::ring_search;
use super::session::{Fit, PlacementSession};
use crate::classify::ComponentKind;
use crate::geometry::{Point, Rotation};
use crate::ids::InstanceId;
use std::collections::VecDeque;
use std::f64::consts::PI;

const MEMBER_ANGLES: usize = 8;
const MEMBER_ANGLE_SHIFT: f64 = 0.4;

/// One connected group of unplaced, non-connector parts.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionalCluster {
    /// Members in discovery order.
    pub members: Vec<InstanceId>,
    /// Where the cluster wants to sit: the mean centre of its placed
    /// neighbours, or the canvas centre.
    pub attraction: Point,
    /// Number of member nets that also touch the core.
    pub core_links: usize,
}

/// Connected components of the unplaced parts, excluding connectors, sorted
/// by how strongly they connect to `core`.
pub fn functional_clusters(s: &PlacementSession<'_>, core: Option<InstanceId>) -> Vec<FunctionalCluster> {
    let sch = s.schematic();
    let graph = s.graph();
    let eligible =
        |id: InstanceId| !s.is_placed(id) && sch.instance(id).kind != ComponentKind::Connector;

    let mut seen = vec![false; sch.instance_count()];
    let mut clusters = Vec::new();
    for inst in &sch.instances {
        if seen[inst.id.index()] || !eligible(inst.id) {
            continue;
        }
        seen[inst.id.index()] = true;
        let mut members = vec![inst.id];
        let mut queue = VecDeque::from([inst.id]);
        while let Some(u) = queue.pop_front() {
            for v in graph.neighbors(u) {
                if !seen[v.index()] && eligible(v) {
                    seen[v.index()] = true;
                    members.push(v);
                    queue.push_back(v);
                }
            }
        }

        let mut sum = Point::default();
        let mut count = 0usize;
        let mut core_links = 0usize;
        for net in &sch.nets {
            let ids = net.instances();
            if !ids.iter().any(|id| members.contains(id)) {
                continue;
            }
            for &ext in ids.iter().filter(|id| !members.contains(id) && s.is_placed(**id)) {
                let c = sch.instance(ext).center();
                sum = sum.offset(c.x, c.y);
                count += 1;
            }
            if let Some(core) = core {
                if ids.contains(&core) {
                    core_links += ids.iter().filter(|id| members.contains(id)).count();
                }
            }
        }
        let attraction = if count > 0 {
            Point::new(sum.x / count as f64, sum.y / count as f64)
        } else {
            s.canvas_center()
        };
        clusters.push(FunctionalCluster {
            members,
            attraction,
            core_links,
        });
    }
    clusters.sort_by(|a, b| b.core_links.cmp(&a.core_links));
    clusters
}

/// Seed preference: chips, then unclassified parts; ties go to the better
/// connected part. Connectors never reach a cluster.
fn seed_of(s: &PlacementSession<'_>, members: &[InstanceId]) -> Option<InstanceId> {
    let priority = |id: InstanceId| match s.schematic().instance(id).kind {
        k if k.is_chip() => 2,
        ComponentKind::Misc => 1,
        _ => 0,
    };
    let mut best: Option<(InstanceId, (u8, u32))> = None;
    for &m in members {
        let score = (priority(m), s.graph().degree(m));
        if best.map_or(true, |(_, b)| score > b) {
            best = Some((m, score));
        }
    }
    best.map(|(id, _)| id)
}

/// Seed angles in degrees: left and right first, then above and below, then
/// the full circle.
fn seed_angles() -> Vec<f64> {
    let mut out: Vec<i32> = Vec::new();
    for i in (0..=30).step_by(10) {
        out.extend([180 + i, 180 - i, i, -i]);
    }
    for i in (0..=30).step_by(10) {
        out.extend([90 + i, 90 - i, 270 + i, 270 - i]);
    }
    out.extend((0..360).step_by(20));
    let mut unique: Vec<i32> = Vec::new();
    for a in out {
        let a = a.rem_euclid(360);
        if !unique.contains(&a) {
            unique.push(a);
        }
    }
    unique.into_iter().map(f64::from).collect()
}

/// Places every functional cluster: the seed on rings around the attraction
/// point, the other members packed around the seed.
///
/// Secondary chips get their bypass capacitors as soon as they land.
pub fn place_functional_clusters(s: &mut PlacementSession<'_>, core: Option<InstanceId>) -> usize {
    let clusters = functional_clusters(s, core);
    let angles = seed_angles();
    let cfg = s.config().placement.clone();
    let radii: Vec<f64> = (0..cfg.cluster_ring_count)
        .map(|ring| cfg.cluster_ring_base + ring as f64 * cfg.cluster_ring_step)
        .collect();
    let avoid = s.clearance();

    for (index, cluster) in clusters.iter().enumerate() {
        let members: Vec<InstanceId> = cluster.members.iter().copied().filter(|&m| !s.is_placed(m)).collect();
        let Some(seed) = seed_of(s, &members) else {
            continue;
        };
        let tag = format!("cluster{index}");

        let placed = ring_search(
            s,
            seed,
            cluster.attraction,
            &radii,
            &angles,
            &[Rotation::R0],
            avoid,
            Fit::Normal,
            Some(&tag),
        );
        if !placed {
            s.fallback(seed, Some(&tag));
        }
        if s.schematic().instance(seed).is_chip() {
            place_chip_decaps(s, seed);
        }

        let seed_inst = s.schematic().instance(seed);
        let seed_center = seed_inst.center();
        let (sw, sh) = seed_inst.size();
        let mut radius = sw.max(sh) / 2.0 + cfg.local_spacing;
        let mut k = 0usize;
        for &m in members.iter().filter(|&&m| m != seed) {
            if s.is_placed(m) {
                continue;
            }
            let (w, h) = s.schematic().instance(m).size_at(Rotation::R0);
            let mut ok = false;
            for _ in 0..cfg.local_ring_tries {
                let angle = 2.0 * PI * (k % MEMBER_ANGLES) as f64 / MEMBER_ANGLES as f64
                    + (k / MEMBER_ANGLES) as f64 * MEMBER_ANGLE_SHIFT;
                let origin = Point::new(
                    seed_center.x + radius * angle.cos() - w / 2.0,
                    seed_center.y + radius * angle.sin() - h / 2.0,
                );
                if s.try_at(m, origin, Rotation::R0, avoid, Fit::Normal, Some(&tag)) {
                    ok = true;
                    break;
                }
                k += 1;
                if k % MEMBER_ANGLES == 0 {
                    radius += cfg.local_spacing;
                }
            }
            if !ok {
                s.fallback(m, Some(&tag));
            }
            if s.schematic().instance(m).is_chip() {
                place_chip_decaps(s, m);
            }
        }
        log::debug!(
            "functional cluster {index}: {} parts around {}",
            members.len(),
            s.schematic().instance(seed).reference
        );
    }
    clusters.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Connectivity;
    use crate::model::test_support::{instance, schematic};
    use autosch_config::EngineConfig;
    use autosch_diagnostics::DiagnosticSink;

    #[test]
    fn angles_prefer_the_sides() {
        let a = seed_angles();
        assert_eq!(&a[..4], &[180.0, 0.0, 190.0, 170.0]);
        assert!(a.contains(&330.0));
        let mut sorted = a.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.dedup();
        assert_eq!(sorted.len(), a.len());
    }

    #[test]
    fn seed_prefers_chips_then_unclassified_parts() {
        let mut sch = schematic(
            vec![
                instance("R1", "1k", 2),
                instance("R2", "1k", 2),
                instance("R3", "1k", 2),
                instance("Q1", "", 3),
                instance("U2", "LM358", 8),
            ],
            &[
                ("A", &[("R1", "1"), ("R2", "1"), ("R3", "1")]),
                ("B", &[("R1", "2"), ("Q1", "1")]),
                ("C", &[("Q1", "2"), ("U2", "1")]),
            ],
        );
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let s = PlacementSession::new(&mut sch, &g, &config, &sink);
        let id = |r: &str| s.schematic().find_instance(r).unwrap();
        let (r1, q1, u2) = (id("R1"), id("Q1"), id("U2"));

        assert_eq!(seed_of(&s, &[r1, q1, u2]), Some(u2));
        assert_eq!(seed_of(&s, &[r1, q1]), Some(q1));
        assert_eq!(seed_of(&s, &[id("R2"), r1]), Some(r1));
        assert_eq!(seed_of(&s, &[]), None);
    }

    #[test]
    fn clusters_follow_connectivity() {
        let mut sch = schematic(
            vec![
                instance("U1", "MCU", 8),
                instance("U2", "LM358", 8),
                instance("R1", "1k", 2),
                instance("R2", "1k", 2),
                instance("J1", "header", 4),
            ],
            &[
                ("A", &[("U1", "1"), ("U2", "1")]),
                ("B", &[("U2", "2"), ("R1", "1")]),
                ("C", &[("R2", "1"), ("J1", "1")]),
            ],
        );
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let u1 = sch.find_instance("U1").unwrap();
        let u2 = sch.find_instance("U2").unwrap();
        let mut s = PlacementSession::new(&mut sch, &g, &config, &sink);
        s.commit(u1, Point::new(720.0, 450.0), Rotation::R0, None);

        let clusters = functional_clusters(&s, Some(u1));
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members.len(), 2);
        assert_eq!(clusters[0].core_links, 1);
        assert_eq!(clusters[0].attraction, s.schematic().instance(u1).center());
        assert_eq!(clusters[1].members.len(), 1);

        place_functional_clusters(&mut s, Some(u1));
        assert!(s.is_placed(u2));
        let r2 = s.schematic().find_instance("R2").unwrap();
        let j1 = s.schematic().find_instance("J1").unwrap();
        assert!(s.is_placed(r2));
        assert!(!s.is_placed(j1));
        let d = s.schematic().instance(u2).center().distance(s.schematic().instance(u1).center());
        assert!(d < 400.0);
    }
}
