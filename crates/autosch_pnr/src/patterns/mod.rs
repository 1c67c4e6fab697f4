//! Circuit-pattern detection.
//!
//! Everything here is a pure function of the schematic and its connectivity
//! graph. A missing pattern is an empty result, never an error. The results
//! are collected into a [`LayoutPlan`] that drives the placer.

mod clusters;
mod critical;
mod repeated;

pub use clusters::{
    analyze_topology, find_io_clusters, longest_path, ClusterLayout, IoCluster, Topology,
};
pub use critical::{
    choose_core, find_crystal_groups, find_decoupling_caps, find_reset_circuits, CrystalGroup,
    DecouplingCap, ResetCircuit,
};
pub use repeated::{find_repeated_groups, RepeatedGroup, RepeatedMember, Signature};

use crate::classify::NetClass;
use crate::graph::Connectivity;
use crate::ids::InstanceId;
use crate::ids::NetId;
use crate::model::Schematic;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dominant direction of a group of parts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Spread mostly along y.
    Vertical,
    /// Spread mostly along x.
    Horizontal,
    /// Fewer than two parts.
    None,
}

impl Alignment {
    /// Alignment of the given top-left positions.
    pub fn of(schematic: &Schematic, members: &[InstanceId]) -> Self {
        if members.len() < 2 {
            return Self::None;
        }
        let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
        for &m in members {
            let p = schematic.instance(m).position;
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        if max_y - min_y > max_x - min_x {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }
}

/// Parts sharing one supply net.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusGroup {
    /// The supply net.
    pub net: NetId,
    /// Power or ground.
    pub class: NetClass,
    /// Distinct parts on the net.
    pub members: Vec<InstanceId>,
    /// Spread of the members at the time of the last refresh.
    pub alignment: Alignment,
}

/// Coarse signal flow of a part, from its net and pin names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalDirection {
    /// A name mentions `in` or `rx`.
    Input,
    /// A name mentions `out` or `tx`.
    Output,
    /// Neither.
    Io,
}

/// Everything the placer needs to know about the circuit, derived once per
/// placement pass.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPlan {
    /// The central chip.
    pub primary: Option<InstanceId>,
    /// Other ICs and MCUs, by descending degree.
    pub secondary: Vec<InstanceId>,
    /// Connectors feeding the board (power, input, comm).
    pub inputs: Vec<InstanceId>,
    /// Remaining connectors.
    pub outputs: Vec<InstanceId>,
    /// Bypass capacitors of the primary core, ranked.
    pub decoupling: Vec<DecouplingCap>,
    /// Crystal groups of the primary core.
    pub crystals: Vec<CrystalGroup>,
    /// Reset circuits of the primary core.
    pub resets: Vec<ResetCircuit>,
    /// Repeated sub-circuits on the primary core.
    pub repeated: Vec<RepeatedGroup>,
    /// Supply nets shared by two or more parts.
    pub bus_groups: Vec<BusGroup>,
    /// Signal direction per instance, indexed by instance ID.
    pub directions: Vec<SignalDirection>,
}

impl LayoutPlan {
    /// Derives the plan around `primary`.
    ///
    /// Decoupling ranks and bus alignment read the positions `schematic`
    /// carries; the placer calls this on the drawing as it was handed in.
    pub fn analyze(
        schematic: &Schematic,
        graph: &Connectivity,
        primary: Option<InstanceId>,
    ) -> Self {
        let mut secondary: Vec<InstanceId> = schematic
            .instances
            .iter()
            .filter(|i| i.is_chip() && Some(i.id) != primary)
            .map(|i| i.id)
            .collect();
        secondary.sort_by_key(|&id| std::cmp::Reverse(graph.degree(id)));

        let (inputs, outputs) = schematic
            .instances
            .iter()
            .filter_map(|i| i.connector.map(|c| (i.id, c)))
            .partition::<Vec<_>, _>(|(_, c)| c.is_boundary_input());

        let mut plan = Self {
            primary,
            secondary,
            inputs: inputs.into_iter().map(|(id, _)| id).collect(),
            outputs: outputs.into_iter().map(|(id, _)| id).collect(),
            bus_groups: bus_groups(schematic),
            directions: schematic
                .instances
                .iter()
                .map(|i| signal_direction(schematic, graph, i.id))
                .collect(),
            ..Self::default()
        };

        if let Some(core) = primary {
            plan.decoupling = find_decoupling_caps(schematic, graph, core);
            plan.crystals = find_crystal_groups(schematic, graph, core);
            plan.resets = find_reset_circuits(schematic, graph, core);
            let claimed = plan.critical_parts();
            plan.repeated = find_repeated_groups(schematic, graph, core, &claimed);
        }
        log::debug!(
            "plan: {} decaps, {} crystals, {} reset circuits, {} repeated groups",
            plan.decoupling.len(),
            plan.crystals.len(),
            plan.resets.len(),
            plan.repeated.len()
        );
        plan
    }

    /// Parts claimed by decoupling, crystal and reset detection.
    pub fn critical_parts(&self) -> BTreeSet<InstanceId> {
        let mut out: BTreeSet<InstanceId> = self.decoupling.iter().map(|d| d.cap).collect();
        for g in &self.crystals {
            out.insert(g.crystal);
            out.extend(g.capacitors.iter().copied());
        }
        for r in &self.resets {
            out.extend(r.parts());
        }
        out
    }

    /// Recomputes bus-group alignment from current positions.
    pub fn refresh_alignment(&mut self, schematic: &Schematic) {
        for g in &mut self.bus_groups {
            g.alignment = Alignment::of(schematic, &g.members);
        }
    }

    /// Direction recorded for `id`.
    pub fn direction(&self, id: InstanceId) -> SignalDirection {
        self.directions
            .get(id.index())
            .copied()
            .unwrap_or(SignalDirection::Io)
    }
}

fn bus_groups(schematic: &Schematic) -> Vec<BusGroup> {
    let mut out = Vec::new();
    for class in [NetClass::Ground, NetClass::Power] {
        for net in schematic.nets.iter().filter(|n| n.class == class) {
            let members = net.instances();
            if members.len() >= 2 {
                out.push(BusGroup {
                    net: net.id,
                    class,
                    alignment: Alignment::of(schematic, &members),
                    members,
                });
            }
        }
    }
    out
}

fn signal_direction(schematic: &Schematic, graph: &Connectivity, id: InstanceId) -> SignalDirection {
    let inst = schematic.instance(id);
    let names: Vec<String> = graph
        .nets_of(id)
        .iter()
        .map(|&n| schematic.net(n).name.to_lowercase())
        .chain(inst.symbol.pins.iter().map(|p| p.name.to_lowercase()))
        .collect();
    if names.iter().any(|n| n.contains("in") || n.contains("rx")) {
        SignalDirection::Input
    } else if names.iter().any(|n| n.contains("out") || n.contains("tx")) {
        SignalDirection::Output
    } else {
        SignalDirection::Io
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::test_support::{instance, schematic};

    fn board() -> Schematic {
        schematic(
            vec![
                instance("U1", "ATMEGA", 28),
                instance("U2", "LM358", 8),
                instance("J1", "POWER", 2),
                instance("J2", "OUT", 3),
                instance("C1", "100n", 2),
            ],
            &[
                ("VCC", &[("U1", "7"), ("C1", "1"), ("J1", "1"), ("U2", "8")]),
                ("GND", &[("U1", "8"), ("C1", "2"), ("J1", "2"), ("U2", "4")]),
                ("RX", &[("U1", "2"), ("U2", "1")]),
                ("TXOUT", &[("U1", "3"), ("J2", "1")]),
            ],
        )
    }

    #[test]
    fn plan_collects_roles() {
        let sch = board();
        let g = Connectivity::build(&sch);
        let core = choose_core(&sch, &g);
        let plan = LayoutPlan::analyze(&sch, &g, core);
        assert_eq!(plan.primary, sch.find_instance("U1"));
        assert_eq!(plan.secondary, vec![sch.find_instance("U2").unwrap()]);
        assert_eq!(plan.inputs, vec![sch.find_instance("J1").unwrap()]);
        assert_eq!(plan.decoupling.len(), 1);
        assert_eq!(plan.bus_groups.len(), 2);
        assert_eq!(plan.bus_groups[0].class, NetClass::Ground);
        assert!(plan.critical_parts().contains(&sch.find_instance("C1").unwrap()));
        assert_eq!(plan.direction(sch.find_instance("U2").unwrap()), SignalDirection::Input);
    }

    #[test]
    fn alignment_follows_spread() {
        let mut sch = board();
        let a = sch.find_instance("C1").unwrap();
        let b = sch.find_instance("J2").unwrap();
        sch.instance_mut(a).position = Point::new(0.0, 0.0);
        sch.instance_mut(b).position = Point::new(10.0, 200.0);
        assert_eq!(Alignment::of(&sch, &[a, b]), Alignment::Vertical);
        assert_eq!(Alignment::of(&sch, &[a]), Alignment::None);
    }
}
