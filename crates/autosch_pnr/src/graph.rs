//! Component connectivity graph.
//!
//! Edge weights count the nets two components share. The graph is built from
//! the schematic's nets once per placement pass and never mutated afterwards.

use crate::ids::{InstanceId, NetId};
use crate::model::Schematic;
use petgraph::graphmap::UnGraphMap;

/// Weighted, undirected component adjacency plus a component → nets index.
#[derive(Debug, Clone)]
pub struct Connectivity {
    graph: UnGraphMap<InstanceId, u32>,
    nets_by_instance: Vec<Vec<NetId>>,
}

impl Connectivity {
    /// Builds the graph from every net in the schematic.
    ///
    /// Nodes are inserted in instance order so iteration is deterministic.
    /// Self-loops are excluded and an instance appearing several times on one
    /// net counts once.
    pub fn build(schematic: &Schematic) -> Self {
        let mut graph = UnGraphMap::new();
        for inst in &schematic.instances {
            graph.add_node(inst.id);
        }
        let mut nets_by_instance = vec![Vec::new(); schematic.instance_count()];

        for net in &schematic.nets {
            let members = net.instances();
            for &m in &members {
                nets_by_instance[m.index()].push(net.id);
            }
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    if a == b {
                        continue;
                    }
                    match graph.edge_weight_mut(a, b) {
                        Some(w) => *w += 1,
                        None => {
                            graph.add_edge(a, b, 1);
                        }
                    }
                }
            }
        }

        Self {
            graph,
            nets_by_instance,
        }
    }

    /// Sum of edge weights incident to `id`.
    pub fn degree(&self, id: InstanceId) -> u32 {
        self.graph.edges(id).map(|(_, _, w)| *w).sum()
    }

    /// Number of nets shared by `a` and `b`.
    pub fn weight(&self, a: InstanceId, b: InstanceId) -> u32 {
        self.graph.edge_weight(a, b).copied().unwrap_or(0)
    }

    /// Neighbours of `id`, sorted by instance ID.
    pub fn neighbors(&self, id: InstanceId) -> Vec<InstanceId> {
        let mut out: Vec<InstanceId> = self.graph.neighbors(id).collect();
        out.sort();
        out
    }

    /// Nets touching `id`, in net order.
    pub fn nets_of(&self, id: InstanceId) -> &[NetId] {
        self.nets_by_instance
            .get(id.index())
            .map_or(&[], Vec::as_slice)
    }

    /// Number of instances in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of distinct adjacent pairs.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
