//! IO clusters: the passive networks hanging off individual core pins, and
//! the series/parallel topology inside each one.

use crate::classify::{is_reset_like, ComponentKind, NetClass};
use crate::graph::Connectivity;
use crate::ids::{InstanceId, NetId};
use crate::model::{PinRef, Schematic};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

/// Upper bound on DFS expansions when extracting the trunk of one cluster.
const LONGEST_PATH_BUDGET: usize = 10_000;

/// Parts reachable from one core pin through signal nets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoCluster {
    /// Core pin index the cluster hangs off.
    pub pin: usize,
    /// Net on that pin.
    pub net: NetId,
    /// Longest simple path through the cluster, starting on the pin's net.
    pub trunk: Vec<InstanceId>,
    /// Members not on the trunk.
    pub branches: Vec<InstanceId>,
    /// All members in discovery order.
    pub members: Vec<InstanceId>,
}

/// Finds one cluster per eligible core pin.
///
/// The breadth-first walk stops at supply nets, the core, other chips,
/// connectors, and anything in `claimed`. Members of a cluster are added to
/// `claimed` so later pins do not pick them up again.
pub fn find_io_clusters(
    schematic: &Schematic,
    graph: &Connectivity,
    core: InstanceId,
    claimed: &mut BTreeSet<InstanceId>,
) -> Vec<IoCluster> {
    let inst = schematic.instance(core);
    let mut clusters = Vec::new();

    for pin in 0..inst.symbol.pins.len() {
        let pin_name = inst.symbol.pins[pin].name.to_uppercase();
        if NetClass::of(&pin_name).is_supply()
            || is_reset_like(&pin_name)
            || pin_name.contains("XTAL")
        {
            continue;
        }
        let Some(&primary) = schematic.nets_of_pin(PinRef { instance: core, pin }).first() else {
            continue;
        };
        if schematic.net(primary).class.is_supply() {
            continue;
        }

        let mut members: Vec<InstanceId> = Vec::new();
        let mut visited_nets = vec![primary];
        let mut queue = VecDeque::from([primary]);
        while let Some(net) = queue.pop_front() {
            for id in schematic.net(net).instances() {
                let candidate = schematic.instance(id);
                if id == core
                    || claimed.contains(&id)
                    || candidate.is_chip()
                    || candidate.kind == ComponentKind::Connector
                    || members.contains(&id)
                {
                    continue;
                }
                members.push(id);
                for &next in graph.nets_of(id) {
                    if !schematic.net(next).class.is_supply() && !visited_nets.contains(&next) {
                        visited_nets.push(next);
                        queue.push_back(next);
                    }
                }
            }
        }
        if members.is_empty() {
            continue;
        }

        // Adjacency restricted to the cluster's nets and members.
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
        for &net in &visited_nets {
            let local: Vec<usize> = schematic
                .net(net)
                .instances()
                .into_iter()
                .filter_map(|id| members.iter().position(|&m| m == id))
                .collect();
            for (i, &a) in local.iter().enumerate() {
                for &b in &local[i + 1..] {
                    if !adj[a].contains(&b) {
                        adj[a].push(b);
                        adj[b].push(a);
                    }
                }
            }
        }
        let starts: Vec<usize> = schematic
            .net(primary)
            .instances()
            .into_iter()
            .filter_map(|id| members.iter().position(|&m| m == id))
            .collect();
        let path = longest_path(&adj, &starts, LONGEST_PATH_BUDGET);
        let trunk: Vec<InstanceId> = path.iter().map(|&i| members[i]).collect();
        let branches = members
            .iter()
            .copied()
            .filter(|m| !trunk.contains(m))
            .collect();

        claimed.extend(members.iter().copied());
        log::debug!(
            "io cluster on {}.{}: {} members, trunk {}",
            inst.reference,
            inst.pin_label(pin),
            members.len(),
            trunk.len()
        );
        clusters.push(IoCluster {
            pin,
            net: primary,
            trunk,
            branches,
            members,
        });
    }
    clusters
}

/// Longest simple path starting at any of `starts`, by explicit-stack DFS.
///
/// At most `budget` node expansions are made; the best path found so far is
/// returned when the budget runs out.
pub fn longest_path(adj: &[Vec<usize>], starts: &[usize], budget: usize) -> Vec<usize> {
    let mut best: Vec<usize> = Vec::new();
    let mut on_path = vec![false; adj.len()];
    let mut expansions = 0usize;

    for &start in starts {
        // (node, index of the next neighbour to try)
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        on_path[start] = true;
        if best.is_empty() {
            best.push(start);
        }
        while let Some(top) = stack.last_mut() {
            if expansions >= budget {
                break;
            }
            let node = top.0;
            match adj[node].get(top.1).copied() {
                Some(neighbour) => {
                    top.1 += 1;
                    if on_path[neighbour] {
                        continue;
                    }
                    expansions += 1;
                    on_path[neighbour] = true;
                    stack.push((neighbour, 0));
                    if stack.len() > best.len() {
                        best = stack.iter().map(|&(n, _)| n).collect();
                    }
                }
                None => {
                    on_path[node] = false;
                    stack.pop();
                }
            }
        }
        for (n, _) in stack {
            on_path[n] = false;
        }
        if expansions >= budget {
            break;
        }
    }
    best
}

/// Series/parallel structure of a set of parts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    /// Two-net parts sharing exactly the same two nets.
    pub parallel_groups: Vec<Vec<InstanceId>>,
    /// Chains of two-net parts linked through single signal nets.
    pub serial_chains: Vec<Vec<InstanceId>>,
    /// Remaining pairs sharing exactly one signal net.
    pub serial_pairs: Vec<(InstanceId, InstanceId, NetId)>,
    /// Parts in neither a parallel group nor a chain.
    pub standalone: Vec<InstanceId>,
}

/// How an IO cluster is laid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterLayout {
    /// Side-by-side stacks of parallel parts.
    Parallel,
    /// Chains running outward from the pin.
    Series,
    /// Parallel stacks, then chains.
    Mixed,
    /// One part next to the pin.
    Single,
    /// Trunk outward from the pin, branches beside their trunk parent.
    Default,
}

/// Analyses the series/parallel structure of `members`.
pub fn analyze_topology(
    schematic: &Schematic,
    graph: &Connectivity,
    members: &[InstanceId],
) -> Topology {
    let mut topo = Topology::default();
    let nets: Vec<BTreeSet<NetId>> = members
        .iter()
        .map(|&m| graph.nets_of(m).iter().copied().collect())
        .collect();
    let mut processed = vec![false; members.len()];

    for i in 0..members.len() {
        if processed[i] || nets[i].len() != 2 {
            continue;
        }
        let mut group = vec![i];
        for j in 0..members.len() {
            if j != i && !processed[j] && nets[j] == nets[i] {
                group.push(j);
                processed[j] = true;
            }
        }
        if group.len() > 1 {
            processed[i] = true;
            topo.parallel_groups
                .push(group.into_iter().map(|k| members[k]).collect());
        }
    }

    let mut visited = vec![false; members.len()];
    for start in 0..members.len() {
        if visited[start] || processed[start] {
            continue;
        }
        let chain = trace_chain(schematic, graph, members, start, &mut visited);
        if chain.len() > 1 {
            for &k in &chain {
                processed[k] = true;
            }
            topo.serial_chains
                .push(chain.into_iter().map(|k| members[k]).collect());
        }
    }

    for i in 0..members.len() {
        if processed[i] {
            continue;
        }
        for j in 0..members.len() {
            if processed[j] {
                continue;
            }
            let (a, b) = (schematic.instance(members[i]), schematic.instance(members[j]));
            if a.reference >= b.reference {
                continue;
            }
            let shared: Vec<NetId> = nets[i].intersection(&nets[j]).copied().collect();
            if shared.len() == 1 && !schematic.net(shared[0]).class.is_supply() {
                topo.serial_pairs.push((members[i], members[j], shared[0]));
            }
        }
    }

    topo.standalone = (0..members.len())
        .filter(|&k| !processed[k])
        .map(|k| members[k])
        .collect();
    topo
}

fn trace_chain(
    schematic: &Schematic,
    graph: &Connectivity,
    members: &[InstanceId],
    start: usize,
    visited: &mut [bool],
) -> Vec<usize> {
    let mut chain = vec![start];
    visited[start] = true;
    let mut current = start;
    'trace: loop {
        for &net in graph.nets_of(members[current]) {
            if schematic.net(net).class.is_supply() {
                continue;
            }
            let connected: Vec<usize> = schematic
                .net(net)
                .instances()
                .into_iter()
                .filter_map(|id| members.iter().position(|&m| m == id))
                .filter(|&k| k != current && !visited[k])
                .collect();
            if let [next] = connected[..] {
                if graph.nets_of(members[next]).len() == 2 {
                    chain.push(next);
                    visited[next] = true;
                    current = next;
                    continue 'trace;
                }
            }
        }
        break;
    }
    chain
}

impl Topology {
    /// Picks the layout style for a cluster of `count` parts.
    pub fn layout(&self, count: usize) -> ClusterLayout {
        let parallel = !self.parallel_groups.is_empty();
        let chains = !self.serial_chains.is_empty();
        let pairs = !self.serial_pairs.is_empty();
        if parallel && !chains && !pairs {
            ClusterLayout::Parallel
        } else if chains && !parallel {
            ClusterLayout::Series
        } else if parallel {
            ClusterLayout::Mixed
        } else if count == 1 {
            ClusterLayout::Single
        } else {
            ClusterLayout::Default
        }
    }
}
