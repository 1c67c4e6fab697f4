//! Critical peripherals of a core: decoupling capacitors, crystal groups, and
//! reset circuits.

use crate::classify::{is_reset_like, ComponentKind, NetClass};
use crate::graph::Connectivity;
use crate::ids::{InstanceId, NetId};
use crate::model::{PinRef, Schematic};
use serde::{Deserialize, Serialize};

/// A capacitor bypassing one power pin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecouplingCap {
    /// The capacitor.
    pub cap: InstanceId,
    /// Chip owning the power pin (the core or a driver IC).
    pub target: InstanceId,
    /// Power pin index on `target`.
    pub pin: usize,
    /// Power net shared by cap and pin.
    pub net: NetId,
    /// Distance from the capacitor to the pin, in the schematic the caps
    /// were found in.
    pub distance: f64,
    /// Distance band: 1 (< 50), 2 (< 100), or 3.
    pub priority: u8,
}

/// A crystal with its load capacitors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrystalGroup {
    /// The crystal or resonator.
    pub crystal: InstanceId,
    /// Up to two grounded capacitors on the crystal nets.
    pub capacitors: Vec<InstanceId>,
    /// Core pins on the crystal nets.
    pub core_pins: Vec<usize>,
}

/// A reset pin with its RC network. Either part may be missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetCircuit {
    /// Reset pin index on the core.
    pub pin: usize,
    /// Net on the reset pin.
    pub net: NetId,
    /// Pull resistor tied to a supply.
    pub resistor: Option<InstanceId>,
    /// Capacitor tied to a supply.
    pub capacitor: Option<InstanceId>,
}

impl ResetCircuit {
    /// Parts of the circuit, resistor first.
    pub fn parts(&self) -> Vec<InstanceId> {
        self.resistor.iter().chain(self.capacitor.iter()).copied().collect()
    }
}

/// Picks the core: highest-degree MCU, else IC, else any component.
///
/// Ties keep insertion order.
pub fn choose_core(schematic: &Schematic, graph: &Connectivity) -> Option<InstanceId> {
    let best_of = |filter: &dyn Fn(ComponentKind) -> bool| {
        let mut best: Option<(InstanceId, u32)> = None;
        for inst in schematic.instances.iter().filter(|i| filter(i.kind)) {
            let deg = graph.degree(inst.id);
            if best.map_or(true, |(_, d)| deg > d) {
                best = Some((inst.id, deg));
            }
        }
        best.map(|(id, _)| id)
    };
    best_of(&|k| k == ComponentKind::Mcu)
        .or_else(|| best_of(&|k| k == ComponentKind::Ic))
        .or_else(|| best_of(&|_| true))
}

/// Values that look like a bypass capacitor.
fn is_decoupling_value(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v.is_empty()
        || v == "c"
        || ["100n", "0.1u", "104", "0.1", "cap"]
            .iter()
            .any(|w| v.contains(w))
}

/// ICs whose power pins also attract bypass capacitors.
fn is_driver_ic(schematic: &Schematic, id: InstanceId) -> bool {
    let inst = schematic.instance(id);
    let reference = inst.reference.to_uppercase();
    let value = inst.value.to_lowercase();
    inst.kind == ComponentKind::Ic
        && (["ULN", "L293", "L298"].iter().any(|p| reference.contains(p))
            || value.contains("driver")
            || value.contains("2003"))
}

fn on_class(schematic: &Schematic, graph: &Connectivity, id: InstanceId, class: NetClass) -> bool {
    graph
        .nets_of(id)
        .iter()
        .any(|&n| schematic.net(n).class == class)
}

fn on_supply(schematic: &Schematic, graph: &Connectivity, id: InstanceId) -> bool {
    graph
        .nets_of(id)
        .iter()
        .any(|&n| schematic.net(n).class.is_supply())
}

/// Finds bypass capacitors for `chip`.
///
/// Each cap serves the nearest power pin on its net, measured in the
/// positions `schematic` carries. The placer passes the drawing as it was
/// handed in, so a cap the designer drew next to a pin keeps that pin.
/// Caps are ranked by distance band, then by the pin they serve (chip
/// before driver ICs, lower pin first), then by distance.
pub fn find_decoupling_caps(
    schematic: &Schematic,
    graph: &Connectivity,
    chip: InstanceId,
) -> Vec<DecouplingCap> {
    // (owner rank, owner, pin, net, position)
    let mut power_pins = Vec::new();
    let mut owners = vec![chip];
    owners.extend(
        schematic
            .instances
            .iter()
            .map(|i| i.id)
            .filter(|&id| id != chip && is_driver_ic(schematic, id)),
    );
    for (rank, owner) in owners.into_iter().enumerate() {
        for &net_id in graph.nets_of(owner) {
            let net = schematic.net(net_id);
            if net.class != NetClass::Power {
                continue;
            }
            for e in net.endpoints.iter().filter(|e| e.instance == owner) {
                if let Some(p) = schematic.pin_position(*e) {
                    power_pins.push((rank, owner, e.pin, net_id, p));
                }
            }
        }
    }

    let mut seen = Vec::new();
    let mut caps: Vec<(InstanceId, NetId)> = Vec::new();
    for net in schematic.nets.iter().filter(|n| n.class == NetClass::Power) {
        for id in net.instances() {
            let inst = schematic.instance(id);
            if inst.kind != ComponentKind::Capacitor || seen.contains(&id) {
                continue;
            }
            if on_class(schematic, graph, id, NetClass::Ground) && is_decoupling_value(&inst.value)
            {
                seen.push(id);
                caps.push((id, net.id));
            }
        }
    }

    let mut out = Vec::new();
    for (cap, net) in caps {
        let cap_pos = schematic.instance(cap).position;
        let nearest = power_pins
            .iter()
            .filter(|(_, _, _, n, _)| *n == net)
            .map(|(rank, owner, pin, _, p)| (*rank, *owner, *pin, p.distance(cap_pos)))
            .fold(None::<(usize, InstanceId, usize, f64)>, |best, cand| match best {
                Some(b) if b.3 <= cand.3 => Some(b),
                _ => Some(cand),
            });
        if let Some((rank, target, pin, distance)) = nearest {
            let priority = if distance < 50.0 {
                1
            } else if distance < 100.0 {
                2
            } else {
                3
            };
            out.push((
                rank,
                DecouplingCap {
                    cap,
                    target,
                    pin,
                    net,
                    distance,
                    priority,
                },
            ));
        }
    }
    out.sort_by(|(ra, a), (rb, b)| {
        a.priority
            .cmp(&b.priority)
            .then(ra.cmp(rb))
            .then(a.pin.cmp(&b.pin))
            .then(a.distance.total_cmp(&b.distance))
    });
    out.into_iter().map(|(_, d)| d).collect()
}

/// Finds crystals next to `core` with up to two grounded load capacitors each.
pub fn find_crystal_groups(
    schematic: &Schematic,
    graph: &Connectivity,
    core: InstanceId,
) -> Vec<CrystalGroup> {
    let mut groups = Vec::new();
    for crystal in graph.neighbors(core) {
        if schematic.instance(crystal).kind != ComponentKind::Crystal {
            continue;
        }
        let shared: Vec<NetId> = graph
            .nets_of(crystal)
            .iter()
            .copied()
            .filter(|&n| schematic.net(n).endpoints.iter().any(|e| e.instance == core))
            .collect();
        if shared.is_empty() {
            continue;
        }
        let mut capacitors = Vec::new();
        let mut core_pins = Vec::new();
        for &net_id in &shared {
            for e in &schematic.net(net_id).endpoints {
                if e.instance == core {
                    if !core_pins.contains(&e.pin) {
                        core_pins.push(e.pin);
                    }
                    continue;
                }
                if e.instance == crystal || capacitors.contains(&e.instance) {
                    continue;
                }
                if schematic.instance(e.instance).kind == ComponentKind::Capacitor
                    && on_class(schematic, graph, e.instance, NetClass::Ground)
                {
                    capacitors.push(e.instance);
                }
            }
        }
        capacitors.truncate(2);
        groups.push(CrystalGroup {
            crystal,
            capacitors,
            core_pins,
        });
    }
    groups
}

/// Finds reset pins of `core` and the supply-tied R and C on each.
///
/// Pins qualify by a reset-like pin or net name. When no pin does and the
/// core is an MCU, pin number 9 is tried (the classic 8051 reset pin).
pub fn find_reset_circuits(
    schematic: &Schematic,
    graph: &Connectivity,
    core: InstanceId,
) -> Vec<ResetCircuit> {
    let inst = schematic.instance(core);
    let pin_nets = |pin: usize| schematic.nets_of_pin(PinRef { instance: core, pin });

    let mut candidates: Vec<usize> = (0..inst.symbol.pins.len())
        .filter(|&pin| {
            let nets = pin_nets(pin);
            !nets.is_empty()
                && (is_reset_like(&inst.symbol.pins[pin].name)
                    || nets.iter().any(|&n| is_reset_like(&schematic.net(n).name)))
        })
        .collect();
    if candidates.is_empty() && inst.kind == ComponentKind::Mcu {
        candidates.extend(
            inst.symbol
                .pins
                .iter()
                .position(|p| p.number == "9")
                .filter(|&pin| {
                    pin_nets(pin)
                        .iter()
                        .all(|&n| schematic.net(n).class == NetClass::Signal)
                })
                .filter(|&pin| !pin_nets(pin).is_empty()),
        );
    }

    let mut circuits = Vec::new();
    for pin in candidates {
        let nets = pin_nets(pin);
        let mut resistor = None;
        let mut capacitor = None;
        for &net_id in nets {
            for other in schematic.net(net_id).instances() {
                if other == core || !on_supply(schematic, graph, other) {
                    continue;
                }
                match schematic.instance(other).kind {
                    ComponentKind::Resistor if resistor.is_none() => resistor = Some(other),
                    ComponentKind::Capacitor if capacitor.is_none() => capacitor = Some(other),
                    _ => {}
                }
            }
        }
        if resistor.is_some() || capacitor.is_some() {
            circuits.push(ResetCircuit {
                pin,
                net: nets[0],
                resistor,
                capacitor,
            });
        }
    }
    circuits
}
