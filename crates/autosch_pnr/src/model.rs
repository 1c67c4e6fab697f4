//! Core schematic data structures.
//!
//! Defines the netlist the engine works on: component instances (with a
//! symbol shape, position, and rotation), nets (sets of pin endpoints), and the
//! lookup indices built alongside them. The [`Schematic`] is the central data
//! structure that flows through placement and routing.

use crate::classify::{ComponentKind, ConnectorClass, NetClass};
use crate::geometry::{Point, Rect, Rotation, Side};
use crate::ids::{InstanceId, NetId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pin pitch of generated symbols.
pub const GENERIC_PIN_PITCH: f64 = 10.0;

/// Width of generated symbols.
pub const GENERIC_SYMBOL_WIDTH: f64 = 60.0;

/// One pin of a symbol, in unrotated local coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolPin {
    /// Pin number as printed on the part (`"1"`, `"A3"`).
    pub number: String,
    /// Pin name (`"VCC"`, `"P1.0"`); may be empty.
    #[serde(default)]
    pub name: String,
    /// Local horizontal offset.
    pub x: f64,
    /// Local vertical offset.
    pub y: f64,
}

/// Shape of a component symbol.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// Unrotated width.
    pub width: f64,
    /// Unrotated height.
    pub height: f64,
    /// Ordered pin list.
    pub pins: Vec<SymbolPin>,
}

impl Symbol {
    /// Generates a box symbol with `pin_count` numbered pins alternating
    /// between the left and right edges.
    pub fn generic(pin_count: usize) -> Self {
        let rows = pin_count.div_ceil(2).max(1);
        let height = (rows as f64 + 1.0) * GENERIC_PIN_PITCH;
        let pins = (0..pin_count)
            .map(|i| SymbolPin {
                number: (i + 1).to_string(),
                name: String::new(),
                x: if i % 2 == 0 { 0.0 } else { GENERIC_SYMBOL_WIDTH },
                y: GENERIC_PIN_PITCH * (i / 2 + 1) as f64,
            })
            .collect();
        Self {
            width: GENERIC_SYMBOL_WIDTH,
            height,
            pins,
        }
    }
}

/// A placed occurrence of a component.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Instance {
    /// Index into [`Schematic::instances`].
    pub id: InstanceId,
    /// Reference designator (`U1`, `R3`).
    pub reference: String,
    /// Value text (`10k`, `STM32F103`).
    pub value: String,
    /// Library key the symbol came from, if any.
    pub symbol_key: Option<String>,
    /// Symbol shape and pins.
    pub symbol: Symbol,
    /// Classified component kind.
    pub kind: ComponentKind,
    /// Connector class, for connectors only.
    pub connector: Option<ConnectorClass>,
    /// Top-left corner of the rotated bounding box.
    pub position: Point,
    /// Symbol rotation.
    pub rotation: Rotation,
    /// Placement group tag; members of one group may pack tightly.
    pub group: Option<String>,
}

impl Instance {
    /// Rotated `(width, height)`.
    pub fn size(&self) -> (f64, f64) {
        self.size_at(self.rotation)
    }

    /// Rotated size for a hypothetical rotation.
    pub fn size_at(&self, rotation: Rotation) -> (f64, f64) {
        rotation.size(self.symbol.width, self.symbol.height)
    }

    /// Bounding rectangle at the current position.
    pub fn rect(&self) -> Rect {
        let (w, h) = self.size();
        Rect::new(self.position.x, self.position.y, w, h)
    }

    /// Centre of the bounding rectangle.
    pub fn center(&self) -> Point {
        self.rect().center()
    }

    /// Absolute position of pin `index`.
    pub fn pin_position(&self, index: usize) -> Option<Point> {
        self.pin_position_at(index, self.position, self.rotation)
    }

    /// Absolute position of pin `index` for a hypothetical origin and rotation.
    pub fn pin_position_at(&self, index: usize, origin: Point, rotation: Rotation) -> Option<Point> {
        let pin = self.symbol.pins.get(index)?;
        let local = rotation.transform(pin.x, pin.y, self.symbol.width, self.symbol.height);
        Some(Point::new(origin.x + local.x, origin.y + local.y))
    }

    /// Edge of the bounding box nearest to pin `index`.
    ///
    /// Ties resolve in the order left, right, top, bottom.
    pub fn pin_side(&self, index: usize) -> Side {
        let Some(p) = self.pin_position(index) else {
            return Side::Left;
        };
        side_of_point(&self.rect(), p)
    }

    /// Looks a pin up by number first, then by name (case-insensitive).
    pub fn find_pin(&self, designator: &str) -> Option<usize> {
        let wanted = designator.trim();
        self.symbol
            .pins
            .iter()
            .position(|p| p.number == wanted)
            .or_else(|| {
                self.symbol
                    .pins
                    .iter()
                    .position(|p| !p.name.is_empty() && p.name.eq_ignore_ascii_case(wanted))
            })
    }

    /// Pin name, falling back to the pin number.
    pub fn pin_label(&self, index: usize) -> &str {
        match self.symbol.pins.get(index) {
            Some(p) if !p.name.is_empty() => &p.name,
            Some(p) => &p.number,
            None => "",
        }
    }

    /// Returns `true` for ICs and MCUs.
    pub fn is_chip(&self) -> bool {
        self.kind.is_chip()
    }
}

/// Edge of `rect` nearest to `p`, ties in the order left, right, top, bottom.
pub fn side_of_point(rect: &Rect, p: Point) -> Side {
    let distances = [
        (Side::Left, (p.x - rect.x).abs()),
        (Side::Right, (rect.right() - p.x).abs()),
        (Side::Top, (p.y - rect.y).abs()),
        (Side::Bottom, (rect.bottom() - p.y).abs()),
    ];
    let mut best = distances[0];
    for candidate in &distances[1..] {
        if candidate.1 < best.1 {
            best = *candidate;
        }
    }
    best.0
}

/// One endpoint of a net: a pin of an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PinRef {
    /// Owning instance.
    pub instance: InstanceId,
    /// Index into the instance symbol's pin list.
    pub pin: usize,
}

/// An electrical net with resolved endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Net {
    /// Index into [`Schematic::nets`].
    pub id: NetId,
    /// Net name.
    pub name: String,
    /// Power, ground, or signal.
    pub class: NetClass,
    /// Resolved endpoints, de-duplicated, in input order.
    pub endpoints: Vec<PinRef>,
}

impl Net {
    /// Distinct instances on this net, in endpoint order.
    pub fn instances(&self) -> Vec<InstanceId> {
        let mut seen = Vec::new();
        for e in &self.endpoints {
            if !seen.contains(&e.instance) {
                seen.push(e.instance);
            }
        }
        seen
    }
}

/// The complete schematic: instances, nets, and lookup indices.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Schematic {
    /// All instances, in input order.
    pub instances: Vec<Instance>,
    /// All nets, in input order.
    pub nets: Vec<Net>,
    #[serde(skip)]
    by_reference: HashMap<String, InstanceId>,
    #[serde(skip)]
    by_name: HashMap<String, NetId>,
    #[serde(skip)]
    pin_nets: HashMap<PinRef, Vec<NetId>>,
}

impl Schematic {
    /// Creates an empty schematic.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instance and returns its ID.
    pub fn add_instance(&mut self, mut instance: Instance) -> InstanceId {
        let id = InstanceId::from_raw(self.instances.len() as u32);
        instance.id = id;
        self.by_reference.insert(instance.reference.clone(), id);
        self.instances.push(instance);
        id
    }

    /// Adds a net and returns its ID.
    pub fn add_net(&mut self, mut net: Net) -> NetId {
        let id = NetId::from_raw(self.nets.len() as u32);
        net.id = id;
        for e in &net.endpoints {
            self.pin_nets.entry(*e).or_default().push(id);
        }
        self.by_name.insert(net.name.clone(), id);
        self.nets.push(net);
        id
    }

    /// Rebuilds the lookup indices after deserialisation.
    pub fn rebuild_indices(&mut self) {
        self.by_reference = self
            .instances
            .iter()
            .map(|i| (i.reference.clone(), i.id))
            .collect();
        self.by_name = self.nets.iter().map(|n| (n.name.clone(), n.id)).collect();
        self.pin_nets.clear();
        for net in &self.nets {
            for e in &net.endpoints {
                self.pin_nets.entry(*e).or_default().push(net.id);
            }
        }
    }

    /// Returns the instance with the given ID.
    pub fn instance(&self, id: InstanceId) -> &Instance {
        &self.instances[id.index()]
    }

    /// Returns a mutable reference to the instance with the given ID.
    pub fn instance_mut(&mut self, id: InstanceId) -> &mut Instance {
        &mut self.instances[id.index()]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &Net {
        &self.nets[id.index()]
    }

    /// Looks an instance up by reference designator.
    pub fn find_instance(&self, reference: &str) -> Option<InstanceId> {
        self.by_reference.get(reference).copied()
    }

    /// Looks a net up by name.
    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.by_name.get(name).copied()
    }

    /// Nets attached to a pin.
    pub fn nets_of_pin(&self, pin: PinRef) -> &[NetId] {
        self.pin_nets.get(&pin).map_or(&[], Vec::as_slice)
    }

    /// Absolute position of a net endpoint.
    pub fn pin_position(&self, pin: PinRef) -> Option<Point> {
        self.instance(pin.instance).pin_position(pin.pin)
    }

    /// Number of instances.
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }
}
