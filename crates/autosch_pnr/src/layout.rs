//! The finished layout handed to renderers and exporters.

use crate::classify::ComponentKind;
use crate::geometry::{Point, Rotation};
use crate::input::{NetlistInput, ValidationReport};
use crate::model::Schematic;
use crate::quality::QualityReport;
use crate::routing::{NetLabel, PowerSymbol, RouteStats, Routing, Wire};
use autosch_common::ContentHash;
use serde::{Deserialize, Serialize};

/// Final position of one component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Reference designator.
    pub reference: String,
    /// Value text.
    pub value: String,
    /// Classified kind.
    pub kind: ComponentKind,
    /// Top-left corner of the rotated bounding box.
    pub position: Point,
    /// Symbol rotation.
    pub rotation: Rotation,
    /// Rotated width.
    pub width: f64,
    /// Rotated height.
    pub height: f64,
    /// Placement group tag, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// A placed and routed schematic, in absolute canvas coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Reference of the primary core, when one was found.
    pub core: Option<String>,
    /// Components in input order.
    pub placements: Vec<Placement>,
    /// Wires in drawing order.
    pub wires: Vec<Wire>,
    /// Net labels.
    pub labels: Vec<NetLabel>,
    /// Supply and ground glyphs.
    pub power_symbols: Vec<PowerSymbol>,
    /// Junction dots.
    pub junctions: Vec<Point>,
    /// Routing counters.
    pub stats: RouteStats,
    /// Post-layout checks.
    pub quality: QualityReport,
    /// Problems found in the input netlist.
    pub validation: ValidationReport,
}

impl Layout {
    pub(crate) fn assemble(
        schematic: &Schematic,
        core: Option<String>,
        routing: Routing,
        quality: QualityReport,
        validation: ValidationReport,
    ) -> Self {
        let placements = schematic
            .instances
            .iter()
            .map(|i| {
                let (width, height) = i.size();
                Placement {
                    reference: i.reference.clone(),
                    value: i.value.clone(),
                    kind: i.kind,
                    position: i.position,
                    rotation: i.rotation,
                    width,
                    height,
                    group: i.group.clone(),
                }
            })
            .collect();
        Self {
            core,
            placements,
            wires: routing.wires,
            labels: routing.labels,
            power_symbols: routing.power_symbols,
            junctions: routing.junctions,
            stats: routing.stats,
            quality,
            validation,
        }
    }

    /// Looks up the placement of `reference`.
    pub fn placement(&self, reference: &str) -> Option<&Placement> {
        self.placements.iter().find(|p| p.reference == reference)
    }

    /// Wires of the net called `name`.
    pub fn wires_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Wire> + 'a {
        self.wires.iter().filter(move |w| w.net == name)
    }

    /// Labels of the net called `name`.
    pub fn labels_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a NetLabel> + 'a {
        self.labels.iter().filter(move |l| l.net == name)
    }

    /// Writes the placed positions and rotations back into `input`, so a
    /// later [`reroute`](crate::reroute) starts from this placement.
    pub fn apply_to(&self, input: &mut NetlistInput) {
        for comp in &mut input.components {
            if let Some(p) = self.placement(comp.reference.trim()) {
                comp.position = Some(p.position);
                comp.rotation = Some(p.rotation);
            }
        }
    }

    /// Content hash of the serialised layout.
    ///
    /// Identical input, configuration and seed give identical fingerprints.
    pub fn fingerprint(&self) -> ContentHash {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        ContentHash::from_bytes(&bytes)
    }
}
