//! Wire colours.

use crate::classify::NetClass;
use autosch_common::stable_hash;
use serde::{Deserialize, Serialize};

/// Stroke style of a net's wires.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetStyle {
    /// CSS colour.
    pub stroke: String,
    /// Stroke width in canvas units.
    pub width: u32,
    /// Dash pattern, empty for solid.
    pub dash: String,
}

const SUPPLY_STROKE: &str = "#ef4444";
const GROUND_STROKE: &str = "#0ea5e9";
const WIRE_WIDTH: u32 = 2;

/// Style for a net. Supply rails are red and grounds blue; other nets get a
/// colour derived from a hash of their name, so it is stable between runs.
pub fn net_style(name: &str, class: NetClass) -> NetStyle {
    let stroke = match class {
        NetClass::Power => SUPPLY_STROKE.to_string(),
        NetClass::Ground => GROUND_STROKE.to_string(),
        NetClass::Signal => {
            let h = stable_hash(name) % 360;
            let s = 60 + stable_hash(&format!("{name}s")) % 25;
            let l = 32 + stable_hash(&format!("{name}l")) % 18;
            format!("hsl({h} {s}% {l}%)")
        }
    };
    NetStyle {
        stroke,
        width: WIRE_WIDTH,
        dash: String::new(),
    }
}
