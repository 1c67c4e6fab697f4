//! Repeated sub-circuits hanging off core pins (button banks, LED arrays).

use crate::classify::{is_reset_like, ComponentKind, NetClass};
use crate::graph::Connectivity;
use crate::ids::{InstanceId, NetId};
use crate::model::{PinRef, Schematic};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Role-aware signature of the parts on one core pin.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signature {
    /// Switch and resistor, switch returns to ground.
    ButtonPullup,
    /// Switch and resistor, switch returns to a supply.
    ButtonPulldown,
    /// Switch and resistor with a signal return.
    ButtonWithResistor,
    /// Switch straight to ground.
    ButtonDirectGnd,
    /// Switch straight to a supply.
    ButtonDirectVcc,
    /// Switch with no supply return.
    ButtonFloating,
    /// LED with a series resistor.
    LedArray,
    /// LED on its own.
    LedDirect,
    /// Sorted part kinds joined by `+`.
    Generic(String),
}

impl Signature {
    /// True for the button family.
    pub fn is_button(&self) -> bool {
        matches!(
            self,
            Self::ButtonPullup
                | Self::ButtonPulldown
                | Self::ButtonWithResistor
                | Self::ButtonDirectGnd
                | Self::ButtonDirectVcc
                | Self::ButtonFloating
        )
    }

    /// True for the LED family.
    pub fn is_led(&self) -> bool {
        matches!(self, Self::LedArray | Self::LedDirect)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ButtonPullup => "BUTTON_PULLUP",
            Self::ButtonPulldown => "BUTTON_PULLDOWN",
            Self::ButtonWithResistor => "BUTTON_WITH_RESISTOR",
            Self::ButtonDirectGnd => "BUTTON_DIRECT_GND",
            Self::ButtonDirectVcc => "BUTTON_DIRECT_VCC",
            Self::ButtonFloating => "BUTTON_FLOATING",
            Self::LedArray => "LED_ARRAY",
            Self::LedDirect => "LED_DIRECT",
            Self::Generic(s) => s,
        };
        f.write_str(name)
    }
}

/// One repetition: a core pin and the parts on its net.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedMember {
    /// Core pin index.
    pub pin: usize,
    /// Net on the pin.
    pub net: NetId,
    /// Parts of this repetition, primary part first.
    pub parts: Vec<InstanceId>,
}

/// Two or more core pins carrying the same kind of circuit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatedGroup {
    /// Shared signature.
    pub signature: Signature,
    /// Members ordered by pin name digits.
    pub members: Vec<RepeatedMember>,
}

fn is_switch(schematic: &Schematic, id: InstanceId) -> bool {
    let inst = schematic.instance(id);
    inst.kind == ComponentKind::Switch
        || (inst.kind == ComponentKind::Misc
            && (inst.value.to_lowercase().contains("sw")
                || inst.reference.to_uppercase().starts_with('S')))
}

fn is_led(schematic: &Schematic, id: InstanceId) -> bool {
    let inst = schematic.instance(id);
    inst.kind == ComponentKind::Led || inst.value.to_lowercase().contains("led")
}

fn signature_of(
    schematic: &Schematic,
    graph: &Connectivity,
    parts: &[InstanceId],
    pin_net: NetId,
) -> Signature {
    let switch = parts.iter().copied().find(|&p| is_switch(schematic, p));
    let has_resistor = parts
        .iter()
        .any(|&p| schematic.instance(p).kind == ComponentKind::Resistor);
    if let Some(sw) = switch {
        let other = graph
            .nets_of(sw)
            .iter()
            .copied()
            .find(|&n| n != pin_net)
            .map(|n| schematic.net(n).class);
        return match (has_resistor, other) {
            (true, Some(NetClass::Ground)) => Signature::ButtonPullup,
            (true, Some(NetClass::Power)) => Signature::ButtonPulldown,
            (true, _) => Signature::ButtonWithResistor,
            (false, Some(NetClass::Ground)) => Signature::ButtonDirectGnd,
            (false, Some(NetClass::Power)) => Signature::ButtonDirectVcc,
            (false, _) => Signature::ButtonFloating,
        };
    }
    if parts.iter().any(|&p| is_led(schematic, p)) {
        return if has_resistor {
            Signature::LedArray
        } else {
            Signature::LedDirect
        };
    }
    let mut kinds: Vec<&str> = parts
        .iter()
        .map(|&p| schematic.instance(p).kind.name())
        .collect();
    kinds.sort_unstable();
    Signature::Generic(kinds.join("+"))
}

/// Sort key for a core pin: digits in its name, else its number.
fn pin_order_key(schematic: &Schematic, core: InstanceId, pin: usize) -> u64 {
    let p = &schematic.instance(core).symbol.pins[pin];
    let digits: String = p.name.chars().filter(char::is_ascii_digit).collect();
    digits
        .parse()
        .or_else(|_| p.number.parse())
        .unwrap_or(pin as u64)
}

/// Groups core pins by the signature of the circuit hanging off each.
///
/// Parts in `claimed` (already taken by critical peripherals) are ignored.
/// Pins whose nets also reach another chip or a connector are buses, not
/// local circuits, and are skipped. A part claimed by an earlier member of
/// the same group drops the later member.
pub fn find_repeated_groups(
    schematic: &Schematic,
    graph: &Connectivity,
    core: InstanceId,
    claimed: &BTreeSet<InstanceId>,
) -> Vec<RepeatedGroup> {
    let inst = schematic.instance(core);
    let mut buckets: Vec<(Signature, Vec<RepeatedMember>)> = Vec::new();

    for pin in 0..inst.symbol.pins.len() {
        let nets = schematic.nets_of_pin(PinRef { instance: core, pin });
        let Some(&first) = nets.first() else { continue };
        let pin_name = &inst.symbol.pins[pin].name;
        if NetClass::of(pin_name).is_supply()
            || is_reset_like(pin_name)
            || nets.iter().any(|&n| {
                let net = schematic.net(n);
                net.class.is_supply() || is_reset_like(&net.name)
            })
        {
            continue;
        }

        let mut parts = Vec::new();
        let mut bus = false;
        for &n in nets {
            for other in schematic.net(n).instances() {
                if other == core || parts.contains(&other) || claimed.contains(&other) {
                    continue;
                }
                let o = schematic.instance(other);
                if o.is_chip() || o.kind == ComponentKind::Connector {
                    bus = true;
                }
                parts.push(other);
            }
        }
        if bus || parts.is_empty() {
            continue;
        }
        // Primary part first: the switch or LED if there is one.
        parts.sort_by_key(|&p| !(is_switch(schematic, p) || is_led(schematic, p)));

        let signature = signature_of(schematic, graph, &parts, first);
        let member = RepeatedMember {
            pin,
            net: first,
            parts,
        };
        match buckets.iter_mut().find(|(s, _)| *s == signature) {
            Some((_, members)) => members.push(member),
            None => buckets.push((signature, vec![member])),
        }
    }

    let mut groups = Vec::new();
    for (signature, mut members) in buckets {
        members.sort_by_key(|m| pin_order_key(schematic, core, m.pin));
        let mut used = BTreeSet::new();
        members.retain(|m| {
            if m.parts.iter().any(|p| used.contains(p)) {
                return false;
            }
            used.extend(m.parts.iter().copied());
            true
        });
        if members.len() >= 2 {
            groups.push(RepeatedGroup { signature, members });
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{instance, schematic};

    fn button_board() -> Schematic {
        let mut u1 = instance("U1", "ATMEGA328", 28);
        for i in 0..4 {
            u1.symbol.pins[10 + i].name = format!("PD{}", 3 - i);
        }
        let mut instances = vec![u1];
        for i in 1..=4 {
            instances.push(instance(&format!("SW{i}"), "button", 2));
            instances.push(instance(&format!("R{i}"), "10k", 2));
        }
        instances.push(instance("D1", "LED", 2));
        schematic(
            instances,
            &[
                ("B1", &[("U1", "11"), ("SW1", "1"), ("R1", "1")]),
                ("B2", &[("U1", "12"), ("SW2", "1"), ("R2", "1")]),
                ("B3", &[("U1", "13"), ("SW3", "1"), ("R3", "1")]),
                ("B4", &[("U1", "14"), ("SW4", "1"), ("R4", "1")]),
                ("L1", &[("U1", "2"), ("D1", "1")]),
                (
                    "GND",
                    &[("SW1", "2"), ("SW2", "2"), ("SW3", "2"), ("SW4", "2"), ("D1", "2")],
                ),
                ("VCC", &[("R1", "2"), ("R2", "2"), ("R3", "2"), ("R4", "2")]),
            ],
        )
    }

    #[test]
    fn finds_pullup_buttons_in_pin_name_order() {
        let sch = button_board();
        let g = Connectivity::build(&sch);
        let u1 = sch.find_instance("U1").unwrap();
        let groups = find_repeated_groups(&sch, &g, u1, &BTreeSet::new());
        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.signature, Signature::ButtonPullup);
        assert_eq!(group.signature.to_string(), "BUTTON_PULLUP");
        assert_eq!(group.members.len(), 4);
        // PD0 is on pin 14, so SW4 comes first.
        assert_eq!(group.members[0].parts[0], sch.find_instance("SW4").unwrap());
        assert_eq!(group.members[0].parts[1], sch.find_instance("R4").unwrap());
    }

    #[test]
    fn claimed_parts_are_ignored() {
        let sch = button_board();
        let g = Connectivity::build(&sch);
        let u1 = sch.find_instance("U1").unwrap();
        let claimed: BTreeSet<_> = ["R1", "R2", "R3", "R4"]
            .iter()
            .filter_map(|r| sch.find_instance(r))
            .collect();
        let groups = find_repeated_groups(&sch, &g, u1, &claimed);
        assert_eq!(groups[0].signature, Signature::ButtonDirectGnd);
    }

    #[test]
    fn single_circuits_are_not_groups() {
        let sch = schematic(
            vec![instance("U1", "IC", 8), instance("D1", "LED", 2), instance("R1", "1k", 2)],
            &[("A", &[("U1", "1"), ("D1", "1")]), ("B", &[("U1", "2"), ("R1", "1")])],
        );
        let g = Connectivity::build(&sch);
        let groups = find_repeated_groups(&sch, &g, sch.find_instance("U1").unwrap(), &BTreeSet::new());
        assert!(groups.is_empty());
    }

    #[test]
    fn generic_signature_sorts_kinds() {
        let sch = schematic(
            vec![
                instance("U1", "IC", 8),
                instance("R1", "1k", 2),
                instance("C1", "1n", 2),
                instance("R2", "1k", 2),
                instance("C2", "1n", 2),
            ],
            &[
                ("A", &[("U1", "1"), ("R1", "1"), ("C1", "1")]),
                ("B", &[("U1", "2"), ("C2", "1"), ("R2", "1")]),
            ],
        );
        let g = Connectivity::build(&sch);
        let groups = find_repeated_groups(&sch, &g, sch.find_instance("U1").unwrap(), &BTreeSet::new());
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].signature, Signature::Generic("Capacitor+Resistor".into()));
    }
}
