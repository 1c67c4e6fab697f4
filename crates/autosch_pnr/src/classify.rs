//! Component and net classification from names, values, and library keys.
//!
//! Component kinds come from an ordered [`ClassifierTable`]: the first rule
//! whose predicate matches a [`Descriptor`] wins. Callers may push extra
//! rules or insert overrides at the front without touching placement code.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad component category used by the pattern detector and placer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Board connector or header.
    Connector,
    /// Capacitor.
    Capacitor,
    /// Resistor.
    Resistor,
    /// Inductor or choke.
    Inductor,
    /// Light-emitting diode.
    Led,
    /// Any other diode.
    Diode,
    /// Push button or switch.
    Switch,
    /// Crystal or resonator.
    Crystal,
    /// Generic integrated circuit.
    Ic,
    /// Microcontroller.
    Mcu,
    /// Anything else.
    Misc,
}

impl ComponentKind {
    /// Returns `true` for ICs and microcontrollers.
    pub fn is_chip(self) -> bool {
        matches!(self, ComponentKind::Ic | ComponentKind::Mcu)
    }

    /// Short name used in circuit signatures.
    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Connector => "Connector",
            ComponentKind::Capacitor => "Capacitor",
            ComponentKind::Resistor => "Resistor",
            ComponentKind::Inductor => "Inductor",
            ComponentKind::Led => "LED",
            ComponentKind::Diode => "Diode",
            ComponentKind::Switch => "Switch",
            ComponentKind::Crystal => "Crystal",
            ComponentKind::Ic => "IC",
            ComponentKind::Mcu => "MCU",
            ComponentKind::Misc => "Misc",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The facts a classifier rule may look at.
#[derive(Clone, Debug)]
pub struct Descriptor {
    /// Reference designator, upper-cased.
    pub reference: String,
    /// Value text, lower-cased.
    pub value: String,
    /// Library key, lower-cased.
    pub key: String,
    /// Number of pins on the symbol.
    pub pin_count: usize,
}

impl Descriptor {
    /// Builds a descriptor, normalising case.
    pub fn new(reference: &str, value: &str, key: &str, pin_count: usize) -> Self {
        Self {
            reference: reference.trim().to_uppercase(),
            value: value.trim().to_lowercase(),
            key: key.trim().to_lowercase(),
            pin_count,
        }
    }

    fn key_or_value_contains(&self, words: &[&str]) -> bool {
        words
            .iter()
            .any(|w| self.key.contains(w) || self.value.contains(w))
    }

    fn value_contains(&self, words: &[&str]) -> bool {
        words.iter().any(|w| self.value.contains(w))
    }

    fn ref_prefix(&self, prefixes: &[&str]) -> bool {
        prefixes.iter().any(|p| prefixed_number(&self.reference, p))
    }
}

/// Returns `true` if `text` is `prefix` followed by at least one digit.
fn prefixed_number(text: &str, prefix: &str) -> bool {
    text.strip_prefix(prefix)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// One entry of a [`ClassifierTable`].
pub struct ClassifierRule {
    name: &'static str,
    kind: ComponentKind,
    matches: Box<dyn Fn(&Descriptor) -> bool + Send + Sync>,
}

impl ClassifierRule {
    /// Creates a rule assigning `kind` to every descriptor matching `predicate`.
    pub fn new(
        name: &'static str,
        kind: ComponentKind,
        predicate: impl Fn(&Descriptor) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            kind,
            matches: Box::new(predicate),
        }
    }

    /// Rule name, for debugging.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Kind assigned by this rule.
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }
}

impl fmt::Debug for ClassifierRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierRule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

const MCU_WORDS: &[&str] = &[
    "mcu",
    "microcontroller",
    "stm32",
    "esp32",
    "esp8266",
    "atmega",
    "attiny",
    "nrf",
    "samd",
    "8051",
    "mcs51",
    "avr",
    "rp2040",
    "89c51",
];

const CONNECTOR_WORDS: &[&str] = &[
    "header", "hdr", "connector", "conn", "socket", "port", "plug", "jack", "usb",
];

const IC_WORDS: &[&str] = &[
    "fpga", "cpu", "soc", "ic", "opamp", "sensor", "adc", "dac", "driver", "cpld",
];

fn is_chip_like(d: &Descriptor) -> bool {
    d.ref_prefix(&["U"]) || d.key_or_value_contains(IC_WORDS) || d.pin_count >= 8
}

/// Ordered list of classification rules.
#[derive(Debug)]
pub struct ClassifierTable {
    rules: Vec<ClassifierRule>,
}

impl ClassifierTable {
    /// Creates a table with no rules; everything classifies as `Misc`.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Appends a rule with the lowest priority.
    pub fn push(&mut self, rule: ClassifierRule) {
        self.rules.push(rule);
    }

    /// Inserts a rule with the highest priority.
    pub fn insert_front(&mut self, rule: ClassifierRule) {
        self.rules.insert(0, rule);
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[ClassifierRule] {
        &self.rules
    }

    /// Classifies a descriptor by the first matching rule.
    pub fn classify(&self, descriptor: &Descriptor) -> ComponentKind {
        self.rules
            .iter()
            .find(|rule| (rule.matches)(descriptor))
            .map_or(ComponentKind::Misc, |rule| rule.kind)
    }
}

impl Default for ClassifierTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.push(ClassifierRule::new("connector", ComponentKind::Connector, |d| {
            d.ref_prefix(&["J", "P", "K", "CN"]) || d.key_or_value_contains(CONNECTOR_WORDS)
        }));
        table.push(ClassifierRule::new("capacitor", ComponentKind::Capacitor, |d| {
            d.ref_prefix(&["C"]) || d.value_contains(&["cap"])
        }));
        table.push(ClassifierRule::new("resistor", ComponentKind::Resistor, |d| {
            d.ref_prefix(&["R"]) || d.value_contains(&["res"])
        }));
        table.push(ClassifierRule::new("inductor", ComponentKind::Inductor, |d| {
            d.ref_prefix(&["L"]) || d.value_contains(&["inductor", "choke"])
        }));
        table.push(ClassifierRule::new("led", ComponentKind::Led, |d| {
            d.ref_prefix(&["LED"]) || d.key_or_value_contains(&["led"])
        }));
        table.push(ClassifierRule::new("diode", ComponentKind::Diode, |d| {
            d.ref_prefix(&["D"]) || d.value_contains(&["diode", "1n4148", "schottky"])
        }));
        table.push(ClassifierRule::new("switch", ComponentKind::Switch, |d| {
            d.ref_prefix(&["S", "SW"]) || d.key_or_value_contains(&["switch", "button"])
        }));
        table.push(ClassifierRule::new("crystal", ComponentKind::Crystal, |d| {
            d.ref_prefix(&["Y", "X"]) || d.key_or_value_contains(&["crystal", "xtal", "resonator"])
        }));
        table.push(ClassifierRule::new("mcu", ComponentKind::Mcu, |d| {
            is_chip_like(d) && d.key_or_value_contains(MCU_WORDS)
        }));
        table.push(ClassifierRule::new("ic", ComponentKind::Ic, is_chip_like));
        table
    }
}

/// Electrical role of a net, derived from its name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetClass {
    /// Supply rail.
    Power,
    /// Ground return.
    Ground,
    /// Anything else.
    Signal,
}

impl NetClass {
    /// Classifies a net name. Ground wins over power for names like `VSS`.
    pub fn of(name: &str) -> Self {
        if is_ground_name(name) {
            NetClass::Ground
        } else if is_power_name(name) {
            NetClass::Power
        } else {
            NetClass::Signal
        }
    }

    /// Returns `true` for power and ground nets.
    pub fn is_supply(self) -> bool {
        !matches!(self, NetClass::Signal)
    }
}

/// Matches supply rail names: `VCC`, `VDD`, `VIN`, `+5V`, `3V3`, `3.3V`, `VCC_IO`.
pub fn is_power_name(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    if upper.is_empty() {
        return false;
    }
    const RAILS: &[&str] = &["VCC", "VDD", "VEE", "VBUS", "VIN", "AVDD", "DVDD", "VREF"];
    if RAILS.contains(&upper.as_str()) || upper.contains("VCC") || upper.contains("VDD") {
        return true;
    }
    is_voltage_literal(upper.strip_prefix('+').unwrap_or(&upper))
}

/// Matches a leading voltage literal such as `5V`, `3V3`, `1V8` or `3.3V`.
fn is_voltage_literal(text: &str) -> bool {
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return false;
    }
    let rest = &text[digits..];
    if rest.starts_with('V') {
        return true;
    }
    if let Some(fraction) = rest.strip_prefix('.') {
        let frac_digits = fraction.chars().take_while(|c| c.is_ascii_digit()).count();
        return frac_digits > 0 && fraction[frac_digits..].starts_with('V');
    }
    false
}

/// Matches ground names: `GND`, `VSS`, `AGND`, `PGND`, ...
pub fn is_ground_name(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    !upper.is_empty() && (upper.contains("GND") || upper.contains("VSS"))
}

/// Matches the canonical reset names exactly (case-insensitive).
pub fn is_reset_name(name: &str) -> bool {
    matches!(
        name.trim().to_uppercase().as_str(),
        "RESET" | "RST" | "NRST" | "NRESET" | "MCLR"
    )
}

/// Matches reset names plus anything containing `RST` or `RESET`.
pub fn is_reset_like(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    is_reset_name(&upper) || upper.contains("RST") || upper.contains("RESET")
}

/// Where a connector belongs on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorClass {
    /// Power input jack or terminal.
    Power,
    /// Signal input.
    Input,
    /// Signal output (motors, displays).
    Output,
    /// Communication port.
    Comm,
    /// General purpose IO header.
    Io,
}

impl ConnectorClass {
    /// Returns `true` for classes that count as board inputs.
    pub fn is_boundary_input(self) -> bool {
        matches!(
            self,
            ConnectorClass::Power | ConnectorClass::Input | ConnectorClass::Comm
        )
    }
}

/// Classifies a connector by reference, value keywords, and pin count.
pub fn classify_connector(d: &Descriptor) -> ConnectorClass {
    let r = d.reference.as_str();
    let v = d.value.as_str();
    let any = |words: &[&str]| words.iter().any(|w| v.contains(w));

    if r == "POWER"
        || r == "POWER-2P"
        || r.starts_with("PWR")
        || any(&["power", "vin", "dc", "pwr", "supply", "12v", "5v", "vcc"])
        || (d.pin_count == 2 && (v.contains("2p") || r.contains("2P") || r == "J1"))
    {
        return ConnectorClass::Power;
    }
    if r.contains("MOTOR") || any(&["motor", "stepper", "step"]) {
        return ConnectorClass::Output;
    }
    if any(&["led", "display", "lcd", "oled", "out"]) || r.starts_with('D') {
        return ConnectorClass::Output;
    }
    if any(&["sw", "switch", "button", "sensor", "input", "in"]) {
        return ConnectorClass::Input;
    }
    if any(&["uart", "serial", "rs232", "rs485", "i2c", "spi", "can", "comm"]) {
        return ConnectorClass::Comm;
    }
    match d.pin_count {
        2 | 3 => ConnectorClass::Input,
        5 | 6 => ConnectorClass::Output,
        _ => ConnectorClass::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(reference: &str, value: &str, key: &str, pins: usize) -> ComponentKind {
        ClassifierTable::default().classify(&Descriptor::new(reference, value, key, pins))
    }

    #[test]
    fn classifies_by_reference_prefix() {
        assert_eq!(kind("C1", "", "", 2), ComponentKind::Capacitor);
        assert_eq!(kind("R12", "10k", "", 2), ComponentKind::Resistor);
        assert_eq!(kind("J3", "", "", 4), ComponentKind::Connector);
        assert_eq!(kind("CN1", "", "", 4), ComponentKind::Connector);
        assert_eq!(kind("Y1", "", "", 2), ComponentKind::Crystal);
        assert_eq!(kind("SW2", "", "", 2), ComponentKind::Switch);
        assert_eq!(kind("D1", "1N4148", "", 2), ComponentKind::Diode);
        assert_eq!(kind("Q1", "", "", 3), ComponentKind::Misc);
    }

    #[test]
    fn led_wins_over_diode() {
        assert_eq!(kind("D4", "LED red", "", 2), ComponentKind::Led);
        assert_eq!(kind("LED1", "", "", 2), ComponentKind::Led);
    }

    #[test]
    fn mcu_versus_ic() {
        assert_eq!(kind("U1", "STM32F103", "", 48), ComponentKind::Mcu);
        assert_eq!(kind("U2", "LM358", "", 8), ComponentKind::Ic);
        assert_eq!(kind("X9", "", "at89c51", 40), ComponentKind::Crystal);
        assert_eq!(kind("IC1", "", "", 14), ComponentKind::Ic);
    }

    #[test]
    fn custom_rule_takes_priority() {
        let mut table = ClassifierTable::default();
        table.insert_front(ClassifierRule::new("relay", ComponentKind::Misc, |d| {
            d.value.contains("relay")
        }));
        assert_eq!(
            table.classify(&Descriptor::new("K1", "Relay 5V", "", 5)),
            ComponentKind::Misc
        );
        assert_eq!(table.rules()[0].name(), "relay");
    }

    #[test]
    fn empty_table_yields_misc() {
        let table = ClassifierTable::empty();
        assert_eq!(table.classify(&Descriptor::new("U1", "", "", 40)), ComponentKind::Misc);
    }

    #[test]
    fn net_names() {
        for name in ["VCC", "+5V", "3V3", "3.3V", "vdd_io", "VBUS", "1V8"] {
            assert_eq!(NetClass::of(name), NetClass::Power, "{name}");
        }
        for name in ["GND", "AGND", "vss"] {
            assert_eq!(NetClass::of(name), NetClass::Ground, "{name}");
        }
        for name in ["SDA", "V", "5", "P1.0", "VOUT"] {
            assert_eq!(NetClass::of(name), NetClass::Signal, "{name}");
        }
    }

    #[test]
    fn reset_names() {
        assert!(is_reset_name("nRST"));
        assert!(!is_reset_name("RST_OUT"));
        assert!(is_reset_like("RST_OUT"));
        assert!(!is_reset_like("P3.2"));
    }

    #[test]
    fn connector_classes() {
        let c = |r: &str, v: &str, n: usize| classify_connector(&Descriptor::new(r, v, "", n));
        assert_eq!(c("J5", "DC Jack", 3), ConnectorClass::Power);
        assert_eq!(c("J1", "", 2), ConnectorClass::Power);
        assert_eq!(c("P2", "Stepper", 5), ConnectorClass::Output);
        assert_eq!(c("P3", "UART", 4), ConnectorClass::Comm);
        assert_eq!(c("P4", "", 3), ConnectorClass::Input);
        assert_eq!(c("P5", "", 10), ConnectorClass::Io);
    }
}
