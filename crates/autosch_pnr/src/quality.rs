//! Post-layout quality checks.
//!
//! The validator only reads the placed schematic. Distances are measured the
//! way the placer measures them (edge gaps, not centre distances), so a part
//! placed by its intended tier never shows up here.

use crate::classify::{ComponentKind, ConnectorClass, NetClass};
use crate::graph::Connectivity;
use crate::ids::InstanceId;
use crate::model::Schematic;
use crate::patterns::{find_decoupling_caps, LayoutPlan};
use autosch_config::EngineConfig;
use autosch_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A crystal sits too far from the core.
pub const CRYSTAL_TOO_FAR: DiagnosticCode = DiagnosticCode::new(Category::Quality, 301);
/// A chip with supply pins has no bypass capacitor.
pub const MISSING_DECOUPLING: DiagnosticCode = DiagnosticCode::new(Category::Quality, 302);
/// A bypass capacitor sits too far from its pin.
pub const DECAP_TOO_FAR: DiagnosticCode = DiagnosticCode::new(Category::Quality, 303);
/// A reset network part sits too far from the reset pin.
pub const RESET_TOO_FAR: DiagnosticCode = DiagnosticCode::new(Category::Quality, 304);
/// A repeated group is not laid out on a line.
pub const GROUP_MISALIGNED: DiagnosticCode = DiagnosticCode::new(Category::Quality, 305);
/// A connector is away from every canvas edge.
pub const CONNECTOR_OFF_EDGE: DiagnosticCode = DiagnosticCode::new(Category::Quality, 306);
/// A power connector is not on the left edge.
pub const POWER_CONNECTOR_NOT_LEFT: DiagnosticCode = DiagnosticCode::new(Category::Quality, 307);

/// Largest acceptable positional variance inside a repeated group.
const ALIGNMENT_VARIANCE_LIMIT: f64 = 10.0;
/// Extra distance beyond the edge margin that still counts as on the edge.
const EDGE_SLACK: f64 = 10.0;
/// More warnings than this downgrade the level to [`QualityLevel::Warning`].
const WARNING_LIMIT: usize = 5;

/// Overall verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityLevel {
    /// At least one critical finding.
    Poor,
    /// Many warnings.
    Warning,
    /// A few warnings.
    Good,
    /// Nothing found.
    Excellent,
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Poor => "poor",
            Self::Warning => "warning",
            Self::Good => "good",
            Self::Excellent => "excellent",
        })
    }
}

/// One quality finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Check that produced it.
    pub code: DiagnosticCode,
    /// Reference designator the finding is about.
    pub reference: String,
    /// Human-readable description.
    pub message: String,
}

/// Result of [`validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Overall verdict.
    pub level: QualityLevel,
    /// Findings that make the layout hard to use.
    pub criticals: Vec<Finding>,
    /// Findings worth a look.
    pub warnings: Vec<Finding>,
    /// Connectors found on a canvas edge.
    pub connectors_on_edge: usize,
    /// Connectors in the schematic.
    pub total_connectors: usize,
}

impl Default for QualityReport {
    fn default() -> Self {
        Self {
            level: QualityLevel::Excellent,
            criticals: Vec::new(),
            warnings: Vec::new(),
            connectors_on_edge: 0,
            total_connectors: 0,
        }
    }
}

impl QualityReport {
    fn critical(&mut self, code: DiagnosticCode, reference: &str, message: String) {
        self.criticals.push(Finding {
            code,
            reference: reference.to_string(),
            message,
        });
    }

    fn warn(&mut self, code: DiagnosticCode, reference: &str, message: String) {
        self.warnings.push(Finding {
            code,
            reference: reference.to_string(),
            message,
        });
    }

    fn settle(&mut self) {
        self.level = if !self.criticals.is_empty() {
            QualityLevel::Poor
        } else if self.warnings.len() > WARNING_LIMIT {
            QualityLevel::Warning
        } else if !self.warnings.is_empty() {
            QualityLevel::Good
        } else {
            QualityLevel::Excellent
        };
    }

    /// Emits every finding into `sink`: criticals as warnings, the rest as notes.
    pub fn emit_to(&self, sink: &DiagnosticSink) {
        for f in &self.criticals {
            sink.emit(Diagnostic::warning(f.code, f.message.clone()).on_component(f.reference.clone()));
        }
        for f in &self.warnings {
            sink.emit(Diagnostic::note(f.code, f.message.clone()).on_component(f.reference.clone()));
        }
    }
}

/// Checks a placed schematic.
pub fn validate(
    schematic: &Schematic,
    graph: &Connectivity,
    plan: &LayoutPlan,
    config: &EngineConfig,
) -> QualityReport {
    let mut report = QualityReport::default();
    let limits = &config.placement;

    if let Some(core) = plan.primary {
        let core_inst = schematic.instance(core);
        let core_rect = core_inst.rect();

        for xtal in schematic.instances.iter().filter(|i| i.kind == ComponentKind::Crystal) {
            let gap = core_rect.gap_to_rect(&xtal.rect());
            if gap > limits.crystal_max_distance {
                report.critical(
                    CRYSTAL_TOO_FAR,
                    &xtal.reference,
                    format!(
                        "crystal {} is {:.0} from {} (limit {})",
                        xtal.reference, gap, core_inst.reference, limits.crystal_max_distance
                    ),
                );
            }
        }

        for circuit in &plan.resets {
            let Some(pin) = core_inst.pin_position(circuit.pin) else {
                continue;
            };
            for part in circuit.parts() {
                let inst = schematic.instance(part);
                let gap = inst.rect().gap_to_point(pin);
                if gap > limits.reset_max_distance {
                    report.warn(
                        RESET_TOO_FAR,
                        &inst.reference,
                        format!(
                            "reset part {} is {:.0} from the reset pin (limit {})",
                            inst.reference, gap, limits.reset_max_distance
                        ),
                    );
                }
            }
        }
    }

    for group in &plan.repeated {
        let primaries: Vec<InstanceId> = group.members.iter().filter_map(|m| m.parts.first().copied()).collect();
        if primaries.len() < 2 {
            continue;
        }
        let xs: Vec<f64> = primaries.iter().map(|&id| schematic.instance(id).position.x).collect();
        let ys: Vec<f64> = primaries.iter().map(|&id| schematic.instance(id).position.y).collect();
        let variance = population_variance(&xs).min(population_variance(&ys));
        if variance > ALIGNMENT_VARIANCE_LIMIT {
            let first = &schematic.instance(primaries[0]).reference;
            report.warn(
                GROUP_MISALIGNED,
                first,
                format!("group {} is poorly aligned (variance {variance:.2})", group.signature),
            );
        }
    }

    for chip in schematic.instances.iter().filter(|i| i.is_chip()) {
        let powered = graph
            .nets_of(chip.id)
            .iter()
            .any(|&n| schematic.net(n).class == NetClass::Power);
        if !powered {
            continue;
        }
        let decaps: Vec<_> = find_decoupling_caps(schematic, graph, chip.id)
            .into_iter()
            .filter(|d| d.target == chip.id)
            .collect();
        if decaps.is_empty() {
            report.warn(
                MISSING_DECOUPLING,
                &chip.reference,
                format!("{} has supply pins but no decoupling capacitor", chip.reference),
            );
            continue;
        }
        for d in decaps {
            let Some(pin) = chip.pin_position(d.pin) else {
                continue;
            };
            let cap = schematic.instance(d.cap);
            let gap = cap.rect().gap_to_point(pin);
            if gap > limits.decap_max_distance {
                report.warn(
                    DECAP_TOO_FAR,
                    &cap.reference,
                    format!(
                        "decoupling capacitor {} is {:.0} from {} (limit {})",
                        cap.reference, gap, chip.reference, limits.decap_max_distance
                    ),
                );
            }
        }
    }

    let canvas = &config.canvas;
    let reach = canvas.edge_margin + EDGE_SLACK;
    for conn in schematic.instances.iter().filter(|i| i.kind == ComponentKind::Connector) {
        report.total_connectors += 1;
        let r = conn.rect();
        let on_left = r.x <= reach;
        let on_edge = on_left || r.right() >= canvas.width - reach || r.y <= reach || r.bottom() >= canvas.height - reach;
        if on_edge {
            report.connectors_on_edge += 1;
        } else {
            report.warn(
                CONNECTOR_OFF_EDGE,
                &conn.reference,
                format!("connector {} is not on a canvas edge", conn.reference),
            );
        }
        if conn.connector == Some(ConnectorClass::Power) && !on_left {
            report.warn(
                POWER_CONNECTOR_NOT_LEFT,
                &conn.reference,
                format!("power connector {} should sit on the left edge", conn.reference),
            );
        }
    }

    report.settle();
    log::debug!(
        "quality {}: {} critical, {} warnings",
        report.level,
        report.criticals.len(),
        report.warnings.len()
    );
    report
}

fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::model::test_support::{instance, schematic};

    fn at(sch: &mut Schematic, reference: &str, x: f64, y: f64) {
        let id = sch.find_instance(reference).unwrap();
        sch.instance_mut(id).position = Point::new(x, y);
    }

    fn check(sch: &Schematic) -> QualityReport {
        let graph = Connectivity::build(sch);
        let core = crate::patterns::choose_core(sch, &graph);
        let plan = LayoutPlan::analyze(sch, &graph, core);
        validate(sch, &graph, &plan, &EngineConfig::default())
    }

    #[test]
    fn levels_follow_counts() {
        let mut r = QualityReport::default();
        r.settle();
        assert_eq!(r.level, QualityLevel::Excellent);
        r.warn(CONNECTOR_OFF_EDGE, "J1", String::new());
        r.settle();
        assert_eq!(r.level, QualityLevel::Good);
        for _ in 0..5 {
            r.warn(CONNECTOR_OFF_EDGE, "J1", String::new());
        }
        r.settle();
        assert_eq!(r.level, QualityLevel::Warning);
        r.critical(CRYSTAL_TOO_FAR, "Y1", String::new());
        r.settle();
        assert_eq!(r.level, QualityLevel::Poor);
    }

    #[test]
    fn distant_crystal_is_critical() {
        let mut sch = schematic(
            vec![instance("U1", "MCU", 8), instance("Y1", "8MHz", 2)],
            &[("XI", &[("U1", "1"), ("Y1", "1")]), ("XO", &[("U1", "3"), ("Y1", "2")])],
        );
        at(&mut sch, "U1", 700.0, 400.0);
        at(&mut sch, "Y1", 300.0, 400.0);
        let report = check(&sch);
        assert_eq!(report.level, QualityLevel::Poor);
        assert_eq!(report.criticals[0].code, CRYSTAL_TOO_FAR);
        assert_eq!(report.criticals[0].reference, "Y1");

        at(&mut sch, "Y1", 620.0, 400.0);
        assert!(check(&sch).criticals.is_empty());
    }

    #[test]
    fn powered_chip_without_bypass_cap_is_flagged() {
        let mut sch = schematic(
            vec![instance("U1", "MCU", 4), instance("C1", "100nF", 2)],
            &[("VCC", &[("U1", "1")]), ("GND", &[("U1", "2"), ("C1", "2")])],
        );
        at(&mut sch, "U1", 700.0, 400.0);
        at(&mut sch, "C1", 600.0, 400.0);
        let report = check(&sch);
        assert!(report.warnings.iter().any(|f| f.code == MISSING_DECOUPLING && f.reference == "U1"));
    }

    #[test]
    fn far_bypass_cap_is_flagged() {
        let mut sch = schematic(
            vec![instance("U1", "MCU", 4), instance("C1", "100nF", 2)],
            &[("VCC", &[("U1", "1"), ("C1", "1")]), ("GND", &[("U1", "2"), ("C1", "2")])],
        );
        at(&mut sch, "U1", 700.0, 400.0);
        at(&mut sch, "C1", 200.0, 400.0);
        let report = check(&sch);
        assert!(report.warnings.iter().any(|f| f.code == DECAP_TOO_FAR && f.reference == "C1"));

        // Cap body right next to pin 1 at (700, 410).
        at(&mut sch, "C1", 630.0, 395.0);
        assert!(!check(&sch).warnings.iter().any(|f| f.code == DECAP_TOO_FAR));
    }

    #[test]
    fn connectors_are_checked_against_edges() {
        let mut sch = schematic(
            vec![instance("J1", "PWR", 2), instance("J2", "header", 4)],
            &[],
        );
        at(&mut sch, "J1", 1420.0, 400.0);
        at(&mut sch, "J2", 700.0, 400.0);
        let report = check(&sch);
        assert_eq!(report.total_connectors, 2);
        assert_eq!(report.connectors_on_edge, 1);
        assert!(report.warnings.iter().any(|f| f.code == POWER_CONNECTOR_NOT_LEFT && f.reference == "J1"));
        assert!(report.warnings.iter().any(|f| f.code == CONNECTOR_OFF_EDGE && f.reference == "J2"));
    }

    #[test]
    fn variance_picks_the_aligned_axis() {
        assert_eq!(population_variance(&[10.0, 10.0, 10.0]), 0.0);
        assert_eq!(population_variance(&[0.0, 10.0]), 25.0);
        assert_eq!(population_variance(&[]), 0.0);
    }

    #[test]
    fn findings_reach_the_sink() {
        let mut r = QualityReport::default();
        r.critical(CRYSTAL_TOO_FAR, "Y1", "far".into());
        r.warn(CONNECTOR_OFF_EDGE, "J2", "inside".into());
        let sink = DiagnosticSink::new();
        r.emit_to(&sink);
        let diags = sink.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(sink.warning_count(), 1);
    }
}
