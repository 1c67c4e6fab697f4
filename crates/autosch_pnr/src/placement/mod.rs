//! Hierarchical placer.
//!
//! Places the primary core first, then the parts whose position matters most
//! to it (bypass capacitors, crystal, reset network), then repeated arrays and
//! per-pin IO clusters, then everything else by connectivity, and finally the
//! connectors on the canvas edges. All state lives in a [`PlacementSession`];
//! every phase only adds placements, so a part placed early never moves
//! except for the final rotation pass.

mod arrays;
mod clusters;
mod connectors;
mod io;
mod peripherals;
mod rotation;
mod search;
mod session;

pub use connectors::{edge_for, CONNECTOR_TAG};
pub use peripherals::{CRYSTAL_TAG, DECOUPLING_TAG, RESET_TAG};
pub use session::{DEGRADED_PERIPHERAL, FORCED_PLACEMENT, RANDOM_FALLBACK};

use crate::geometry::{Point, Rotation};
use crate::graph::Connectivity;
use crate::model::Schematic;
use crate::patterns::{choose_core, find_io_clusters, LayoutPlan};
use autosch_config::EngineConfig;
use autosch_diagnostics::DiagnosticSink;
use session::{Fit, PlacementSession};

/// Places every instance of `schematic` and returns the pattern plan the
/// placement was built from.
///
/// Existing positions are discarded once the plan is derived; the only
/// thing they still decide is which power pin each bypass capacitor serves
/// and the order the capacitors are placed in. Otherwise the result depends
/// only on the netlist, the configuration and its seed.
pub fn place(
    schematic: &mut Schematic,
    graph: &Connectivity,
    config: &EngineConfig,
    sink: &DiagnosticSink,
) -> LayoutPlan {
    let core = choose_core(schematic, graph);
    let mut plan = LayoutPlan::analyze(schematic, graph, core);
    let mut s = PlacementSession::new(schematic, graph, config, sink);

    // Phase 1: primary core at the canvas centre
    if let Some(core) = core {
        let (w, h) = s.schematic().instance(core).size_at(Rotation::R0);
        let c = s.canvas_center();
        let origin = Point::new(c.x - w / 2.0, c.y - h / 2.0);
        if s.try_at(core, origin, Rotation::R0, 0.0, Fit::Normal, None) {
            log::debug!("core {} at canvas centre", s.schematic().instance(core).reference);
        } else {
            s.fallback(core, None);
        }
    }

    if let Some(core) = core {
        // Phase 2: critical peripherals
        for decap in &plan.decoupling {
            if !peripherals::place_decap(&mut s, decap) {
                s.degraded(decap.cap, "decoupling capacitor placed away from its pin");
            }
        }
        for group in &plan.crystals {
            peripherals::place_crystal_group(&mut s, core, group);
        }
        for circuit in &plan.resets {
            peripherals::place_reset_circuit(&mut s, core, circuit);
        }

        // Phase 3: repeated sub-circuits as arrays
        for (index, group) in plan.repeated.iter().enumerate() {
            arrays::place_repeated_group(&mut s, core, index, group);
        }

        // Phase 4: IO clusters on the remaining core pins
        let mut claimed = plan.critical_parts();
        claimed.extend(
            s.schematic()
                .instances
                .iter()
                .filter(|i| s.is_placed(i.id))
                .map(|i| i.id),
        );
        let io = find_io_clusters(s.schematic(), graph, core, &mut claimed);
        for cluster in &io {
            io::place_io_cluster(&mut s, core, cluster);
        }

        // Phase 5: bypass capacitors of secondary chips that are already placed
        for &chip in &plan.secondary {
            if s.is_placed(chip) {
                peripherals::place_chip_decaps(&mut s, chip);
            }
        }
    }

    // Phase 6: everything else, clustered by connectivity
    clusters::place_functional_clusters(&mut s, core);

    // Phase 7: connectors on the canvas edges
    connectors::place_connectors(&mut s);

    if config.placement.optimize_rotation {
        rotation::optimize_rotations(&mut s);
    }

    let leftovers: Vec<_> = s
        .schematic()
        .instances
        .iter()
        .filter(|i| !s.is_placed(i.id))
        .map(|i| i.id)
        .collect();
    for id in leftovers {
        s.fallback(id, None);
    }

    log::debug!("placement done: {} parts", s.placed_count());
    drop(s);
    plan.refresh_alignment(schematic);
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::{instance, schematic};

    fn board() -> Schematic {
        let mut u1 = instance("U1", "ATMEGA328", 28);
        u1.symbol.pins[6].name = "VCC".into();
        u1.symbol.pins[7].name = "GND".into();
        schematic(
            vec![
                u1,
                instance("C1", "100n", 2),
                instance("R1", "330", 2),
                instance("LED1", "red led", 2),
                instance("U2", "LM358", 8),
                instance("J1", "DC jack", 2),
                instance("J2", "header", 4),
            ],
            &[
                ("VCC", &[("U1", "7"), ("C1", "1"), ("J1", "1"), ("U2", "8")]),
                ("GND", &[("U1", "8"), ("C1", "2"), ("J1", "2"), ("U2", "4"), ("LED1", "2")]),
                ("PB0", &[("U1", "14"), ("R1", "1")]),
                ("LED_A", &[("R1", "2"), ("LED1", "1")]),
                ("AIN", &[("U1", "23"), ("U2", "1")]),
                ("OUT", &[("U2", "7"), ("J2", "1")]),
            ],
        )
    }

    #[test]
    fn every_part_is_placed_without_overlap() {
        let mut sch = board();
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        let plan = place(&mut sch, &g, &config, &sink);
        assert_eq!(plan.primary, sch.find_instance("U1"));
        assert_eq!(sink.warning_count(), 0);

        let rects: Vec<_> = sch.instances.iter().map(|i| (i.group.clone(), i.rect())).collect();
        for (i, (ga, a)) in rects.iter().enumerate() {
            assert!(a.x >= 20.0 && a.y >= 20.0 && a.right() <= 1480.0 && a.bottom() <= 930.0);
            for (gb, b) in &rects[i + 1..] {
                if ga.is_none() || ga != gb {
                    assert!(!a.overlaps(b), "{a:?} overlaps {b:?}");
                }
            }
        }
        let j1 = sch.find_instance("J1").unwrap();
        assert_eq!(sch.instance(j1).position.x, 20.0);
    }

    #[test]
    fn oversized_core_is_forced_with_a_warning() {
        let mut sch = schematic(
            vec![instance("U1", "MCU", 240), instance("R1", "10k", 2)],
            &[("P1", &[("U1", "1"), ("R1", "1")])],
        );
        let g = Connectivity::build(&sch);
        let config = EngineConfig::default();
        let sink = DiagnosticSink::new();
        place(&mut sch, &g, &config, &sink);

        let u1 = sch.instance(sch.find_instance("U1").unwrap());
        assert!(u1.rect().h > config.canvas.height);
        assert_eq!(u1.position, Point::new(20.0, 20.0));
        assert_eq!(sink.count_of(FORCED_PLACEMENT), 1);
    }

    #[test]
    fn drawn_bypass_caps_keep_their_pins() {
        let mut sch = schematic(
            vec![
                instance("U1", "AT89C51", 40),
                instance("C1", "100n", 2),
                instance("C6", "100n", 2),
            ],
            &[
                ("VCC", &[("U1", "10"), ("U1", "40"), ("C1", "1"), ("C6", "1")]),
                ("GND", &[("U1", "20"), ("C1", "2"), ("C6", "2")]),
            ],
        );
        let u1 = sch.find_instance("U1").unwrap();
        let c1 = sch.find_instance("C1").unwrap();
        let c6 = sch.find_instance("C6").unwrap();
        sch.instance_mut(u1).position = Point::new(500.0, 400.0);
        sch.instance_mut(c1).position = Point::new(575.0, 450.0);
        sch.instance_mut(c6).position = Point::new(570.0, 600.0);
        let g = Connectivity::build(&sch);
        let sink = DiagnosticSink::new();
        let plan = place(&mut sch, &g, &EngineConfig::default(), &sink);

        let served: Vec<_> = plan.decoupling.iter().map(|d| (d.cap, d.pin)).collect();
        assert_eq!(served, vec![(c1, 9), (c6, 39)]);
        for (cap, pin) in served {
            let pin = sch.instance(u1).pin_position(pin).unwrap();
            let rect = sch.instance(cap).rect();
            assert!(rect.gap_to_point(pin) <= 25.0, "{rect:?} too far from {pin:?}");
        }
    }

    #[test]
    fn placement_is_deterministic() {
        let run = || {
            let mut sch = board();
            let g = Connectivity::build(&sch);
            place(&mut sch, &g, &EngineConfig::default(), &DiagnosticSink::new());
            sch.instances.iter().map(|i| (i.position, i.rotation)).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
