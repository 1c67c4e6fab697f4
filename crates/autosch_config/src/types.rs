//! Configuration types deserialized from `autosch.toml`.

use serde::Deserialize;

/// The top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Canvas geometry.
    pub canvas: CanvasConfig,
    /// Placement tuning.
    pub placement: PlacementConfig,
    /// Routing tuning.
    pub routing: RoutingConfig,
}

/// Canvas size, grid pitch and the margin every component must keep from the edge.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Canvas width in canvas units.
    pub width: f64,
    /// Canvas height in canvas units.
    pub height: f64,
    /// Grid pitch; every placed position is a multiple of it.
    pub grid: f64,
    /// Minimum distance between a component rect and the canvas edge.
    pub edge_margin: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1500.0,
            height: 950.0,
            grid: 10.0,
            edge_margin: 20.0,
        }
    }
}

/// Placement tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    /// Seed for the placement fallback generator.
    pub seed: u64,
    /// Clearance added around every component rect for collision checks.
    pub avoid_clearance: f64,
    /// Gap between the core and peripherals placed against one of its sides.
    pub core_margin: f64,
    /// Maximum decoupling capacitor distance from its power pin.
    pub decap_max_distance: f64,
    /// Maximum crystal distance from the core, checked by the validator.
    pub crystal_max_distance: f64,
    /// Maximum reset part distance from its pin.
    pub reset_max_distance: f64,
    /// Steps scanned by the near-core-side search.
    pub periph_scan_steps: u32,
    /// First ring radius for cluster seeds.
    pub cluster_ring_base: f64,
    /// Ring radius increment for cluster seeds.
    pub cluster_ring_step: f64,
    /// Number of cluster seed rings tried before the random fallback.
    pub cluster_ring_count: u32,
    /// Radius increment when packing cluster members around their seed.
    pub local_spacing: f64,
    /// Attempts per cluster member on the local ring.
    pub local_ring_tries: u32,
    /// Gap kept between connectors along a canvas edge.
    pub connector_spacing: f64,
    /// Turn two-pin passives towards their connections after placement.
    pub optimize_rotation: bool,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            avoid_clearance: 4.0,
            core_margin: 24.0,
            decap_max_distance: 25.0,
            crystal_max_distance: 30.0,
            reset_max_distance: 35.0,
            periph_scan_steps: 60,
            cluster_ring_base: 140.0,
            cluster_ring_step: 100.0,
            cluster_ring_count: 15,
            local_spacing: 28.0,
            local_ring_tries: 120,
            connector_spacing: 28.0,
            optimize_rotation: true,
        }
    }
}

/// How far apart parallel wires sharing a lane key are drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneSpacingMode {
    /// Tight spacing for nets whose pins are close together, standard otherwise.
    #[default]
    Auto,
    /// Always the standard spacing.
    Standard,
    /// Always the tight spacing.
    Compact,
}

/// Routing tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RoutingConfig {
    /// Extra clearance (on top of the placement clearance) wires keep from components.
    pub route_clearance: f64,
    /// Pin escape stub length for small parts.
    pub stub_length: f64,
    /// Pin escape stub length for ICs.
    pub ic_stub_length: f64,
    /// Minimum power glyph stub for small parts.
    pub power_stub: f64,
    /// Minimum power glyph stub for ICs.
    pub ic_power_stub: f64,
    /// Cost of a 90 degree turn in the grid search (charged twice).
    pub turn_penalty: f64,
    /// Cost of stepping away from the target.
    pub backwards_penalty: f64,
    /// Pairwise connections longer than this become labels.
    pub max_wire_length: f64,
    /// Grid search iteration budget.
    pub astar_max_iterations: u32,
    /// Grid search wall-clock budget in milliseconds.
    pub astar_time_limit_ms: u64,
    /// Lane spacing strategy.
    pub lane_spacing: LaneSpacingMode,
    /// Standard lane spacing.
    pub lane_spacing_standard: f64,
    /// Tight lane spacing.
    pub lane_spacing_tight: f64,
    /// Diagonal span below which `auto` lane spacing is tight.
    pub net_locality_threshold: f64,
    /// Largest lane index handed out per lane key.
    pub lane_max: i32,
    /// Pins closer than this are bussed together before global routing.
    pub local_cluster_radius: f64,
    /// Grid steps scanned on each side when positioning a trunk.
    pub trunk_scan_steps: u32,
    /// Longest stub tried when placing a net label.
    pub label_stub_max: f64,
    /// Width of the obstacle recorded for each drawn wire segment.
    pub wire_obstacle_width: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            route_clearance: 8.0,
            stub_length: 18.0,
            ic_stub_length: 36.0,
            power_stub: 20.0,
            ic_power_stub: 30.0,
            turn_penalty: 20.0,
            backwards_penalty: 10.0,
            max_wire_length: 1000.0,
            astar_max_iterations: 60_000,
            astar_time_limit_ms: 600,
            lane_spacing: LaneSpacingMode::Auto,
            lane_spacing_standard: 10.0,
            lane_spacing_tight: 6.0,
            net_locality_threshold: 250.0,
            lane_max: 6,
            local_cluster_radius: 120.0,
            trunk_scan_steps: 24,
            label_stub_max: 54.0,
            wire_obstacle_width: 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.canvas.width, 1500.0);
        assert_eq!(cfg.canvas.grid, 10.0);
        assert_eq!(cfg.placement.seed, 42);
        assert_eq!(cfg.routing.astar_max_iterations, 60_000);
        assert_eq!(cfg.routing.lane_spacing, LaneSpacingMode::Auto);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: EngineConfig = toml::from_str("[routing]\nlane_max = 3\n").unwrap();
        assert_eq!(cfg.routing.lane_max, 3);
        assert_eq!(cfg.routing.stub_length, 18.0);
        assert_eq!(cfg.canvas, CanvasConfig::default());
    }

    #[test]
    fn lane_mode_lowercase() {
        let cfg: EngineConfig = toml::from_str("[routing]\nlane_spacing = \"compact\"\n").unwrap();
        assert_eq!(cfg.routing.lane_spacing, LaneSpacingMode::Compact);
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(toml::from_str::<EngineConfig>("[canvas]\ncolour = 1\n").is_err());
    }
}
