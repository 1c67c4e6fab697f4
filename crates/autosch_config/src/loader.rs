//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::EngineConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "autosch.toml";

/// Loads and validates `<dir>/autosch.toml`.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    let content = std::fs::read_to_string(dir.join(CONFIG_FILE_NAME))?;
    load_config_from_str(&content)
}

/// Parses and validates configuration text.
pub fn load_config_from_str(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn positive(value: f64, key: &'static str) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, format!("must be positive, got {value}")))
    }
}

/// Checks values the engine divides by or iterates over.
fn validate_config(config: &EngineConfig) -> Result<(), ConfigError> {
    let canvas = &config.canvas;
    positive(canvas.width, "canvas.width")?;
    positive(canvas.height, "canvas.height")?;
    positive(canvas.grid, "canvas.grid")?;
    if canvas.edge_margin < 0.0
        || canvas.edge_margin * 2.0 >= canvas.width
        || canvas.edge_margin * 2.0 >= canvas.height
    {
        return Err(ConfigError::invalid(
            "canvas.edge_margin",
            format!(
                "{} does not fit a {}x{} canvas",
                canvas.edge_margin, canvas.width, canvas.height
            ),
        ));
    }
    positive(config.placement.local_spacing, "placement.local_spacing")?;
    positive(config.placement.cluster_ring_step, "placement.cluster_ring_step")?;
    positive(
        config.routing.lane_spacing_standard,
        "routing.lane_spacing_standard",
    )?;
    positive(config.routing.lane_spacing_tight, "routing.lane_spacing_tight")?;
    if config.routing.lane_max < 0 {
        return Err(ConfigError::invalid("routing.lane_max", "must not be negative"));
    }
    if config.routing.astar_max_iterations == 0 {
        return Err(ConfigError::invalid(
            "routing.astar_max_iterations",
            "must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LaneSpacingMode;

    #[test]
    fn empty_file_is_default() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[canvas]
width = 2000
height = 1200
grid = 5
edge_margin = 30

[placement]
seed = 7
decap_max_distance = 40
optimize_rotation = false

[routing]
lane_spacing = "standard"
astar_time_limit_ms = 50
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.canvas.width, 2000.0);
        assert_eq!(config.canvas.grid, 5.0);
        assert_eq!(config.placement.seed, 7);
        assert!(!config.placement.optimize_rotation);
        assert_eq!(config.routing.lane_spacing, LaneSpacingMode::Standard);
        assert_eq!(config.routing.astar_time_limit_ms, 50);
    }

    #[test]
    fn zero_grid_errors() {
        let err = load_config_from_str("[canvas]\ngrid = 0\n").unwrap_err();
        assert_eq!(err.key(), Some("canvas.grid"));
    }

    #[test]
    fn oversized_margin_errors() {
        let err = load_config_from_str("[canvas]\nheight = 100\nedge_margin = 60\n").unwrap_err();
        assert_eq!(err.key(), Some("canvas.edge_margin"));
    }

    #[test]
    fn negative_lane_max_errors() {
        let err = load_config_from_str("[routing]\nlane_max = -1\n").unwrap_err();
        assert_eq!(err.key(), Some("routing.lane_max"));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[placement]\nseed = 99\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.placement.seed, 99);
    }

    #[test]
    fn io_error_from_nonexistent_dir() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
