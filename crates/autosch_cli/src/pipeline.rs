//! Shared plumbing for the subcommands: reading the netlist, resolving the
//! configuration and printing diagnostics.

use std::path::{Path, PathBuf};

use autosch_config::{EngineConfig, CONFIG_FILE_NAME};
use autosch_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use autosch_pnr::NetlistInput;

use crate::GlobalArgs;

/// Reads and parses a netlist document.
pub fn read_netlist(path: &Path) -> Result<NetlistInput, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read netlist {}: {e}", path.display()))?;
    Ok(NetlistInput::from_json(&text)?)
}

/// Resolves the engine configuration.
///
/// `--config` may name a file or a directory. Without it, an `autosch.toml`
/// next to the netlist is used when present, else the defaults.
pub fn resolve_config(
    global: &GlobalArgs,
    netlist: &Path,
) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    let explicit = global.config.as_ref().map(PathBuf::from);
    let file = match explicit {
        Some(path) if path.is_dir() => Some(path.join(CONFIG_FILE_NAME)),
        Some(path) => Some(path),
        None => netlist
            .parent()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .filter(|p| p.is_file()),
    };
    match file {
        Some(path) => {
            log::debug!("config from {}", path.display());
            let text = std::fs::read_to_string(&path)
                .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
            Ok(autosch_config::load_config_from_str(&text)?)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Prints every collected diagnostic to stderr.
pub fn render_diagnostics(sink: &DiagnosticSink, color: bool) {
    let renderer = TerminalRenderer::new(color);
    for diag in sink.diagnostics() {
        eprint!("{}", renderer.render(&diag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn global(config: Option<String>) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config,
        }
    }

    #[test]
    fn config_next_to_netlist_is_picked_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[placement]\nseed = 9\n").unwrap();
        let netlist = dir.path().join("board.json");
        let config = resolve_config(&global(None), &netlist).unwrap();
        assert_eq!(config.placement.seed, 9);
    }

    #[test]
    fn explicit_directory_is_searched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "[canvas]\nwidth = 2000\n").unwrap();
        let other = TempDir::new().unwrap();
        let config = resolve_config(
            &global(Some(dir.path().display().to_string())),
            &other.path().join("board.json"),
        )
        .unwrap();
        assert_eq!(config.canvas.width, 2000.0);
    }

    #[test]
    fn missing_config_means_defaults() {
        let dir = TempDir::new().unwrap();
        let config = resolve_config(&global(None), &dir.path().join("board.json")).unwrap();
        assert_eq!(config.placement.seed, EngineConfig::default().placement.seed);
    }

    #[test]
    fn invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.toml");
        fs::write(&file, "[canvas]\ngrid = 0\n").unwrap();
        assert!(resolve_config(&global(Some(file.display().to_string())), &file).is_err());
    }

    #[test]
    fn netlist_errors_name_the_file() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.json");
        let err = read_netlist(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.json"));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{not json").unwrap();
        assert!(read_netlist(&broken).is_err());
    }
}
