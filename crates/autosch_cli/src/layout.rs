//! `autosch layout`: place and route a netlist and write the layout JSON.

use std::path::Path;

use autosch_diagnostics::DiagnosticSink;
use autosch_pnr::Layout;

use crate::pipeline::{read_netlist, render_diagnostics, resolve_config};
use crate::{GlobalArgs, LayoutArgs};

/// Runs the `autosch layout` command.
///
/// Returns exit code 0 when the netlist was laid out without input errors,
/// 1 otherwise. A layout is written in both cases.
pub fn run(args: &LayoutArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let netlist_path = Path::new(&args.netlist);
    let input = read_netlist(netlist_path)?;
    let mut config = resolve_config(global, netlist_path)?;
    if let Some(seed) = args.seed {
        config.placement.seed = seed;
    }

    let sink = DiagnosticSink::new();
    let layout = if args.route_only {
        autosch_pnr::reroute(&input, &config, &sink)?
    } else {
        autosch_pnr::place_and_route(&input, &config, &sink)?
    };

    let json = serde_json::to_string_pretty(&layout)?;
    match &args.output {
        Some(path) => std::fs::write(path, json + "\n")
            .map_err(|e| format!("cannot write {path}: {e}"))?,
        None => println!("{json}"),
    }

    if !global.quiet {
        render_diagnostics(&sink, global.color);
        print_summary(&layout, global.verbose);
    }
    Ok(if sink.has_errors() { 1 } else { 0 })
}

fn print_summary(layout: &Layout, verbose: bool) {
    let stats = &layout.stats;
    eprintln!(
        "     Placed {} components{}",
        layout.placements.len(),
        layout
            .core
            .as_deref()
            .map(|c| format!(" around {c}"))
            .unwrap_or_default()
    );
    eprintln!(
        "     Routed {}/{} nets ({} labelled, {} skipped, {:.0}% wired)",
        stats.wired_nets,
        stats.total_nets,
        stats.labelled_nets,
        stats.skipped_nets,
        stats.success_rate * 100.0
    );
    if verbose {
        let mut nets: Vec<&str> = layout.wires.iter().map(|w| w.net.as_str()).collect();
        nets.sort_unstable();
        nets.dedup();
        for net in nets {
            eprintln!(
                "            {net}: {} wires, {} labels",
                layout.wires_of(net).count(),
                layout.labels_of(net).count()
            );
        }
    }
    eprintln!(
        "    Quality {} ({} critical, {} warnings)",
        layout.quality.level,
        layout.quality.criticals.len(),
        layout.quality.warnings.len()
    );
    eprintln!("Fingerprint {}", layout.fingerprint());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const NETLIST: &str = r#"{
        "components": [{"reference": "R1", "value": "10k"}, {"reference": "R2", "value": "10k"}],
        "nets": [{"name": "N1", "endpoints": [{"reference": "R1", "pin": 1}, {"reference": "R2", "pin": 1}]}]
    }"#;

    fn quiet() -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: None,
        }
    }

    fn args(netlist: &Path, output: &Path, seed: Option<u64>) -> LayoutArgs {
        LayoutArgs {
            netlist: netlist.display().to_string(),
            seed,
            output: Some(output.display().to_string()),
            route_only: false,
        }
    }

    #[test]
    fn writes_layout_json() {
        let dir = TempDir::new().unwrap();
        let netlist = dir.path().join("board.json");
        fs::write(&netlist, NETLIST).unwrap();
        let out = dir.path().join("layout.json");

        let code = run(&args(&netlist, &out, None), &quiet()).unwrap();
        assert_eq!(code, 0);
        let layout: Layout = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(layout.placements.len(), 2);
        assert_eq!(layout.wires_of("N1").count(), 1);
    }

    #[test]
    fn same_seed_writes_same_file() {
        let dir = TempDir::new().unwrap();
        let netlist = dir.path().join("board.json");
        fs::write(&netlist, NETLIST).unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        run(&args(&netlist, &a, Some(3)), &quiet()).unwrap();
        run(&args(&netlist, &b, Some(3)), &quiet()).unwrap();
        assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
    }

    #[test]
    fn input_errors_set_the_exit_code() {
        let dir = TempDir::new().unwrap();
        let netlist = dir.path().join("board.json");
        fs::write(
            &netlist,
            r#"{"components": [{"reference": "R1"}, {"reference": "R1"}], "nets": []}"#,
        )
        .unwrap();
        let out = dir.path().join("layout.json");
        assert_eq!(run(&args(&netlist, &out, None), &quiet()).unwrap(), 1);
        assert!(out.is_file());
    }
}
