//! `autosch check`: validate a netlist without laying it out.

use std::path::Path;

use autosch_diagnostics::DiagnosticSink;
use autosch_pnr::{build_schematic, ClassifierTable, ValidationReport};

use crate::pipeline::{read_netlist, render_diagnostics};
use crate::{CheckArgs, GlobalArgs, ReportFormat};

/// Runs the `autosch check` command.
///
/// Returns exit code 0 for a clean netlist, 1 when anything was skipped.
pub fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let input = read_netlist(Path::new(&args.netlist))?;
    let sink = DiagnosticSink::new();
    let (schematic, report) = build_schematic(&input, &ClassifierTable::default(), &sink);

    match args.format {
        ReportFormat::Text => {
            if !global.quiet {
                render_diagnostics(&sink, global.color);
                eprintln!(
                    "   Checked {} components, {} nets: {}",
                    schematic.instance_count(),
                    schematic.net_count(),
                    summary(&report)
                );
                if global.verbose {
                    for inst in &schematic.instances {
                        eprintln!("            {} ({}) {}", inst.reference, inst.kind, inst.value);
                    }
                }
            }
        }
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(if report.is_clean() { 0 } else { 1 })
}

fn summary(report: &ValidationReport) -> String {
    if report.is_clean() {
        "clean".to_string()
    } else {
        format!("{} issue(s)", report.issue_count())
    }
}
