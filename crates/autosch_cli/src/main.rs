//! autosch CLI: command-line front end for the schematic placer and router.
//!
//! Provides `autosch layout` to place and route a JSON netlist and write the
//! layout, and `autosch check` to validate a netlist without laying it out.

#![warn(missing_docs)]

mod check;
mod layout;
mod pipeline;

use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// autosch: automatic schematic placement and routing.
#[derive(Parser, Debug)]
#[command(name = "autosch", version, about = "Schematic auto-placement and routing")]
pub struct Cli {
    /// Print nothing but the layout itself and fatal errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print per-net routing details.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// When to color diagnostics.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to an `autosch.toml` file or a directory containing one.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// `autosch` subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Place and route a netlist.
    Layout(LayoutArgs),
    /// Validate a netlist and print the report.
    Check(CheckArgs),
}

/// Arguments for the `autosch layout` subcommand.
#[derive(Parser, Debug)]
pub struct LayoutArgs {
    /// Netlist JSON file.
    pub netlist: String,

    /// Override the placement seed from the configuration.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to write the layout JSON (default: stdout).
    #[arg(short, long)]
    pub output: Option<String>,

    /// Keep the positions in the netlist and only route.
    #[arg(long)]
    pub route_only: bool,
}

/// Arguments for the `autosch check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Netlist JSON file.
    pub netlist: String,

    /// Output format for the report.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Value of `--color`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from the environment.
    Auto,
    /// Color even when piped.
    Always,
    /// Plain text.
    Never,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Summary line on stderr.
    Text,
    /// The validation report as JSON on stdout.
    Json,
}

/// Flags shared by every subcommand, resolved once in `main`.
pub struct GlobalArgs {
    /// `--quiet`.
    pub quiet: bool,
    /// Whether to print per-net details.
    pub verbose: bool,
    /// Resolved `--color`.
    pub color: bool,
    /// Optional path to a config file or directory.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none() && std::env::var_os("TERM").is_some(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };

    let result = match cli.command {
        Command::Layout(ref args) => layout::run(args, &global),
        Command::Check(ref args) => check::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_layout_default() {
        let cli = Cli::parse_from(["autosch", "layout", "board.json"]);
        match cli.command {
            Command::Layout(ref args) => {
                assert_eq!(args.netlist, "board.json");
                assert!(args.seed.is_none());
                assert!(args.output.is_none());
                assert!(!args.route_only);
            }
            _ => panic!("expected Layout command"),
        }
    }

    #[test]
    fn parse_layout_with_args() {
        let cli = Cli::parse_from([
            "autosch",
            "layout",
            "board.json",
            "--seed",
            "7",
            "--output",
            "out.json",
            "--config",
            "cfg/autosch.toml",
        ]);
        assert_eq!(cli.config.as_deref(), Some("cfg/autosch.toml"));
        match cli.command {
            Command::Layout(ref args) => {
                assert_eq!(args.seed, Some(7));
                assert_eq!(args.output.as_deref(), Some("out.json"));
            }
            _ => panic!("expected Layout command"),
        }
    }

    #[test]
    fn parse_check_json() {
        let cli = Cli::parse_from(["autosch", "check", "board.json", "--format", "json"]);
        match cli.command {
            Command::Check(ref args) => assert_eq!(args.format, ReportFormat::Json),
            _ => panic!("expected Check command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["autosch", "--quiet", "--color", "never", "check", "n.json"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn layout_requires_a_netlist() {
        assert!(Cli::try_parse_from(["autosch", "layout"]).is_err());
    }
}
