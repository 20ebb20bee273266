use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use titrasim::workflows::experiment::Strategy;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Titrasim Contributors",
    version,
    about = "titra - A terminal lab bench for the glycine acid-base titration experiment.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole experiment automatically and print the analysis.
    Run(RunArgs),
    /// Perform the experiment step by step from a command prompt.
    Interactive(InteractiveArgs),
    /// Tabulate the simulated titration curve.
    Curve(CurveArgs),
}

/// Options shared by every command that runs a lab session.
#[derive(Args, Debug, Clone, Default)]
pub struct LabArgs {
    /// Path to a lab configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seed for the pH meter noise, for reproducible runs.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Disable measurement noise, overriding the config file.
    #[arg(long)]
    pub no_noise: bool,

    /// Skip the settle pauses between steps.
    #[arg(long)]
    pub no_delay: bool,

    /// Override the pH at which the titration stops.
    #[arg(long, value_name = "FLOAT")]
    pub stop_ph: Option<f64>,

    /// Override the volume (mL) at which the titration stops.
    #[arg(long, value_name = "FLOAT")]
    pub stop_volume: Option<f64>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S titrant.capacity-ml=25
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub lab: LabArgs,

    /// How increments are chosen during the titration.
    #[arg(long, value_enum, default_value_t = StrategyArg::Coarse)]
    pub strategy: StrategyArg,

    /// Write the readings to a CSV file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the pKa estimates to a CSV file.
    #[arg(long, value_name = "PATH")]
    pub summary: Option<PathBuf>,
}

/// Arguments for the `interactive` subcommand.
#[derive(Args, Debug)]
pub struct InteractiveArgs {
    #[command(flatten)]
    pub lab: LabArgs,

    /// Write the readings of each completed titration to a CSV file.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `curve` subcommand.
#[derive(Args, Debug)]
pub struct CurveArgs {
    /// Volume step between rows, in mL.
    #[arg(long, default_value_t = 1.0, value_name = "FLOAT")]
    pub step: f64,

    /// Last volume to tabulate, in mL.
    #[arg(long, default_value_t = 45.0, value_name = "FLOAT")]
    pub max_volume: f64,

    /// Seed for the pH meter noise.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// Print the noise-free baseline only.
    #[arg(long)]
    pub no_noise: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyArg {
    /// Coarse increments only.
    Coarse,
    /// Fine increments whenever the steep region unlocks them.
    Adaptive,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Coarse => Strategy::CoarseOnly,
            StrategyArg::Adaptive => Strategy::Adaptive,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults_to_coarse_strategy() {
        let cli = Cli::parse_from(["titra", "run"]);
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.strategy, StrategyArg::Coarse);
        assert!(args.lab.config.is_none());
        assert!(!args.lab.no_delay);
    }

    #[test]
    fn global_flags_are_accepted_after_subcommand() {
        let cli = Cli::parse_from(["titra", "run", "-vv", "--log-file", "lab.log"]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.log_file, Some(PathBuf::from("lab.log")));
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["titra", "-q", "-v", "run"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_collects_lab_overrides() {
        let cli = Cli::parse_from([
            "titra",
            "run",
            "--seed",
            "7",
            "--no-noise",
            "--strategy",
            "adaptive",
            "-S",
            "termination.stop-ph=10.5",
            "-S",
            "settle.stage-delay-ms=0",
            "-o",
            "out.csv",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("Expected 'run' subcommand");
        };
        assert_eq!(args.lab.seed, Some(7));
        assert!(args.lab.no_noise);
        assert_eq!(Strategy::from(args.strategy), Strategy::Adaptive);
        assert_eq!(args.lab.set_values.len(), 2);
        assert_eq!(args.output, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn curve_has_sensible_defaults() {
        let cli = Cli::parse_from(["titra", "curve"]);
        let Commands::Curve(args) = cli.command else {
            panic!("Expected 'curve' subcommand");
        };
        assert_eq!(args.step, 1.0);
        assert_eq!(args.max_volume, 45.0);
        assert!(!args.no_noise);
    }
}
