use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "xrdcloud - Turn crystal structures into X-ray diffraction point clouds for property-prediction models.",
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

    /// Number of worker threads per chunk.
    /// Defaults to the number of logical cores minus two.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub workers: Option<usize>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S simulation.wavelength=MoKa
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", global = true)]
    pub set_values: Vec<String>,

    /// Reset the output directories without asking for confirmation.
    #[arg(short, long, global = true)]
    pub yes: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate, encode and write point clouds for every material in a catalog.
    Run(RunArgs),
    /// Simulate diffraction patterns and store them in an intermediate table.
    Compute(ComputeArgs),
    /// Encode the patterns of an intermediate table into point clouds.
    Generate(GenerateArgs),
    /// Delete and recreate the output directories.
    Reset(OutputArgs),
    /// Read every artifact back and check shapes and pairing.
    Verify(VerifyArgs),
}

/// Output location shared by the commands that write artifacts.
#[derive(Args, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Directory that holds the `features/` and `target/` subdirectories.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the material catalog (`;`-delimited, with header).
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Also keep the simulated patterns in an intermediate table at this path.
    #[arg(long, value_name = "PATH")]
    pub intermediate: Option<PathBuf>,

    /// X-ray wavelength: a preset such as 'CuKa' or a value in angstrom.
    #[arg(short, long, value_name = "NAME_OR_ANGSTROM")]
    pub wavelength: Option<String>,

    /// Override the number of points per cloud.
    #[arg(short, long, value_name = "INT")]
    pub points: Option<usize>,

    /// Override the number of sequential chunks the catalog is cut into.
    #[arg(long, value_name = "INT")]
    pub slices: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ComputeArgs {
    /// Path to the material catalog (`;`-delimited, with header).
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Path of the intermediate pattern table to create.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// X-ray wavelength: a preset such as 'CuKa' or a value in angstrom.
    #[arg(short, long, value_name = "NAME_OR_ANGSTROM")]
    pub wavelength: Option<String>,

    /// Override the number of sequential chunks the catalog is cut into.
    #[arg(long, value_name = "INT")]
    pub slices: Option<usize>,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Path of the intermediate pattern table to encode.
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Override the number of points per cloud.
    #[arg(short, long, value_name = "INT")]
    pub points: Option<usize>,

    /// Override the number of sequential chunks the table is cut into.
    #[arg(long, value_name = "INT")]
    pub slices: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Expected number of points per cloud.
    #[arg(short, long, value_name = "INT")]
    pub points: Option<usize>,
}
