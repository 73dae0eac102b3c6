use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "paramerge")]
#[command(about = "Merge near-duplicate pytest tests into parametrized ones", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect type-2 test clones and merge each class into one
    /// parametrized test
    Refactor {
        /// Root of the candidate source tree
        path: PathBuf,

        /// Use an existing clone report instead of running the detector
        #[arg(long)]
        report: Option<PathBuf>,

        /// Configuration file (paramerge.toml in the current directory
        /// when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print rewritten files instead of writing them
        #[arg(long)]
        dry_run: bool,

        /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },
}
