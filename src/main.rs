use anyhow::Result;
use clap::Parser;
use paramerge::cli::{Cli, Commands};
use paramerge::commands::refactor::{self, RefactorOptions};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Refactor {
            path,
            report,
            config,
            dry_run,
            verbosity,
        } => {
            init_logging(verbosity);
            refactor::run(RefactorOptions {
                path,
                report,
                config,
                dry_run,
            })
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}
