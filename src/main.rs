//! Automix — batch fader-level solver.
//!
//! Reads a mix spec and a track list, writes the solved levels as JSON.
//! Exits 1 when the spec has no target section or a file can't be
//! read/written; an unreachable target is still a normal exit.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use automix::config::load_config;
use automix::pipeline::run_files;
use automix::report::RunOutput;

#[derive(Parser, Debug)]
#[command(name = "automix", version, about = "Solve fader levels for a target mix")]
struct Cli {
    /// Mix specification file
    spec_file: PathBuf,
    /// Track names from the host, one per line
    track_list_file: PathBuf,
    /// Where to write the JSON result
    output_file: PathBuf,
    /// Solver config (YAML). Defaults to ~/.automix/config.yaml if present.
    #[arg(long)]
    config: Option<PathBuf>,
    /// More logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,
    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// `-v`/`-q` win over `RUST_LOG`, which wins over the `info` default.
fn init_logging(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<RunOutput> {
    let config = load_config(cli.config.as_deref()).context("loading solver config")?;
    let output = run_files(
        &cli.spec_file,
        &cli.track_list_file,
        &cli.output_file,
        &config.solver,
    )?;
    Ok(output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);
    info!("automix v{}", env!("CARGO_PKG_VERSION"));

    match run(&cli) {
        Ok(RunOutput::Solved(report)) => {
            info!(
                success = report.success,
                residual = report.error,
                "wrote {}",
                cli.output_file.display()
            );
            ExitCode::SUCCESS
        }
        Ok(RunOutput::Failed(failure)) => {
            error!("{}", failure.error);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
