//! barline CLI - Real-time OHLCV bars from tick streams.

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use display::Format;

#[derive(Parser)]
#[command(name = "barline")]
#[command(about = "Build live OHLCV bars from tick streams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output and warnings)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported resolutions
    Resolutions {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a recorded tick file through the engine
    Replay {
        /// Tick file (.csv, .ndjson or .jsonl)
        input: PathBuf,

        /// Resolution codes to build (e.g., 1, 15, 240, 1D)
        #[arg(short, long, value_delimiter = ',', default_value = "1")]
        resolution: Vec<String>,

        /// Symbol for rows without a symbol column; also filters other symbols
        #[arg(short, long)]
        symbol: Option<String>,

        /// Output directory. Files named <symbol>_<resolution>.<format>
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,

        /// Disable the continuity check
        #[arg(long)]
        no_continuity: bool,

        /// Print engine status as JSON when done
        #[arg(long)]
        status: bool,
    },

    /// Drive the engine with a simulated random-walk feed
    Simulate {
        /// Symbols to simulate
        #[arg(short, long, value_delimiter = ',', default_value = "EURUSD")]
        symbols: Vec<String>,

        /// Resolution codes to subscribe to
        #[arg(short, long, value_delimiter = ',', default_value = "1,5")]
        resolution: Vec<String>,

        /// Number of ticks per symbol
        #[arg(short, long, default_value = "1000")]
        ticks: usize,

        /// Simulated milliseconds between ticks
        #[arg(long, default_value = "1000", value_parser = clap::value_parser!(i64).range(1..))]
        step_ms: i64,

        /// Random seed
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Quote store commit frame in milliseconds (overrides BARLINE_FRAME_INTERVAL_MS)
        #[arg(long)]
        frame_ms: Option<u64>,
    },
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 1)
        .try_init()
        .map_err(|e| anyhow!(e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet)?;

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Resolutions { json } => commands::resolutions::list_resolutions(json),
        Commands::Replay {
            input,
            resolution,
            symbol,
            output_dir,
            format,
            no_continuity,
            status,
        } => {
            let options = commands::replay::ReplayOptions {
                resolutions: resolution,
                symbol,
                validate_continuity: !no_continuity,
            };
            commands::replay::replay(&input, &options, output_dir, format, status, cli.quiet).await
        }
        Commands::Simulate {
            symbols,
            resolution,
            ticks,
            step_ms,
            seed,
            frame_ms,
        } => {
            let options = commands::simulate::SimulateOptions {
                symbols,
                resolutions: resolution,
                ticks,
                step_ms,
                seed,
                frame_ms,
            };
            commands::simulate::simulate(&options, cli.quiet).await
        }
    }
}
