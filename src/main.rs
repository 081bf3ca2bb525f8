use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

pub mod cmd;
pub mod config;
pub mod error;
pub mod utils;

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// CLI arguments for configuring loadbench behavior.
#[derive(Debug, Clone, Parser)]
#[command(name = "loadbench")]
#[command(bin_name = "loadbench")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    cmds: CliCommands,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false, global = true)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false, global = true)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o', global = true)]
    pub output: Option<PathBuf>,

    /// how long a stopped run may keep draining in-flight requests (<= 0.0 = unbounded)
    #[arg(long, value_name = "SECONDS", default_value_t = 30., global = true)]
    pub graceful: f64,
}

#[derive(Debug, Clone, Subcommand)]
enum CliCommands {
    Run(cmd::run::RunCommand),
    Mock(cmd::mock::MockCommand),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(err) = utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    }) {
        eprintln!("🚩 failed to set up tracing: {err:#}");
        std::process::exit(1);
    }

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received: begin graceful stop");
                shutdown.cancel();
            }
        });
    }

    let result = match args.cmds {
        CliCommands::Run(run_args) => cmd::run::exec(args.graceful, shutdown, run_args).await,
        CliCommands::Mock(mock_args) => cmd::mock::exec(shutdown, mock_args).await,
    };

    if let Err(err) = result {
        eprintln!("🚩 exit with error: {err:#}");
        std::process::exit(1);
    }
}
