use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use peerlink_cli::application::run_with_limit;
use peerlink_cli::infrastructure::load_config;
use peerlink_cli::{DemoOptions, LogConfig, Result};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "peerlink")]
#[command(
    version,
    about = "PeerLink CLI - loopback demo and smoke tests for the P2P transport"
)]
struct Cli {
    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Serve tokio-console on 127.0.0.1:6669
    #[cfg(feature = "console")]
    #[arg(long, global = true)]
    console: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a host and clients over the in-memory network
    Demo {
        /// Number of clients to connect
        #[arg(short = 'c', long, default_value_t = 2)]
        clients: usize,

        /// Message rounds each client sends
        #[arg(short = 'r', long, default_value_t = 3)]
        rounds: usize,

        /// Transport config as JSON (missing fields use defaults)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Abort after this many seconds
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Print the effective transport config as JSON
    Config {
        /// Transport config as JSON (missing fields use defaults)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::dev()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    #[cfg(feature = "console")]
    let log_config = if cli.console {
        log_config.with_console()
    } else {
        log_config
    };
    log_config.init()?;

    match cli.command {
        Commands::Demo {
            clients,
            rounds,
            config,
            duration_secs,
        } => {
            let options = DemoOptions {
                clients,
                rounds,
                config: load_config(config.as_deref())?,
            };
            run_demo(options, duration_secs.map(Duration::from_secs)).await?;
        }
        Commands::Config { config } => {
            let config = load_config(config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_demo(options: DemoOptions, limit: Option<Duration>) -> Result<()> {
    info!(
        "Starting loopback demo: {} clients, {} rounds",
        options.clients, options.rounds
    );
    info!("Press Ctrl+C to exit");

    tokio::select! {
        report = run_with_limit(options, limit) => {
            let report = report?;
            info!("");
            info!("Connected:    {}", report.connected);
            info!("Requests:     {}", report.requests_received);
            info!("Echoes:       {}", report.echoes_received);
            info!("Disconnected: {}", report.disconnected);
        }
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, shutting down...");
        }
    }

    Ok(())
}
