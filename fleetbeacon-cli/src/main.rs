//! Fleetbeacon CLI - Command-line interface
//!
//! This binary provides the driver-side command-line interface to the
//! fleetbeacon library: start and stop location reporting, manage the
//! configuration file, and list valid transport modes.

mod commands;
mod error;

use clap::{Parser, Subcommand};

use crate::error::CliError;

#[derive(Debug, Parser)]
#[command(
    name = "fleetbeacon",
    version = fleetbeacon::VERSION,
    about = "Periodic vehicle location reporting for public transport fleets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start reporting this vehicle's position
    Start(commands::start::StartArgs),

    /// Stop a running fleetbeacon instance
    Stop,

    /// View and modify configuration settings
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },

    /// List valid transport modes
    Modes,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Start(args) => commands::start::run(args),
        Commands::Stop => commands::stop::run(),
        Commands::Config { command } => commands::config::run(command),
        Commands::Modes => commands::modes::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

/// Initialize logging. `RUST_LOG` overrides the default `warn` filter.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();
}
