//! Start command - run a tracking session in the foreground.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio_util::sync::CancellationToken;

use fleetbeacon::config::ConfigFile;
use fleetbeacon::location::{FixedSource, GpsdSource, LocationSource, DEFAULT_GPSD_ADDR};
use fleetbeacon::prefs::{IniPreferenceStore, PreferenceStore};
use fleetbeacon::session::{SessionConfig, TrackingSession};
use fleetbeacon::transmit::HttpTransmitter;
use fleetbeacon::TransportMode;

use super::common::{remove_pidfile, write_pidfile, FormatArg, SourceKind};
use crate::error::CliError;

/// Arguments for the start command.
#[derive(Debug, Args)]
pub struct StartArgs {
    /// Vehicle identifier reported to the backend
    #[arg(long)]
    pub id: Option<String>,

    /// Transport mode (see `fleetbeacon modes`)
    #[arg(long)]
    pub mode: Option<String>,

    /// Reporting interval in seconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Backend endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Wire format for submissions
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Remember the vehicle id and mode for the next start
    #[arg(long)]
    pub remember: bool,

    /// Forget any remembered vehicle id and mode
    #[arg(long, conflicts_with = "remember")]
    pub forget: bool,

    /// Position source
    #[arg(long, value_enum, default_value = "gpsd")]
    pub source: SourceKind,

    /// gpsd address (host:port)
    #[arg(long, default_value = DEFAULT_GPSD_ADDR)]
    pub gpsd: String,

    /// Latitude for the fixed source
    #[arg(long, requires = "lon")]
    pub lat: Option<f64>,

    /// Longitude for the fixed source
    #[arg(long, requires = "lat")]
    pub lon: Option<f64>,
}

/// Run the start command.
pub fn run(args: StartArgs) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let store = IniPreferenceStore::new()?;

    if args.forget {
        store.clear()?;
    }
    let remembered = store.load()?;

    // Resolve settings: CLI > remembered preferences / config file
    let vehicle_id = args
        .id
        .or_else(|| remembered.as_ref().map(|p| p.vehicle_id.clone()))
        .ok_or_else(|| {
            CliError::InvalidConfig("vehicle id required (use --id, or --remember once)".to_string())
        })?;

    let mode = match args.mode {
        Some(mode) => mode
            .parse::<TransportMode>()
            .map_err(|e| CliError::InvalidConfig(e.to_string()))?,
        None => remembered
            .as_ref()
            .map(|p| p.mode)
            .ok_or_else(|| {
                CliError::InvalidConfig(
                    "transport mode required (use --mode, see `fleetbeacon modes`)".to_string(),
                )
            })?,
    };

    let endpoint = args
        .endpoint
        .or_else(|| config.backend.url.clone())
        .ok_or_else(|| {
            CliError::Config(
                "no endpoint configured; use --endpoint or \
                 `fleetbeacon config set backend.url <url>`"
                    .to_string(),
            )
        })?;

    let interval_secs = args.interval.unwrap_or(config.report.interval_secs);
    if interval_secs == 0 {
        return Err(CliError::InvalidConfig(
            "interval must be at least 1 second".to_string(),
        ));
    }
    let format = args.format.map(Into::into).unwrap_or(config.report.format);
    let timeout = Duration::from_secs(config.report.timeout_secs);

    let transmitter = Arc::new(HttpTransmitter::with_timeout(&endpoint, format, timeout)?);
    let source: Arc<dyn LocationSource> = match args.source {
        SourceKind::Gpsd => Arc::new(GpsdSource::new(args.gpsd.as_str())),
        SourceKind::Fixed => match (args.lat, args.lon) {
            (Some(lat), Some(lon)) => Arc::new(FixedSource::new(lat, lon)),
            _ => {
                return Err(CliError::InvalidConfig(
                    "the fixed source requires --lat and --lon".to_string(),
                ))
            }
        },
    };

    let mut session = TrackingSession::new(source, transmitter)
        .with_interval(Duration::from_secs(interval_secs));
    if args.remember {
        session = session.with_preferences(Arc::new(store) as Arc<dyn PreferenceStore>);
    }

    // Print banner
    println!("Fleetbeacon v{}", fleetbeacon::VERSION);
    println!("===============");
    println!();
    println!("Vehicle:  {} ({})", vehicle_id, mode);
    println!("Endpoint: {}", endpoint);
    println!("Format:   {}", format);
    println!("Interval: {}s", interval_secs);
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    // Set up signal handler for graceful shutdown
    let shutdown = CancellationToken::new();
    let shutdown_handler = shutdown.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        shutdown_handler.cancel();
    })
    .map_err(|e| CliError::Config(format!("failed to set signal handler: {}", e)))?;

    write_pidfile()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    let result = runtime.block_on(drive_session(
        &session,
        SessionConfig::new(vehicle_id, mode),
        shutdown,
    ));

    remove_pidfile();
    if result.is_ok() {
        println!("Stopped.");
    }
    result
}

/// Run the session until shutdown, echoing each tick outcome.
async fn drive_session(
    session: &TrackingSession,
    config: SessionConfig,
    shutdown: CancellationToken,
) -> Result<(), CliError> {
    session.start(config)?;
    let mut status_rx = session.subscribe();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,

            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                if let Some(result) = &status.last_result {
                    println!("[tick {}] {}", status.ticks, result);
                }
            }
        }
    }

    session.stop();
    Ok(())
}
