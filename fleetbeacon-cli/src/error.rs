//! CLI error type and exit-code mapping.

use std::fmt;

use fleetbeacon::config::ConfigError;
use fleetbeacon::prefs::PrefsError;
use fleetbeacon::session::StartError;
use fleetbeacon::transmit::TransmitError;

/// Errors surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file or resolution problem.
    Config(String),

    /// The requested session configuration is invalid.
    InvalidConfig(String),

    /// The session refused to start.
    Start(StartError),

    /// The transmitter could not be constructed.
    Transmit(TransmitError),

    /// Failed to create the Tokio runtime.
    Runtime(String),

    /// Pidfile or other I/O failure.
    Io(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    ///
    /// Invalid session configuration exits with 2; everything else with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidConfig(_) => 2,
            CliError::Start(StartError::InvalidConfig(_)) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {}", msg),
            CliError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
            CliError::Start(e) => write!(f, "could not start tracking: {}", e),
            CliError::Transmit(e) => write!(f, "transmitter setup failed: {}", e),
            CliError::Runtime(msg) => write!(f, "failed to create Tokio runtime: {}", msg),
            CliError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Start(e) => Some(e),
            CliError::Transmit(e) => Some(e),
            CliError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<PrefsError> for CliError {
    fn from(e: PrefsError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<StartError> for CliError {
    fn from(e: StartError) -> Self {
        CliError::Start(e)
    }
}

impl From<TransmitError> for CliError {
    fn from(e: TransmitError) -> Self {
        CliError::Transmit(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
