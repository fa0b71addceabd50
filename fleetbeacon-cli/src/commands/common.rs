//! Shared helpers for CLI commands.

use std::path::PathBuf;

use clap::ValueEnum;

use fleetbeacon::transmit::WireFormat;

use crate::error::CliError;

/// Selectable position sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// A gpsd daemon on this machine.
    Gpsd,
    /// A fixed coordinate given with --lat/--lon.
    Fixed,
}

/// Selectable wire formats (CLI names mirror the config file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Form,
    Query,
    Json,
}

impl From<FormatArg> for WireFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Form => WireFormat::Form,
            FormatArg::Query => WireFormat::Query,
            FormatArg::Json => WireFormat::Json,
        }
    }
}

/// Path of the pidfile marking a running instance.
pub fn pidfile_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("fleetbeacon.pid")
}

/// Record this process as the running instance.
pub fn write_pidfile() -> Result<(), CliError> {
    std::fs::write(pidfile_path(), std::process::id().to_string())?;
    Ok(())
}

/// Remove the pidfile, ignoring a file that is already gone.
pub fn remove_pidfile() {
    let _ = std::fs::remove_file(pidfile_path());
}

/// Read the pid of the running instance, if any.
pub fn read_pidfile() -> Result<Option<i32>, CliError> {
    let path = pidfile_path();
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(&path)?;
    match contents.trim().parse::<i32>() {
        Ok(pid) => Ok(Some(pid)),
        Err(_) => {
            // Corrupt pidfile; treat as no running instance.
            remove_pidfile();
            Ok(None)
        }
    }
}
