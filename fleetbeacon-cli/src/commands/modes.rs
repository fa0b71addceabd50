//! Modes command - list valid transport modes.

use fleetbeacon::TransportMode;

use crate::error::CliError;

/// Run the modes command.
pub fn run() -> Result<(), CliError> {
    for mode in TransportMode::ALL {
        println!("{}", mode);
    }
    Ok(())
}
