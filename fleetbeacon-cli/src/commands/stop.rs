//! Stop command - signal a running fleetbeacon instance.

use super::common::{read_pidfile, remove_pidfile};
use crate::error::CliError;

/// Run the stop command.
///
/// The start command records its pid; stop delivers SIGINT to it, which
/// triggers the same graceful shutdown as Ctrl+C in the foreground.
pub fn run() -> Result<(), CliError> {
    let pid = match read_pidfile()? {
        Some(pid) => pid,
        None => {
            return Err(CliError::Config(
                "no running fleetbeacon instance found".to_string(),
            ))
        }
    };

    // Signal 0 probes whether the process is still alive.
    if unsafe { libc::kill(pid, 0) } != 0 {
        remove_pidfile();
        return Err(CliError::Config(format!(
            "recorded instance (pid {}) is no longer running",
            pid
        )));
    }

    if unsafe { libc::kill(pid, libc::SIGINT) } != 0 {
        return Err(CliError::Config(format!(
            "failed to signal pid {}: {}",
            pid,
            std::io::Error::last_os_error()
        )));
    }

    println!("Sent stop signal to fleetbeacon (pid {})", pid);
    Ok(())
}
