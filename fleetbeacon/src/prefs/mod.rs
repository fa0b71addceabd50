//! Persisted driver preferences.
//!
//! The client remembers the last vehicle id and transport mode across
//! restarts so drivers don't re-enter them every shift. The store is an
//! injected dependency of the session and the CLI; clearing it corresponds
//! to the driver opting out of being remembered.

use std::path::PathBuf;

use crate::config::{config_file_path, ConfigError, ConfigFile};
use crate::TransportMode;

/// Remembered driver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    /// Vehicle identifier.
    pub vehicle_id: String,
    /// Transport mode.
    pub mode: TransportMode,
}

/// Errors from preference persistence.
#[derive(Debug, thiserror::Error)]
pub enum PrefsError {
    /// Underlying config file failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Stores driver preferences across process restarts.
pub trait PreferenceStore: Send + Sync {
    /// Load the remembered preferences, if any are stored and valid.
    fn load(&self) -> Result<Option<Preferences>, PrefsError>;

    /// Persist the given preferences, replacing any previous ones.
    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError>;

    /// Forget any stored preferences.
    fn clear(&self) -> Result<(), PrefsError>;
}

/// Preference store backed by the `[driver]` section of the config file.
#[derive(Debug, Clone)]
pub struct IniPreferenceStore {
    path: PathBuf,
}

impl IniPreferenceStore {
    /// Store backed by the default config file location.
    pub fn new() -> Result<Self, PrefsError> {
        Ok(Self {
            path: config_file_path()?,
        })
    }

    /// Store backed by an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PreferenceStore for IniPreferenceStore {
    fn load(&self) -> Result<Option<Preferences>, PrefsError> {
        let config = ConfigFile::load_from(&self.path)?;
        let (id, mode) = match (config.driver.vehicle_id, config.driver.mode) {
            (Some(id), Some(mode)) => (id, mode),
            _ => return Ok(None),
        };
        // A stale file with a mode the current build no longer knows is
        // treated as nothing remembered, not an error.
        match mode.parse::<TransportMode>() {
            Ok(mode) => Ok(Some(Preferences {
                vehicle_id: id,
                mode,
            })),
            Err(_) => Ok(None),
        }
    }

    fn save(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        let mut config = ConfigFile::load_from(&self.path)?;
        config.driver.vehicle_id = Some(prefs.vehicle_id.clone());
        config.driver.mode = Some(prefs.mode.as_str().to_string());
        config.save_to(&self.path)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), PrefsError> {
        let mut config = ConfigFile::load_from(&self.path)?;
        config.driver.vehicle_id = None;
        config.driver.mode = None;
        config.save_to(&self.path)?;
        Ok(())
    }
}
