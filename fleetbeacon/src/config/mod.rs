//! On-disk configuration file.
//!
//! Settings live in an INI file at `<user config dir>/fleetbeacon/config.ini`:
//!
//! ```ini
//! [backend]
//! url = https://tracker.example.com/api/location/update
//!
//! [report]
//! interval = 5
//! timeout = 10
//! format = form
//!
//! [driver]
//! vehicle_id = Poda001
//! mode = bus
//! ```
//!
//! The `[driver]` section doubles as the remembered-preference record (see
//! [`crate::prefs`]). Missing file and missing keys fall back to defaults;
//! unparseable values are logged and ignored rather than refusing to start.

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::warn;

use crate::session::DEFAULT_INTERVAL_SECS;
use crate::transmit::{WireFormat, DEFAULT_TIMEOUT_SECS};
use crate::TransportMode;

/// Errors from configuration loading and persistence.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The platform reports no user configuration directory.
    #[error("could not determine the user config directory")]
    NoConfigDir,

    /// Reading or parsing the config file failed.
    #[error("failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// Writing the config file failed.
    #[error("failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    /// A value is not valid for its key.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    /// The key is not a known configuration setting.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// Path of the configuration file under the user config directory.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join("fleetbeacon").join("config.ini"))
        .ok_or(ConfigError::NoConfigDir)
}

/// `[backend]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendSection {
    /// Reporting endpoint URL.
    pub url: Option<String>,
}

/// `[report]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    /// Tick interval in seconds.
    pub interval_secs: u64,
    /// Total request timeout in seconds.
    pub timeout_secs: u64,
    /// Wire encoding variant.
    pub format: WireFormat,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            format: WireFormat::default(),
        }
    }
}

/// `[driver]` section - the remembered driver preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverSection {
    /// Remembered vehicle identifier.
    pub vehicle_id: Option<String>,
    /// Remembered transport mode (stored as its wire name).
    pub mode: Option<String>,
}

/// The parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub backend: BackendSection,
    pub report: ReportSection,
    pub driver: DriverSection,
}

impl ConfigFile {
    /// Load from the default location. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(config_file_path()?)
    }

    /// Load from an explicit path. A missing file yields defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config = Self::default();

        if let Some(backend) = ini.section(Some("backend")) {
            config.backend.url = backend.get("url").map(str::to_string);
        }

        if let Some(report) = ini.section(Some("report")) {
            if let Some(value) = report.get("interval") {
                match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => config.report.interval_secs = secs,
                    _ => warn!(value, "Ignoring invalid report.interval"),
                }
            }
            if let Some(value) = report.get("timeout") {
                match value.parse::<u64>() {
                    Ok(secs) if secs > 0 => config.report.timeout_secs = secs,
                    _ => warn!(value, "Ignoring invalid report.timeout"),
                }
            }
            if let Some(value) = report.get("format") {
                match value.parse::<WireFormat>() {
                    Ok(format) => config.report.format = format,
                    Err(_) => warn!(value, "Ignoring invalid report.format"),
                }
            }
        }

        if let Some(driver) = ini.section(Some("driver")) {
            config.driver.vehicle_id = driver.get("vehicle_id").map(str::to_string);
            config.driver.mode = driver.get("mode").map(str::to_string);
        }

        Ok(config)
    }

    /// Save to the default location, creating parent directories.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(config_file_path()?)
    }

    /// Save to an explicit path, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        }

        let mut ini = Ini::new();

        if let Some(url) = &self.backend.url {
            ini.with_section(Some("backend")).set("url", url.as_str());
        }

        ini.with_section(Some("report"))
            .set("interval", self.report.interval_secs.to_string())
            .set("timeout", self.report.timeout_secs.to_string())
            .set("format", self.report.format.as_str());

        if let Some(id) = &self.driver.vehicle_id {
            ini.with_section(Some("driver")).set("vehicle_id", id.as_str());
        }
        if let Some(mode) = &self.driver.mode {
            ini.with_section(Some("driver")).set("mode", mode.as_str());
        }

        ini.write_to_file(path).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// String-addressed configuration keys for the CLI `config` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    BackendUrl,
    ReportInterval,
    ReportTimeout,
    ReportFormat,
    DriverVehicleId,
    DriverMode,
}

impl ConfigKey {
    /// All keys, in listing order.
    pub const ALL: &'static [ConfigKey] = &[
        ConfigKey::BackendUrl,
        ConfigKey::ReportInterval,
        ConfigKey::ReportTimeout,
        ConfigKey::ReportFormat,
        ConfigKey::DriverVehicleId,
        ConfigKey::DriverMode,
    ];

    /// The `section.key` name of this key.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::BackendUrl => "backend.url",
            ConfigKey::ReportInterval => "report.interval",
            ConfigKey::ReportTimeout => "report.timeout",
            ConfigKey::ReportFormat => "report.format",
            ConfigKey::DriverVehicleId => "driver.vehicle_id",
            ConfigKey::DriverMode => "driver.mode",
        }
    }

    /// Read this key's value as a display string. Unset keys are empty.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::BackendUrl => config.backend.url.clone().unwrap_or_default(),
            ConfigKey::ReportInterval => config.report.interval_secs.to_string(),
            ConfigKey::ReportTimeout => config.report.timeout_secs.to_string(),
            ConfigKey::ReportFormat => config.report.format.to_string(),
            ConfigKey::DriverVehicleId => config.driver.vehicle_id.clone().unwrap_or_default(),
            ConfigKey::DriverMode => config.driver.mode.clone().unwrap_or_default(),
        }
    }

    /// Set this key from a string, validating it. An empty value clears
    /// optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        match self {
            ConfigKey::BackendUrl => {
                config.backend.url = non_empty(value);
            }
            ConfigKey::ReportInterval => {
                config.report.interval_secs = parse_secs(self.name(), value)?;
            }
            ConfigKey::ReportTimeout => {
                config.report.timeout_secs = parse_secs(self.name(), value)?;
            }
            ConfigKey::ReportFormat => {
                config.report.format =
                    value
                        .parse::<WireFormat>()
                        .map_err(|reason| ConfigError::InvalidValue {
                            key: self.name().to_string(),
                            reason,
                        })?;
            }
            ConfigKey::DriverVehicleId => {
                config.driver.vehicle_id = non_empty(value);
            }
            ConfigKey::DriverMode => {
                if let Some(raw) = non_empty(value) {
                    let mode = raw
                        .parse::<TransportMode>()
                        .map_err(|e| ConfigError::InvalidValue {
                            key: self.name().to_string(),
                            reason: e.to_string(),
                        })?;
                    config.driver.mode = Some(mode.as_str().to_string());
                } else {
                    config.driver.mode = None;
                }
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .iter()
            .copied()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            reason: "expected a positive number of seconds".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(dir.path().join("missing.ini")).unwrap();

        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.report.interval_secs, 5);
        assert_eq!(config.report.timeout_secs, 10);
        assert_eq!(config.report.format, WireFormat::Form);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.backend.url = Some("https://tracker.example.com/update".to_string());
        config.report.interval_secs = 10;
        config.report.format = WireFormat::Query;
        config.driver.vehicle_id = Some("Poda001".to_string());
        config.driver.mode = Some("bus".to_string());

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[report]\ninterval=soon\ntimeout=0\nformat=carrier-pigeon\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.report.interval_secs, 5);
        assert_eq!(config.report.timeout_secs, 10);
        assert_eq!(config.report.format, WireFormat::Form);
    }

    #[test]
    fn test_config_key_parse() {
        assert_eq!(
            "backend.url".parse::<ConfigKey>().unwrap(),
            ConfigKey::BackendUrl
        );
        assert_eq!(
            "driver.mode".parse::<ConfigKey>().unwrap(),
            ConfigKey::DriverMode
        );
        assert!(matches!(
            "nope.nothing".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_config_key_get_set_round_trip() {
        let mut config = ConfigFile::default();

        ConfigKey::BackendUrl
            .set(&mut config, "https://tracker.example.com/update")
            .unwrap();
        ConfigKey::ReportInterval.set(&mut config, "15").unwrap();
        ConfigKey::DriverMode.set(&mut config, "ferry").unwrap();

        assert_eq!(
            ConfigKey::BackendUrl.get(&config),
            "https://tracker.example.com/update"
        );
        assert_eq!(ConfigKey::ReportInterval.get(&config), "15");
        assert_eq!(ConfigKey::DriverMode.get(&config), "ferry");
    }

    #[test]
    fn test_config_key_set_rejects_bad_values() {
        let mut config = ConfigFile::default();

        assert!(ConfigKey::ReportInterval.set(&mut config, "0").is_err());
        assert!(ConfigKey::ReportInterval.set(&mut config, "often").is_err());
        assert!(ConfigKey::ReportFormat.set(&mut config, "xml").is_err());
        assert!(ConfigKey::DriverMode.set(&mut config, "zeppelin").is_err());

        // Nothing was changed by the failed sets.
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_config_key_set_empty_clears_optional() {
        let mut config = ConfigFile::default();
        config.driver.vehicle_id = Some("Poda001".to_string());

        ConfigKey::DriverVehicleId.set(&mut config, "").unwrap();
        assert_eq!(config.driver.vehicle_id, None);
    }
}
