// src/settings.rs
//
// User settings, stored as TOML under the platform config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::heartbeat::HeartbeatOptions;
use crate::io::DiscoveryOptions;
use crate::session::SessionOptions;

const APP_DIR: &str = "PaddleConfig";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no configuration directory on this platform")]
    NoConfigDir,

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppSettings {
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Probe only this port instead of scanning.
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,
    #[serde(default = "default_handshake_deadline_ms")]
    pub handshake_deadline_ms: u64,
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    #[serde(default = "default_response_deadline_ms")]
    pub response_deadline_ms: u64,
    #[serde(default = "default_scan_backoff_ms")]
    pub scan_backoff_ms: u64,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_heartbeat_retry_ms")]
    pub heartbeat_retry_ms: u64,
    #[serde(default = "default_allowed_errors")]
    pub allowed_errors: u32,
    #[serde(default = "default_profile_dir")]
    pub profile_dir: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
    #[serde(default)]
    pub file_logging: bool,
}

fn default_baud_rate() -> u32 {
    9600
}
fn default_discovery_timeout_ms() -> u64 {
    500
}
fn default_handshake_deadline_ms() -> u64 {
    3000
}
fn default_command_timeout_ms() -> u64 {
    50
}
fn default_response_deadline_ms() -> u64 {
    2000
}
fn default_scan_backoff_ms() -> u64 {
    1000
}
fn default_heartbeat_interval_ms() -> u64 {
    2000
}
fn default_heartbeat_retry_ms() -> u64 {
    1000
}
fn default_allowed_errors() -> u32 {
    5
}

fn documents_dir() -> PathBuf {
    dirs::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
fn default_profile_dir() -> String {
    documents_dir().join("Profiles").to_string_lossy().to_string()
}
fn default_reports_dir() -> String {
    documents_dir().join("Reports").to_string_lossy().to_string()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            port: None,
            discovery_timeout_ms: default_discovery_timeout_ms(),
            handshake_deadline_ms: default_handshake_deadline_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            response_deadline_ms: default_response_deadline_ms(),
            scan_backoff_ms: default_scan_backoff_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_retry_ms: default_heartbeat_retry_ms(),
            allowed_errors: default_allowed_errors(),
            profile_dir: default_profile_dir(),
            reports_dir: default_reports_dir(),
            file_logging: false,
        }
    }
}

impl AppSettings {
    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            port_override: self.port.clone(),
            probe_timeout: Duration::from_millis(self.discovery_timeout_ms),
            handshake_deadline: Duration::from_millis(self.handshake_deadline_ms),
            backoff: Duration::from_millis(self.scan_backoff_ms),
            max_passes: None,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            read_timeout: Duration::from_millis(self.command_timeout_ms),
            response_deadline: Duration::from_millis(self.response_deadline_ms),
        }
    }

    pub fn heartbeat_options(&self) -> HeartbeatOptions {
        HeartbeatOptions {
            interval: Duration::from_millis(self.heartbeat_interval_ms),
            retry_interval: Duration::from_millis(self.heartbeat_retry_ms),
            allowed_errors: self.allowed_errors,
            response_deadline: Duration::from_millis(self.response_deadline_ms),
        }
    }

    /// Resolve a profile name against `profile_dir` unless it is already a path.
    pub fn profile_path(&self, name: &Path) -> PathBuf {
        if name.is_absolute() || name.components().count() > 1 {
            name.to_path_buf()
        } else {
            Path::new(&self.profile_dir).join(name)
        }
    }
}

/// Default location: `<config_dir>/PaddleConfig/settings.toml`.
pub fn settings_path() -> Result<PathBuf, SettingsError> {
    let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
    Ok(dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// Load settings from `path`. A missing file yields defaults without
/// touching the disk.
pub fn load_settings(path: &Path) -> Result<AppSettings, SettingsError> {
    if !path.exists() {
        return Ok(AppSettings::default());
    }
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SettingsError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Create the profile and report directories if needed.
pub fn initialize_directories(settings: &AppSettings) -> Result<(), SettingsError> {
    for dir in [&settings.profile_dir, &settings.reports_dir] {
        std::fs::create_dir_all(dir).map_err(|source| SettingsError::Io {
            path: PathBuf::from(dir),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings, AppSettings::default());
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.allowed_errors, 5);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "port = \"/dev/ttyACM0\"\nallowed_errors = 2\n").unwrap();

        let settings = load_settings(&path).unwrap();
        assert_eq!(settings.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(settings.allowed_errors, 2);
        assert_eq!(settings.command_timeout_ms, 50);
        assert_eq!(
            settings.discovery_options().handshake_deadline,
            Duration::from_secs(3)
        );
        assert_eq!(
            settings.discovery_options().port_override.as_deref(),
            Some("/dev/ttyACM0")
        );
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let settings = AppSettings {
            scan_backoff_ms: 250,
            file_logging: true,
            ..AppSettings::default()
        };
        save_settings(&path, &settings).unwrap();
        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "baud_rate = \"fast\"").unwrap();
        assert!(matches!(load_settings(&path), Err(SettingsError::Parse(_))));
    }

    #[test]
    fn test_profile_path_resolution() {
        let settings = AppSettings {
            profile_dir: "/profiles".to_string(),
            ..AppSettings::default()
        };
        assert_eq!(settings.profile_path(Path::new("gig.ptc")), PathBuf::from("/profiles/gig.ptc"));
        assert_eq!(settings.profile_path(Path::new("./gig.ptc")), PathBuf::from("./gig.ptc"));
    }
}
