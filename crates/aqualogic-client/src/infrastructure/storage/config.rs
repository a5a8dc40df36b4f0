//! TOML configuration for the AquaLogic client.
//!
//! Looked up in order:
//! 1. an explicit path (`--config` or `AQUALOGIC_CONFIG` for the shell),
//! 2. the platform config file:
//!    - Windows: `%APPDATA%\AquaLogic\config.toml`
//!    - Linux:   `$XDG_CONFIG_HOME/aqualogic/config.toml` (or `~/.config/...`)
//!    - macOS:   `~/Library/Application Support/AquaLogic/config.toml`
//! 3. built-in defaults.
//!
//! ```toml
//! [connection]
//! transport = "tcp"
//! host = "192.168.1.50"
//! port = 8899
//!
//! [engine]
//! burst_writes = 5
//! command_retries = 10
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! Every field carries `#[serde(default = "...")]`, so a partial file only
//! overrides what it names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::engine::EngineConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which transport carries the bus bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Tcp,
    Serial,
    File,
}

/// How to reach the controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    #[serde(default = "default_transport")]
    pub transport: TransportKind,
    /// Host of the serial-to-TCP bridge.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Device path of the RS-485 adapter.
    #[serde(default = "default_serial_port")]
    pub serial_port: String,
    /// Capture file replayed by the `file` transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_file: Option<PathBuf>,
}

/// Engine timing and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineSettings {
    /// Inactivity window after which the read loop gives up.
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Delay between sending a command and checking its effect.
    #[serde(default = "default_reconcile_delay_ms")]
    pub reconcile_delay_ms: u64,
    /// Number of times each command frame is written per keep-alive.
    #[serde(default = "default_burst_writes")]
    pub burst_writes: u32,
    #[serde(default = "default_burst_interval_ms")]
    pub burst_interval_ms: u64,
    /// Pause after a keep-alive before the burst starts.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
    #[serde(default = "default_command_retries")]
    pub command_retries: u32,
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_transport() -> TransportKind {
    TransportKind::Tcp
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8899
}
fn default_serial_port() -> String {
    "/dev/ttyUSB0".to_string()
}
fn default_read_timeout_secs() -> u64 {
    5
}
fn default_reconcile_delay_ms() -> u64 {
    2000
}
fn default_burst_writes() -> u32 {
    5
}
fn default_burst_interval_ms() -> u64 {
    8
}
fn default_send_delay_ms() -> u64 {
    50
}
fn default_command_retries() -> u32 {
    10
}
fn default_max_frame_len() -> usize {
    512
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            host: default_host(),
            port: default_port(),
            serial_port: default_serial_port(),
            replay_file: None,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            read_timeout_secs: default_read_timeout_secs(),
            reconcile_delay_ms: default_reconcile_delay_ms(),
            burst_writes: default_burst_writes(),
            burst_interval_ms: default_burst_interval_ms(),
            send_delay_ms: default_send_delay_ms(),
            command_retries: default_command_retries(),
            max_frame_len: default_max_frame_len(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl From<&EngineSettings> for EngineConfig {
    fn from(s: &EngineSettings) -> Self {
        EngineConfig {
            read_timeout: Duration::from_secs(s.read_timeout_secs),
            reconcile_delay: Duration::from_millis(s.reconcile_delay_ms),
            burst_writes: s.burst_writes,
            burst_interval: Duration::from_millis(s.burst_interval_ms),
            send_delay: Duration::from_millis(s.send_delay_ms),
            command_retries: s.command_retries,
            max_frame_len: s.max_frame_len,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the platform config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads the configuration from `path`, or from the platform config file when
/// `path` is `None`.  A missing file yields `AppConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Ok(p) => p,
            Err(ConfigError::NoPlatformConfigDir) => return Ok(AppConfig::default()),
            Err(e) => return Err(e),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io { path, source: e }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("AquaLogic"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("aqualogic"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("AquaLogic")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_controller_timing() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.connection.transport, TransportKind::Tcp);
        assert_eq!(cfg.connection.port, 8899);
        assert_eq!(cfg.engine.read_timeout_secs, 5);
        assert_eq!(cfg.engine.reconcile_delay_ms, 2000);
        assert_eq!(cfg.engine.burst_writes, 5);
        assert_eq!(cfg.engine.command_retries, 10);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_section_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[connection]
transport = "serial"
serial_port = "/dev/ttyAMA0"

[engine]
burst_writes = 12
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.connection.transport, TransportKind::Serial);
        assert_eq!(cfg.connection.serial_port, "/dev/ttyAMA0");
        assert_eq!(cfg.connection.port, 8899);
        assert_eq!(cfg.engine.burst_writes, 12);
        assert_eq!(cfg.engine.burst_interval_ms, 8);
    }

    #[test]
    fn test_unknown_transport_is_a_parse_error() {
        let result: Result<AppConfig, _> = toml::from_str("[connection]\ntransport = \"usb\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_engine_settings_convert_to_durations() {
        let engine = EngineConfig::from(&EngineSettings::default());
        assert_eq!(engine.read_timeout, Duration::from_secs(5));
        assert_eq!(engine.reconcile_delay, Duration::from_secs(2));
        assert_eq!(engine.burst_interval, Duration::from_millis(8));
        assert_eq!(engine.send_delay, Duration::from_millis(50));
    }

    #[test]
    fn test_save_then_load_round_trips() {
        // Arrange
        let path = std::env::temp_dir()
            .join(format!("aqualogic-config-{}", std::process::id()))
            .join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.connection.host = "pool-bridge.local".to_string();
        cfg.connection.replay_file = Some(PathBuf::from("captures/pool_on.bin"));

        // Act
        save_config(&cfg, &path).expect("save");
        let loaded = load_config(Some(&path)).expect("load");
        let _ = std::fs::remove_dir_all(path.parent().expect("parent"));

        // Assert
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_missing_explicit_file_yields_defaults() {
        let path = std::env::temp_dir().join("aqualogic-definitely-missing.toml");
        assert_eq!(load_config(Some(&path)).expect("load"), AppConfig::default());
    }
}
