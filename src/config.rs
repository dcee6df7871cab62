use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::state::ZoomStep;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub instance: InstanceConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Identifier shared by every launch of the application
    #[serde(default = "default_app_id")]
    pub app_id: String,
    /// Directory for the lock file and socket (empty = XDG runtime dir)
    #[serde(default)]
    pub runtime_dir: Option<PathBuf>,
    /// How long the primary waits for its listener to accept connections
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// How long shutdown waits for the listener to stop
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
    /// Delivery attempts made by a secondary launch
    #[serde(default = "default_notify_attempts")]
    pub notify_attempts: u32,
    /// Base backoff between delivery attempts
    #[serde(default = "default_notify_backoff_ms")]
    pub notify_backoff_ms: u64,
    /// Bound on a single connect + write
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Bound on reading one forwarded message
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Decode images no wider than this (0 = full size)
    #[serde(default = "default_decode_max_width")]
    pub decode_max_width: u32,
    /// Zoom step used before any session is restored
    #[serde(default)]
    pub default_zoom_step: ZoomStep,
    /// Render a block preview of the selected image
    #[serde(default = "default_true")]
    pub show_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Restore tabs and geometry on startup
    #[serde(default = "default_true")]
    pub restore_on_startup: bool,
    /// Save the session on exit
    #[serde(default = "default_true")]
    pub save_on_exit: bool,
    /// Session file override
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// How long exit waits for the final save
    #[serde(default = "default_save_timeout_ms")]
    pub save_timeout_ms: u64,
}

// Default value helpers
fn default_app_id() -> String {
    "pictab".to_string()
}
fn default_ready_timeout_ms() -> u64 {
    2000
}
fn default_stop_timeout_ms() -> u64 {
    1000
}
fn default_notify_attempts() -> u32 {
    10
}
fn default_notify_backoff_ms() -> u64 {
    100
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
fn default_read_timeout_ms() -> u64 {
    2000
}
fn default_decode_max_width() -> u32 {
    1920
}
fn default_save_timeout_ms() -> u64 {
    3000
}
fn default_true() -> bool {
    true
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            app_id: default_app_id(),
            runtime_dir: None,
            ready_timeout_ms: default_ready_timeout_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            notify_attempts: default_notify_attempts(),
            notify_backoff_ms: default_notify_backoff_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            decode_max_width: default_decode_max_width(),
            default_zoom_step: ZoomStep::default(),
            show_preview: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_on_startup: true,
            save_on_exit: true,
            path: None,
            save_timeout_ms: default_save_timeout_ms(),
        }
    }
}

impl InstanceConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn notify_backoff(&self) -> Duration {
        Duration::from_millis(self.notify_backoff_ms)
    }

    pub fn runtime_dir(&self) -> PathBuf {
        self.runtime_dir
            .clone()
            .unwrap_or_else(crate::paths::runtime_dir)
    }
}

impl ViewerConfig {
    pub fn decode_max_width(&self) -> Option<u32> {
        (self.decode_max_width > 0).then_some(self.decode_max_width)
    }
}

impl SessionConfig {
    pub fn session_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(crate::paths::default_session_path)
    }

    pub fn save_timeout(&self) -> Duration {
        Duration::from_millis(self.save_timeout_ms)
    }
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// A missing file yields defaults; an unreadable or invalid one is logged
    /// and also yields defaults.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("{e}; using default configuration");
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the path to the config file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pictab").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.instance.app_id, "pictab");
        assert_eq!(config.instance.ready_timeout(), Duration::from_secs(2));
        assert_eq!(config.instance.stop_timeout(), Duration::from_secs(1));
        assert_eq!(config.instance.notify_attempts, 10);
        assert_eq!(config.viewer.decode_max_width(), Some(1920));
        assert!(config.session.restore_on_startup);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[instance]\nnotify_attempts = 3\n\n[viewer]\ndecode_max_width = 0\ndefault_zoom_step = 20\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.instance.notify_attempts, 3);
        assert_eq!(config.instance.app_id, "pictab");
        assert_eq!(config.viewer.decode_max_width(), None);
        assert_eq!(config.viewer.default_zoom_step, ZoomStep::Twenty);
        assert!(config.session.save_on_exit);
    }

    #[test]
    fn test_invalid_zoom_step_normalized() {
        let config: Config = toml::from_str("[viewer]\ndefault_zoom_step = 15\n").unwrap();
        assert_eq!(config.viewer.default_zoom_step, ZoomStep::Four);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[instance\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
