//! Configuration loading and management
//!
//! Handles parsing of the `board.toml` file in the board data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::BackendKind;
use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::storage::CONFIG_FILE;

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "BOARDSYNC_DIR";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// User whose board is shown
    #[serde(default = "default_user")]
    pub user: String,

    /// Backing store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Persist failure handling
    #[serde(default)]
    pub persist: PersistConfig,

    /// Touch drag tuning
    #[serde(default)]
    pub touch: TouchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: default_user(),
            store: StoreConfig::default(),
            persist: PersistConfig::default(),
            touch: TouchConfig::default(),
        }
    }
}

fn default_user() -> String {
    "guest".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `documents`, `local` or `memory`
    #[serde(default)]
    pub kind: BackendKind,

    /// How long a writer waits for a store file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistConfig {
    /// Restore the previous task state when a write to the store fails.
    /// Off by default: the local change stays until the next reload.
    #[serde(default)]
    pub rollback_on_failure: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchConfig {
    /// Movement on either axis beyond which a touch becomes a drag
    #[serde(default = "default_drag_threshold_px")]
    pub drag_threshold_px: f64,

    /// Clone is drawn this far above the finger
    #[serde(default = "default_clone_offset_y")]
    pub clone_offset_y: f64,

    /// Distance from the viewport edge that starts auto-scroll
    #[serde(default = "default_auto_scroll_edge_px")]
    pub auto_scroll_edge_px: f64,

    #[serde(default = "default_auto_scroll_interval_ms")]
    pub auto_scroll_interval_ms: u64,

    #[serde(default = "default_auto_scroll_step_px")]
    pub auto_scroll_step_px: f64,
}

fn default_drag_threshold_px() -> f64 {
    10.0
}

fn default_clone_offset_y() -> f64 {
    30.0
}

fn default_auto_scroll_edge_px() -> f64 {
    100.0
}

fn default_auto_scroll_interval_ms() -> u64 {
    20
}

fn default_auto_scroll_step_px() -> f64 {
    15.0
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            drag_threshold_px: default_drag_threshold_px(),
            clone_offset_y: default_clone_offset_y(),
            auto_scroll_edge_px: default_auto_scroll_edge_px(),
            auto_scroll_interval_ms: default_auto_scroll_interval_ms(),
            auto_scroll_step_px: default_auto_scroll_step_px(),
        }
    }
}

impl TouchConfig {
    fn validate(&self) -> Result<()> {
        let non_negative = [
            ("touch.drag_threshold_px", self.drag_threshold_px),
            ("touch.clone_offset_y", self.clone_offset_y),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "{field} must be a non-negative number"
                )));
            }
        }

        let positive = [
            ("touch.auto_scroll_edge_px", self.auto_scroll_edge_px),
            ("touch.auto_scroll_step_px", self.auto_scroll_step_px),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfig(format!("{field} must be positive")));
            }
        }

        if self.auto_scroll_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "touch.auto_scroll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `board.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `board.toml` from a data directory, or return defaults when absent
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let content = toml::to_string_pretty(self)?;
        lock::write_atomic(path, content.as_bytes())
    }

    pub fn validate(&self) -> Result<()> {
        let user = self.user.trim();
        if user.is_empty() {
            return Err(Error::InvalidConfig("user cannot be empty".to_string()));
        }
        if user.contains(['/', '\\']) || user == "." || user == ".." {
            return Err(Error::InvalidConfig(format!(
                "user '{user}' must not contain path separators"
            )));
        }
        if self.store.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.lock_timeout_ms must be positive".to_string(),
            ));
        }
        self.touch.validate()
    }
}

/// Data directory: explicit flag, then `BOARDSYNC_DIR`, then the platform
/// data directory.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    directories::ProjectDirs::from("", "", "boardsync")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig(format!(
                "no home directory found; pass --dir or set {DATA_DIR_ENV}"
            ))
        })
}
