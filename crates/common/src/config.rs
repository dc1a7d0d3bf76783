//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{LuminaError, LuminaResult};

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Notification queue settings.
    pub toasts: ToastSettings,

    /// Camera auto-fit constants.
    pub auto_fit: AutoFitSettings,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Notification queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastSettings {
    /// Maximum number of live notifications.
    pub capacity: usize,

    /// Auto-dismiss delay applied when a publisher gives none (ms).
    pub default_duration_ms: u64,
}

/// Camera auto-fit constants.
///
/// These are product values chosen for visual parity across models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoFitSettings {
    /// Distance multiplier applied to the tight-fit distance.
    pub padding: f64,

    /// Camera elevation above the horizontal plane (degrees).
    pub elevation_deg: f64,

    /// Azimuthal rotation from the primary viewing axis (degrees).
    pub azimuth_deg: f64,

    /// Minimum number of selectable meshes before framing is attempted.
    pub min_meshes: usize,

    /// Bounding-sphere radius below which the bounds count as degenerate.
    pub min_radius: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "lumina_toast=trace,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ToastSettings {
    fn default() -> Self {
        Self {
            capacity: 3,
            default_duration_ms: 5000,
        }
    }
}

impl Default for AutoFitSettings {
    fn default() -> Self {
        Self {
            padding: 1.8,
            elevation_deg: 20.0,
            azimuth_deg: 15.0,
            min_meshes: 2,
            min_radius: 1e-4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &std::path::Path) -> LuminaResult<Self> {
        let content = LuminaError::read_file(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|source| LuminaError::ParseAt {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the queue and the framing math cannot honor.
    pub fn validate(&self) -> LuminaResult<()> {
        if self.toasts.capacity == 0 {
            return Err(LuminaError::config("toasts.capacity must be at least 1"));
        }
        if !(self.auto_fit.padding.is_finite() && self.auto_fit.padding > 0.0) {
            return Err(LuminaError::config("auto_fit.padding must be positive"));
        }
        if !(-90.0..=90.0).contains(&self.auto_fit.elevation_deg) {
            return Err(LuminaError::config(
                "auto_fit.elevation_deg must be within [-90, 90]",
            ));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> LuminaResult<PathBuf> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, json)?;
        Ok(config_path)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("lumina").join("config.json")
}
