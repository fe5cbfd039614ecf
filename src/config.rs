//! Configuration management for eyecapture
//!
//! Capture parameters are fixed for the lifetime of a session. They can be
//! loaded from TOML, layered with `EYECAPTURE__SECTION__KEY` environment
//! overrides, validated, and written back out.

use crate::errors::CaptureError;
use crate::types::Viewport;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeCaptureConfig {
    pub capture: CaptureParameters,
    pub camera: CameraConfig,
    pub storage: StorageConfig,
}

/// Parameters of the capture sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureParameters {
    /// Sharp images to keep per eye
    pub images_per_eye: u32,
    /// Max horizontal drift of the face center (normalized) while holding steady
    pub stability_threshold: f32,
    /// Max per-axis offset of the eye from view center, as a fraction of the view size
    pub center_threshold: f32,
    /// How long the eye must stay put before capture starts
    pub stability_delay_ms: u64,
    /// Pause between shots in the series
    pub inter_shot_delay_ms: u64,
    /// Settle time after zooming in, before focus is locked
    pub focus_confirm_delay_ms: u64,
    /// Minimum Laplacian score for a capture to be kept
    pub min_sharpness: f64,
    pub focus_auto_cancel_secs: u64,
    pub metering_auto_cancel_secs: u64,
    /// Fraction of the view width the zoomed eye should span
    pub target_eye_fraction: f32,
    /// Side of the alignment box as a fraction of the shorter view side
    pub alignment_box_fraction: f32,
}

impl Default for CaptureParameters {
    fn default() -> Self {
        Self {
            images_per_eye: 5,
            stability_threshold: 0.01,
            center_threshold: 0.05,
            stability_delay_ms: 500,
            inter_shot_delay_ms: 100,
            focus_confirm_delay_ms: 2000,
            min_sharpness: 10.0,
            focus_auto_cancel_secs: 3,
            metering_auto_cancel_secs: 3,
            target_eye_fraction: 0.4,
            alignment_box_fraction: 0.4,
        }
    }
}

impl CaptureParameters {
    pub fn stability_delay(&self) -> Duration {
        Duration::from_millis(self.stability_delay_ms)
    }

    pub fn inter_shot_delay(&self) -> Duration {
        Duration::from_millis(self.inter_shot_delay_ms)
    }

    pub fn focus_confirm_delay(&self) -> Duration {
        Duration::from_millis(self.focus_confirm_delay_ms)
    }

    pub fn focus_auto_cancel(&self) -> Duration {
        Duration::from_secs(self.focus_auto_cancel_secs)
    }

    pub fn metering_auto_cancel(&self) -> Duration {
        Duration::from_secs(self.metering_auto_cancel_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.images_per_eye == 0 || self.images_per_eye > 100 {
            return Err("images_per_eye must be between 1 and 100".to_string());
        }
        if !(self.stability_threshold > 0.0 && self.stability_threshold <= 1.0) {
            return Err("stability_threshold must be in (0.0, 1.0]".to_string());
        }
        if !(self.center_threshold > 0.0 && self.center_threshold <= 0.5) {
            return Err("center_threshold must be in (0.0, 0.5]".to_string());
        }
        if !self.min_sharpness.is_finite() || self.min_sharpness < 0.0 {
            return Err("min_sharpness must be a non-negative number".to_string());
        }
        if !(self.target_eye_fraction > 0.0 && self.target_eye_fraction <= 1.0) {
            return Err("target_eye_fraction must be in (0.0, 1.0]".to_string());
        }
        if !(self.alignment_box_fraction > 0.0 && self.alignment_box_fraction <= 1.0) {
            return Err("alignment_box_fraction must be in (0.0, 1.0]".to_string());
        }
        Ok(())
    }
}

/// Camera and preview configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Preview viewport size [width, height] in pixels
    pub viewport: [f32; 2],
    /// Upper bound for zoom-in requests
    pub max_zoom_ratio: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            viewport: [1080.0, 1920.0],
            max_zoom_ratio: 8.0,
        }
    }
}

impl CameraConfig {
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport[0], self.viewport[1])
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory captures are written to
    pub output_directory: String,
    /// Participant id used in file names when a session starts without one
    pub participant_id: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_directory: "./captures".to_string(),
            participant_id: "participant".to_string(),
        }
    }
}

impl EyeCaptureConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to read config file: {}", e))
        })?;

        let config: EyeCaptureConfig = toml::from_str(&contents).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to parse config file: {}", e))
        })?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Load the file (if present) and apply `EYECAPTURE__*` environment overrides
    pub fn load_layered<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("EYECAPTURE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CaptureError::ConfigError(format!("Failed to build config: {}", e)))?;

        let config: EyeCaptureConfig = settings
            .try_deserialize()
            .map_err(|e| CaptureError::ConfigError(format!("Invalid config: {}", e)))?;

        config.validate().map_err(CaptureError::ConfigError)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    CaptureError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string).map_err(|e| {
            CaptureError::ConfigError(format!("Failed to write config file: {}", e))
        })?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("eyecapture.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_layered(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        self.capture.validate()?;

        if self.camera.viewport[0] <= 0.0 || self.camera.viewport[1] <= 0.0 {
            return Err("Invalid viewport".to_string());
        }
        if !(self.camera.max_zoom_ratio >= 1.0) {
            return Err("max_zoom_ratio must be at least 1.0".to_string());
        }
        if self.storage.participant_id.trim().is_empty() {
            return Err("participant_id must not be empty".to_string());
        }

        Ok(())
    }
}
