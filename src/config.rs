//! Configuration management for the floor vision worker

use anyhow::{ensure, Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelsConfig,
    pub selection: SelectionConfig,
    pub floor: FloorConfig,
    pub protocol: ProtocolConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// A single pretrained classifier on disk
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ModelSpec {
    /// Identifier reported in the `model` field of responses
    pub id: u32,
    /// ONNX file name, relative to `models_dir`
    pub file: String,
}

/// Classifier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory containing the ONNX model files
    pub models_dir: String,
    /// Model used at or below the pressure threshold
    pub low_pressure: ModelSpec,
    /// Model used above the pressure threshold
    pub high_pressure: ModelSpec,
    /// Square edge length images are resized to before inference
    pub image_size: u32,
    /// Number of threads for ONNX inference per model
    pub onnx_threads: usize,
}

impl ModelsConfig {
    /// Full path of a model file
    pub fn model_path(&self, spec: &ModelSpec) -> PathBuf {
        Path::new(&self.models_dir).join(&spec.file)
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: ".".to_string(),
            low_pressure: ModelSpec {
                id: 1,
                file: "model_1.onnx".to_string(),
            },
            high_pressure: ModelSpec {
                id: 6,
                file: "model_6.onnx".to_string(),
            },
            image_size: 224,
            onnx_threads: 1,
        }
    }
}

/// Model selection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Pressures at or below this value (hPa) use the low-pressure model
    pub pressure_threshold_hpa: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            pressure_threshold_hpa: 1010.0,
        }
    }
}

/// Floor estimation configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FloorConfig {
    /// Pressure drop (hPa) corresponding to one floor
    pub hpa_per_floor: f64,
    /// Floor assumed when a reset request omits `current_floor`
    pub default_floor: i64,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            hpa_per_floor: 0.4,
            default_floor: 1,
        }
    }
}

/// Stdout protocol configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Prefix written immediately before every response object
    pub result_marker: String,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            result_marker: "__RESULT__".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct MetricsConfig {
    /// Seconds between periodic summaries; 0 reports only at shutdown
    pub report_interval_secs: u64,
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path; a missing file yields defaults
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// Reject values the worker cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.floor.hpa_per_floor.is_finite() && self.floor.hpa_per_floor > 0.0,
            "floor.hpa_per_floor must be a positive number, got {}",
            self.floor.hpa_per_floor
        );
        ensure!(
            self.selection.pressure_threshold_hpa.is_finite(),
            "selection.pressure_threshold_hpa must be finite"
        );
        ensure!(self.models.image_size > 0, "models.image_size must be non-zero");
        ensure!(self.models.onnx_threads > 0, "models.onnx_threads must be non-zero");
        ensure!(
            self.models.low_pressure.id != self.models.high_pressure.id,
            "low and high pressure models need distinct ids"
        );
        ensure!(
            self.protocol.result_marker.is_ascii() && !self.protocol.result_marker.contains('\n'),
            "protocol.result_marker must be a single ASCII line"
        );
        Ok(())
    }
}
