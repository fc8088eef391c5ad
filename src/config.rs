use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineConfig;

const DEFAULT_DB_PATH: &str = "gear_watch.db";
const DEFAULT_PERSON_INPUT_SIZE: u32 = 640;
const DEFAULT_PERSON_CONFIDENCE: f32 = 0.5;
const DEFAULT_GEAR_THRESHOLD: f32 = 0.5;

#[derive(Debug, Deserialize, Default)]
struct ScanConfigFile {
    db_path: Option<String>,
    video_dir: Option<PathBuf>,
    models: Option<ModelsConfigFile>,
    scan: Option<ScanSectionFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelsConfigFile {
    person_model: Option<PathBuf>,
    gear_model: Option<PathBuf>,
    person_input_size: Option<u32>,
    person_confidence: Option<f32>,
    gear_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanSectionFile {
    stride: Option<u64>,
    debounce_secs: Option<f64>,
    default_frame_rate: Option<f64>,
    extensions: Option<Vec<String>>,
    jpeg_quality: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub db_path: String,
    pub video_dir: Option<PathBuf>,
    pub models: ModelSettings,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub person_model: Option<PathBuf>,
    pub gear_model: Option<PathBuf>,
    pub person_input_size: u32,
    pub person_confidence: f32,
    pub gear_threshold: f32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            person_model: None,
            gear_model: None,
            person_input_size: DEFAULT_PERSON_INPUT_SIZE,
            person_confidence: DEFAULT_PERSON_CONFIDENCE,
            gear_threshold: DEFAULT_GEAR_THRESHOLD,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from_file(ScanConfigFile::default())
    }
}

impl ScanConfig {
    /// Defaults, overlaid with the file named by `GEAR_CONFIG`, then `GEAR_*`
    /// environment variables.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("GEAR_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => ScanConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ScanConfigFile) -> Self {
        let models_file = file.models.unwrap_or_default();
        let scan = file.scan.unwrap_or_default();
        let defaults = ModelSettings::default();
        let mut pipeline = PipelineConfig::default();

        if let Some(stride) = scan.stride {
            pipeline.stride = stride;
        }
        if let Some(secs) = scan.debounce_secs {
            pipeline.debounce_interval_s = secs;
        }
        if let Some(rate) = scan.default_frame_rate {
            pipeline.default_frame_rate = rate;
        }
        if let Some(exts) = scan.extensions {
            pipeline.video_extensions = exts;
        }
        if let Some(quality) = scan.jpeg_quality {
            pipeline.jpeg_quality = quality;
        }

        Self {
            db_path: file.db_path.unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            video_dir: file.video_dir,
            models: ModelSettings {
                person_model: models_file.person_model,
                gear_model: models_file.gear_model,
                person_input_size: models_file
                    .person_input_size
                    .unwrap_or(defaults.person_input_size),
                person_confidence: models_file
                    .person_confidence
                    .unwrap_or(defaults.person_confidence),
                gear_threshold: models_file
                    .gear_threshold
                    .unwrap_or(defaults.gear_threshold),
            },
            pipeline,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = non_empty_env("GEAR_DB_PATH") {
            self.db_path = path;
        }
        if let Some(dir) = non_empty_env("GEAR_VIDEO_DIR") {
            self.video_dir = Some(PathBuf::from(dir));
        }
        if let Some(path) = non_empty_env("GEAR_PERSON_MODEL") {
            self.models.person_model = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty_env("GEAR_GEAR_MODEL") {
            self.models.gear_model = Some(PathBuf::from(path));
        }
        if let Some(stride) = non_empty_env("GEAR_STRIDE") {
            self.pipeline.stride = stride
                .trim()
                .parse()
                .map_err(|_| anyhow!("GEAR_STRIDE must be a positive integer"))?;
        }
        if let Some(secs) = non_empty_env("GEAR_DEBOUNCE_SECS") {
            self.pipeline.debounce_interval_s = secs
                .trim()
                .parse()
                .map_err(|_| anyhow!("GEAR_DEBOUNCE_SECS must be a number of seconds"))?;
        }
        Ok(())
    }

    /// Reject settings the scan cannot run with. Extensions are normalised to
    /// lowercase without a leading dot.
    pub fn validate(&mut self) -> Result<()> {
        if self.db_path.trim().is_empty() {
            return Err(anyhow!("db_path must not be empty"));
        }
        let pipeline = &mut self.pipeline;
        if pipeline.stride == 0 {
            return Err(anyhow!("stride must be greater than zero"));
        }
        if !pipeline.debounce_interval_s.is_finite() || pipeline.debounce_interval_s < 0.0 {
            return Err(anyhow!(
                "debounce interval must be a finite, non-negative number of seconds"
            ));
        }
        if !pipeline.default_frame_rate.is_finite() || pipeline.default_frame_rate <= 0.0 {
            return Err(anyhow!("default frame rate must be greater than zero"));
        }
        if pipeline.jpeg_quality == 0 || pipeline.jpeg_quality > 100 {
            return Err(anyhow!("jpeg_quality must be in 1..=100"));
        }
        pipeline.video_extensions = pipeline
            .video_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        if pipeline.video_extensions.is_empty() {
            return Err(anyhow!("at least one video extension is required"));
        }

        for (name, value) in [
            ("person_confidence", self.models.person_confidence),
            ("gear_threshold", self.models.gear_threshold),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(anyhow!("{} must be between 0 and 1 (exclusive)", name));
            }
        }
        if self.models.person_input_size == 0 {
            return Err(anyhow!("person_input_size must be greater than zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<ScanConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
