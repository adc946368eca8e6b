use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::DEFAULT_ALERT_INTERVAL;
use crate::brightness::DEFAULT_SAMPLE_SIZE;
use crate::detect::{Delegate, DetectorOptions, ModelKind};
use crate::pipeline::{PipelineSettings, SpreadPolicy};
use crate::render::ViewSize;
use crate::threshold::{MAX_THRESHOLD, MIN_THRESHOLD};
use crate::zones::{LabelFilter, VEHICLE_LABELS};

const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_RESULTS: usize = 5;
const DEFAULT_NUM_THREADS: usize = 4;
const DEFAULT_SOURCE: &str = "stub://road";
const DEFAULT_FPS: u32 = 10;
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

#[derive(Debug, Deserialize, Default)]
struct ZonewatchConfigFile {
    detector: Option<DetectorConfigFile>,
    alert: Option<AlertConfigFile>,
    brightness: Option<BrightnessConfigFile>,
    source: Option<SourceConfigFile>,
    view: Option<ViewConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    initial_threshold: Option<f32>,
    max_results: Option<usize>,
    num_threads: Option<usize>,
    delegate: Option<Delegate>,
    model: Option<ModelKind>,
    model_dir: Option<PathBuf>,
    apply_spread: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    interval_ms: Option<u64>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
struct BrightnessConfigFile {
    sample_size: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SourceConfigFile {
    path: Option<String>,
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct ViewConfigFile {
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ZonewatchConfig {
    pub detector: DetectorSettings,
    pub alert: AlertSettings,
    pub brightness_sample_size: u32,
    pub source: SourceSettings,
    pub view: Option<ViewSize>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub options: DetectorOptions,
    pub model_dir: Option<PathBuf>,
    pub spread_policy: SpreadPolicy,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub interval: Duration,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub path: String,
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl ZonewatchConfig {
    /// Load from `ZONEWATCH_CONFIG` (if set), apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("ZONEWATCH_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse and validate a config file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mut cfg = Self::from_file(read_config_file(path)?);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: ZonewatchConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let alert = file.alert.unwrap_or_default();
        let source = file.source.unwrap_or_default();

        let options = DetectorOptions {
            threshold: detector.initial_threshold.unwrap_or(DEFAULT_THRESHOLD),
            max_results: detector.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            num_threads: detector.num_threads.unwrap_or(DEFAULT_NUM_THREADS),
            delegate: detector.delegate.unwrap_or_default(),
            model: detector.model.unwrap_or_default(),
        };
        let spread_policy = if detector.apply_spread.unwrap_or(false) {
            SpreadPolicy::Apply
        } else {
            SpreadPolicy::Discard
        };

        let view = file.view.and_then(|view| match (view.width, view.height) {
            (Some(width), Some(height)) => Some(ViewSize::new(width, height)),
            _ => None,
        });

        Self {
            detector: DetectorSettings {
                backend: detector
                    .backend
                    .unwrap_or_else(|| DEFAULT_BACKEND.to_string()),
                options,
                model_dir: detector.model_dir,
                spread_policy,
            },
            alert: AlertSettings {
                interval: alert
                    .interval_ms
                    .map(Duration::from_millis)
                    .unwrap_or(DEFAULT_ALERT_INTERVAL),
                labels: alert.labels.unwrap_or_else(|| {
                    VEHICLE_LABELS.iter().map(|l| l.to_string()).collect()
                }),
            },
            brightness_sample_size: file
                .brightness
                .and_then(|b| b.sample_size)
                .unwrap_or(DEFAULT_SAMPLE_SIZE),
            source: SourceSettings {
                path: source.path.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
                target_fps: source.target_fps.unwrap_or(DEFAULT_FPS),
                width: source.width.unwrap_or(DEFAULT_WIDTH),
                height: source.height.unwrap_or(DEFAULT_HEIGHT),
            },
            view,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(backend) = std::env::var("ZONEWATCH_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_string();
            }
        }
        if let Ok(delegate) = std::env::var("ZONEWATCH_DELEGATE") {
            if !delegate.trim().is_empty() {
                self.detector.options.delegate = Delegate::parse(&delegate)?;
            }
        }
        if let Ok(source) = std::env::var("ZONEWATCH_SOURCE") {
            if !source.trim().is_empty() {
                self.source.path = source;
            }
        }
        if let Ok(interval) = std::env::var("ZONEWATCH_ALERT_INTERVAL_MS") {
            let millis: u64 = interval.trim().parse().map_err(|_| {
                anyhow!("ZONEWATCH_ALERT_INTERVAL_MS must be an integer number of milliseconds")
            })?;
            self.alert.interval = Duration::from_millis(millis);
        }
        if let Ok(labels) = std::env::var("ZONEWATCH_ALERT_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.alert.labels = parsed;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        let threshold = self.detector.options.threshold;
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&threshold) {
            return Err(anyhow!(
                "detector.initial_threshold must be within [{}, {}], got {}",
                MIN_THRESHOLD,
                MAX_THRESHOLD,
                threshold
            ));
        }
        if self.detector.options.max_results == 0 {
            return Err(anyhow!("detector.max_results must be at least 1"));
        }
        if self.detector.options.num_threads == 0 {
            return Err(anyhow!("detector.num_threads must be at least 1"));
        }
        if self.brightness_sample_size == 0 {
            return Err(anyhow!("brightness.sample_size must be at least 1"));
        }
        if self.alert.interval.is_zero() {
            return Err(anyhow!("alert interval must be greater than zero"));
        }
        self.alert.labels = self
            .alert
            .labels
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        if self.alert.labels.is_empty() {
            return Err(anyhow!("alert.labels must name at least one label"));
        }
        if self.source.width == 0 || self.source.height == 0 {
            return Err(anyhow!("source width and height must be at least 1"));
        }
        if self.source.target_fps == 0 {
            return Err(anyhow!("source.target_fps must be at least 1"));
        }
        if let Some(view) = self.view {
            if view.width == 0 || view.height == 0 {
                return Err(anyhow!("view width and height must be at least 1"));
            }
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            detector: self.detector.options.clone(),
            labels: LabelFilter::new(&self.alert.labels),
            alert_interval: self.alert.interval,
            brightness_sample_size: self.brightness_sample_size,
            view: self.view,
            spread_policy: self.detector.spread_policy,
        }
    }
}

/// JSON by default; TOML when the file ends in `.toml`.
fn read_config_file(path: &Path) -> Result<ZonewatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_tuning() {
        let mut cfg = ZonewatchConfig::from_file(ZonewatchConfigFile::default());
        cfg.validate().unwrap();
        assert_eq!(cfg.detector.backend, "stub");
        assert_eq!(cfg.detector.options, DetectorOptions::default());
        assert_eq!(cfg.alert.interval, Duration::from_millis(3000));
        assert_eq!(cfg.alert.labels, vec!["car", "truck", "bus", "motorcycle"]);
        assert_eq!(cfg.brightness_sample_size, 96);
        assert_eq!(cfg.source.path, "stub://road");
        assert!(cfg.view.is_none());
        assert_eq!(cfg.detector.spread_policy, SpreadPolicy::Discard);
    }

    #[test]
    fn validation_rejects_out_of_range_values() {
        let mut cfg = ZonewatchConfig::from_file(ZonewatchConfigFile::default());
        cfg.detector.options.threshold = 0.95;
        assert!(cfg.validate().is_err());

        let mut cfg = ZonewatchConfig::from_file(ZonewatchConfigFile::default());
        cfg.alert.labels = vec!["  ".to_string()];
        assert!(cfg.validate().is_err());

        let mut cfg = ZonewatchConfig::from_file(ZonewatchConfigFile::default());
        cfg.brightness_sample_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn split_csv_skips_blanks() {
        assert_eq!(split_csv(" car, ,bus,"), vec!["car", "bus"]);
    }
}
