use anyhow::{anyhow, Result};
use image::RgbImage;
use serde::Deserialize;

use crate::detect::result::Detection;
use crate::error::PipelineError;

/// Hardware delegate for inference, resolved once at configuration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delegate {
    /// Plain CPU execution. Always available.
    #[default]
    Default,
    /// GPU-style acceleration.
    Accelerated,
    /// Platform neural-network runtime that picks its own fallback path.
    Fallback,
}

impl Delegate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Delegate::Default => "default",
            Delegate::Accelerated => "accelerated",
            Delegate::Fallback => "fallback",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "cpu" => Ok(Delegate::Default),
            "accelerated" | "gpu" => Ok(Delegate::Accelerated),
            "fallback" | "nnapi" => Ok(Delegate::Fallback),
            other => Err(anyhow!("unknown delegate '{}'", other)),
        }
    }
}

/// What the running device can accelerate with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub accelerated: bool,
    pub fallback: bool,
}

impl DeviceCapabilities {
    pub fn cpu_only() -> Self {
        Self::default()
    }

    pub fn supports(&self, delegate: Delegate) -> bool {
        match delegate {
            Delegate::Default => true,
            Delegate::Accelerated => self.accelerated,
            Delegate::Fallback => self.fallback,
        }
    }
}

/// Resolve the requested delegate against the device.
///
/// Unsupported requests fall back to `Delegate::Default` and return the error
/// so the caller can report it once.
pub fn resolve_delegate(
    requested: Delegate,
    capabilities: &DeviceCapabilities,
) -> (Delegate, Option<PipelineError>) {
    if capabilities.supports(requested) {
        (requested, None)
    } else {
        (
            Delegate::Default,
            Some(PipelineError::UnsupportedBackend { requested }),
        )
    }
}

/// Detection model shipped alongside the detector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    MobilenetV1,
    #[default]
    EfficientdetLite0,
    EfficientdetLite1,
    EfficientdetLite2,
}

impl ModelKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelKind::MobilenetV1 => "mobilenetv1.onnx",
            ModelKind::EfficientdetLite0 => "efficientdet_lite0.onnx",
            ModelKind::EfficientdetLite1 => "efficientdet_lite1.onnx",
            ModelKind::EfficientdetLite2 => "efficientdet_lite2.onnx",
        }
    }

    /// Square input edge the model expects.
    pub fn input_size(&self) -> u32 {
        match self {
            ModelKind::MobilenetV1 => 300,
            ModelKind::EfficientdetLite0 => 320,
            ModelKind::EfficientdetLite1 => 384,
            ModelKind::EfficientdetLite2 => 448,
        }
    }
}

/// Everything a detector instance is configured with.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    pub threshold: f32,
    pub max_results: usize,
    pub num_threads: usize,
    pub delegate: Delegate,
    pub model: ModelKind,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_results: 5,
            num_threads: 4,
            delegate: Delegate::Default,
            model: ModelKind::EfficientdetLite0,
        }
    }
}

impl DetectorOptions {
    pub fn with_threshold(&self, threshold: f32) -> Self {
        Self {
            threshold,
            ..self.clone()
        }
    }
}

/// Object detector collaborator.
///
/// Both calls may block for a long time. `reconfigure` must fully complete,
/// successfully or not, before the next `detect` on the same instance; the
/// pipeline guarantees this by owning the instance on a single thread.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Apply new options. On error the previous configuration must stay usable.
    fn reconfigure(&mut self, options: &DetectorOptions) -> Result<()>;

    /// Run detection on an upright image. Box coordinates are in the image's
    /// pixel space.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// Builds detector instances on demand.
pub trait DetectorFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn build(&self, options: &DetectorOptions) -> Result<Box<dyn Detector>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_delegate_falls_back_to_default() {
        let caps = DeviceCapabilities::cpu_only();
        let (resolved, err) = resolve_delegate(Delegate::Accelerated, &caps);
        assert_eq!(resolved, Delegate::Default);
        assert_eq!(
            err,
            Some(PipelineError::UnsupportedBackend {
                requested: Delegate::Accelerated
            })
        );

        let caps = DeviceCapabilities {
            accelerated: true,
            fallback: false,
        };
        let (resolved, err) = resolve_delegate(Delegate::Accelerated, &caps);
        assert_eq!(resolved, Delegate::Accelerated);
        assert!(err.is_none());
    }

    #[test]
    fn delegate_parse_accepts_aliases() {
        assert_eq!(Delegate::parse("GPU").unwrap(), Delegate::Accelerated);
        assert_eq!(Delegate::parse("nnapi").unwrap(), Delegate::Fallback);
        assert_eq!(Delegate::parse(" cpu ").unwrap(), Delegate::Default);
        assert!(Delegate::parse("tpu").is_err());
    }
}
