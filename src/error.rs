//! Pipeline error taxonomy.
//!
//! None of these errors is fatal. Each one is surfaced on the error channel and
//! the pipeline degrades to the previous good configuration or an empty frame.

use crate::detect::Delegate;

#[derive(Clone, Debug, PartialEq)]
pub enum PipelineError {
    /// No detector instance exists and building one on demand failed.
    /// The frame is dropped.
    DetectorUnavailable { reason: String },
    /// A threshold or backend change could not be applied.
    /// The prior configuration stays active.
    ReconfigurationFailed { threshold: f32, reason: String },
    /// A single inference call failed. The frame counts as empty.
    DetectionFailed { reason: String },
    /// Requested acceleration is not available on this device.
    UnsupportedBackend { requested: Delegate },
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::DetectorUnavailable { .. } => "detector_unavailable",
            PipelineError::ReconfigurationFailed { .. } => "reconfiguration_failed",
            PipelineError::DetectionFailed { .. } => "detection_failed",
            PipelineError::UnsupportedBackend { .. } => "unsupported_backend",
        }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::DetectorUnavailable { reason } => {
                write!(f, "object detector failed to initialize: {}", reason)
            }
            PipelineError::ReconfigurationFailed { threshold, reason } => write!(
                f,
                "detector reconfiguration to threshold {:.2} failed: {}",
                threshold, reason
            ),
            PipelineError::DetectionFailed { reason } => {
                write!(f, "detection failed: {}", reason)
            }
            PipelineError::UnsupportedBackend { requested } => write!(
                f,
                "{} delegate is not supported on this device",
                requested.as_str()
            ),
        }
    }
}

impl std::error::Error for PipelineError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure() {
        let err = PipelineError::ReconfigurationFailed {
            threshold: 0.3,
            reason: "model busy".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "detector reconfiguration to threshold 0.30 failed: model busy"
        );
        assert_eq!(err.kind(), "reconfiguration_failed");

        let err = PipelineError::UnsupportedBackend {
            requested: Delegate::Accelerated,
        };
        assert_eq!(
            err.to_string(),
            "accelerated delegate is not supported on this device"
        );
    }
}
