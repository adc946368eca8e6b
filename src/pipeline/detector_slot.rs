use std::sync::Arc;

use image::RgbImage;

use crate::detect::{Detection, Detector, DetectorFactory, DetectorOptions};
use crate::error::PipelineError;

/// Owns the single detector instance and the options it was last configured
/// with. Only the pipeline thread touches it, so reconfiguration always
/// completes before the next `detect`.
pub(crate) struct DetectorSlot {
    factory: Arc<dyn DetectorFactory>,
    instance: Option<Box<dyn Detector>>,
    applied: DetectorOptions,
}

impl DetectorSlot {
    pub(crate) fn new(factory: Arc<dyn DetectorFactory>, options: DetectorOptions) -> Self {
        Self {
            factory,
            instance: None,
            applied: options,
        }
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.instance.is_some()
    }

    pub(crate) fn applied_threshold(&self) -> f32 {
        self.applied.threshold
    }

    pub(crate) fn backend_name(&self) -> &'static str {
        self.instance
            .as_ref()
            .map(|d| d.name())
            .unwrap_or_else(|| self.factory.name())
    }

    /// Build an instance configured for `threshold` if none exists.
    pub(crate) fn ensure(&mut self, threshold: f32) -> Result<(), PipelineError> {
        if self.instance.is_some() {
            return Ok(());
        }
        let options = self.applied.with_threshold(threshold);
        match self.factory.build(&options) {
            Ok(detector) => {
                log::info!(
                    "detector {} ready (threshold {:.2}, max_results {}, delegate {})",
                    detector.name(),
                    options.threshold,
                    options.max_results,
                    options.delegate.as_str()
                );
                self.instance = Some(detector);
                self.applied = options;
                Ok(())
            }
            Err(err) => Err(PipelineError::DetectorUnavailable {
                reason: format!("{:#}", err),
            }),
        }
    }

    /// Move the live instance to `threshold`. On failure the previous
    /// configuration stays in place.
    pub(crate) fn reconfigure(&mut self, threshold: f32) -> Result<(), PipelineError> {
        let options = self.applied.with_threshold(threshold);
        let outcome = match self.instance.as_mut() {
            Some(detector) => detector.reconfigure(&options),
            None => return self.ensure(threshold),
        };
        match outcome {
            Ok(()) => {
                self.applied = options;
                Ok(())
            }
            Err(err) => Err(PipelineError::ReconfigurationFailed {
                threshold,
                reason: format!("{:#}", err),
            }),
        }
    }

    pub(crate) fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>, PipelineError> {
        let Some(detector) = self.instance.as_mut() else {
            return Err(PipelineError::DetectorUnavailable {
                reason: "no detector instance".to_string(),
            });
        };
        detector
            .detect(image)
            .map_err(|err| PipelineError::DetectionFailed {
                reason: format!("{:#}", err),
            })
    }
}
