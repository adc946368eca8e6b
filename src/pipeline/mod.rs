//! Frame pipeline.
//!
//! One frame at a time:
//! brightness → threshold (maybe reconfigure) → detect → classify → alert →
//! render → spread proposal for the next frame.
//!
//! `FramePipeline` is the sole owner of `ThresholdState`, `AlertState` and the
//! detector instance. `PipelineWorker` runs it on a dedicated thread.

mod detector_slot;
mod worker;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::alert::{AlertState, AlertThrottler, DEFAULT_ALERT_INTERVAL};
use crate::brightness::{self, DEFAULT_SAMPLE_SIZE};
use crate::detect::{resolve_delegate, Detection, DetectorFactory, DetectorOptions, DeviceCapabilities};
use crate::error::PipelineError;
use crate::frame::Frame;
use crate::present::Delivery;
use crate::render::{self, RenderData, ViewSize};
use crate::threshold::{self, ThresholdProposal, ThresholdState};
use crate::zones::{self, LabelFilter, ZoneCounts};

use detector_slot::DetectorSlot;
pub use worker::{PipelineWorker, WorkerStats};

/// What happens to the spread-based proposal after each frame.
///
/// Either way the brightness tier is recomputed at the start of the next frame
/// and wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpreadPolicy {
    /// Report the proposal but leave the threshold state alone.
    #[default]
    Discard,
    /// Write the proposal into the threshold state. The next brightness step
    /// then sees a different value and reconfigures the detector.
    Apply,
}

#[derive(Clone, Debug)]
pub struct PipelineSettings {
    pub detector: DetectorOptions,
    pub labels: LabelFilter,
    pub alert_interval: Duration,
    pub brightness_sample_size: u32,
    /// Render target; defaults to the upright frame size.
    pub view: Option<ViewSize>,
    pub spread_policy: SpreadPolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            detector: DetectorOptions::default(),
            labels: LabelFilter::vehicles(),
            alert_interval: DEFAULT_ALERT_INTERVAL,
            brightness_sample_size: DEFAULT_SAMPLE_SIZE,
            view: None,
            spread_policy: SpreadPolicy::Discard,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameStage {
    Received,
    BrightnessEstimated,
    ThresholdUpdated,
    Reconfiguring,
    Detected,
    Classified,
    Alerted,
    Rendered,
    Done,
    Dropped,
}

/// Everything one pipeline pass produced.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub sequence: u64,
    pub stage: FrameStage,
    pub avg_luminance: f64,
    pub threshold: f32,
    pub threshold_changed: bool,
    pub detections: Vec<Detection>,
    pub counts: ZoneCounts,
    pub utterance: Option<String>,
    pub render: Option<RenderData>,
    pub spread: Option<ThresholdProposal>,
    pub errors: Vec<PipelineError>,
    pub inference_time: Duration,
}

impl FrameReport {
    fn new(sequence: u64) -> Self {
        Self {
            sequence,
            stage: FrameStage::Received,
            avg_luminance: 0.0,
            threshold: 0.0,
            threshold_changed: false,
            detections: Vec::new(),
            counts: ZoneCounts::default(),
            utterance: None,
            render: None,
            spread: None,
            errors: Vec::new(),
            inference_time: Duration::ZERO,
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.stage == FrameStage::Dropped
    }

    /// Messages for the presentation context: errors first, then the alert,
    /// then the overlay.
    pub fn deliveries(&self) -> Vec<Delivery> {
        let sequence = self.sequence;
        let mut out: Vec<Delivery> = self
            .errors
            .iter()
            .cloned()
            .map(|error| Delivery::Error { sequence, error })
            .collect();
        if let Some(text) = &self.utterance {
            out.push(Delivery::Alert {
                sequence,
                text: text.clone(),
            });
        }
        if let Some(data) = &self.render {
            out.push(Delivery::Render {
                sequence,
                data: data.clone(),
            });
        }
        out
    }
}

pub struct FramePipeline {
    settings: PipelineSettings,
    detector: DetectorSlot,
    threshold: ThresholdState,
    alert: AlertState,
    throttler: AlertThrottler,
    pending_errors: Vec<PipelineError>,
}

impl FramePipeline {
    /// Build a pipeline around `factory`. The delegate is resolved here, once;
    /// an unsupported request is reported with the first frame.
    pub fn new(
        factory: Arc<dyn DetectorFactory>,
        mut settings: PipelineSettings,
        capabilities: &DeviceCapabilities,
    ) -> Self {
        let mut pending_errors = Vec::new();
        let (delegate, unsupported) = resolve_delegate(settings.detector.delegate, capabilities);
        if let Some(err) = unsupported {
            log::warn!("{}; using the default delegate", err);
            pending_errors.push(err);
        }
        settings.detector.delegate = delegate;

        let threshold = ThresholdState::new(settings.detector.threshold);
        settings.detector.threshold = threshold.current_threshold();
        let throttler = AlertThrottler::new(settings.alert_interval);
        Self {
            detector: DetectorSlot::new(factory, settings.detector.clone()),
            settings,
            threshold,
            alert: AlertState::default(),
            throttler,
            pending_errors,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn threshold_state(&self) -> &ThresholdState {
        &self.threshold
    }

    pub fn alert_state(&self) -> &AlertState {
        &self.alert
    }

    pub fn detector_ready(&self) -> bool {
        self.detector.is_ready()
    }

    pub fn detector_threshold(&self) -> f32 {
        self.detector.applied_threshold()
    }

    /// Build the detector ahead of the first frame.
    pub fn warm_up(&mut self) -> Result<(), PipelineError> {
        self.detector.ensure(self.threshold.current_threshold())
    }

    /// Run one frame through every stage.
    pub fn process(&mut self, frame: Frame, now: Instant) -> FrameReport {
        let mut report = FrameReport::new(frame.sequence);
        report.errors.append(&mut self.pending_errors);

        let image = frame.into_upright();
        let (width, height) = (image.width(), image.height());

        report.avg_luminance =
            brightness::estimate_with(&image, self.settings.brightness_sample_size);
        report.stage = FrameStage::BrightnessEstimated;

        let (threshold, changed) =
            threshold::update_from_brightness(report.avg_luminance, &mut self.threshold);
        report.threshold = threshold;
        report.threshold_changed = changed;
        report.stage = FrameStage::ThresholdUpdated;
        if changed {
            log::info!(
                "brightness {:.1} -> tier {:?}, threshold {:.2}",
                report.avg_luminance,
                self.threshold.last_applied_tier(),
                threshold
            );
        }

        if !self.detector.is_ready() {
            report.stage = FrameStage::Reconfiguring;
            if let Err(err) = self.detector.ensure(threshold) {
                log::error!("frame {} dropped: {}", report.sequence, err);
                report.errors.push(err);
                report.stage = FrameStage::Dropped;
                return report;
            }
        } else if changed || self.detector.applied_threshold() != threshold {
            // A failed reconfiguration leaves the detector behind the state;
            // retry on every frame until it catches up.
            report.stage = FrameStage::Reconfiguring;
            if let Err(err) = self.detector.reconfigure(threshold) {
                log::warn!(
                    "{}; keeping threshold {:.2}",
                    err,
                    self.detector.applied_threshold()
                );
                report.errors.push(err);
            }
        }

        let started = Instant::now();
        report.detections = match self.detector.detect(&image) {
            Ok(detections) => detections,
            Err(err) => {
                log::warn!("frame {}: {}", report.sequence, err);
                report.errors.push(err);
                Vec::new()
            }
        };
        report.inference_time = started.elapsed();
        report.stage = FrameStage::Detected;

        report.counts = zones::classify(&report.detections, width, &self.settings.labels);
        report.stage = FrameStage::Classified;

        report.utterance = self
            .throttler
            .maybe_announce(&report.counts, now, &mut self.alert);
        report.stage = FrameStage::Alerted;

        let view = self
            .settings
            .view
            .unwrap_or_else(|| ViewSize::new(width, height));
        report.render = Some(render::build(&report.detections, width, height, view));
        report.stage = FrameStage::Rendered;

        report.spread = threshold::spread_proposal(&report.detections, width);
        if let (Some(proposal), SpreadPolicy::Apply) = (report.spread, self.settings.spread_policy) {
            self.threshold.apply(proposal);
        }

        log::debug!(
            "frame {} [{}]: luma {:.1} threshold {:.2} detections {} counts {:?} inference {:?}",
            report.sequence,
            self.detector.backend_name(),
            report.avg_luminance,
            report.threshold,
            report.detections.len(),
            report.counts,
            report.inference_time
        );
        report.stage = FrameStage::Done;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Delegate, ScriptedFactory};
    use crate::frame::Rotation;
    use image::{Rgb, RgbImage};

    fn frame(width: u32, height: u32, gray: u8) -> Frame {
        Frame::new(
            RgbImage::from_pixel(width, height, Rgb([gray, gray, gray])),
            Rotation::Deg0,
        )
    }

    fn car(left: f32, right: f32) -> Detection {
        Detection::labeled(BoundingBox::new(left, 10.0, right, 40.0), "car", 0.9)
    }

    fn pipeline(script: Vec<Vec<Detection>>, settings: PipelineSettings) -> FramePipeline {
        FramePipeline::new(
            Arc::new(ScriptedFactory::new(script)),
            settings,
            &DeviceCapabilities::cpu_only(),
        )
    }

    #[test]
    fn full_pass_reaches_done() {
        let mut p = pipeline(vec![vec![car(10.0, 50.0)]], PipelineSettings::default());
        let report = p.process(frame(300, 100, 100), Instant::now());
        assert_eq!(report.stage, FrameStage::Done);
        assert_eq!(report.threshold, 0.5);
        assert!(!report.threshold_changed);
        assert_eq!(report.utterance.as_deref(), Some("Vehicle 1 on left"));
        let render = report.render.unwrap();
        assert_eq!((render.source_width, render.source_height), (300, 100));
        assert_eq!(render.scale, 1.0);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn dark_frame_lowers_threshold_and_reconfigures() {
        let mut p = pipeline(vec![vec![]], PipelineSettings::default());
        p.warm_up().unwrap();
        let report = p.process(frame(64, 64, 20), Instant::now());
        assert_eq!(report.threshold, 0.3);
        assert!(report.threshold_changed);
        assert_eq!(p.detector_threshold(), 0.3);
        assert_eq!(report.render.unwrap().boxes.len(), 0);
    }

    #[test]
    fn unsupported_delegate_is_reported_once() {
        let mut settings = PipelineSettings::default();
        settings.detector.delegate = Delegate::Accelerated;
        let mut p = pipeline(vec![vec![]], settings);
        assert_eq!(p.settings().detector.delegate, Delegate::Default);

        let first = p.process(frame(10, 10, 100), Instant::now());
        assert_eq!(
            first.errors,
            vec![PipelineError::UnsupportedBackend {
                requested: Delegate::Accelerated
            }]
        );
        let second = p.process(frame(10, 10, 100), Instant::now());
        assert!(second.errors.is_empty());
    }

    #[test]
    fn spread_is_discarded_by_default() {
        let mut p = pipeline(
            vec![vec![car(5.0, 15.0), car(285.0, 295.0)]],
            PipelineSettings::default(),
        );
        let report = p.process(frame(300, 100, 100), Instant::now());
        let spread = report.spread.unwrap();
        assert!((spread.value - 0.3267).abs() < 1e-3);
        assert_eq!(p.threshold_state().current_threshold(), 0.5);
    }

    #[test]
    fn applied_spread_is_overridden_by_next_brightness_step() {
        let settings = PipelineSettings {
            spread_policy: SpreadPolicy::Apply,
            ..PipelineSettings::default()
        };
        let mut p = pipeline(vec![vec![car(5.0, 15.0), car(285.0, 295.0)]], settings);
        p.process(frame(300, 100, 100), Instant::now());
        assert!(p.threshold_state().current_threshold() < 0.4);

        let next = p.process(frame(300, 100, 100), Instant::now());
        assert_eq!(next.threshold, 0.5);
        assert!(next.threshold_changed);
    }

    #[test]
    fn rotated_frames_use_upright_geometry() {
        // 100x300 captured sideways becomes 300x100 upright.
        let mut p = pipeline(vec![vec![car(250.0, 290.0)]], PipelineSettings::default());
        let sideways = Frame::new(
            RgbImage::from_pixel(100, 300, Rgb([100, 100, 100])),
            Rotation::Deg90,
        );
        let report = p.process(sideways, Instant::now());
        assert_eq!(report.counts.right, 1);
        assert_eq!(report.utterance.as_deref(), Some("Vehicle 1 on right"));
    }

    #[test]
    fn deliveries_keep_error_alert_render_order() {
        let mut settings = PipelineSettings::default();
        settings.detector.delegate = Delegate::Fallback;
        let mut p = pipeline(vec![vec![car(10.0, 50.0)]], settings);
        let report = p.process(frame(300, 100, 100), Instant::now());
        let kinds: Vec<&str> = report
            .deliveries()
            .iter()
            .map(|d| match d {
                Delivery::Error { .. } => "error",
                Delivery::Alert { .. } => "alert",
                Delivery::Render { .. } => "render",
            })
            .collect();
        assert_eq!(kinds, vec!["error", "alert", "render"]);
    }
}
