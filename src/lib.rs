//! Zonewatch
//!
//! Turns per-frame object detections into adaptively tuned detection
//! sensitivity, left/center/right zone occupancy, rate-limited spoken alerts
//! and render-ready overlay geometry.
//!
//! # Module Structure
//!
//! - `brightness`: mean luma of a downsampled frame
//! - `threshold`: brightness tiers and spread-based proposals
//! - `zones`: label filtering and zone counts
//! - `alert`: utterance composition and the minimum alert interval
//! - `render`: scaled boxes, captions and zone dividers
//! - `detect`: detector trait, options, delegates, registry and backends
//! - `frame`: frames, rotation and the latest-only slot
//! - `pipeline`: per-frame orchestration and the worker thread
//! - `present`: voice/renderer/error collaborators fed over a channel
//! - `ingest`: synthetic and image-directory frame sources
//! - `config`: file + environment configuration

pub mod alert;
pub mod brightness;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod present;
pub mod render;
pub mod threshold;
pub mod zones;

pub use alert::{AlertState, AlertThrottler, DEFAULT_ALERT_INTERVAL};
pub use detect::{
    resolve_delegate, BoundingBox, Category, Delegate, Detection, Detector, DetectorFactory,
    DetectorOptions, DetectorRegistry, DeviceCapabilities, ModelKind, ScriptedDetector,
    ScriptedFactory,
};
pub use error::PipelineError;
pub use frame::{Frame, LatestFrameSlot, Rotation};
pub use ingest::{FrameSource, SourceConfig};
pub use pipeline::{
    FramePipeline, FrameReport, FrameStage, PipelineSettings, PipelineWorker, SpreadPolicy,
};
pub use present::{Delivery, ErrorSink, Presentation, Renderer, VoiceOutput};
pub use render::{RenderData, ScaledBox, ViewSize};
pub use threshold::{BrightnessTier, ProposalSource, ThresholdProposal, ThresholdState};
pub use zones::{LabelFilter, Zone, ZoneCounts};

/// Registry with every backend compiled into this build.
///
/// `stub` replays `script`; `tract` (feature `backend-tract`) loads models
/// from `model_dir`.
pub fn default_registry(
    script: Vec<Vec<Detection>>,
    #[allow(unused_variables)] model_dir: Option<&std::path::Path>,
) -> DetectorRegistry {
    let mut registry = DetectorRegistry::new();
    registry.register(ScriptedFactory::new(script));
    #[cfg(feature = "backend-tract")]
    if let Some(dir) = model_dir {
        registry.register(detect::backends::TractFactory::new(dir));
    }
    registry
}
