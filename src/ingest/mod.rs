//! Frame sources.
//!
//! - `stub://...`: synthetic scene that cycles through night, dusk and daylight
//! - local directory of still images, replayed in file-name order
//!
//! Sources hand frames straight to the pipeline worker and keep no copies.

pub mod dir;
pub mod synthetic;

use anyhow::Result;

pub use dir::ImageDirSource;
pub use synthetic::SyntheticSource;

use crate::frame::Rotation;
use image::RgbImage;

/// Configuration shared by every source.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// `stub://name` or a local directory path.
    pub path: String,
    pub target_fps: u32,
    /// Synthetic frame size; directory sources use each file's own size.
    pub width: u32,
    pub height: u32,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: "stub://road".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub path: String,
}

/// A frame source selected from its path.
pub enum FrameSource {
    Synthetic(SyntheticSource),
    Directory(ImageDirSource),
}

impl FrameSource {
    pub fn open(config: SourceConfig) -> Result<Self> {
        if config.path.starts_with("stub://") {
            Ok(FrameSource::Synthetic(SyntheticSource::new(config)))
        } else {
            Ok(FrameSource::Directory(ImageDirSource::open(config)?))
        }
    }

    /// Next frame, or `None` once a finite source is exhausted.
    pub fn next_frame(&mut self) -> Result<Option<(RgbImage, Rotation)>> {
        match self {
            FrameSource::Synthetic(source) => Ok(Some(source.next_frame())),
            FrameSource::Directory(source) => source.next_frame(),
        }
    }

    pub fn stats(&self) -> SourceStats {
        match self {
            FrameSource::Synthetic(source) => source.stats(),
            FrameSource::Directory(source) => source.stats(),
        }
    }
}
