//! Synthetic frame source (`stub://`) for demos and tests.
//!
//! The scene brightness steps through night, dusk and daylight every
//! `FRAMES_PER_PHASE` frames so each threshold tier gets exercised. Pixels
//! carry a little noise around the phase's base level.

use image::{Rgb, RgbImage};
use rand::Rng;

use super::{SourceConfig, SourceStats};
use crate::frame::Rotation;

const FRAMES_PER_PHASE: u64 = 50;
/// Base gray levels for night, dusk and daylight.
const PHASE_LEVELS: [u8; 3] = [40, 115, 200];
const NOISE: i16 = 12;

pub struct SyntheticSource {
    config: SourceConfig,
    frame_count: u64,
}

impl SyntheticSource {
    pub fn new(config: SourceConfig) -> Self {
        log::info!("SyntheticSource: connected to {}", config.path);
        Self {
            config,
            frame_count: 0,
        }
    }

    /// Base gray level for the frame about to be produced.
    pub fn current_level(&self) -> u8 {
        let phase = (self.frame_count / FRAMES_PER_PHASE) as usize % PHASE_LEVELS.len();
        PHASE_LEVELS[phase]
    }

    pub fn next_frame(&mut self) -> (RgbImage, Rotation) {
        let level = self.current_level() as i16;
        self.frame_count += 1;

        let mut rng = rand::thread_rng();
        let image = RgbImage::from_fn(self.config.width, self.config.height, |_, _| {
            let jitter = rng.gen_range(-NOISE..=NOISE);
            let v = (level + jitter).clamp(0, 255) as u8;
            Rgb([v, v, v])
        });
        (image, Rotation::Deg0)
    }

    pub fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            path: self.config.path.clone(),
        }
    }
}
