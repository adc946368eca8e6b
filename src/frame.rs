//! Frames and the latest-only hand-off to the pipeline worker.
//!
//! - `Frame`: decoded RGB image plus the rotation needed to make it upright.
//! - `LatestFrameSlot`: single pending-frame slot. A new submission replaces a
//!   frame the worker has not started yet; the in-flight frame is never touched.

use anyhow::{anyhow, Result};
use image::imageops;
use image::RgbImage;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

// ----------------------------------------------------------------------------
// Rotation
// ----------------------------------------------------------------------------

/// Clockwise rotation that turns the captured image upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn from_degrees(degrees: i32) -> Result<Self> {
        match degrees.rem_euclid(360) {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(anyhow!(
                "rotation must be a multiple of 90 degrees, got {}",
                degrees
            )),
        }
    }

    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotate `image` clockwise by this amount. `Deg0` returns the input.
    pub fn apply(&self, image: RgbImage) -> RgbImage {
        match self {
            Rotation::Deg0 => image,
            Rotation::Deg90 => imageops::rotate90(&image),
            Rotation::Deg180 => imageops::rotate180(&image),
            Rotation::Deg270 => imageops::rotate270(&image),
        }
    }
}

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One captured image, processed as an atomic unit.
pub struct Frame {
    pub image: RgbImage,
    pub rotation: Rotation,
    /// Submission order, assigned by the slot.
    pub sequence: u64,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, rotation: Rotation) -> Self {
        Self {
            image,
            rotation,
            sequence: 0,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the frame, returning the upright image.
    pub fn into_upright(self) -> RgbImage {
        self.rotation.apply(self.image)
    }
}

// ----------------------------------------------------------------------------
// LatestFrameSlot: keep-only-latest backpressure
// ----------------------------------------------------------------------------

#[derive(Default)]
struct SlotState {
    pending: Option<Frame>,
    next_sequence: u64,
    superseded: u64,
    closed: bool,
}

/// Holds at most one frame waiting for the worker.
#[derive(Default)]
pub struct LatestFrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a frame. Returns `true` when it replaced a frame that was still
    /// pending, `false` otherwise. Frames offered after `close` are discarded.
    pub fn submit(&self, mut frame: Frame) -> bool {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.closed {
            return false;
        }
        frame.sequence = state.next_sequence;
        state.next_sequence += 1;
        let replaced = state.pending.replace(frame).is_some();
        if replaced {
            state.superseded += 1;
        }
        self.ready.notify_one();
        replaced
    }

    /// Block until a frame is available. Returns `None` once the slot is
    /// closed; a frame already pending at close time is still handed out.
    pub fn take(&self) -> Option<Frame> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        loop {
            if let Some(frame) = state.pending.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            state = match self.ready.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }
    }

    /// Non-blocking variant of `take`.
    pub fn try_take(&self) -> Option<Frame> {
        match self.state.lock() {
            Ok(mut guard) => guard.pending.take(),
            Err(poisoned) => poisoned.into_inner().pending.take(),
        }
    }

    pub fn close(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.closed = true;
        self.ready.notify_all();
    }

    /// Frames replaced before the worker picked them up.
    pub fn superseded(&self) -> u64 {
        match self.state.lock() {
            Ok(guard) => guard.superseded,
            Err(poisoned) => poisoned.into_inner().superseded,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use std::sync::Arc;

    fn make_frame(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height), Rotation::Deg0)
    }

    #[test]
    fn rotation_parses_quarter_turns() {
        assert_eq!(Rotation::from_degrees(0).unwrap(), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(90).unwrap(), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(-90).unwrap(), Rotation::Deg270);
        assert_eq!(Rotation::from_degrees(450).unwrap(), Rotation::Deg90);
        assert!(Rotation::from_degrees(45).is_err());
    }

    #[test]
    fn rotation_is_clockwise_and_swaps_dimensions() {
        let mut image = RgbImage::new(4, 2);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        let frame = Frame::new(image, Rotation::Deg90);
        let upright = frame.into_upright();
        assert_eq!((upright.width(), upright.height()), (2, 4));
        // Top-left moves to top-right under a clockwise quarter turn.
        assert_eq!(upright.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn slot_keeps_only_latest() {
        let slot = LatestFrameSlot::new();
        assert!(!slot.submit(make_frame(1, 1)));
        assert!(slot.submit(make_frame(2, 2)));
        assert!(slot.submit(make_frame(3, 3)));
        assert_eq!(slot.superseded(), 2);

        let frame = slot.try_take().unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.sequence, 2);
        assert!(slot.try_take().is_none());
    }

    #[test]
    fn close_drains_pending_then_stops() {
        let slot = LatestFrameSlot::new();
        slot.submit(make_frame(1, 1));
        slot.close();
        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
        assert!(!slot.submit(make_frame(1, 1)));
        assert!(slot.try_take().is_none());
    }

    #[test]
    fn take_wakes_on_submit() {
        let slot = Arc::new(LatestFrameSlot::new());
        let worker_slot = slot.clone();
        let handle = std::thread::spawn(move || worker_slot.take().map(|f| f.width()));
        slot.submit(make_frame(7, 1));
        assert_eq!(handle.join().unwrap(), Some(7));
    }
}
