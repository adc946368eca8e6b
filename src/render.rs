//! Render-ready overlay geometry.
//!
//! Boxes are scaled from source-image pixels into the view so the image fills
//! the view (the larger of the two axis ratios wins).

use crate::detect::{BoundingBox, Detection};

/// Caption used when a detection carries no category.
const UNKNOWN_LABEL: &str = "?";

#[derive(Clone, Debug, PartialEq)]
pub struct ScaledBox {
    pub rect: BoundingBox,
    pub label: String,
    pub score: f32,
    /// "car 0.92"
    pub caption: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderData {
    pub boxes: Vec<ScaledBox>,
    pub source_height: u32,
    pub source_width: u32,
    pub scale: f32,
    /// x positions of the left/center and center/right zone dividers, in
    /// view coordinates.
    pub zone_dividers: [f32; 2],
}

/// Size of the surface the renderer draws on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewSize {
    pub width: u32,
    pub height: u32,
}

impl ViewSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub fn scale_factor(view: ViewSize, source_width: u32, source_height: u32) -> f32 {
    let sx = view.width as f32 / source_width.max(1) as f32;
    let sy = view.height as f32 / source_height.max(1) as f32;
    sx.max(sy)
}

pub fn caption(label: &str, score: f32) -> String {
    format!("{} {:.2}", label, score)
}

pub fn build(
    detections: &[Detection],
    source_width: u32,
    source_height: u32,
    view: ViewSize,
) -> RenderData {
    let scale = scale_factor(view, source_width, source_height);
    let boxes = detections
        .iter()
        .map(|det| {
            let label = det.label().unwrap_or(UNKNOWN_LABEL).to_string();
            let score = det.score();
            ScaledBox {
                rect: det.bounding_box.scaled(scale),
                caption: caption(&label, score),
                label,
                score,
            }
        })
        .collect();
    let third = view.width as f32 / 3.0;
    RenderData {
        boxes,
        source_height,
        source_width,
        scale,
        zone_dividers: [third, 2.0 * third],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_fill_the_view() {
        let detections = [Detection::labeled(
            BoundingBox::new(10.0, 20.0, 50.0, 60.0),
            "car",
            0.923,
        )];
        let data = build(&detections, 300, 200, ViewSize::new(600, 600));
        assert_eq!(data.scale, 3.0);
        assert_eq!(data.boxes[0].rect, BoundingBox::new(30.0, 60.0, 150.0, 180.0));
        assert_eq!(data.boxes[0].caption, "car 0.92");
        assert_eq!(data.source_width, 300);
        assert_eq!(data.source_height, 200);
        assert_eq!(data.zone_dividers, [200.0, 400.0]);
    }

    #[test]
    fn unlabeled_detection_gets_placeholder() {
        let detections = [Detection::new(BoundingBox::default(), vec![])];
        let data = build(&detections, 10, 10, ViewSize::new(10, 10));
        assert_eq!(data.boxes[0].caption, "? 0.00");
    }
}
