//! Scene brightness estimation.

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Edge length of the square thumbnail brightness is measured on.
pub const DEFAULT_SAMPLE_SIZE: u32 = 96;

/// Perceptual luma of one RGB pixel.
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Mean luminance over a `DEFAULT_SAMPLE_SIZE` square thumbnail of `image`.
pub fn estimate(image: &RgbImage) -> f64 {
    estimate_with(image, DEFAULT_SAMPLE_SIZE)
}

/// Mean luminance over a `sample_size` square thumbnail of `image`.
///
/// The thumbnail bounds the cost for large frames. An empty image, or a zero
/// sample size, reads as black.
pub fn estimate_with(image: &RgbImage, sample_size: u32) -> f64 {
    if image.width() == 0 || image.height() == 0 || sample_size == 0 {
        return 0.0;
    }
    let thumb = imageops::resize(image, sample_size, sample_size, FilterType::Triangle);
    let (total, count) = thumb.pixels().fold((0.0f64, 0u64), |(total, count), px| {
        (total + luminance(px[0], px[1], px[2]), count + 1)
    });
    total / count as f64
}
