// THEORY:
// The binarizer is a hard, global cut. One threshold for the whole frame, no
// local adaptation and no hysteresis: a smoothed intensity at or above the
// threshold is "active" (255), anything below is "inactive" (0).

use image::{GrayImage, Luma};

pub const ACTIVE: u8 = 255;
pub const INACTIVE: u8 = 0;

/// Produces the raw binary motion mask.
pub fn binarize(smoothed: &GrayImage, threshold: u8) -> GrayImage {
    let (width, height) = smoothed.dimensions();
    let mut mask = GrayImage::new(width, height);
    for (out, pixel) in mask.pixels_mut().zip(smoothed.pixels()) {
        *out = Luma([if pixel.0[0] >= threshold { ACTIVE } else { INACTIVE }]);
    }
    mask
}

/// Number of active pixels in a mask.
pub fn count_active(mask: &GrayImage) -> usize {
    mask.as_raw().iter().filter(|&&v| v != INACTIVE).count()
}
