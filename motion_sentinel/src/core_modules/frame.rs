// THEORY:
// A `Frame` is the only "dumb" container the detector consumes: a packed RGB
// buffer straight from the capture device. Every stage downstream either reads
// two frames of the same shape or produces single-channel maps of that shape, so
// the shape check lives here, next to the type, and runs before any pixel work.

use crate::error::{DetectorError, Result};
use image::{Rgb, RgbImage};

/// One captured image from the video stream.
pub type Frame = RgbImage;

pub type Luminance = f32;

/// Rec. 601 luma weights, the usual RGB -> gray reduction of vision libraries.
const LUMA_RED: Luminance = 0.299;
const LUMA_GREEN: Luminance = 0.587;
const LUMA_BLUE: Luminance = 0.114;

/// Fails with `IncompatibleFrames` unless both frames share width and height.
pub fn ensure_same_shape(previous: &Frame, current: &Frame) -> Result<()> {
    if previous.dimensions() != current.dimensions() {
        return Err(DetectorError::IncompatibleFrames {
            previous: previous.dimensions(),
            current: current.dimensions(),
        });
    }
    Ok(())
}

/// Perceived brightness of one pixel on the 0..255 scale.
#[inline]
pub fn luminance(pixel: &Rgb<u8>) -> Luminance {
    let [red, green, blue] = pixel.0;
    LUMA_RED * red as Luminance + LUMA_GREEN * green as Luminance + LUMA_BLUE * blue as Luminance
}
