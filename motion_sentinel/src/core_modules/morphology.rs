// THEORY:
// The morphological cleaner turns the speckled raw mask into solid blobs that
// the region extractor can outline. Dilation grows every active region by the
// structuring element, closing the gaps between fragments of the same object.
// Erosion then shrinks the result back by the same amount, so merged blobs
// return to roughly their original extent but stay connected.
//
// Pixels outside the image never take part: they cannot grow a dilation and
// they cannot eat into an erosion. Without that rule every erosion would chew a
// band off the frame border.
//
// The structuring element is built once and handed in, it is never recreated
// per frame.

use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

/// The neighbourhood shape used by `dilate` and `erode`: a square of side
/// `2 * radius + 1`. Repeating a square pass `n` times is the same as one pass
/// with a square of radius `n * radius`, which is what the chessboard distance
/// transform computes in a single sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructuringElement {
    radius: u32,
}

impl StructuringElement {
    /// A fully active `size x size` square. `size` should be odd.
    pub fn square(size: u32) -> Self {
        Self { radius: size / 2 }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Side length of the square.
    pub fn size(&self) -> u32 {
        2 * self.radius + 1
    }
}

/// Grows active regions, `iterations` times in sequence.
pub fn dilate(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    repeat(mask, element.radius * iterations, morphology::dilate)
}

/// Shrinks active regions, `iterations` times in sequence.
pub fn erode(mask: &GrayImage, element: &StructuringElement, iterations: u32) -> GrayImage {
    repeat(mask, element.radius * iterations, morphology::erode)
}

/// Applies `pass` with a total chessboard reach of `reach` pixels. imageproc
/// takes the reach as a `u8`, so larger reaches are split into chunks; square
/// dilations and erosions compose additively.
fn repeat(mask: &GrayImage, reach: u32, pass: fn(&GrayImage, Norm, u8) -> GrayImage) -> GrayImage {
    let mut current = mask.clone();
    let mut remaining = reach;
    while remaining > 0 {
        let step = remaining.min(u8::MAX as u32);
        current = pass(&current, Norm::LInf, step as u8);
        remaining -= step;
    }
    current
}
