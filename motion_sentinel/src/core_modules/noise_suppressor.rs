// THEORY:
// The noise suppressor turns the 3-channel difference map into something the
// binarizer can cut with a single number. It works in two steps:
//
// 1.  **Channel Reduction**: Each difference pixel collapses to one intensity via
//     Rec. 601 luma weights. This is not an average; green counts for more than
//     red, red for more than blue, matching perceived brightness.
// 2.  **Smoothing**: A small Gaussian low-pass pass spreads isolated bright pixels
//     (sensor noise, compression artifacts) over their neighbours so that they
//     fall under the threshold, while coherent changes survive.
//
// The Gaussian is separable, so a k x k blur costs two 1D passes of k taps.
// Edges use reflect-101 (`dcb|abcd|cba`), the border mode vision libraries
// default to for blurs. The kernel weights are computed once per detector and
// the convolution itself is imageproc's separable filter.

use crate::core_modules::frame::{luminance, Frame};
use image::{imageops, GrayImage, Luma};
use imageproc::filter::separable_filter_equal;

/// Converts a difference map into a single intensity channel.
pub fn to_intensity(diff: &Frame) -> GrayImage {
    let (width, height) = diff.dimensions();
    let mut gray = GrayImage::new(width, height);
    for (out, pixel) in gray.pixels_mut().zip(diff.pixels()) {
        *out = Luma([luminance(pixel).round().min(255.0) as u8]);
    }
    gray
}

/// A normalized 1D Gaussian applied along both axes.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKernel {
    weights: Vec<f32>,
}

impl GaussianKernel {
    /// Builds the kernel for an odd `size` with sigma derived from the size.
    ///
    /// Sizes up to 7 use the fixed binomial tables (5 taps: `[1, 4, 6, 4, 1] / 16`).
    /// Larger sizes sample a Gaussian with `sigma = 0.3 * ((size - 1) / 2 - 1) + 0.8`.
    pub fn new(size: u32) -> Self {
        let weights = match size {
            1 => vec![1.0],
            3 => vec![0.25, 0.5, 0.25],
            5 => vec![0.0625, 0.25, 0.375, 0.25, 0.0625],
            7 => vec![0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
            _ => Self::sampled(size),
        };
        Self { weights }
    }

    fn sampled(size: u32) -> Vec<f32> {
        let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
        let center = (size as f32 - 1.0) * 0.5;
        let raw: Vec<f32> = (0..size)
            .map(|i| {
                let x = i as f32 - center;
                (-(x * x) / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let total: f32 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }

    pub fn size(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Blurs a single-channel map. Output has the same dimensions.
    ///
    /// imageproc's separable filter clamps at the edges, so the map is first
    /// padded by the kernel radius with reflect-101 borders and the filtered
    /// result is cropped back.
    pub fn smooth(&self, gray: &GrayImage) -> GrayImage {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return gray.clone();
        }
        let radius = (self.weights.len() / 2) as u32;

        // --- 1. Reflect-101 padding ---
        let padded = GrayImage::from_fn(width + 2 * radius, height + 2 * radius, |x, y| {
            let sx = reflect_101(x as isize - radius as isize, width as usize);
            let sy = reflect_101(y as isize - radius as isize, height as usize);
            *gray.get_pixel(sx as u32, sy as u32)
        });

        // --- 2. Horizontal then vertical pass, then crop ---
        let filtered: GrayImage = separable_filter_equal(&padded, self.weights.as_slice());
        imageops::crop_imm(&filtered, radius, radius, width, height).to_image()
    }
}

/// Maps an out-of-range index back into `0..len` by mirroring around the edge
/// pixel without repeating it.
#[inline]
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let period = 2 * last;
    let mut i = index.rem_euclid(period);
    if i > last {
        i = period - i;
    }
    i as usize
}
