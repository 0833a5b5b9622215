// THEORY:
// The `pipeline` module is the top-level API of the detector. It chains the six
// stages in `core_modules` into one call that takes a pair of frames and hands
// back everything a caller may want to show or act on: the verdict, the cleaned
// mask, the outlined regions and the annotated previous frame.
//
// The detector holds no per-frame state. Its only fields are the configuration
// and the two precomputed kernels (Gaussian weights and structuring element),
// so a single `MotionDetector` can judge any number of frame pairs in any order.

use crate::config::DetectorConfig;
use crate::core_modules::binarizer::binarize;
use crate::core_modules::decision::decide;
use crate::core_modules::differencer::absolute_difference;
use crate::core_modules::frame::ensure_same_shape;
use crate::core_modules::morphology::{dilate, erode, StructuringElement};
use crate::core_modules::noise_suppressor::{to_intensity, GaussianKernel};
use crate::core_modules::region_extractor::{draw_regions, extract_regions};
use crate::error::Result;
use image::GrayImage;
use log::debug;

// Re-export key data structures for the public API.
pub use crate::core_modules::decision::{MotionDecision, Verdict};
pub use crate::core_modules::frame::Frame;
pub use crate::core_modules::region_extractor::{Point, Region};

const STRUCTURING_ELEMENT_SIZE: u32 = 3;

/// Everything produced for one frame pair.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    /// Raw-mask pixel count and the resulting verdict.
    pub decision: MotionDecision,
    /// The mask after dilation and erosion. Regions are traced from this one.
    pub cleaned_mask: GrayImage,
    /// Outer contours of the moving areas, possibly empty.
    pub regions: Vec<Region>,
    /// The previous frame with `regions` drawn over it.
    pub annotated: Frame,
}

/// The frame-differencing motion detector.
pub struct MotionDetector {
    config: DetectorConfig,
    blur: GaussianKernel,
    element: StructuringElement,
}

impl MotionDetector {
    /// Validates `config` and precomputes the kernels.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            blur: GaussianKernel::new(config.blur_kernel_size),
            element: StructuringElement::square(STRUCTURING_ELEMENT_SIZE),
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Runs the full pipeline on one frame pair.
    ///
    /// `previous` is consumed: it becomes the canvas for the contour overlay and
    /// comes back as `FrameAnalysis::annotated`.
    pub fn analyze(&self, previous: Frame, current: &Frame) -> Result<FrameAnalysis> {
        ensure_same_shape(&previous, current)?;

        // Stage 1: Frame Differencing
        let diff = absolute_difference(&previous, current)?;

        // Stage 2: Noise Suppression
        let intensity = to_intensity(&diff);
        let smoothed = self.blur.smooth(&intensity);

        // Stage 3: Binarization
        let raw_mask = binarize(&smoothed, self.config.binary_threshold);

        // Stage 4: Morphological Cleanup
        let dilated = dilate(&raw_mask, &self.element, self.config.dilate_iterations);
        let cleaned_mask = erode(&dilated, &self.element, self.config.erode_iterations);

        // Stage 5: Decision, on the raw mask rather than the cleaned one
        let decision = decide(&raw_mask, self.config.motion_pixel_threshold);

        // Stage 6: Region Extraction & Overlay
        let regions = extract_regions(&cleaned_mask);
        let mut annotated = previous;
        if !regions.is_empty() {
            draw_regions(
                &mut annotated,
                &regions,
                self.config.contour_color,
                self.config.contour_thickness,
            );
        }

        debug!(
            "analyzed {}x{} pair: {} active pixels, {} regions, {}",
            current.width(),
            current.height(),
            decision.active_pixels,
            regions.len(),
            decision.verdict
        );

        Ok(FrameAnalysis {
            decision,
            cleaned_mask,
            regions,
            annotated,
        })
    }

    /// Convenience wrapper that only reports whether the pair shows motion.
    pub fn movement_detected(&self, previous: &Frame, current: &Frame) -> Result<bool> {
        let analysis = self.analyze(previous.clone(), current)?;
        Ok(analysis.decision.verdict.is_movement())
    }
}
