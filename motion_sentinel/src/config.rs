// THEORY:
// Every number that shapes a detection lives here instead of inside the stages.
// The defaults reproduce the classic CCTV tuning: a 5x5 blur, an intensity cut at
// 20, ten rounds of dilation and erosion, and a 4000 pixel motion budget. A JSON
// file may override any subset of them; missing fields keep their defaults.

use crate::error::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunable constants for the `MotionDetector`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Side length of the square Gaussian smoothing kernel. Must be odd.
    pub blur_kernel_size: u32,
    /// Smoothed intensities at or above this value become active mask pixels.
    pub binary_threshold: u8,
    /// How many times the 3x3 dilation is applied before eroding.
    pub dilate_iterations: u32,
    /// How many times the 3x3 erosion is applied after dilating.
    pub erode_iterations: u32,
    /// A frame is classified as motion when the raw mask holds strictly more
    /// active pixels than this.
    pub motion_pixel_threshold: usize,
    /// RGB color of the contour overlay.
    pub contour_color: [u8; 3],
    /// Stroke width of the contour overlay in pixels.
    pub contour_thickness: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            blur_kernel_size: 5,
            binary_threshold: 20,
            dilate_iterations: 10,
            erode_iterations: 10,
            motion_pixel_threshold: 4000,
            contour_color: [255, 0, 0],
            contour_thickness: 2,
        }
    }
}

impl DetectorConfig {
    /// Reads a (possibly partial) JSON configuration and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DetectorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DetectorConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.blur_kernel_size == 0 || self.blur_kernel_size % 2 == 0 {
            return Err(DetectorError::InvalidConfig(format!(
                "blur_kernel_size must be a positive odd number, got {}",
                self.blur_kernel_size
            )));
        }
        if self.contour_thickness == 0 {
            return Err(DetectorError::InvalidConfig(
                "contour_thickness must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
