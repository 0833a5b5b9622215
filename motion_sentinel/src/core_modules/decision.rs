// THEORY:
// The decision engine is the only part of the detector that says "yes" or "no".
// It counts active pixels in the RAW mask, before morphology has merged or
// trimmed anything, and compares that count to a fixed budget with a strict
// greater-than. Each frame pair is judged on its own: there is no hysteresis, so
// borderline motion may flicker between verdicts from one frame to the next.
//
// Counting the raw mask while contours come from the cleaned mask is an
// inherited asymmetry. It is kept as-is for compatibility with the classic
// detector's numbers.

use crate::core_modules::binarizer::count_active;
use image::GrayImage;
use std::fmt;

/// The per-frame motion classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    MovementDetected,
    NoMovement,
}

impl Verdict {
    pub fn is_movement(self) -> bool {
        matches!(self, Verdict::MovementDetected)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::MovementDetected => f.write_str("Movement Detected"),
            Verdict::NoMovement => f.write_str("No Movement"),
        }
    }
}

/// The observable output of the decision engine for one frame pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionDecision {
    /// Active pixels in the raw (pre-morphology) mask.
    pub active_pixels: usize,
    pub verdict: Verdict,
}

/// Classifies a count against the motion budget.
pub fn classify(active_pixels: usize, motion_pixel_threshold: usize) -> MotionDecision {
    let verdict = if active_pixels > motion_pixel_threshold {
        Verdict::MovementDetected
    } else {
        Verdict::NoMovement
    };
    MotionDecision { active_pixels, verdict }
}

/// Counts the raw mask and classifies it.
pub fn decide(raw_mask: &GrayImage, motion_pixel_threshold: usize) -> MotionDecision {
    classify(count_active(raw_mask), motion_pixel_threshold)
}
