// THEORY:
// The differencer is the first and simplest stage: it answers "what changed?"
// for every channel of every pixel between two consecutive frames. It is a pure
// function. The absolute difference of two u8 values always fits in a u8, so no
// clamping or widening is needed.

use crate::core_modules::frame::{ensure_same_shape, Frame};
use crate::error::Result;

/// Computes `|previous - current|` independently for each color channel.
pub fn absolute_difference(previous: &Frame, current: &Frame) -> Result<Frame> {
    ensure_same_shape(previous, current)?;

    let (width, height) = previous.dimensions();
    let mut diff = Frame::new(width, height);
    for ((out, a), b) in diff.iter_mut().zip(previous.iter()).zip(current.iter()) {
        *out = a.abs_diff(*b);
    }

    Ok(diff)
}
