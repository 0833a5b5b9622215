// THEORY:
// This file is the entry point of the `motion_sentinel` library crate. The
// public surface is small on purpose: `MotionDetector` and its `FrameAnalysis`
// for callers that already own their frames, and `stream::run` with its
// collaborator traits for callers that want the read/analyze/present loop.
// The individual stages stay reachable under `core_modules` for anyone who
// needs a single step (a mask without the contours, say).

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod stream;

pub use config::DetectorConfig;
pub use error::{DetectorError, Result};
pub use pipeline::{Frame, FrameAnalysis, MotionDecision, MotionDetector, Point, Region, Verdict};
pub use stream::{run, DisplaySink, FrameSource, InterruptSignal, RunSummary, StopReason, VerdictSink};
