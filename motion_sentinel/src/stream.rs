// THEORY:
// The `stream` module is the loop driver. It owns the two-slot frame window and
// nothing else: each iteration pulls one frame from a `FrameSource`, runs the
// detector on (previous, current), hands the results to the sinks, then moves
// `current` into the `previous` slot. No frame is ever copied to make that
// handoff and no state outlives the window.
//
// Everything around the loop is a collaborator behind a small trait:
//
// - `FrameSource`     yields frames in presentation order, `Ok(None)` at the end.
// - `DisplaySink`     receives the current frame, cleaned mask and overlay.
// - `VerdictSink`     receives the active-pixel count and the verdict.
// - `InterruptSignal` is polled once per iteration, after presentation.
//
// Failure policy is "stop and report". A capture error is never retried: reusing
// a stale frame would silently break the differencing invariant.

use crate::core_modules::decision::MotionDecision;
use crate::core_modules::frame::Frame;
use crate::error::{DetectorError, Result};
use crate::pipeline::MotionDetector;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, GrayImage, ImageEncoder};
use log::{debug, info, warn};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const FRAME_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "tiff"];

/// Produces frames in presentation order.
pub trait FrameSource {
    /// `Ok(None)` signals a graceful end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Receives the three visual outputs of each iteration.
pub trait DisplaySink {
    fn present(&mut self, current: &Frame, cleaned_mask: &GrayImage, annotated: &Frame) -> Result<()>;
}

/// Receives the per-frame decision.
pub trait VerdictSink {
    fn report(&mut self, decision: &MotionDecision);
}

/// An external "stop requested" check.
pub trait InterruptSignal {
    fn stop_requested(&mut self) -> bool;
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndOfStream,
    Interrupted,
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Frame pairs analyzed, which is one less than the frames read.
    pub frames_processed: u64,
    /// Frame pairs judged as movement.
    pub motion_frames: u64,
    pub stop: StopReason,
}

/// Drives the detector over `source` until the stream ends, the interrupt
/// fires, or a collaborator fails.
pub fn run<S, D, V, I>(
    detector: &MotionDetector,
    source: &mut S,
    display: &mut D,
    verdicts: &mut V,
    interrupt: &mut I,
) -> Result<RunSummary>
where
    S: FrameSource + ?Sized,
    D: DisplaySink + ?Sized,
    V: VerdictSink + ?Sized,
    I: InterruptSignal + ?Sized,
{
    let mut summary = RunSummary {
        frames_processed: 0,
        motion_frames: 0,
        stop: StopReason::EndOfStream,
    };

    // --- 1. Fill the first slot; fewer than two frames means nothing to compare ---
    let Some(mut previous) = source.next_frame()? else {
        debug!("frame source was empty");
        return Ok(summary);
    };

    // --- 2. Slide the window until the source runs dry ---
    while let Some(current) = source.next_frame()? {
        let analysis = detector.analyze(previous, &current)?;

        verdicts.report(&analysis.decision);
        display.present(&current, &analysis.cleaned_mask, &analysis.annotated)?;

        summary.frames_processed += 1;
        if analysis.decision.verdict.is_movement() {
            summary.motion_frames += 1;
        }

        // Ownership handoff: the current frame becomes the previous one.
        previous = current;

        if interrupt.stop_requested() {
            warn!("stop requested after {} frame pairs", summary.frames_processed);
            summary.stop = StopReason::Interrupted;
            break;
        }
    }

    info!(
        "run finished ({:?}): {} frame pairs, {} with movement",
        summary.stop, summary.frames_processed, summary.motion_frames
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Frame sources
// ---------------------------------------------------------------------------

/// Frames held in memory, yielded front to back.
#[derive(Debug, Default)]
pub struct VecFrameSource {
    frames: VecDeque<Frame>,
}

impl VecFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for VecFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

/// Still images from a directory, read in file-name order.
pub struct ImageSequenceSource {
    paths: VecDeque<PathBuf>,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let open_err = |source: std::io::Error| DetectorError::source_open(dir, source);

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(open_err)? {
            let path = entry.map_err(open_err)?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                paths.push(path);
            }
        }
        paths.sort();

        info!("found {} frames in {}", paths.len(), dir.display());
        Ok(Self {
            paths: paths.into(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path).map_err(DetectorError::capture)?;
        debug!("read frame {}", path.display());
        Ok(Some(image.to_rgb8()))
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Logs every decision the way a console monitor would print it.
#[derive(Debug, Default)]
pub struct LogVerdictSink;

impl VerdictSink for LogVerdictSink {
    fn report(&mut self, decision: &MotionDecision) {
        info!("{}", decision.active_pixels);
        info!("{}", decision.verdict);
    }
}

/// Collects every decision, for callers that want the whole history.
#[derive(Debug, Default)]
pub struct RecordingVerdictSink {
    pub decisions: Vec<MotionDecision>,
}

impl VerdictSink for RecordingVerdictSink {
    fn report(&mut self, decision: &MotionDecision) {
        self.decisions.push(*decision);
    }
}

/// Discards the display buffers.
#[derive(Debug, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn present(&mut self, _current: &Frame, _cleaned_mask: &GrayImage, _annotated: &Frame) -> Result<()> {
        Ok(())
    }
}

/// Writes the three display buffers of each iteration as PNG files:
/// `NNNNNN_original.png`, `NNNNNN_mask.png` and `NNNNNN_contours.png`.
pub struct ImageDirSink {
    dir: PathBuf,
    index: u64,
}

impl ImageDirSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(DetectorError::display)?;
        Ok(Self { dir, index: 0 })
    }

    fn save(&self, suffix: &str, width: u32, height: u32, buffer: &[u8], color: ExtendedColorType) -> Result<()> {
        let name = self.dir.join(format!("{:06}_{}.png", self.index, suffix));
        let output = std::fs::File::create(&name).map_err(DetectorError::display)?;
        let encoder = PngEncoder::new(output);
        encoder.write_image(buffer, width, height, color)?;
        Ok(())
    }
}

impl DisplaySink for ImageDirSink {
    fn present(&mut self, current: &Frame, cleaned_mask: &GrayImage, annotated: &Frame) -> Result<()> {
        let (width, height) = current.dimensions();
        self.save("original", width, height, current.as_raw(), ExtendedColorType::Rgb8)?;
        self.save("mask", width, height, cleaned_mask.as_raw(), ExtendedColorType::L8)?;
        self.save("contours", width, height, annotated.as_raw(), ExtendedColorType::Rgb8)?;
        self.index += 1;
        Ok(())
    }
}

impl<T> DisplaySink for Option<T>
where
    T: DisplaySink,
{
    fn present(&mut self, current: &Frame, cleaned_mask: &GrayImage, annotated: &Frame) -> Result<()> {
        match self {
            Some(sink) => sink.present(current, cleaned_mask, annotated),
            None => Ok(()),
        }
    }
}

/// Presents to both sinks, first one first. A failure in the first skips the
/// second.
impl<A, B> DisplaySink for (A, B)
where
    A: DisplaySink,
    B: DisplaySink,
{
    fn present(&mut self, current: &Frame, cleaned_mask: &GrayImage, annotated: &Frame) -> Result<()> {
        self.0.present(current, cleaned_mask, annotated)?;
        self.1.present(current, cleaned_mask, annotated)
    }
}

// ---------------------------------------------------------------------------
// Interrupts
// ---------------------------------------------------------------------------

/// Never asks the loop to stop.
#[derive(Debug, Default)]
pub struct NeverInterrupt;

impl InterruptSignal for NeverInterrupt {
    fn stop_requested(&mut self) -> bool {
        false
    }
}

/// A flag shared with another thread, e.g. a Ctrl-C handler.
impl InterruptSignal for Arc<AtomicBool> {
    fn stop_requested(&mut self) -> bool {
        self.load(Ordering::SeqCst)
    }
}

/// An optional signal; absent means "never stop".
impl<T> InterruptSignal for Option<T>
where
    T: InterruptSignal,
{
    fn stop_requested(&mut self) -> bool {
        self.as_mut().is_some_and(|signal| signal.stop_requested())
    }
}

/// Stops when either signal asserts. Both are polled every time so that
/// signals with side effects (a GUI key poll) keep running.
impl<A, B> InterruptSignal for (A, B)
where
    A: InterruptSignal,
    B: InterruptSignal,
{
    fn stop_requested(&mut self) -> bool {
        let first = self.0.stop_requested();
        let second = self.1.stop_requested();
        first || second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::pipeline::Verdict;
    use image::Rgb;

    fn detector() -> MotionDetector {
        MotionDetector::new(DetectorConfig::default()).unwrap()
    }

    fn black() -> Frame {
        Frame::new(160, 120)
    }

    fn with_square() -> Frame {
        let mut frame = black();
        for y in 20..100 {
            for x in 40..120 {
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        frame
    }

    /// Records what the loop presented.
    #[derive(Default)]
    struct CountingDisplay {
        presented: usize,
        annotated_had_overlay: Vec<bool>,
    }

    impl DisplaySink for CountingDisplay {
        fn present(&mut self, _current: &Frame, _mask: &GrayImage, annotated: &Frame) -> Result<()> {
            self.presented += 1;
            self.annotated_had_overlay
                .push(annotated.pixels().any(|p| *p == Rgb([255, 0, 0])));
            Ok(())
        }
    }

    /// Fires after `after` polls.
    struct StopAfter {
        after: usize,
        polls: usize,
    }

    impl InterruptSignal for StopAfter {
        fn stop_requested(&mut self) -> bool {
            self.polls += 1;
            self.polls >= self.after
        }
    }

    /// Yields some frames, then fails.
    struct FailingSource {
        frames: VecFrameSource,
    }

    impl FrameSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<Frame>> {
            match self.frames.next_frame()? {
                Some(frame) => Ok(Some(frame)),
                None => Err(DetectorError::capture("camera unplugged")),
            }
        }
    }

    #[test]
    fn single_frame_stream_runs_zero_iterations() {
        let mut source = VecFrameSource::new(vec![black()]);
        let mut display = CountingDisplay::default();
        let mut verdicts = RecordingVerdictSink::default();

        let summary = run(&detector(), &mut source, &mut display, &mut verdicts, &mut NeverInterrupt).unwrap();

        assert_eq!(summary.frames_processed, 0);
        assert_eq!(summary.stop, StopReason::EndOfStream);
        assert_eq!(display.presented, 0);
        assert!(verdicts.decisions.is_empty());
    }

    #[test]
    fn empty_stream_terminates_cleanly() {
        let mut source = VecFrameSource::default();
        let summary = run(
            &detector(),
            &mut source,
            &mut NullDisplay,
            &mut RecordingVerdictSink::default(),
            &mut NeverInterrupt,
        )
        .unwrap();
        assert_eq!(summary.frames_processed, 0);
    }

    #[test]
    fn window_slides_one_frame_per_iteration() {
        // black -> square -> square -> black: motion, still, motion.
        let mut source = VecFrameSource::new(vec![black(), with_square(), with_square(), black()]);
        let mut display = CountingDisplay::default();
        let mut verdicts = RecordingVerdictSink::default();

        let summary = run(&detector(), &mut source, &mut display, &mut verdicts, &mut NeverInterrupt).unwrap();

        assert_eq!(summary.frames_processed, 3);
        assert_eq!(summary.motion_frames, 2);
        let verdict_list: Vec<Verdict> = verdicts.decisions.iter().map(|d| d.verdict).collect();
        assert_eq!(
            verdict_list,
            vec![Verdict::MovementDetected, Verdict::NoMovement, Verdict::MovementDetected]
        );
        assert_eq!(display.annotated_had_overlay, vec![true, false, true]);
    }

    #[test]
    fn interrupt_is_checked_after_each_presentation() {
        let mut source = VecFrameSource::new(vec![black(), black(), black(), black(), black()]);
        let mut display = CountingDisplay::default();
        let mut interrupt = StopAfter { after: 2, polls: 0 };

        let summary = run(
            &detector(),
            &mut source,
            &mut display,
            &mut RecordingVerdictSink::default(),
            &mut interrupt,
        )
        .unwrap();

        assert_eq!(summary.stop, StopReason::Interrupted);
        assert_eq!(summary.frames_processed, 2);
        assert_eq!(display.presented, 2);
        assert_eq!(source.next_frame().unwrap().map(|f| f.dimensions()), Some((160, 120)));
    }

    #[test]
    fn capture_failure_stops_the_loop() {
        let mut source = FailingSource {
            frames: VecFrameSource::new(vec![black(), black()]),
        };
        let mut display = CountingDisplay::default();

        let err = run(
            &detector(),
            &mut source,
            &mut display,
            &mut RecordingVerdictSink::default(),
            &mut NeverInterrupt,
        )
        .unwrap_err();

        assert!(matches!(err, DetectorError::Capture(_)));
        assert_eq!(display.presented, 1);
    }

    #[test]
    fn mid_stream_resolution_change_is_an_error() {
        let mut source = VecFrameSource::new(vec![black(), Frame::new(80, 60)]);
        let err = run(
            &detector(),
            &mut source,
            &mut NullDisplay,
            &mut RecordingVerdictSink::default(),
            &mut NeverInterrupt,
        )
        .unwrap_err();
        assert!(matches!(err, DetectorError::IncompatibleFrames { .. }));
    }

    #[test]
    fn shared_flag_and_pair_interrupts() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut pair = (NeverInterrupt, flag.clone());
        assert!(!pair.stop_requested());
        flag.store(true, Ordering::SeqCst);
        assert!(pair.stop_requested());

        let mut absent: Option<NeverInterrupt> = None;
        assert!(!absent.stop_requested());
        let mut present = Some(flag);
        assert!(present.stop_requested());
    }

    #[test]
    fn paired_displays_both_see_every_iteration() {
        let frames = vec![black(), with_square(), black()];
        let mut source = VecFrameSource::new(frames);
        let mut display = (CountingDisplay::default(), Some(CountingDisplay::default()));
        let mut verdicts = RecordingVerdictSink::default();

        run(&detector(), &mut source, &mut display, &mut verdicts, &mut NeverInterrupt).unwrap();

        let (first, second) = display;
        assert_eq!(first.presented, 2);
        assert_eq!(second.map(|d| d.presented), Some(2));

        let mut absent: Option<CountingDisplay> = None;
        let frame = black();
        let mask = GrayImage::new(frame.width(), frame.height());
        assert!(absent.present(&frame, &mask, &frame).is_ok());
    }

    #[test]
    fn image_directory_round_trip() {
        let root = std::env::temp_dir().join(format!("motion_sentinel_stream_{}", std::process::id()));
        let frames_dir = root.join("frames");
        let output_dir = root.join("out");
        std::fs::create_dir_all(&frames_dir).unwrap();

        black().save(frames_dir.join("000.png")).unwrap();
        with_square().save(frames_dir.join("001.png")).unwrap();
        std::fs::write(frames_dir.join("notes.txt"), "not a frame").unwrap();

        let mut source = ImageSequenceSource::open(&frames_dir).unwrap();
        assert_eq!(source.remaining(), 2);
        let mut display = ImageDirSink::create(&output_dir).unwrap();
        let mut verdicts = RecordingVerdictSink::default();

        let summary = run(&detector(), &mut source, &mut display, &mut verdicts, &mut NeverInterrupt).unwrap();

        assert_eq!(summary.frames_processed, 1);
        assert_eq!(verdicts.decisions[0].verdict, Verdict::MovementDetected);
        for name in ["000000_original.png", "000000_mask.png", "000000_contours.png"] {
            assert!(output_dir.join(name).exists(), "missing {}", name);
        }
        let mask = image::open(output_dir.join("000000_mask.png")).unwrap().to_luma8();
        assert_eq!(mask.dimensions(), (160, 120));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn missing_directory_is_a_source_error() {
        let err = ImageSequenceSource::open("/no/such/frames/dir").err().unwrap();
        assert!(matches!(err, DetectorError::SourceOpen { .. }));
    }
}
