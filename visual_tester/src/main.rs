use anyhow::Context;
use clap::{crate_version, Arg, ArgMatches, Command};
use log::{info, warn};
use motion_sentinel::stream::{
    run, DisplaySink, FrameSource, ImageDirSink, ImageSequenceSource, InterruptSignal, LogVerdictSink,
};
use motion_sentinel::{DetectorConfig, MotionDetector, StopReason};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "opencv")]
mod video;

/// 128 + SIGINT, what a shell reports for a process killed by Ctrl-C.
const EXIT_INTERRUPTED: i32 = 130;

type BoxedSource = Box<dyn FrameSource + Send>;
type BoxedDisplay = Box<dyn DisplaySink + Send>;
type BoxedInterrupt = Box<dyn InterruptSignal + Send>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Argument Parsing & Setup ---
    let matches = Command::new("visual_tester")
        .version(crate_version!())
        .about("Frame-differencing motion detection over a video or a directory of frames")
        .arg(
            Arg::new("input")
                .help("Directory of frames, or a video file (needs the `opencv` feature)")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("output")
                .long("output")
                .short('o')
                .help("Write original, mask and contour images for every frame pair here")
                .takes_value(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("JSON detector configuration; flags below override it")
                .takes_value(true),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .short('t')
                .help("Binarization threshold on the 0-255 intensity scale")
                .takes_value(true),
        )
        .arg(
            Arg::new("min-pixels")
                .long("min-pixels")
                .short('m')
                .help("Active pixel count above which a frame counts as movement")
                .takes_value(true),
        )
        .arg(
            Arg::new("blur")
                .long("blur")
                .short('b')
                .help("Odd Gaussian kernel size")
                .takes_value(true),
        )
        .arg(
            Arg::new("iterations")
                .long("iterations")
                .short('i')
                .help("Dilation and erosion rounds")
                .takes_value(true),
        )
        .arg(
            Arg::new("display")
                .long("display")
                .short('d')
                .help("Show highgui windows; ESC stops (needs the `opencv` feature)"),
        )
        .get_matches();

    let config = build_config(&matches)?;
    let detector = MotionDetector::new(config).context("invalid detector configuration")?;
    info!("detector configuration: {:?}", detector.config());

    // --- 2. Collaborators ---
    let input = matches.value_of("input").context("missing input")?;
    let mut source = open_source(input)?;
    let display_windows = matches.is_present("display");
    let mut display = open_display(matches.value_of("output"), display_windows)?;

    let stop = Arc::new(AtomicBool::new(false));
    tokio::spawn(watch_interrupts(tokio::signal::ctrl_c, stop.clone(), || {
        std::process::exit(EXIT_INTERRUPTED);
    }));
    let mut interrupt = build_interrupt(stop, display_windows);

    // --- 3. Main Processing Loop ---
    let summary = tokio::task::spawn_blocking(move || {
        run(
            &detector,
            source.as_mut(),
            display.as_mut(),
            &mut LogVerdictSink,
            interrupt.as_mut(),
        )
    })
    .await
    .context("detection loop panicked")??;

    match summary.stop {
        StopReason::EndOfStream => info!("end of stream reached"),
        StopReason::Interrupted => info!("stopped on request"),
    }
    info!(
        "Processing complete: {} frame pairs, {} with movement",
        summary.frames_processed, summary.motion_frames
    );
    Ok(())
}

/// First signal: ask the loop to stop after the current frame. Second signal:
/// `on_second`, since the loop may be stuck inside a capture call.
async fn watch_interrupts<S, F>(mut next_signal: S, stop: Arc<AtomicBool>, on_second: impl FnOnce())
where
    S: FnMut() -> F,
    F: Future<Output = std::io::Result<()>>,
{
    if next_signal().await.is_err() {
        return;
    }
    warn!("Ctrl-C received, stopping after the current frame (press again to quit now)");
    stop.store(true, Ordering::SeqCst);

    if next_signal().await.is_ok() {
        warn!("second Ctrl-C received, exiting");
        on_second();
    }
}

fn parse_flag<T>(matches: &ArgMatches, name: &str) -> anyhow::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|raw| raw.parse::<T>().with_context(|| format!("invalid value for --{}: {}", name, raw)))
        .transpose()
}

fn build_config(matches: &ArgMatches) -> anyhow::Result<DetectorConfig> {
    let mut config = match matches.value_of("config") {
        Some(path) => DetectorConfig::from_json_file(path)?,
        None => DetectorConfig::default(),
    };

    if let Some(threshold) = parse_flag(matches, "threshold")? {
        config.binary_threshold = threshold;
    }
    if let Some(min_pixels) = parse_flag(matches, "min-pixels")? {
        config.motion_pixel_threshold = min_pixels;
    }
    if let Some(blur) = parse_flag(matches, "blur")? {
        config.blur_kernel_size = blur;
    }
    if let Some(iterations) = parse_flag::<u32>(matches, "iterations")? {
        config.dilate_iterations = iterations;
        config.erode_iterations = iterations;
    }

    config.validate()?;
    Ok(config)
}

fn open_source(input: &str) -> anyhow::Result<BoxedSource> {
    if Path::new(input).is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(input)?));
    }

    #[cfg(feature = "opencv")]
    {
        Ok(Box::new(video::VideoFileSource::open(input)?))
    }
    #[cfg(not(feature = "opencv"))]
    {
        anyhow::bail!("{} is not a directory; reading video files needs the `opencv` feature", input)
    }
}

/// Frames go to the highgui windows, the output directory, both, or nowhere.
fn open_display(output: Option<&str>, windows: bool) -> anyhow::Result<BoxedDisplay> {
    let files = output
        .map(|dir| ImageDirSink::create(dir).with_context(|| format!("cannot write to {}", dir)))
        .transpose()?;

    #[cfg(feature = "opencv")]
    {
        let windows = windows.then_some(video::HighguiDisplay);
        Ok(Box::new((windows, files)))
    }
    #[cfg(not(feature = "opencv"))]
    {
        if windows {
            anyhow::bail!("--display needs the `opencv` feature");
        }
        Ok(Box::new(files))
    }
}

fn build_interrupt(stop: Arc<AtomicBool>, windows: bool) -> BoxedInterrupt {
    #[cfg(feature = "opencv")]
    {
        let esc = windows.then_some(video::EscKey);
        Box::new((stop, esc))
    }
    #[cfg(not(feature = "opencv"))]
    {
        let _ = windows;
        Box::new(stop)
    }
}
