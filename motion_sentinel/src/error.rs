use std::path::PathBuf;

type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Every way the detector or one of its collaborators can stop a run.
///
/// End-of-stream is deliberately absent: a source that runs dry returns
/// `Ok(None)` and the loop shuts down cleanly.
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("incompatible frames: previous is {previous:?}, current is {current:?} (width, height)")]
    IncompatibleFrames {
        previous: (u32, u32),
        current: (u32, u32),
    },

    #[error("frame capture failed")]
    Capture(#[source] BoxedError),

    #[error("failed to open frame source {}", .path.display())]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: BoxedError,
    },

    #[error("display sink failed")]
    Display(#[source] BoxedError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read configuration {}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),
}

impl DetectorError {
    pub fn capture<E>(error: E) -> Self
    where
        E: Into<BoxedError>,
    {
        DetectorError::Capture(error.into())
    }

    pub fn source_open<E>(path: impl Into<PathBuf>, error: E) -> Self
    where
        E: Into<BoxedError>,
    {
        DetectorError::SourceOpen {
            path: path.into(),
            source: error.into(),
        }
    }

    pub fn display<E>(error: E) -> Self
    where
        E: Into<BoxedError>,
    {
        DetectorError::Display(error.into())
    }
}

pub type Result<T> = std::result::Result<T, DetectorError>;
