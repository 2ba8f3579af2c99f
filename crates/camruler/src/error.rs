use std::path::PathBuf;

use camruler_calib::CalibrationError;
use camruler_checkerboard::BoardError;
use camruler_core::FontError;
use camruler_measure::MeasureError;

/// Errors produced by the session loop, frame sources/sinks and file helpers.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode or encode {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no image files found in {0}")]
    EmptySequence(PathBuf),

    #[error("frame source failed: {0}")]
    Source(String),

    #[error("display sink failed: {0}")]
    Display(String),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    #[error(transparent)]
    Measure(#[from] MeasureError),
}

impl SessionError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io { path, source }
    }

    pub(crate) fn image(path: impl Into<PathBuf>) -> impl FnOnce(image::ImageError) -> Self {
        let path = path.into();
        move |source| Self::Image { path, source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>) -> impl FnOnce(serde_json::Error) -> Self {
        let path = path.into();
        move |source| Self::Json { path, source }
    }
}
