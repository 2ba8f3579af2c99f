use camruler_checkerboard::BoardError;

use crate::lens::LensFitError;

/// Recoverable calibration failures. The calibration state is never modified
/// when one of these is returned.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("degenerate points: reference points coincide")]
    DegeneratePoints,
    #[error("known distance must be finite and positive, got {0}")]
    InvalidDistance(f64),
    #[error(transparent)]
    InvalidBoard(#[from] BoardError),
    #[error("pattern not found")]
    PatternNotFound,
    #[error(transparent)]
    LensFit(#[from] LensFitError),
}
