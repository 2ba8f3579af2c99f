//! Pixel-to-centimeter calibration.
//!
//! Two ways to calibrate a [`CalibrationEngine`]:
//!
//! - manual: two reference points collected with a [`PointCollector`] and the
//!   known distance between them;
//! - checkerboard: ChESS corners assembled into the inner-corner grid, a
//!   single-view [`LensModel`] fit and the mean undistorted corner spacing.
//!
//! ```
//! use camruler_calib::{CalibrationEngine, ReferencePointPair};
//! use camruler_core::PixelPoint;
//!
//! let mut engine = CalibrationEngine::default();
//! let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(100, 0));
//! let ratio = engine.calibrate_manual(&pair, 10.0).unwrap();
//! assert!((ratio - 0.1).abs() < 1e-12);
//! assert!(engine.is_calibrated());
//! ```

mod corners;
mod engine;
mod error;
mod lens;
mod points;
mod state;

pub use corners::{ChessCornerDetector, ChessCornerParams, CornerDetector};
pub use engine::{CalibrationEngine, CalibrationParams, CheckerboardCalibration};
pub use error::CalibrationError;
pub use lens::{fit_single_view, LensFitError, LensModel};
pub use points::{CollectorPhase, PointCollector, ReferencePointPair};
pub use state::CalibrationState;
