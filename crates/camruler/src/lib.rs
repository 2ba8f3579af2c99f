//! Measure physical object dimensions from a camera feed.
//!
//! This crate ties the `camruler-*` crates together:
//! - re-exports of the core, checkerboard, calibration and measurement crates
//! - the [`Session`] loop over a [`FrameSource`] and a [`DisplaySink`]
//! - file-backed sources/sinks, JSON configuration and calibration files
//! - one-shot helpers in [`pipeline`]
//!
//! ## Quickstart
//!
//! ```
//! use camruler::core::{BoundingBox, PixelPoint};
//! use camruler::measure::{MeasureParams, MeasurementEngine};
//! use camruler::core::{OverlayParams, OverlayRenderer};
//! use camruler::pipeline::calibrate_from_points;
//!
//! let state = calibrate_from_points(PixelPoint::new(0, 0), PixelPoint::new(100, 0), 10.0)
//!     .unwrap();
//! let engine = MeasurementEngine::new(
//!     MeasureParams::default(),
//!     OverlayRenderer::without_text(OverlayParams::default()),
//! );
//! let m = engine.measure_box(&state, BoundingBox::new(0, 0, 50, 20)).unwrap();
//! assert!((m.width_cm - 5.0).abs() < 1e-9);
//! assert!((m.height_cm - 2.0).abs() < 1e-9);
//! ```
//!
//! ## API map
//! - `camruler::core`: frames, geometry, homography, overlay, logger.
//! - `camruler::checkerboard`: checkerboard grid assembly and rendering.
//! - `camruler::calib`: calibration engine, point collector, lens model.
//! - `camruler::measure`: contour detector and measurement engine.

pub use camruler_calib as calib;
pub use camruler_checkerboard as checkerboard;
pub use camruler_core as core;
pub use camruler_measure as measure;

pub use camruler_calib::{CalibrationEngine, CalibrationError, CalibrationState};
pub use camruler_core::{BoundingBox, Frame, PixelPoint};
pub use camruler_measure::{MeasureError, MeasuredObject};

mod config;
mod error;
mod input;
pub mod io;
pub mod pipeline;
mod session;
mod sources;

pub use config::SessionConfig;
pub use error::SessionError;
pub use input::{InputEvent, Key, KeyBindings};
pub use session::{DisplaySink, FrameSource, Session, SessionMode, StepOutcome};
pub use sources::{ImageDirSink, ImageSequenceSource};
