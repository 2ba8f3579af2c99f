use std::sync::atomic::{AtomicBool, Ordering};

use camruler_checkerboard::{
    mean_adjacent_spacing, CheckerboardDetector, CheckerboardParams, CheckerboardSpec,
};
use camruler_core::{to_gray, Frame};
use log::{debug, info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::corners::{ChessCornerDetector, ChessCornerParams, CornerDetector};
use crate::error::CalibrationError;
use crate::lens::{fit_single_view, LensModel};
use crate::points::ReferencePointPair;
use crate::state::CalibrationState;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub chess: ChessCornerParams,
    pub checkerboard: CheckerboardParams,
}

/// Result of a successful checkerboard calibration.
#[derive(Clone, Debug)]
pub struct CheckerboardCalibration {
    pub pixel_to_cm: f64,
    pub lens: LensModel,
    /// Detected inner corners in raw frame coordinates, row-major.
    pub corners: Vec<Point2<f32>>,
}

/// Owns the session [`CalibrationState`] and every way of replacing it.
pub struct CalibrationEngine<D = ChessCornerDetector> {
    state: CalibrationState,
    corners: D,
    checkerboard: CheckerboardDetector,
    size_warned: AtomicBool,
}

impl CalibrationEngine<ChessCornerDetector> {
    pub fn new(params: CalibrationParams) -> Self {
        let corners = ChessCornerDetector::new(params.chess);
        Self::with_corner_detector(params.checkerboard, corners)
    }
}

impl Default for CalibrationEngine<ChessCornerDetector> {
    fn default() -> Self {
        Self::new(CalibrationParams::default())
    }
}

impl<D: CornerDetector> CalibrationEngine<D> {
    pub fn with_corner_detector(params: CheckerboardParams, corners: D) -> Self {
        Self {
            state: CalibrationState::uncalibrated(),
            corners,
            checkerboard: CheckerboardDetector::new(params),
            size_warned: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.is_calibrated()
    }

    /// Replace the state wholesale, e.g. with one loaded from disk.
    pub fn restore(&mut self, state: CalibrationState) {
        info!(
            "restored calibration (ratio {:?}, lens model: {})",
            state.pixel_to_cm,
            state.lens.is_some()
        );
        self.state = state;
        self.size_warned.store(false, Ordering::Relaxed);
    }

    /// Scale from two reference points a known distance apart.
    ///
    /// An existing lens model is kept.
    pub fn calibrate_manual(
        &mut self,
        points: &ReferencePointPair,
        known_distance_cm: f64,
    ) -> Result<f64, CalibrationError> {
        let ratio = points.ratio_for(known_distance_cm)?;
        self.state = CalibrationState {
            pixel_to_cm: Some(ratio),
            lens: self.state.lens.clone(),
        };
        info!(
            "manual calibration: {:.2} px = {} cm, ratio {:.6} cm/px",
            points.pixel_distance(),
            known_distance_cm,
            ratio
        );
        Ok(ratio)
    }

    /// Detect the board, fit a single-view lens model and derive the scale
    /// from the mean spacing of the undistorted corners.
    ///
    /// On any error the previous state is kept.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, frame), fields(w = frame.width(), h = frame.height()))
    )]
    pub fn calibrate_checkerboard(
        &mut self,
        frame: &Frame,
        spec: &CheckerboardSpec,
    ) -> Result<CheckerboardCalibration, CalibrationError> {
        spec.validate()?;
        let size = spec.inner_corners();

        let gray = to_gray(frame);
        let raw = self.corners.detect(&gray);
        debug!("corner detector returned {} corners", raw.len());

        let Some(detection) = self.checkerboard.detect_from_corners(&raw, size) else {
            warn!(
                "no {}x{} checkerboard found in the frame",
                spec.squares[0], spec.squares[1]
            );
            return Err(CalibrationError::PatternNotFound);
        };

        let image_points: Vec<Point2<f64>> = detection
            .corners
            .iter()
            .map(|p| Point2::new(p.x as f64, p.y as f64))
            .collect();
        let lens = fit_single_view(
            &spec.object_points(),
            &image_points,
            [frame.width(), frame.height()],
        )?;

        let undistorted: Vec<Point2<f64>> = image_points
            .iter()
            .map(|&p| lens.undistort_point(p))
            .collect();
        let spacing = mean_adjacent_spacing(&undistorted, size)
            .filter(|s| s.is_finite() && *s > 0.0)
            .ok_or(CalibrationError::DegeneratePoints)?;
        let ratio = spec.square_size / spacing;

        info!(
            "checkerboard calibration: spacing {:.2} px, ratio {:.6} cm/px, rms {:.3} px",
            spacing, ratio, lens.rms_error
        );

        self.state = CalibrationState {
            pixel_to_cm: Some(ratio),
            lens: Some(lens.clone()),
        };
        self.size_warned.store(false, Ordering::Relaxed);

        Ok(CheckerboardCalibration {
            pixel_to_cm: ratio,
            lens,
            corners: detection.corners,
        })
    }

    /// Undistorted copy of `frame`, or `None` without a lens model or when
    /// the model was fitted at another resolution.
    pub fn undistort(&self, frame: &Frame) -> Option<Frame> {
        let lens = self.state.lens()?;
        if !lens.fits_frame(frame) {
            if !self.size_warned.swap(true, Ordering::Relaxed) {
                warn!(
                    "lens model fitted on {}x{} frames, got {}x{}; not undistorting",
                    lens.image_size[0],
                    lens.image_size[1],
                    frame.width(),
                    frame.height()
                );
            }
            return None;
        }
        Some(lens.undistort_frame(frame))
    }
}
