//! One-shot helpers over single images, used by the CLI.

use camruler_calib::{
    CalibrationEngine, CalibrationError, CalibrationParams, CalibrationState,
    CheckerboardCalibration, ReferencePointPair,
};
use camruler_checkerboard::CheckerboardSpec;
use camruler_core::{Frame, OverlayRenderer, PixelPoint};
use camruler_measure::{ContourDetector, MeasuredObject, MeasurementEngine};
use log::warn;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::config::SessionConfig;
use crate::error::SessionError;

/// Manual calibration from two known points, starting from an empty state.
pub fn calibrate_from_points(
    first: PixelPoint,
    second: PixelPoint,
    known_distance_cm: f64,
) -> Result<CalibrationState, CalibrationError> {
    let mut engine = CalibrationEngine::default();
    engine.calibrate_manual(&ReferencePointPair::new(first, second), known_distance_cm)?;
    Ok(engine.state().clone())
}

/// Checkerboard calibration of a single frame with the ChESS corner detector.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(frame, params),
        fields(width = frame.width(), height = frame.height())
    )
)]
pub fn calibrate_from_checkerboard(
    frame: &Frame,
    spec: &CheckerboardSpec,
    params: CalibrationParams,
) -> Result<(CalibrationState, CheckerboardCalibration), CalibrationError> {
    let mut engine = CalibrationEngine::new(params);
    let calibration = engine.calibrate_checkerboard(frame, spec)?;
    Ok((engine.state().clone(), calibration))
}

/// Undistort (when configured and possible), detect and measure every object
/// of one frame. Returns the measurements and the annotated frame.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(frame, state, config),
        fields(width = frame.width(), height = frame.height())
    )
)]
pub fn measure_frame(
    frame: &Frame,
    state: &CalibrationState,
    config: &SessionConfig,
) -> Result<(Vec<MeasuredObject>, Frame), SessionError> {
    let mut annotated = match state.lens() {
        Some(lens) if config.undistort && lens.fits_frame(frame) => lens.undistort_frame(frame),
        Some(lens) if config.undistort => {
            warn!(
                "lens model fitted on {}x{} frames, measuring the {}x{} frame as is",
                lens.image_size[0],
                lens.image_size[1],
                frame.width(),
                frame.height()
            );
            frame.clone()
        }
        _ => frame.clone(),
    };
    let source = annotated.clone();

    let overlay = OverlayRenderer::new(config.overlay.clone())?;
    let engine = MeasurementEngine::new(config.measure.clone(), overlay);
    let contours = ContourDetector::new(config.contours.clone()).find_contours(&source);
    let objects = engine.measure_object(state, &mut annotated, contours)?;
    Ok((objects, annotated))
}
