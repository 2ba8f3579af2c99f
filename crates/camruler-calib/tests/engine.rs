use std::f32::consts::FRAC_PI_4;

use approx::assert_abs_diff_eq;
use camruler_calib::{
    CalibrationEngine, CalibrationError, CalibrationState, CornerDetector, LensModel,
    ReferencePointPair,
};
use camruler_checkerboard::{render_checkerboard, CheckerboardParams, CheckerboardSpec};
use camruler_core::{Corner, Frame, PixelPoint};
use image::{GrayImage, Rgb};

/// Corner detector that ignores the image and returns a fixed corner set.
struct FixedCorners(Vec<Corner>);

impl CornerDetector for FixedCorners {
    fn detect(&self, _gray: &GrayImage) -> Vec<Corner> {
        self.0.clone()
    }
}

fn synthetic_corners(cols: u32, rows: u32, origin: (f32, f32), spacing: f32) -> Vec<Corner> {
    let mut corners = Vec::new();
    for j in 0..rows {
        for i in 0..cols {
            let orientation = if (i + j) % 2 == 0 {
                FRAC_PI_4
            } else {
                3.0 * FRAC_PI_4
            };
            corners.push(Corner::new(
                origin.0 + i as f32 * spacing,
                origin.1 + j as f32 * spacing,
                orientation,
                1.0,
            ));
        }
    }
    corners
}

fn blank_frame(w: u32, h: u32) -> Frame {
    Frame::from_pixel(w, h, Rgb([0, 0, 0]))
}

fn engine_with(corners: Vec<Corner>) -> CalibrationEngine<FixedCorners> {
    CalibrationEngine::with_corner_detector(CheckerboardParams::default(), FixedCorners(corners))
}

#[test]
fn manual_reference_points_give_expected_ratio() {
    let mut engine = CalibrationEngine::default();
    assert!(!engine.is_calibrated());

    let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(100, 0));
    let ratio = engine.calibrate_manual(&pair, 10.0).expect("calibrate");

    assert_abs_diff_eq!(0.1, ratio, epsilon = 1e-12);
    assert!(engine.is_calibrated());
    assert_eq!(Some(ratio), engine.state().pixel_to_cm);
}

#[test]
fn degenerate_manual_calibration_keeps_state() {
    let mut engine = CalibrationEngine::default();
    let same = ReferencePointPair::new(PixelPoint::new(8, 8), PixelPoint::new(8, 8));
    assert_eq!(
        Err(CalibrationError::DegeneratePoints),
        engine.calibrate_manual(&same, 10.0)
    );
    assert_eq!(&CalibrationState::uncalibrated(), engine.state());
}

#[test]
fn blank_frame_has_no_checkerboard() {
    let mut engine = CalibrationEngine::default();
    let spec = CheckerboardSpec::new([9, 6], 2.5).expect("spec");

    let result = engine.calibrate_checkerboard(&blank_frame(160, 120), &spec);
    assert!(matches!(result, Err(CalibrationError::PatternNotFound)));
    assert!(!engine.is_calibrated());
}

#[test]
fn rendered_board_calibrates_with_chess_corners() {
    let mut engine = CalibrationEngine::default();
    let spec = CheckerboardSpec::new([9, 6], 1.0).expect("spec");
    // 480 / 9 = 53 px squares.
    let frame = render_checkerboard(640, 480, [9, 6]);

    let calib = engine
        .calibrate_checkerboard(&frame, &spec)
        .expect("calibration");

    assert_abs_diff_eq!(1.0 / 53.0, calib.pixel_to_cm, epsilon = 2e-4);
    assert_eq!(40, calib.corners.len());
    // Row-major from the top-left inner corner.
    let first = calib.corners[0];
    let last = calib.corners[39];
    assert_abs_diff_eq!(53.0, first.x, epsilon = 1.0);
    assert_abs_diff_eq!(53.0, first.y, epsilon = 1.0);
    assert_abs_diff_eq!(424.0, calib.corners[7].x, epsilon = 1.0);
    assert_abs_diff_eq!(424.0, last.x, epsilon = 1.0);
    assert_abs_diff_eq!(265.0, last.y, epsilon = 1.0);
    assert!(calib.lens.rms_error < 0.5, "rms {}", calib.lens.rms_error);
}

#[test]
fn checkerboard_sets_ratio_and_lens_together() {
    let mut engine = engine_with(synthetic_corners(8, 5, (100.0, 80.0), 30.0));
    let spec = CheckerboardSpec::new([9, 6], 2.5).expect("spec");

    let calib = engine
        .calibrate_checkerboard(&blank_frame(640, 480), &spec)
        .expect("calibration");

    assert_abs_diff_eq!(2.5 / 30.0, calib.pixel_to_cm, epsilon = 1e-6);
    assert_eq!(40, calib.corners.len());
    assert_eq!([640, 480], calib.lens.image_size);
    assert!(calib.lens.rms_error < 1e-3);

    let state = engine.state();
    assert_eq!(Some(calib.pixel_to_cm), state.pixel_to_cm);
    assert_eq!(Some(&calib.lens), state.lens.as_ref());
}

#[test]
fn failed_recalibration_keeps_previous_state() {
    let mut engine = engine_with(Vec::new());
    let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(0, 40));
    engine.calibrate_manual(&pair, 2.0).expect("manual");
    let before = engine.state().clone();

    let spec = CheckerboardSpec::new([9, 6], 2.5).expect("spec");
    let result = engine.calibrate_checkerboard(&blank_frame(320, 240), &spec);
    assert!(matches!(result, Err(CalibrationError::PatternNotFound)));
    assert_eq!(&before, engine.state());

    let bad = CheckerboardSpec {
        squares: [2, 6],
        square_size: 2.5,
    };
    assert!(matches!(
        engine.calibrate_checkerboard(&blank_frame(320, 240), &bad),
        Err(CalibrationError::InvalidBoard(_))
    ));
    assert_eq!(&before, engine.state());
}

#[test]
fn manual_calibration_keeps_fitted_lens() {
    let mut engine = engine_with(synthetic_corners(8, 5, (100.0, 80.0), 30.0));
    let spec = CheckerboardSpec::new([9, 6], 2.5).expect("spec");
    engine
        .calibrate_checkerboard(&blank_frame(640, 480), &spec)
        .expect("checkerboard");
    assert!(engine.undistort(&blank_frame(640, 480)).is_some());

    let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(100, 0));
    engine.calibrate_manual(&pair, 10.0).expect("manual");
    assert_eq!(Some(0.1), engine.state().pixel_to_cm);
    assert!(engine.state().lens.is_some());
}

#[test]
fn restore_replaces_state_wholesale() {
    let mut engine = CalibrationEngine::default();
    assert!(engine.undistort(&blank_frame(8, 8)).is_none());

    let state = CalibrationState {
        pixel_to_cm: Some(0.05),
        lens: Some(LensModel::pinhole(400.0, [8, 8])),
    };
    engine.restore(state.clone());
    assert_eq!(&state, engine.state());

    let out = engine.undistort(&blank_frame(8, 8)).expect("lens model");
    assert_eq!((8, 8), out.dimensions());
}

#[test]
fn lens_from_another_resolution_is_not_applied() {
    let mut engine = CalibrationEngine::default();
    engine.restore(CalibrationState {
        pixel_to_cm: Some(0.05),
        lens: Some(LensModel::pinhole(640.0, [640, 480])),
    });

    assert!(engine.undistort(&blank_frame(320, 240)).is_none());
    assert!(engine.undistort(&blank_frame(320, 240)).is_none());
    assert!(engine.undistort(&blank_frame(640, 480)).is_some());
}
