use approx::assert_abs_diff_eq;
use camruler_calib::{CalibrationEngine, ReferencePointPair};
use camruler_core::{BoundingBox, Frame, OverlayParams, OverlayRenderer, PixelPoint};
use camruler_measure::{ContourDetector, MeasureError, MeasureParams, MeasurementEngine};
use image::Rgb;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

fn measurement_engine() -> MeasurementEngine {
    MeasurementEngine::new(
        MeasureParams::default(),
        OverlayRenderer::without_text(OverlayParams::default()),
    )
}

fn frame_with_rect(x: i32, y: i32, w: u32, h: u32) -> Frame {
    let mut frame = Frame::from_pixel(640, 480, Rgb([0, 0, 0]));
    draw_filled_rect_mut(&mut frame, Rect::at(x, y).of_size(w, h), Rgb([255, 255, 255]));
    frame
}

#[test]
fn manual_calibration_then_box_measurement() {
    let mut calib = CalibrationEngine::default();
    let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(100, 0));
    calib.calibrate_manual(&pair, 10.0).expect("calibrate");

    let m = measurement_engine()
        .measure_box(calib.state(), BoundingBox::new(30, 30, 50, 20))
        .expect("measure");
    assert_abs_diff_eq!(5.0, m.width_cm, epsilon = 1e-9);
    assert_abs_diff_eq!(2.0, m.height_cm, epsilon = 1e-9);
}

#[test]
fn measuring_before_calibration_fails() {
    let calib = CalibrationEngine::default();
    let mut frame = frame_with_rect(100, 100, 200, 120);
    let contours = ContourDetector::default().find_contours(&frame).collect::<Vec<_>>();
    assert_eq!(
        Err(MeasureError::NotCalibrated),
        measurement_engine().measure_object(calib.state(), &mut frame, contours)
    );
}

#[test]
fn blank_frame_measures_nothing() {
    let mut calib = CalibrationEngine::default();
    let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(100, 0));
    calib.calibrate_manual(&pair, 10.0).expect("calibrate");

    let mut frame = Frame::from_pixel(640, 480, Rgb([0, 0, 0]));
    let contours = ContourDetector::default().find_contours(&frame);
    let objects = measurement_engine()
        .measure_object(calib.state(), &mut frame, contours)
        .expect("measure");
    assert!(objects.is_empty());
}

#[test]
fn synthetic_rectangle_is_measured_to_scale() {
    let ratio = 0.1;
    let mut calib = CalibrationEngine::default();
    let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(0, 100));
    calib.calibrate_manual(&pair, 10.0).expect("calibrate");

    let mut frame = frame_with_rect(100, 100, 200, 120);
    let contours = ContourDetector::default().find_contours(&frame);
    let objects = measurement_engine()
        .measure_object(calib.state(), &mut frame, contours)
        .expect("measure");

    let largest = objects
        .iter()
        .max_by(|a, b| a.area_cm2().total_cmp(&b.area_cm2()))
        .expect("one object");
    assert_abs_diff_eq!(200.0 * ratio, largest.width_cm, epsilon = 4.0 * ratio);
    assert_abs_diff_eq!(120.0 * ratio, largest.height_cm, epsilon = 4.0 * ratio);
}
