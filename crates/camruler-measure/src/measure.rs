use camruler_calib::CalibrationState;
use camruler_core::{BoundingBox, Frame, OverlayRenderer};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::contours::Contour;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureError {
    #[error("not calibrated: no pixel to centimeter ratio set")]
    NotCalibrated,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureParams {
    /// Contours enclosing this many square pixels or fewer are ignored.
    pub min_area_px: f64,
}

impl Default for MeasureParams {
    fn default() -> Self {
        Self {
            min_area_px: 1000.0,
        }
    }
}

/// Physical dimensions of one detected object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasuredObject {
    pub width_cm: f64,
    pub height_cm: f64,
    pub bbox: BoundingBox,
}

impl MeasuredObject {
    pub fn area_cm2(&self) -> f64 {
        self.width_cm * self.height_cm
    }
}

/// Turns contours into calibrated measurements and annotates frames with them.
pub struct MeasurementEngine {
    pub params: MeasureParams,
    overlay: OverlayRenderer,
}

impl MeasurementEngine {
    pub fn new(params: MeasureParams, overlay: OverlayRenderer) -> Self {
        Self { params, overlay }
    }

    pub fn overlay(&self) -> &OverlayRenderer {
        &self.overlay
    }

    /// Convert one pixel bounding box, without any area filter.
    pub fn measure_box(
        &self,
        state: &CalibrationState,
        bbox: BoundingBox,
    ) -> Result<MeasuredObject, MeasureError> {
        let ratio = state.ratio().ok_or(MeasureError::NotCalibrated)?;
        Ok(MeasuredObject {
            width_cm: bbox.width as f64 * ratio,
            height_cm: bbox.height as f64 * ratio,
            bbox,
        })
    }

    /// Measure every contour above the area threshold, in contour order.
    pub fn measure_contours<I>(
        &self,
        state: &CalibrationState,
        contours: I,
    ) -> Result<Vec<MeasuredObject>, MeasureError>
    where
        I: IntoIterator<Item = Contour>,
    {
        let ratio = state.ratio().ok_or(MeasureError::NotCalibrated)?;
        let mut out = Vec::new();
        for contour in contours {
            let area = contour.area();
            if area <= self.params.min_area_px {
                continue;
            }
            let Some(bbox) = contour.bounding_box() else {
                continue;
            };
            out.push(MeasuredObject {
                width_cm: bbox.width as f64 * ratio,
                height_cm: bbox.height as f64 * ratio,
                bbox,
            });
        }
        debug!("{} objects measured", out.len());
        Ok(out)
    }

    /// [`Self::measure_contours`] plus the box and `W:`/`H:` labels drawn into
    /// `frame`.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, state, frame, contours))
    )]
    pub fn measure_object<I>(
        &self,
        state: &CalibrationState,
        frame: &mut Frame,
        contours: I,
    ) -> Result<Vec<MeasuredObject>, MeasureError>
    where
        I: IntoIterator<Item = Contour>,
    {
        let objects = self.measure_contours(state, contours)?;
        for obj in &objects {
            self.annotate(frame, obj);
        }
        Ok(objects)
    }

    /// Draw one measurement: box, width label above, height label below.
    pub fn annotate(&self, frame: &mut Frame, obj: &MeasuredObject) {
        let p = self.overlay.params();
        let b = obj.bbox;
        self.overlay
            .draw_box(frame, &b, p.box_color, p.box_thickness);

        let [(wx, wy), (hx, hy)] = label_anchors(&b, p.text_scale.round() as i32);
        self.overlay.add_text(
            frame,
            &format!("W: {:.2} cm", obj.width_cm),
            wx,
            wy,
            p.label_color,
        );
        self.overlay.add_text(
            frame,
            &format!("H: {:.2} cm", obj.height_cm),
            hx,
            hy,
            p.label_color,
        );
    }
}

/// Top-left corners of the width and height labels, left-aligned with the
/// box: baselines 10 px above its top and 20 px below its bottom.
fn label_anchors(b: &BoundingBox, text_h: i32) -> [(i32, i32); 2] {
    [
        (b.x, b.y - 10 - text_h),
        (b.x, b.y + b.height as i32 + 20 - text_h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use camruler_core::{OverlayParams, PixelPoint};
    use image::Rgb;

    fn engine() -> MeasurementEngine {
        MeasurementEngine::new(
            MeasureParams::default(),
            OverlayRenderer::without_text(OverlayParams::default()),
        )
    }

    fn calibrated(ratio: f64) -> CalibrationState {
        CalibrationState {
            pixel_to_cm: Some(ratio),
            lens: None,
        }
    }

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Contour {
        Contour::new(vec![
            PixelPoint::new(x, y),
            PixelPoint::new(x + w, y),
            PixelPoint::new(x + w, y + h),
            PixelPoint::new(x, y + h),
        ])
    }

    #[test]
    fn box_scales_by_ratio() {
        let m = engine()
            .measure_box(&calibrated(0.1), BoundingBox::new(0, 0, 50, 20))
            .expect("measure");
        assert_abs_diff_eq!(5.0, m.width_cm, epsilon = 1e-9);
        assert_abs_diff_eq!(2.0, m.height_cm, epsilon = 1e-9);
        assert_abs_diff_eq!(10.0, m.area_cm2(), epsilon = 1e-9);
    }

    #[test]
    fn uncalibrated_state_is_rejected() {
        let state = CalibrationState::default();
        let e = engine();
        assert_eq!(
            Err(MeasureError::NotCalibrated),
            e.measure_box(&state, BoundingBox::new(0, 0, 10, 10))
        );
        assert_eq!(
            Err(MeasureError::NotCalibrated),
            e.measure_contours(&state, vec![rect(0, 0, 100, 100)])
        );
    }

    #[test]
    fn area_threshold_is_exclusive() {
        let objects = engine()
            .measure_contours(
                &calibrated(1.0),
                vec![rect(0, 0, 20, 20), rect(0, 0, 40, 25), rect(5, 5, 40, 26)],
            )
            .expect("measure");
        assert_eq!(1, objects.len());
        assert_eq!(BoundingBox::new(5, 5, 41, 27), objects[0].bbox);
    }

    #[test]
    fn empty_input_is_not_an_error() {
        let objects = engine()
            .measure_contours(&calibrated(0.5), Vec::new())
            .expect("measure");
        assert!(objects.is_empty());
    }

    #[test]
    fn results_follow_contour_order() {
        let objects = engine()
            .measure_contours(
                &calibrated(0.5),
                vec![rect(200, 10, 60, 40), rect(10, 10, 100, 40)],
            )
            .expect("measure");
        assert_eq!(200, objects[0].bbox.x);
        assert_eq!(10, objects[1].bbox.x);
        assert_abs_diff_eq!(30.5, objects[0].width_cm, epsilon = 1e-9);
    }

    #[test]
    fn measurement_serializes_for_downstream_consumers() {
        let m = engine()
            .measure_box(&calibrated(0.5), BoundingBox::new(1, 2, 10, 4))
            .expect("measure");
        let v = serde_json::to_value(m).expect("json");
        assert_eq!(5.0, v["width_cm"]);
        assert_eq!(2.0, v["height_cm"]);
        assert_eq!(10, v["bbox"]["width"]);
    }

    #[test]
    fn labels_are_left_aligned_above_and_below() {
        let b = BoundingBox::new(40, 30, 101, 61);
        assert_eq!([(40, 4), (40, 95)], label_anchors(&b, 16));
    }

    #[test]
    fn measure_object_draws_the_box() {
        let mut frame = Frame::from_pixel(200, 150, Rgb([0, 0, 0]));
        let e = engine();
        let objects = e
            .measure_object(&calibrated(0.2), &mut frame, vec![rect(40, 30, 100, 60)])
            .expect("measure");
        assert_eq!(1, objects.len());

        let green = e.overlay().params().box_color.rgb();
        assert_eq!(green, *frame.get_pixel(40, 30));
        assert_eq!(green, *frame.get_pixel(140, 90));
        assert_eq!(Rgb([0, 0, 0]), *frame.get_pixel(90, 60));
    }
}
