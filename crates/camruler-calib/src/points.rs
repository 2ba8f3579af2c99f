//! Interactive collection of the two reference points for manual calibration.

use camruler_core::{Color, Frame, OverlayRenderer, PixelPoint};
use log::debug;

use crate::error::CalibrationError;

const POINT_RADIUS: i32 = 5;

/// The two pixel positions spanning a known physical distance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferencePointPair {
    pub first: PixelPoint,
    pub second: PixelPoint,
}

impl ReferencePointPair {
    pub fn new(first: PixelPoint, second: PixelPoint) -> Self {
        Self { first, second }
    }

    pub fn pixel_distance(&self) -> f64 {
        self.first.distance(&self.second)
    }

    /// Centimeters per pixel for a known distance between the two points.
    pub fn ratio_for(&self, known_distance_cm: f64) -> Result<f64, CalibrationError> {
        if !(known_distance_cm.is_finite() && known_distance_cm > 0.0) {
            return Err(CalibrationError::InvalidDistance(known_distance_cm));
        }
        let d = self.pixel_distance();
        if d == 0.0 {
            return Err(CalibrationError::DegeneratePoints);
        }
        Ok(known_distance_cm / d)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectorPhase {
    AwaitingFirst,
    AwaitingSecond { first: PixelPoint },
    Done(ReferencePointPair),
    Cancelled,
}

/// Pointer-driven state machine `AwaitingFirst -> AwaitingSecond -> Done`.
///
/// Pointer moves only update the cursor. Clicks after `Done` or `Cancelled`
/// are ignored.
#[derive(Clone, Debug)]
pub struct PointCollector {
    phase: CollectorPhase,
    cursor: PixelPoint,
}

impl Default for PointCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl PointCollector {
    pub fn new() -> Self {
        Self {
            phase: CollectorPhase::AwaitingFirst,
            cursor: PixelPoint::default(),
        }
    }

    pub fn phase(&self) -> CollectorPhase {
        self.phase
    }

    pub fn cursor(&self) -> PixelPoint {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.phase,
            CollectorPhase::Done(_) | CollectorPhase::Cancelled
        )
    }

    pub fn points(&self) -> Option<ReferencePointPair> {
        match self.phase {
            CollectorPhase::Done(pair) => Some(pair),
            _ => None,
        }
    }

    /// Points clicked so far, in click order.
    pub fn clicked(&self) -> Vec<PixelPoint> {
        match self.phase {
            CollectorPhase::AwaitingSecond { first } => vec![first],
            CollectorPhase::Done(pair) => vec![pair.first, pair.second],
            CollectorPhase::AwaitingFirst | CollectorPhase::Cancelled => Vec::new(),
        }
    }

    pub fn pointer_move(&mut self, at: PixelPoint) {
        self.cursor = at;
    }

    pub fn pointer_down(&mut self, at: PixelPoint) -> CollectorPhase {
        self.cursor = at;
        self.phase = match self.phase {
            CollectorPhase::AwaitingFirst => {
                debug!("first reference point at ({}, {})", at.x, at.y);
                CollectorPhase::AwaitingSecond { first: at }
            }
            CollectorPhase::AwaitingSecond { first } => {
                debug!("second reference point at ({}, {})", at.x, at.y);
                CollectorPhase::Done(ReferencePointPair::new(first, at))
            }
            finished => finished,
        };
        self.phase
    }

    /// Abort collection. A completed pair is kept.
    pub fn cancel(&mut self) {
        if !matches!(self.phase, CollectorPhase::Done(_)) {
            self.phase = CollectorPhase::Cancelled;
        }
    }

    /// Draw the collection overlay on a copy of the frozen frame: the
    /// following crosshair, the clicked points and the segment between them.
    pub fn render(&self, frozen: &Frame, overlay: &OverlayRenderer) -> Frame {
        let mut frame = frozen.clone();
        let clicked = self.clicked();
        if let [a, b] = clicked.as_slice() {
            overlay.draw_segment(&mut frame, *a, *b, Color::Blue, 2);
        }
        for p in &clicked {
            overlay.fixed_crosshairs(&mut frame, p.x, p.y);
            overlay.draw_point(&mut frame, *p, POINT_RADIUS, Color::Green);
        }
        if !self.is_finished() {
            overlay.dynamic_crosshair(&mut frame, self.cursor);
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use camruler_core::OverlayParams;
    use image::Rgb;

    #[test]
    fn two_clicks_complete_the_pair() {
        let mut collector = PointCollector::new();
        collector.pointer_move(PixelPoint::new(5, 5));
        assert_eq!(CollectorPhase::AwaitingFirst, collector.phase());
        assert_eq!(PixelPoint::new(5, 5), collector.cursor());

        collector.pointer_down(PixelPoint::new(0, 0));
        assert_eq!(
            CollectorPhase::AwaitingSecond {
                first: PixelPoint::new(0, 0)
            },
            collector.phase()
        );
        assert!(collector.points().is_none());

        collector.pointer_down(PixelPoint::new(100, 0));
        let pair = collector.points().expect("done");
        assert_eq!(PixelPoint::new(100, 0), pair.second);
        assert!(collector.is_finished());

        // Further clicks do not change the pair.
        collector.pointer_down(PixelPoint::new(7, 7));
        assert_eq!(Some(pair), collector.points());
    }

    #[test]
    fn cancel_aborts_unless_done() {
        let mut collector = PointCollector::new();
        collector.pointer_down(PixelPoint::new(3, 4));
        collector.cancel();
        assert_eq!(CollectorPhase::Cancelled, collector.phase());
        assert!(collector.clicked().is_empty());
        collector.pointer_down(PixelPoint::new(1, 1));
        assert_eq!(CollectorPhase::Cancelled, collector.phase());

        let mut done = PointCollector::new();
        done.pointer_down(PixelPoint::new(0, 0));
        done.pointer_down(PixelPoint::new(0, 10));
        done.cancel();
        assert!(done.points().is_some());
    }

    #[test]
    fn ratio_from_reference_pair() {
        let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(100, 0));
        assert_abs_diff_eq!(0.1, pair.ratio_for(10.0).expect("ratio"), epsilon = 1e-12);

        let diag = ReferencePointPair::new(PixelPoint::new(10, 10), PixelPoint::new(40, 50));
        assert_abs_diff_eq!(50.0, diag.pixel_distance(), epsilon = 1e-12);
        assert_abs_diff_eq!(0.5, diag.ratio_for(25.0).expect("ratio"), epsilon = 1e-12);
    }

    #[test]
    fn degenerate_pair_and_bad_distance_fail() {
        let same = ReferencePointPair::new(PixelPoint::new(5, 5), PixelPoint::new(5, 5));
        assert_eq!(Err(CalibrationError::DegeneratePoints), same.ratio_for(10.0));

        let pair = ReferencePointPair::new(PixelPoint::new(0, 0), PixelPoint::new(1, 0));
        assert_eq!(Err(CalibrationError::InvalidDistance(0.0)), pair.ratio_for(0.0));
        assert!(matches!(
            pair.ratio_for(f64::NAN),
            Err(CalibrationError::InvalidDistance(_))
        ));
    }

    #[test]
    fn render_marks_clicked_points_without_touching_the_frozen_frame() {
        let overlay = OverlayRenderer::without_text(OverlayParams::default());
        let frozen = Frame::from_pixel(120, 80, Rgb([0, 0, 0]));
        let mut collector = PointCollector::new();
        collector.pointer_down(PixelPoint::new(20, 40));
        collector.pointer_down(PixelPoint::new(100, 40));

        let shown = collector.render(&frozen, &overlay);
        assert_eq!(Color::Green.rgb(), *shown.get_pixel(20, 40));
        assert_eq!(Color::Green.rgb(), *shown.get_pixel(100, 40));
        assert!(frozen.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
