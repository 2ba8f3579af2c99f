use camruler_core::Corner;
use chess_corners::{find_chess_corners_image, ChessConfig, CornerDescriptor, ThresholdMode};
use image::GrayImage;
use log::warn;
use serde::{Deserialize, Serialize};

/// Source of X-junction corners for checkerboard detection.
pub trait CornerDetector {
    fn detect(&self, gray: &GrayImage) -> Vec<Corner>;
}

/// Tuning for the ChESS corner detector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessCornerParams {
    /// Response threshold relative to the strongest corner.
    pub threshold_rel: f32,
    pub nms_radius: u32,
}

impl Default for ChessCornerParams {
    fn default() -> Self {
        Self {
            threshold_rel: 0.2,
            nms_radius: 2,
        }
    }
}

/// [`CornerDetector`] backed by the `chess-corners` crate.
#[derive(Clone, Debug, Default)]
pub struct ChessCornerDetector {
    pub params: ChessCornerParams,
}

impl ChessCornerDetector {
    pub fn new(params: ChessCornerParams) -> Self {
        Self { params }
    }

    fn config(&self) -> ChessConfig {
        let mut cfg = ChessConfig::single_scale();
        cfg.threshold_mode = ThresholdMode::Relative;
        cfg.threshold_value = self.params.threshold_rel;
        cfg.nms_radius = self.params.nms_radius;
        cfg
    }
}

/// Direction bisecting the dark sector between the two grid axes.
///
/// `axes[1]` lies within half a turn counter-clockwise of `axes[0]` and the
/// sector between them is dark, so the bisector runs along the diagonal of
/// a dark square. Adjacent board corners get orthogonal values and the board
/// edges sit at 45° to them.
fn dark_diagonal(c: &CornerDescriptor) -> f32 {
    0.5 * (c.axes[0].angle + c.axes[1].angle)
}

impl CornerDetector for ChessCornerDetector {
    /// Corners with a non-positive ChESS response are dropped: X-junctions
    /// always respond positively.
    fn detect(&self, gray: &GrayImage) -> Vec<Corner> {
        let found = match find_chess_corners_image(gray, &self.config()) {
            Ok(found) => found,
            Err(e) => {
                warn!("ChESS detection failed: {e}");
                return Vec::new();
            }
        };
        found
            .iter()
            .filter(|c| c.response > 0.0)
            .map(|c| Corner::new(c.x, c.y, dark_diagonal(c), c.response))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_corners::AxisEstimate;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn descriptor(a0: f32, a1: f32) -> CornerDescriptor {
        CornerDescriptor::new(
            10.0,
            20.0,
            50.0,
            80.0,
            1.0,
            [AxisEstimate::new(a0, 0.01), AxisEstimate::new(a1, 0.01)],
        )
    }

    #[test]
    fn neighbouring_corners_get_orthogonal_diagonals() {
        // Axis-aligned board: dark sector from +x towards +y, and its neighbour
        // along x with the colors swapped.
        let here = dark_diagonal(&descriptor(0.0, FRAC_PI_2));
        let next = dark_diagonal(&descriptor(FRAC_PI_2, PI));
        assert!((here - FRAC_PI_4).abs() < 1e-6);
        assert!((next - 3.0 * FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn flat_image_has_no_corners() {
        let gray = GrayImage::from_pixel(96, 64, image::Luma([128]));
        assert!(ChessCornerDetector::default().detect(&gray).is_empty());
    }

    #[test]
    fn params_fill_missing_fields() {
        let params: ChessCornerParams =
            serde_json::from_str(r#"{ "nms_radius": 4 }"#).expect("parse");
        assert_eq!(4, params.nms_radius);
        assert_eq!(0.2, params.threshold_rel);
    }
}
