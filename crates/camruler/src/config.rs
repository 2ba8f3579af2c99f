use camruler_calib::CalibrationParams;
use camruler_checkerboard::CheckerboardSpec;
use camruler_core::OverlayParams;
use camruler_measure::{ContourParams, MeasureParams};
use serde::{Deserialize, Serialize};

use crate::input::KeyBindings;

/// Everything a [`crate::Session`] can be tuned with. Every section may be
/// omitted from a JSON config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Physical distance between the two manual reference points.
    pub known_distance_cm: f64,
    /// Board used by the checkerboard calibration key.
    pub checkerboard: CheckerboardSpec,
    /// Remove lens distortion from frames once a lens model exists.
    pub undistort: bool,
    pub calibration: CalibrationParams,
    pub contours: ContourParams,
    pub measure: MeasureParams,
    pub overlay: OverlayParams,
    pub keys: KeyBindings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            known_distance_cm: 10.0,
            checkerboard: CheckerboardSpec {
                squares: [9, 6],
                square_size: 1.0,
            },
            undistort: true,
            calibration: CalibrationParams::default(),
            contours: ContourParams::default(),
            measure: MeasureParams::default(),
            overlay: OverlayParams::default(),
            keys: KeyBindings::default(),
        }
    }
}
