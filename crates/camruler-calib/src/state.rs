use serde::{Deserialize, Serialize};

use crate::lens::LensModel;

/// Session calibration: the pixel to centimeter scale and, after a
/// checkerboard calibration, the fitted lens model.
///
/// The value is only ever replaced as a whole.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationState {
    pub pixel_to_cm: Option<f64>,
    pub lens: Option<LensModel>,
}

impl CalibrationState {
    pub fn uncalibrated() -> Self {
        Self::default()
    }

    pub fn is_calibrated(&self) -> bool {
        self.pixel_to_cm.is_some()
    }

    pub fn ratio(&self) -> Option<f64> {
        self.pixel_to_cm
    }

    pub fn lens(&self) -> Option<&LensModel> {
        self.lens.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_uncalibrated() {
        let state = CalibrationState::default();
        assert!(!state.is_calibrated());
        assert_eq!(None, state.ratio());
        assert!(state.lens().is_none());
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let state: CalibrationState =
            serde_json::from_str(r#"{ "pixel_to_cm": 0.25 }"#).expect("parse");
        assert_eq!(Some(0.25), state.ratio());
        assert!(state.lens.is_none());

        let empty: CalibrationState = serde_json::from_str("{}").expect("parse");
        assert_eq!(CalibrationState::uncalibrated(), empty);
    }
}
