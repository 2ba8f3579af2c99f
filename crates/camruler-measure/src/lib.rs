//! Object outlines from Canny edges, measured with a calibrated scale.

mod contours;
mod measure;

pub use contours::{Contour, ContourDetector, ContourParams};
pub use measure::{MeasureError, MeasureParams, MeasuredObject, MeasurementEngine};
