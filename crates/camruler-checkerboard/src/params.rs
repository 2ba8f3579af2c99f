use serde::{Deserialize, Serialize};

/// Neighbour search settings for the corner grid graph.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    /// Minimal distance between adjacent corners, in pixels.
    pub min_spacing_pix: f32,
    /// Maximal distance between adjacent corners, in pixels.
    pub max_spacing_pix: f32,
    /// Number of nearest neighbours examined per corner.
    pub k_neighbors: usize,
    /// Angular tolerance for orientation and edge-direction checks.
    pub orientation_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 5.0,
            max_spacing_pix: 200.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}

/// Parameters of the checkerboard detector.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CheckerboardParams {
    /// Minimal corner strength to consider.
    pub min_corner_strength: f32,
    pub graph: GridGraphParams,
}

impl Default for CheckerboardParams {
    fn default() -> Self {
        Self {
            min_corner_strength: 0.0,
            graph: GridGraphParams::default(),
        }
    }
}
