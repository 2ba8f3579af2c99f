use nalgebra::Point2;

/// Canonical 2D corner fed to the checkerboard grid assembly.
///
/// This is what you obtain by adapting the output of a ChESS corner detector.
#[derive(Clone, Debug)]
pub struct Corner {
    /// Corner position in pixel coordinates.
    pub position: Point2<f32>,

    /// Dominant diagonal orientation at the corner, in radians.
    ///
    /// Defined modulo π because checkerboard axes are undirected. Adjacent
    /// corners of a checkerboard have roughly orthogonal orientations.
    pub orientation: f32,

    /// Strength / response of the corner detector.
    pub strength: f32,
}

impl Corner {
    pub fn new(x: f32, y: f32, orientation: f32, strength: f32) -> Self {
        Self {
            position: Point2::new(x, y),
            orientation,
            strength,
        }
    }
}
