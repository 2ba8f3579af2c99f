use std::f32::consts::{FRAC_PI_2, PI};

/// Wrap an angle difference into `[-π, π)`.
fn wrap_pi(diff: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let d = diff.rem_euclid(two_pi);
    if d >= PI {
        d - two_pi
    } else {
        d
    }
}

/// Absolute difference between two directions given modulo π, in `[0, π/2]`.
pub(crate) fn axis_diff(a: f32, b: f32) -> f32 {
    let d = wrap_pi(b - a).abs();
    d.min(PI - d)
}

/// Whether two undirected axes are orthogonal within `tolerance` radians.
pub(crate) fn is_orthogonal(reference: f32, other: f32, tolerance: f32) -> bool {
    (FRAC_PI_2 - axis_diff(reference, other)).abs() <= tolerance.abs()
}
