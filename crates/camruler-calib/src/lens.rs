use camruler_core::{estimate_homography, sample_bilinear_rgb_u8, Frame, Homography};
use image::Rgb;
use log::debug;
use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Point2, Vector2, Vector3};
use serde::{Deserialize, Serialize};

const UNDISTORT_ITERATIONS: usize = 20;
const RADIAL_ROUNDS: usize = 100;
const RADIAL_TOLERANCE: f64 = 1e-9;
/// Fraction of the corner radius a board must reach before `k2` is fitted.
const WIDE_BOARD: f64 = 0.8;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LensFitError {
    #[error("lens fit needs at least 4 correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("object and image point counts differ ({object} vs {image})")]
    MismatchedPoints { object: usize, image: usize },
    #[error("board homography is degenerate")]
    DegenerateHomography,
}

/// Pinhole intrinsics with Brown-Conrady distortion `[k1, k2, p1, p2, k3]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LensModel {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub distortion: [f64; 5],
    /// Size of the frames the model was fitted on, `[width, height]`.
    pub image_size: [u32; 2],
    /// RMS reprojection error of the fit, in pixels.
    pub rms_error: f64,
}

impl LensModel {
    /// Distortion-free model with the principal point at the image center.
    pub fn pinhole(focal: f64, image_size: [u32; 2]) -> Self {
        Self {
            fx: focal,
            fy: focal,
            cx: (image_size[0] as f64 - 1.0) * 0.5,
            cy: (image_size[1] as f64 - 1.0) * 0.5,
            distortion: [0.0; 5],
            image_size,
            rms_error: 0.0,
        }
    }

    /// Whether `frame` has the resolution the model was fitted on.
    pub fn fits_frame(&self, frame: &Frame) -> bool {
        self.image_size == [frame.width(), frame.height()]
    }

    pub fn camera_matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.fx, 0.0, self.cx, //
            0.0, self.fy, self.cy, //
            0.0, 0.0, 1.0,
        )
    }

    fn to_normalized(&self, p: Point2<f64>) -> Vector2<f64> {
        Vector2::new((p.x - self.cx) / self.fx, (p.y - self.cy) / self.fy)
    }

    fn to_pixel(&self, n: Vector2<f64>) -> Point2<f64> {
        Point2::new(self.fx * n.x + self.cx, self.fy * n.y + self.cy)
    }

    /// Apply the distortion model to normalized coordinates.
    pub fn distort_normalized(&self, n: Vector2<f64>) -> Vector2<f64> {
        let [k1, k2, p1, p2, k3] = self.distortion;
        let (x, y) = (n.x, n.y);
        let r2 = x * x + y * y;
        let radial = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));
        Vector2::new(
            x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x),
            y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y,
        )
    }

    /// Where an ideal (undistorted) pixel shows up in the raw frame.
    pub fn distort_point(&self, p: Point2<f64>) -> Point2<f64> {
        self.to_pixel(self.distort_normalized(self.to_normalized(p)))
    }

    /// Remove lens distortion from a raw pixel position (fixed-point inverse).
    pub fn undistort_point(&self, p: Point2<f64>) -> Point2<f64> {
        let [k1, k2, p1, p2, k3] = self.distortion;
        let d = self.to_normalized(p);
        let (mut x, mut y) = (d.x, d.y);
        for _ in 0..UNDISTORT_ITERATIONS {
            let r2 = x * x + y * y;
            let radial = 1.0 + r2 * (k1 + r2 * (k2 + r2 * k3));
            if radial.abs() < 1e-12 {
                break;
            }
            let dx = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
            let dy = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
            x = (d.x - dx) / radial;
            y = (d.y - dy) / radial;
        }
        self.to_pixel(Vector2::new(x, y))
    }

    /// Remap a raw frame to its undistorted version, keeping the same camera
    /// matrix and frame size.
    pub fn undistort_frame(&self, frame: &Frame) -> Frame {
        let (w, h) = frame.dimensions();
        let mut out = Frame::new(w, h);
        for (x, y, px) in out.enumerate_pixels_mut() {
            let src = self.distort_point(Point2::new(x as f64, y as f64));
            *px = Rgb(sample_bilinear_rgb_u8(frame, src.x as f32, src.y as f32));
        }
        out
    }
}

/// Board pose relative to the camera, `X_cam = R * X_board + t`.
#[derive(Clone, Copy, Debug)]
struct PlanarPose {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl PlanarPose {
    fn project(&self, lens: &LensModel, p: Point2<f64>) -> Option<Point2<f64>> {
        let pc = self.rotation * Vector3::new(p.x, p.y, 0.0) + self.translation;
        if pc.z.abs() < 1e-12 {
            return None;
        }
        let n = Vector2::new(pc.x / pc.z, pc.y / pc.z);
        Some(lens.to_pixel(lens.distort_normalized(n)))
    }
}

/// Fit a lens model from a single view of a planar target.
///
/// The principal point is fixed at the image center and skew at zero. The
/// focal lengths come from the two homography constraints of Zhang's method;
/// when the view does not constrain them (fronto-parallel board) the focal
/// length falls back to the larger image dimension.
///
/// Radial distortion is refined by alternation: the homography is estimated
/// on the currently undistorted corners, the radial terms are fitted against
/// its residuals on the raw corners, and the corners are undistorted again.
/// `k2` is only fitted when the board reaches out towards the frame corners;
/// over a small radius it is collinear with `k1`.
pub fn fit_single_view(
    object: &[Point2<f64>],
    image: &[Point2<f64>],
    image_size: [u32; 2],
) -> Result<LensModel, LensFitError> {
    if object.len() != image.len() {
        return Err(LensFitError::MismatchedPoints {
            object: object.len(),
            image: image.len(),
        });
    }
    if object.len() < 4 {
        return Err(LensFitError::NotEnoughPoints(object.len()));
    }

    let mut lens = LensModel::pinhole(1.0, image_size);
    let mut undistorted = image.to_vec();
    let mut rounds = 0;
    while rounds < RADIAL_ROUNDS {
        rounds += 1;
        let homography = estimate_homography(object, &undistorted)
            .ok_or(LensFitError::DegenerateHomography)?;
        let (fx, fy) = estimate_focal(&homography, &lens);
        lens.fx = fx;
        lens.fy = fy;

        let with_k2 =
            board_radius(&homography, &lens, object) >= WIDE_BOARD * corner_radius(&lens);
        let [k1, k2] = fit_radial(&homography, &lens, object, image, with_k2);
        let step = (k1 - lens.distortion[0]).abs().max((k2 - lens.distortion[1]).abs());
        lens.distortion = [k1, k2, 0.0, 0.0, 0.0];
        undistorted = image.iter().map(|&p| lens.undistort_point(p)).collect();
        if step < RADIAL_TOLERANCE {
            break;
        }
    }

    let homography =
        estimate_homography(object, &undistorted).ok_or(LensFitError::DegenerateHomography)?;
    let pose = planar_pose(&homography, &lens).ok_or(LensFitError::DegenerateHomography)?;
    lens.rms_error = reprojection_rms(&pose, &lens, object, image);

    debug!(
        "lens fit after {} rounds: fx={:.2} fy={:.2} k1={:.4} k2={:.4} rms={:.3}px",
        rounds, lens.fx, lens.fy, lens.distortion[0], lens.distortion[1], lens.rms_error
    );
    Ok(lens)
}

/// Largest normalized radius the board reaches.
fn board_radius(homography: &Homography, lens: &LensModel, object: &[Point2<f64>]) -> f64 {
    object
        .iter()
        .map(|&o| lens.to_normalized(homography.apply(o)).norm())
        .fold(0.0, f64::max)
}

/// Normalized radius of the frame corners.
fn corner_radius(lens: &LensModel) -> f64 {
    Vector2::new(lens.cx / lens.fx, lens.cy / lens.fy).norm()
}

fn plausible_focal(f: f64, max_dim: f64) -> bool {
    f.is_finite() && f > 0.1 * max_dim && f < 50.0 * max_dim
}

fn estimate_focal(homography: &Homography, lens: &LensModel) -> (f64, f64) {
    let max_dim = lens.image_size[0].max(lens.image_size[1]).max(1) as f64;

    // Shift the principal point to the origin: H' = T * H.
    let t = Matrix3::new(
        1.0, 0.0, -lens.cx, //
        0.0, 1.0, -lens.cy, //
        0.0, 0.0, 1.0,
    );
    let hp = t * homography.h;
    let (h1, h2) = (hp.column(0), hp.column(1));

    // With B = diag(1/fx^2, 1/fy^2, 1): h1^T B h2 = 0 and h1^T B h1 = h2^T B h2.
    let a = Matrix2::new(
        h1[0] * h2[0],
        h1[1] * h2[1],
        h1[0] * h1[0] - h2[0] * h2[0],
        h1[1] * h1[1] - h2[1] * h2[1],
    );
    let b = Vector2::new(
        -h1[2] * h2[2],
        -(h1[2] * h1[2] - h2[2] * h2[2]),
    );

    let scale = a.norm_squared();
    if scale > 0.0 && a.determinant().abs() > 1e-9 * scale {
        if let Some(inv) = a.try_inverse() {
            let uv = inv * b;
            if uv[0] > 0.0 && uv[1] > 0.0 {
                let (fx, fy) = (1.0 / uv[0].sqrt(), 1.0 / uv[1].sqrt());
                if plausible_focal(fx, max_dim) && plausible_focal(fy, max_dim) {
                    return (fx, fy);
                }
            }
        }
    }

    // Square pixels: one unknown, least squares over both equations.
    let c = Vector2::new(a[(0, 0)] + a[(0, 1)], a[(1, 0)] + a[(1, 1)]);
    let cc = c.norm_squared();
    if cc > 1e-18 * scale.max(1e-300) {
        let u = c.dot(&b) / cc;
        if u > 0.0 {
            let f = 1.0 / u.sqrt();
            if plausible_focal(f, max_dim) {
                return (f, f);
            }
        }
    }

    debug!("focal length unconstrained by this view, using {max_dim}");
    (max_dim, max_dim)
}

fn fit_radial(
    homography: &Homography,
    lens: &LensModel,
    object: &[Point2<f64>],
    image: &[Point2<f64>],
    with_k2: bool,
) -> [f64; 2] {
    let n = object.len();
    let terms = if with_k2 { 2 } else { 1 };
    let mut a = DMatrix::<f64>::zeros(2 * n, terms);
    let mut b = DVector::<f64>::zeros(2 * n);

    for (k, (o, obs)) in object.iter().zip(image).enumerate() {
        let ideal = lens.to_normalized(homography.apply(*o));
        let seen = lens.to_normalized(*obs);
        let r2 = ideal.norm_squared();
        a[(2 * k, 0)] = ideal.x * r2;
        a[(2 * k + 1, 0)] = ideal.y * r2;
        if with_k2 {
            a[(2 * k, 1)] = ideal.x * r2 * r2;
            a[(2 * k + 1, 1)] = ideal.y * r2 * r2;
        }
        b[2 * k] = seen.x - ideal.x;
        b[2 * k + 1] = seen.y - ideal.y;
    }

    match a.svd(true, true).solve(&b, 1e-12) {
        Ok(k) if k.iter().all(|v| v.is_finite()) => [k[0], if with_k2 { k[1] } else { 0.0 }],
        _ => [0.0, 0.0],
    }
}

fn planar_pose(homography: &Homography, lens: &LensModel) -> Option<PlanarPose> {
    let b = lens.camera_matrix().try_inverse()? * homography.h;
    let (b1, b2, b3) = (b.column(0), b.column(1), b.column(2));

    let norm = 0.5 * (b1.norm() + b2.norm());
    if norm < 1e-12 {
        return None;
    }
    let mut lambda = 1.0 / norm;
    // Board in front of the camera.
    if b3[2] * lambda < 0.0 {
        lambda = -lambda;
    }

    let r1: Vector3<f64> = b1 * lambda;
    let r2: Vector3<f64> = b2 * lambda;
    let r3 = r1.cross(&r2);
    let rough = Matrix3::from_columns(&[r1, r2, r3]);

    let svd = rough.svd(true, true);
    let rotation = svd.u? * svd.v_t?;

    Some(PlanarPose {
        rotation,
        translation: b3 * lambda,
    })
}

fn reprojection_rms(
    pose: &PlanarPose,
    lens: &LensModel,
    object: &[Point2<f64>],
    image: &[Point2<f64>],
) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (o, obs) in object.iter().zip(image) {
        if let Some(p) = pose.project(lens, *o) {
            sum += (p - *obs).norm_squared();
            count += 1;
        }
    }
    if count == 0 {
        return f64::INFINITY;
    }
    (sum / count as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use nalgebra::Rotation3;

    fn board(cols: usize, rows: usize, square: f64) -> Vec<Point2<f64>> {
        (0..rows)
            .flat_map(|j| (0..cols).map(move |i| Point2::new(i as f64 * square, j as f64 * square)))
            .collect()
    }

    fn project_view(
        truth: &LensModel,
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
        object: &[Point2<f64>],
    ) -> Vec<Point2<f64>> {
        let pose = PlanarPose {
            rotation,
            translation,
        };
        object
            .iter()
            .map(|&p| pose.project(truth, p).expect("in front of camera"))
            .collect()
    }

    #[test]
    fn recovers_focal_from_tilted_view() {
        let truth = LensModel::pinhole(800.0, [640, 480]);
        let object = board(8, 5, 2.5);
        let rotation = *Rotation3::from_euler_angles(0.3, -0.2, 0.1).matrix();
        let image = project_view(&truth, rotation, Vector3::new(-8.0, -5.0, 60.0), &object);

        let lens = fit_single_view(&object, &image, [640, 480]).expect("fit");
        assert_abs_diff_eq!(800.0, lens.fx, epsilon = 0.5);
        assert_abs_diff_eq!(800.0, lens.fy, epsilon = 0.5);
        assert_abs_diff_eq!(319.5, lens.cx, epsilon = 1e-12);
        assert_abs_diff_eq!(239.5, lens.cy, epsilon = 1e-12);
        assert!(lens.distortion[0].abs() < 1e-3);
        assert!(lens.rms_error < 1e-3, "rms {}", lens.rms_error);
    }

    #[test]
    fn recovers_barrel_and_pincushion_k1() {
        let object = board(8, 5, 2.5);
        let rotation = *Rotation3::from_euler_angles(0.3, -0.2, 0.1).matrix();
        for k1 in [-0.25, 0.1] {
            let mut truth = LensModel::pinhole(800.0, [640, 480]);
            truth.distortion[0] = k1;
            let image = project_view(&truth, rotation, Vector3::new(-8.0, -5.0, 60.0), &object);

            let lens = fit_single_view(&object, &image, [640, 480]).expect("fit");
            assert_abs_diff_eq!(k1, lens.distortion[0], epsilon = 1e-3);
            // The board stays near the center: k2 is not fitted.
            assert_eq!(0.0, lens.distortion[1]);
            assert_abs_diff_eq!(800.0, lens.fx, epsilon = 0.5);
            assert!(lens.rms_error < 1e-2, "rms {}", lens.rms_error);
        }
    }

    #[test]
    fn fronto_parallel_view_falls_back_to_image_size() {
        let object = board(8, 5, 2.5);
        let image: Vec<Point2<f64>> = object
            .iter()
            .map(|p| Point2::new(100.0 + p.x * 12.0, 80.0 + p.y * 12.0))
            .collect();

        let lens = fit_single_view(&object, &image, [640, 480]).expect("fit");
        assert_abs_diff_eq!(640.0, lens.fx, epsilon = 1e-9);
        assert_abs_diff_eq!(640.0, lens.fy, epsilon = 1e-9);
        assert!(lens.rms_error < 1e-6, "rms {}", lens.rms_error);
    }

    #[test]
    fn rejects_short_or_mismatched_input() {
        let object = board(2, 1, 1.0);
        assert_eq!(
            Err(LensFitError::NotEnoughPoints(2)),
            fit_single_view(&object, &object, [64, 48])
        );
        let four = board(2, 2, 1.0);
        assert!(matches!(
            fit_single_view(&four, &four[..3], [64, 48]),
            Err(LensFitError::MismatchedPoints { .. })
        ));
    }

    #[test]
    fn undistort_inverts_distort() {
        let mut lens = LensModel::pinhole(700.0, [640, 480]);
        lens.distortion = [-0.2, 0.05, 0.001, -0.0005, 0.0];

        for p in [
            Point2::new(20.0, 30.0),
            Point2::new(319.5, 239.5),
            Point2::new(600.0, 420.0),
        ] {
            let raw = lens.distort_point(p);
            let back = lens.undistort_point(raw);
            assert_abs_diff_eq!(p.x, back.x, epsilon = 1e-3);
            assert_abs_diff_eq!(p.y, back.y, epsilon = 1e-3);
        }
    }

    #[test]
    fn zero_distortion_remap_is_identity() {
        let lens = LensModel::pinhole(500.0, [8, 6]);
        let mut frame = Frame::new(8, 6);
        for (x, y, px) in frame.enumerate_pixels_mut() {
            *px = Rgb([(x * 30) as u8, (y * 40) as u8, 7]);
        }
        assert_eq!(frame, lens.undistort_frame(&frame));
    }

    #[test]
    fn fits_only_its_own_resolution() {
        let lens = LensModel::pinhole(640.0, [640, 480]);
        assert!(lens.fits_frame(&Frame::new(640, 480)));
        assert!(!lens.fits_frame(&Frame::new(480, 640)));
        assert!(!lens.fits_frame(&Frame::new(320, 240)));
    }

    #[test]
    fn lens_model_serializes() {
        let lens = LensModel::pinhole(640.0, [640, 480]);
        let json = serde_json::to_string(&lens).expect("serialize");
        let back: LensModel = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(lens, back);
        assert_eq!(lens.camera_matrix()[(0, 2)], 319.5);
    }
}
