use camruler_core::{to_gray, BoundingBox, Frame, PixelPoint};
use imageproc::contours::{find_contours, BorderType};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use log::debug;
use serde::{Deserialize, Serialize};

/// Ordered boundary points of one connected region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<PixelPoint>,
}

impl Contour {
    pub fn new(points: Vec<PixelPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed polygon area (shoelace formula), in square pixels.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: i64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64
            })
            .sum();
        twice.abs() as f64 * 0.5
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points.iter().copied())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Gaussian kernel size; the blur sigma is derived from it.
    pub blur_kernel: u32,
    pub canny_low: f32,
    pub canny_high: f32,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            blur_kernel: 7,
            canny_low: 50.0,
            canny_high: 100.0,
        }
    }
}

impl ContourParams {
    /// Sigma matching a `k x k` Gaussian kernel: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
    pub fn blur_sigma(&self) -> f32 {
        let k = self.blur_kernel.max(1) as f32;
        (0.3 * ((k - 1.0) * 0.5 - 1.0) + 0.8).max(0.1)
    }
}

/// Extracts external object outlines from a frame.
///
/// Grayscale, Gaussian blur, Canny edges, then outer borders only with runs of
/// collinear points collapsed to their end points.
#[derive(Clone, Debug, Default)]
pub struct ContourDetector {
    pub params: ContourParams,
}

impl ContourDetector {
    pub fn new(params: ContourParams) -> Self {
        Self { params }
    }

    /// Edge map of the frame (255 on edges, 0 elsewhere).
    pub fn edges(&self, frame: &Frame) -> image::GrayImage {
        let gray = to_gray(frame);
        let blurred = gaussian_blur_f32(&gray, self.params.blur_sigma());
        canny(&blurred, self.params.canny_low, self.params.canny_high)
    }

    /// Contours of the current frame. Nothing is kept between frames.
    pub fn find_contours(&self, frame: &Frame) -> impl Iterator<Item = Contour> {
        let edges = self.edges(frame);
        let raw = find_contours::<i32>(&edges);
        debug!("{} raw borders in edge map", raw.len());

        raw.into_iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .map(|c| {
                let points: Vec<PixelPoint> =
                    c.points.iter().map(|p| PixelPoint::new(p.x, p.y)).collect();
                Contour::new(compress_collinear(&points))
            })
    }
}

/// Drop points lying in the middle of a straight run of equal steps.
fn compress_collinear(points: &[PixelPoint]) -> Vec<PixelPoint> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let step = |a: PixelPoint, b: PixelPoint| ((b.x - a.x).signum(), (b.y - a.y).signum());
    (0..n)
        .filter(|&i| {
            let prev = points[(i + n - 1) % n];
            let next = points[(i + 1) % n];
            step(prev, points[i]) != step(points[i], next)
        })
        .map(|i| points[i])
        .collect()
}
