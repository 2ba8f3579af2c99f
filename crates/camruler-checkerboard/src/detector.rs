use std::collections::HashMap;

use camruler_core::Corner;
use log::{debug, info};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::board::BoardSize;
use crate::gridgraph::{assign_grid_coordinates, connected_components, GridGraph};
use crate::params::CheckerboardParams;

/// A fully detected inner-corner grid.
#[derive(Clone, Debug)]
pub struct CheckerboardDetection {
    pub size: BoardSize,
    /// Corner positions, row-major (`j * cols + i`).
    pub corners: Vec<Point2<f32>>,
}

impl CheckerboardDetection {
    pub fn corner(&self, i: u32, j: u32) -> Option<Point2<f32>> {
        if i >= self.size.cols || j >= self.size.rows {
            return None;
        }
        self.corners
            .get((j * self.size.cols + i) as usize)
            .copied()
    }
}

/// Mean distance between horizontally and vertically adjacent grid points.
///
/// `points` are row-major over `size`. Returns `None` for grids without any
/// adjacent pair.
pub fn mean_adjacent_spacing(points: &[Point2<f64>], size: BoardSize) -> Option<f64> {
    if points.len() != size.corner_count() {
        return None;
    }
    let (cols, rows) = (size.cols as usize, size.rows as usize);
    let mut sum = 0.0;
    let mut count = 0usize;
    for j in 0..rows {
        for i in 0..cols {
            let p = points[j * cols + i];
            if i + 1 < cols {
                sum += (points[j * cols + i + 1] - p).norm();
                count += 1;
            }
            if j + 1 < rows {
                sum += (points[(j + 1) * cols + i] - p).norm();
                count += 1;
            }
        }
    }
    (count > 0).then(|| sum / count as f64)
}

/// Checkerboard detector working on a cloud of ChESS corners.
///
/// Algorithm:
/// 1. Filter corners by strength.
/// 2. Link each corner to at most four mutual neighbours (right/left/up/down)
///    using orientation and spacing checks.
/// 3. Take the largest connected component and BFS integer coordinates.
/// 4. Accept only a complete grid of the expected size (either orientation).
pub struct CheckerboardDetector {
    pub params: CheckerboardParams,
}

impl CheckerboardDetector {
    pub fn new(params: CheckerboardParams) -> Self {
        Self { params }
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, corners), fields(n = corners.len()))
    )]
    pub fn detect_from_corners(
        &self,
        corners: &[Corner],
        expected: BoardSize,
    ) -> Option<CheckerboardDetection> {
        let strong: Vec<Corner> = corners
            .iter()
            .filter(|c| c.strength >= self.params.min_corner_strength)
            .cloned()
            .collect();

        debug!(
            "{} of {} corners pass the strength filter",
            strong.len(),
            corners.len()
        );

        let needed = expected.corner_count();
        if needed == 0 || strong.len() < needed {
            info!(
                "not enough corners for a {}x{} grid ({} found)",
                expected.cols,
                expected.rows,
                strong.len()
            );
            return None;
        }

        let graph = GridGraph::new(&strong, &self.params.graph);
        let component = connected_components(&graph)
            .into_iter()
            .max_by_key(|c| c.len())?;
        if component.len() < needed {
            info!(
                "largest connected grid has {} corners, need {}",
                component.len(),
                needed
            );
            return None;
        }

        let coords = assign_grid_coordinates(&graph, &component);
        let min_i = coords.iter().map(|&(_, i, _)| i).min()?;
        let min_j = coords.iter().map(|&(_, _, j)| j).min()?;

        let mut by_coord: HashMap<(u32, u32), usize> = HashMap::with_capacity(coords.len());
        for &(node, i, j) in &coords {
            let key = ((i - min_i) as u32, (j - min_j) as u32);
            if by_coord.insert(key, node).is_some() {
                info!("grid coordinates are inconsistent at {:?}", key);
                return None;
            }
        }

        let found = BoardSize {
            cols: by_coord.keys().map(|&(i, _)| i).max()? + 1,
            rows: by_coord.keys().map(|&(_, j)| j).max()? + 1,
        };
        let transposed = if found == expected {
            false
        } else if found == expected.transposed() {
            true
        } else {
            info!(
                "found a {}x{} grid, expected {}x{}",
                found.cols, found.rows, expected.cols, expected.rows
            );
            return None;
        };
        if by_coord.len() != needed {
            info!("grid is incomplete: {} of {} corners", by_coord.len(), needed);
            return None;
        }

        let mut ordered = Vec::with_capacity(needed);
        for j in 0..expected.rows {
            for i in 0..expected.cols {
                let key = if transposed { (j, i) } else { (i, j) };
                let node = *by_coord.get(&key)?;
                ordered.push(strong[node].position);
            }
        }

        info!(
            "detected {}x{} checkerboard{}",
            expected.cols,
            expected.rows,
            if transposed { " (transposed)" } else { "" }
        );

        Some(CheckerboardDetection {
            size: expected,
            corners: ordered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn synthetic_grid(cols: u32, rows: u32, origin: (f32, f32), spacing: f32) -> Vec<Corner> {
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                };
                corners.push(Corner::new(
                    origin.0 + i as f32 * spacing,
                    origin.1 + j as f32 * spacing,
                    orientation,
                    1.0,
                ));
            }
        }
        corners
    }

    #[test]
    fn detects_complete_grid_in_row_major_order() {
        let mut corners = synthetic_grid(8, 5, (50.0, 40.0), 30.0);
        corners.reverse();
        corners.push(Corner::new(600.0, 450.0, 0.3, 1.0));

        let detector = CheckerboardDetector::new(CheckerboardParams::default());
        let det = detector
            .detect_from_corners(&corners, BoardSize { cols: 8, rows: 5 })
            .expect("detection");

        assert_eq!(40, det.corners.len());
        assert_eq!(Some(Point2::new(50.0, 40.0)), det.corner(0, 0));
        assert_eq!(Some(Point2::new(80.0, 40.0)), det.corner(1, 0));
        assert_eq!(Some(Point2::new(50.0, 70.0)), det.corner(0, 1));
        assert_eq!(Some(Point2::new(260.0, 160.0)), det.corner(7, 4));
        assert_eq!(None, det.corner(8, 0));
    }

    #[test]
    fn accepts_transposed_expectation() {
        let corners = synthetic_grid(8, 5, (50.0, 40.0), 30.0);
        let detector = CheckerboardDetector::new(CheckerboardParams::default());
        let det = detector
            .detect_from_corners(&corners, BoardSize { cols: 5, rows: 8 })
            .expect("detection");

        assert_eq!(BoardSize { cols: 5, rows: 8 }, det.size);
        assert_eq!(Point2::new(50.0, 40.0), det.corners[0]);
        assert_eq!(Point2::new(50.0, 70.0), det.corners[1]);
    }

    #[test]
    fn incomplete_grid_is_rejected() {
        let mut corners = synthetic_grid(8, 5, (50.0, 40.0), 30.0);
        corners.remove(12);
        let detector = CheckerboardDetector::new(CheckerboardParams::default());
        assert!(detector
            .detect_from_corners(&corners, BoardSize { cols: 8, rows: 5 })
            .is_none());
    }

    #[test]
    fn wrong_size_is_rejected() {
        let corners = synthetic_grid(6, 4, (50.0, 40.0), 30.0);
        let detector = CheckerboardDetector::new(CheckerboardParams::default());
        assert!(detector
            .detect_from_corners(&corners, BoardSize { cols: 8, rows: 5 })
            .is_none());
    }

    #[test]
    fn spacing_of_regular_grid() {
        let size = BoardSize { cols: 3, rows: 2 };
        let pts: Vec<Point2<f64>> = (0..2)
            .flat_map(|j| (0..3).map(move |i| Point2::new(i as f64 * 12.0, j as f64 * 12.0)))
            .collect();
        let spacing = mean_adjacent_spacing(&pts, size).expect("spacing");
        approx::assert_abs_diff_eq!(12.0, spacing, epsilon = 1e-12);
        assert!(mean_adjacent_spacing(&pts[..4], size).is_none());
    }
}
