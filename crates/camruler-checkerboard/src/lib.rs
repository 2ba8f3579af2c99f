//! Checkerboard inner-corner detection built on top of `camruler-core`.
//!
//! ## Quickstart
//!
//! ```
//! use camruler_checkerboard::{CheckerboardDetector, CheckerboardParams, CheckerboardSpec};
//! use camruler_core::Corner;
//!
//! let spec = CheckerboardSpec::new([9, 6], 1.0).unwrap();
//! let detector = CheckerboardDetector::new(CheckerboardParams::default());
//!
//! let corners: Vec<Corner> = Vec::new();
//! let result = detector.detect_from_corners(&corners, spec.inner_corners());
//! assert!(result.is_none());
//! ```
//!
//! The crate does not run a corner detector itself; feed it ChESS corners
//! adapted into [`camruler_core::Corner`].

mod board;
mod detector;
mod geom;
mod gridgraph;
mod params;
mod render;

pub use board::{BoardError, BoardSize, CheckerboardSpec};
pub use detector::{mean_adjacent_spacing, CheckerboardDetection, CheckerboardDetector};
pub use gridgraph::{
    assign_grid_coordinates, connected_components, GridGraph, NeighborDirection, NodeNeighbor,
};
pub use params::{CheckerboardParams, GridGraphParams};
pub use render::{draw_checkerboard, render_checkerboard};
