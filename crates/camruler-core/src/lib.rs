//! Core types and utilities shared by the `camruler-*` crates.
//!
//! This crate holds the frame and geometry vocabulary (frames, corners,
//! bounding boxes, homographies), bilinear sampling, the overlay renderer used
//! to annotate frames, and the minimal logger. It does *not* depend on any
//! concrete corner detector or calibration algorithm.

mod corner;
mod frame;
mod homography;
mod logger;
mod overlay;
mod sampling;

pub use corner::Corner;
pub use frame::{to_gray, BoundingBox, Frame, PixelPoint};
pub use homography::{estimate_homography, Homography};
pub use overlay::{Color, FontError, OverlayParams, OverlayRenderer};
pub use sampling::{sample_bilinear_rgb, sample_bilinear_rgb_u8};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
