//! Frame annotation: crosshairs, boxes, markers and text.
//!
//! Every drawing call mutates the frame in place. Text needs a TrueType font;
//! without one the geometry is still drawn and labels are skipped.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::Rgb;
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{BoundingBox, Frame, PixelPoint};

/// Named overlay colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Green,
    Blue,
    Yellow,
    Gray,
    White,
}

impl Color {
    pub fn rgb(self) -> Rgb<u8> {
        match self {
            Color::Red => Rgb([255, 0, 0]),
            Color::Green => Rgb([0, 255, 0]),
            Color::Blue => Rgb([0, 0, 255]),
            Color::Yellow => Rgb([255, 255, 0]),
            Color::Gray => Rgb([200, 200, 200]),
            Color::White => Rgb([255, 255, 255]),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TrueType font {path}")]
    Invalid { path: PathBuf },
}

/// Overlay style settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayParams {
    /// TrueType font used for labels. No font means no text.
    pub font_path: Option<PathBuf>,
    /// Label height in pixels.
    pub text_scale: f32,
    /// Half-length of the diagonal "X" marker arms.
    pub marker_half_size: i32,
    /// Crosshair color while following the pointer.
    pub follow_color: Color,
    /// Crosshair color for fixed (confirmed) points.
    pub fixed_color: Color,
    /// Bounding box color for measured objects.
    pub box_color: Color,
    /// Dimension label color.
    pub label_color: Color,
    /// Bounding box line thickness in pixels.
    pub box_thickness: u32,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            font_path: None,
            text_scale: 18.0,
            marker_half_size: 50,
            follow_color: Color::Green,
            fixed_color: Color::Blue,
            box_color: Color::Green,
            label_color: Color::Blue,
            box_thickness: 2,
        }
    }
}

pub struct OverlayRenderer {
    params: OverlayParams,
    font: Option<FontVec>,
}

impl OverlayRenderer {
    /// Build a renderer, loading the configured font if any.
    pub fn new(params: OverlayParams) -> Result<Self, FontError> {
        let font = match params.font_path.as_deref() {
            Some(path) => Some(load_font(path)?),
            None => None,
        };
        Ok(Self { params, font })
    }

    /// Renderer that draws geometry only.
    pub fn without_text(params: OverlayParams) -> Self {
        Self { params, font: None }
    }

    pub fn params(&self) -> &OverlayParams {
        &self.params
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Full-frame crosshair plus diagonal marker following the pointer, with
    /// the pixel coordinates printed next to it.
    pub fn dynamic_crosshair(&self, frame: &mut Frame, cursor: PixelPoint) {
        self.crosshair(frame, cursor, self.params.follow_color);
        let label = format!("({}, {})", cursor.x, cursor.y);
        self.add_text(frame, &label, cursor.x + 10, cursor.y - 10, Color::White);
    }

    /// Same visual style as [`Self::dynamic_crosshair`] at a fixed point.
    pub fn fixed_crosshairs(&self, frame: &mut Frame, x: i32, y: i32) {
        self.crosshair(frame, PixelPoint::new(x, y), self.params.fixed_color);
    }

    /// Crosshair through the frame center, no marker.
    pub fn center_crosshairs(&self, frame: &mut Frame, color: Color) {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        let (cx, cy) = ((frame.width() / 2) as f32, (frame.height() / 2) as f32);
        let c = color.rgb();
        draw_line_segment_mut(frame, (cx, 0.0), (cx, h), c);
        draw_line_segment_mut(frame, (0.0, cy), (w, cy), c);
    }

    fn crosshair(&self, frame: &mut Frame, at: PixelPoint, color: Color) {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        let (x, y) = (at.x as f32, at.y as f32);
        let d = self.params.marker_half_size as f32;
        let c = color.rgb();

        draw_line_segment_mut(frame, (x, 0.0), (x, h), c);
        draw_line_segment_mut(frame, (0.0, y), (w, y), c);
        draw_line_segment_mut(frame, (x - d, y - d), (x + d, y + d), c);
        draw_line_segment_mut(frame, (x - d, y + d), (x + d, y - d), c);
    }

    /// Hollow rectangle; thickness grows inwards.
    pub fn draw_box(&self, frame: &mut Frame, bbox: &BoundingBox, color: Color, thickness: u32) {
        let c = color.rgb();
        for t in 0..thickness.max(1) {
            let w = bbox.width.saturating_sub(2 * t);
            let h = bbox.height.saturating_sub(2 * t);
            if w == 0 || h == 0 {
                break;
            }
            let rect = Rect::at(bbox.x + t as i32, bbox.y + t as i32).of_size(w, h);
            draw_hollow_rect_mut(frame, rect, c);
        }
    }

    pub fn draw_point(&self, frame: &mut Frame, p: PixelPoint, radius: i32, color: Color) {
        draw_filled_circle_mut(frame, (p.x, p.y), radius, color.rgb());
    }

    pub fn draw_segment(
        &self,
        frame: &mut Frame,
        a: PixelPoint,
        b: PixelPoint,
        color: Color,
        thickness: u32,
    ) {
        let c = color.rgb();
        let horizontal = (b.x - a.x).abs() >= (b.y - a.y).abs();
        let half = (thickness.max(1) as i32 - 1) / 2;
        for off in -half..=(thickness.max(1) as i32 - 1 - half) {
            let (dx, dy) = if horizontal { (0, off) } else { (off, 0) };
            draw_line_segment_mut(
                frame,
                ((a.x + dx) as f32, (a.y + dy) as f32),
                ((b.x + dx) as f32, (b.y + dy) as f32),
                c,
            );
        }
    }

    /// Draw a single text line with its top-left at `(x, y)`.
    pub fn add_text(&self, frame: &mut Frame, text: &str, x: i32, y: i32, color: Color) {
        let Some(font) = self.font.as_ref() else {
            debug!("no overlay font configured, skipping label {text:?}");
            return;
        };
        let scale = PxScale::from(self.params.text_scale);
        draw_text_mut(frame, color.rgb(), x, y, scale, font, text);
    }

    /// Multi-line status text stacked from the top-left corner.
    pub fn add_text_top_left(&self, frame: &mut Frame, text: &str) {
        let line_height = (self.params.text_scale * 1.6).round() as i32;
        for (k, line) in text.lines().enumerate() {
            let y = 10 + k as i32 * line_height;
            self.add_text(frame, line, 10, y, Color::Blue);
        }
    }
}

fn load_font(path: &Path) -> Result<FontVec, FontError> {
    let bytes = std::fs::read(path).map_err(|source| FontError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(bytes).map_err(|_| FontError::Invalid {
        path: path.to_path_buf(),
    })
}
