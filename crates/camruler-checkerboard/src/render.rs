use camruler_core::Frame;
use image::Rgb;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Render a virtual checkerboard covering the top-left of a black frame.
///
/// The cell size is `min(width, height) / max(squares)` pixels and cell
/// `(i, j)` is white when `i + j` is even.
pub fn render_checkerboard(width: u32, height: u32, squares: [u32; 2]) -> Frame {
    let mut frame = Frame::from_pixel(width, height, Rgb([0, 0, 0]));
    let longest = squares[0].max(squares[1]).max(1);
    let cell = width.min(height) / longest;
    draw_checkerboard(&mut frame, (0, 0), cell, squares);
    frame
}

/// Draw the white cells of a checkerboard into `frame`, starting at `origin`.
pub fn draw_checkerboard(frame: &mut Frame, origin: (i32, i32), cell_px: u32, squares: [u32; 2]) {
    if cell_px == 0 {
        return;
    }
    let white = Rgb([255, 255, 255]);
    for j in 0..squares[1] {
        for i in 0..squares[0] {
            if (i + j) % 2 != 0 {
                continue;
            }
            let x = origin.0 + (i * cell_px) as i32;
            let y = origin.1 + (j * cell_px) as i32;
            draw_filled_rect_mut(frame, Rect::at(x, y).of_size(cell_px, cell_px), white);
        }
    }
}
