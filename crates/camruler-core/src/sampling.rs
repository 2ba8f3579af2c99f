use crate::Frame;

#[inline]
fn get_rgb(src: &Frame, x: i32, y: i32) -> [f32; 3] {
    if x < 0 || y < 0 || x >= src.width() as i32 || y >= src.height() as i32 {
        return [0.0; 3];
    }
    let p = src.get_pixel(x as u32, y as u32).0;
    [p[0] as f32, p[1] as f32, p[2] as f32]
}

/// Bilinear RGB sample at a sub-pixel location; outside pixels read as black.
#[inline]
pub fn sample_bilinear_rgb(src: &Frame, x: f32, y: f32) -> [f32; 3] {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_rgb(src, x0, y0);
    let p10 = get_rgb(src, x0 + 1, y0);
    let p01 = get_rgb(src, x0, y0 + 1);
    let p11 = get_rgb(src, x0 + 1, y0 + 1);

    let mut out = [0.0f32; 3];
    for c in 0..3 {
        let a = p00[c] + fx * (p10[c] - p00[c]);
        let b = p01[c] + fx * (p11[c] - p01[c]);
        out[c] = a + fy * (b - a);
    }
    out
}

#[inline]
pub fn sample_bilinear_rgb_u8(src: &Frame, x: f32, y: f32) -> [u8; 3] {
    sample_bilinear_rgb(src, x, y).map(|v| v.round().clamp(0.0, 255.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn interpolates_between_neighbours() {
        let mut img = Frame::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([200, 100, 50]));

        let mid = sample_bilinear_rgb(&img, 0.5, 0.0);
        approx::assert_abs_diff_eq!(100.0, mid[0], epsilon = 1e-4);
        approx::assert_abs_diff_eq!(50.0, mid[1], epsilon = 1e-4);
        approx::assert_abs_diff_eq!(25.0, mid[2], epsilon = 1e-4);
    }

    #[test]
    fn outside_reads_black() {
        let img = Frame::from_pixel(4, 4, Rgb([255, 255, 255]));
        assert_eq!([0, 0, 0], sample_bilinear_rgb_u8(&img, -5.0, -5.0));
        assert_eq!([255, 255, 255], sample_bilinear_rgb_u8(&img, 1.0, 2.0));
    }
}
