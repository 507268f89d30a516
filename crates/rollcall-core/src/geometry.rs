//! Geometric image transforms: bilinear resize, clamped crop, rotation.
//!
//! All operations take and return [`Frame`]s. Rotation uses inverse mapping
//! with bilinear interpolation; pixels sampled outside the source are black.

use crate::frame::Frame;
use crate::types::Rect;

#[derive(Debug, Clone, thiserror::Error)]
pub enum GeometryError {
    #[error("need at least {expected} keypoints for alignment, got {actual}")]
    InsufficientKeypoints { expected: usize, actual: usize },
    #[error("degenerate crop region after clamping: {width}x{height} px")]
    InvalidCropRegion { width: i64, height: i64 },
}

/// Resize with bilinear interpolation.
pub fn resize_bilinear(frame: &Frame, out_width: u32, out_height: u32) -> Frame {
    let (src_w, src_h) = (frame.width() as usize, frame.height() as usize);
    let (out_w, out_h) = (out_width as usize, out_height as usize);
    let src = frame.data();

    let scale_x = src_w as f32 / out_w as f32;
    let scale_y = src_h as f32 / out_h as f32;

    let mut data = vec![0u8; out_w * out_h * 3];
    for y in 0..out_h {
        let src_y = (y as f32 + 0.5) * scale_y - 0.5;
        let y0 = (src_y.floor() as i32).clamp(0, src_h as i32 - 1) as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = (src_y - src_y.floor()).clamp(0.0, 1.0);

        for x in 0..out_w {
            let src_x = (x as f32 + 0.5) * scale_x - 0.5;
            let x0 = (src_x.floor() as i32).clamp(0, src_w as i32 - 1) as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = (src_x - src_x.floor()).clamp(0.0, 1.0);

            for c in 0..3 {
                let tl = src[(y0 * src_w + x0) * 3 + c] as f32;
                let tr = src[(y0 * src_w + x1) * 3 + c] as f32;
                let bl = src[(y1 * src_w + x0) * 3 + c] as f32;
                let br = src[(y1 * src_w + x1) * 3 + c] as f32;

                let val = tl * (1.0 - fx) * (1.0 - fy)
                    + tr * fx * (1.0 - fy)
                    + bl * (1.0 - fx) * fy
                    + br * fx * fy;

                data[(y * out_w + x) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Frame::new(data, out_width, out_height).expect("resize output buffer is sized to fit")
}

/// Crop `rect` out of the frame, clamping to frame bounds first and
/// truncating to whole pixels. Fails when the clamped region has
/// non-positive width or height.
pub fn crop(frame: &Frame, rect: Rect) -> Result<Frame, GeometryError> {
    let clamped = rect.clamped(frame.width(), frame.height());

    let left = clamped.left as i64;
    let top = clamped.top as i64;
    let width = clamped.width() as i64;
    let height = clamped.height() as i64;

    if width <= 0 || height <= 0 {
        return Err(GeometryError::InvalidCropRegion { width, height });
    }

    // Truncation keeps left + width <= frame width, but cap anyway.
    let width = width.min(frame.width() as i64 - left);
    let height = height.min(frame.height() as i64 - top);
    if width <= 0 || height <= 0 {
        return Err(GeometryError::InvalidCropRegion { width, height });
    }

    let src = frame.data();
    let src_w = frame.width() as usize;
    let (left, top, width, height) = (left as usize, top as usize, width as usize, height as usize);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in top..top + height {
        let row = (y * src_w + left) * 3;
        data.extend_from_slice(&src[row..row + width * 3]);
    }

    Ok(Frame::new(data, width as u32, height as u32)
        .expect("crop output buffer is sized to fit"))
}

/// Rotate the frame by `degrees` (positive per the `atan2` screen convention,
/// y down) about the image center. Output has the same dimensions; corners
/// rotated out of view are lost and uncovered pixels are black.
pub fn rotate_about_center(frame: &Frame, degrees: f32) -> Frame {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let src = frame.data();

    let theta = degrees.to_radians();
    let (sin, cos) = theta.sin_cos();
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;

    let sample = |x: i32, y: i32, c: usize| -> f32 {
        if x >= 0 && x < w as i32 && y >= 0 && y < h as i32 {
            src[(y as usize * w + x as usize) * 3 + c] as f32
        } else {
            0.0
        }
    };

    let mut data = vec![0u8; w * h * 3];
    for oy in 0..h {
        for ox in 0..w {
            // Inverse map: rotate the output coordinate by -theta.
            let dx = ox as f32 - cx;
            let dy = oy as f32 - cy;
            let sx = cos * dx + sin * dy + cx;
            let sy = -sin * dx + cos * dy + cy;

            let x0 = sx.floor() as i32;
            let y0 = sy.floor() as i32;
            let fx = sx - x0 as f32;
            let fy = sy - y0 as f32;

            for c in 0..3 {
                let val = sample(x0, y0, c) * (1.0 - fx) * (1.0 - fy)
                    + sample(x0 + 1, y0, c) * fx * (1.0 - fy)
                    + sample(x0, y0 + 1, c) * (1.0 - fx) * fy
                    + sample(x0 + 1, y0 + 1, c) * fx * fy;
                data[(oy * w + ox) * 3 + c] = val.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    Frame::new(data, frame.width(), frame.height()).expect("rotation preserves dimensions")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> Frame {
        let data: Vec<u8> = rgb
            .iter()
            .copied()
            .cycle()
            .take(w as usize * h as usize * 3)
            .collect();
        Frame::new(data, w, h).unwrap()
    }

    #[test]
    fn test_resize_dimensions() {
        let frame = solid(100, 60, [7, 8, 9]);
        let out = resize_bilinear(&frame, 128, 128);
        assert_eq!(out.width(), 128);
        assert_eq!(out.height(), 128);
    }

    #[test]
    fn test_resize_uniform_stays_uniform() {
        let frame = solid(50, 50, [128, 64, 32]);
        let out = resize_bilinear(&frame, 112, 112);
        for y in 0..112 {
            for x in 0..112 {
                assert_eq!(out.pixel(x, y), [128, 64, 32]);
            }
        }
    }

    #[test]
    fn test_crop_exact() {
        let mut data = vec![0u8; 10 * 10 * 3];
        // Mark pixel (3, 4)
        data[(4 * 10 + 3) * 3] = 255;
        let frame = Frame::new(data, 10, 10).unwrap();

        let out = crop(&frame, Rect::new(3.0, 4.0, 8.0, 9.0)).unwrap();
        assert_eq!(out.width(), 5);
        assert_eq!(out.height(), 5);
        assert_eq!(out.pixel(0, 0), [255, 0, 0]);
    }

    #[test]
    fn test_crop_clamps_out_of_bounds() {
        let frame = solid(10, 10, [1, 2, 3]);
        let out = crop(&frame, Rect::new(-20.0, -20.0, 5.0, 5.0)).unwrap();
        assert_eq!(out.width(), 5);
        assert_eq!(out.height(), 5);
    }

    #[test]
    fn test_crop_degenerate() {
        let frame = solid(10, 10, [1, 2, 3]);
        // Entirely outside the frame — clamps to zero area
        let result = crop(&frame, Rect::new(20.0, 20.0, 30.0, 30.0));
        assert!(matches!(
            result,
            Err(GeometryError::InvalidCropRegion { .. })
        ));
    }

    #[test]
    fn test_crop_subpixel_region() {
        let frame = solid(10, 10, [1, 2, 3]);
        // Width under one pixel truncates to zero
        let result = crop(&frame, Rect::new(2.0, 2.0, 2.4, 8.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_rotate_zero_is_identity() {
        let mut data = vec![0u8; 5 * 5 * 3];
        data[(1 * 5 + 3) * 3 + 1] = 200;
        let frame = Frame::new(data, 5, 5).unwrap();
        let out = rotate_about_center(&frame, 0.0);
        assert_eq!(out.data(), frame.data());
    }

    #[test]
    fn test_rotate_180() {
        // 3x3: bright pixel top-left maps to bottom-right
        let mut data = vec![0u8; 3 * 3 * 3];
        data[0] = 255;
        let frame = Frame::new(data, 3, 3).unwrap();

        let out = rotate_about_center(&frame, 180.0);
        assert_eq!(out.pixel(2, 2)[0], 255);
        assert_eq!(out.pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_rotate_90() {
        // With y down and the inverse-map convention here, out(x, y) samples
        // src(y, 2 - x) on a 3x3 grid for a +90 degree rotation.
        let mut data = vec![0u8; 3 * 3 * 3];
        data[(1 * 3 + 2) * 3] = 255; // src(2, 1)
        let frame = Frame::new(data, 3, 3).unwrap();

        let out = rotate_about_center(&frame, 90.0);
        assert_eq!(out.pixel(1, 2)[0], 255);
    }

    #[test]
    fn test_rotate_center_invariant() {
        let mut data = vec![0u8; 5 * 5 * 3];
        data[(2 * 5 + 2) * 3 + 2] = 180; // exact center
        let frame = Frame::new(data, 5, 5).unwrap();

        for degrees in [30.0, 90.0, 145.0, 270.0] {
            let out = rotate_about_center(&frame, degrees);
            assert_eq!(out.pixel(2, 2)[2], 180, "center moved at {degrees} deg");
        }
    }
}
