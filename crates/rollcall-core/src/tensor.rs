//! Pixel buffer → float tensor conversion.
//!
//! Two normalization conventions exist across the three models and the
//! asymmetry is intentional: the detector and embedder take `[-1, 1]` input,
//! the landmark model takes `[0, 1]`. Both produce NHWC `[1, H, W, 3]`
//! tensors whose standard layout is the flat row-major R,G,B-interleaved
//! `f32[H*W*3]` array the models expect.

use crate::frame::Frame;
use ndarray::Array4;

/// Map each channel byte to `[0, 1]` via `v / 255`.
pub fn to_unit_tensor(frame: &Frame) -> Array4<f32> {
    fill(frame, |v| v / 255.0)
}

/// Map each channel byte to `[-1, 1]` via `(v / 255) * 2 - 1`.
pub fn to_signed_tensor(frame: &Frame) -> Array4<f32> {
    fill(frame, |v| (v / 255.0) * 2.0 - 1.0)
}

fn fill(frame: &Frame, f: impl Fn(f32) -> f32) -> Array4<f32> {
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, h, w, 3));
    for y in 0..h {
        for x in 0..w {
            let [r, g, b] = frame.pixel(x as u32, y as u32);
            tensor[[0, y, x, 0]] = f(r as f32);
            tensor[[0, y, x, 1]] = f(g as f32);
            tensor[[0, y, x, 2]] = f(b as f32);
        }
    }
    tensor
}
