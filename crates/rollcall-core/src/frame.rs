//! Frame type — an immutable RGB pixel buffer.

use image::RgbImage;

/// An RGB frame: interleaved R,G,B bytes, row-major, `width * height * 3`.
///
/// Frames are immutable once constructed; every pipeline stage that changes
/// geometry produces a new frame.
#[derive(Debug, Clone)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Wrap an interleaved RGB buffer. Zero-sized dimensions and length
    /// mismatches are rejected.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, FrameError> {
        if width == 0 || height == 0 {
            return Err(FrameError::ZeroSized { width, height });
        }
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Interleaved RGB bytes, row-major.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// RGB channels of the pixel at (x, y). Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        debug_assert!(x < self.width && y < self.height);
        let off = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[off], self.data[off + 1], self.data[off + 2]]
    }

    pub fn from_image(img: &RgbImage) -> Result<Self, FrameError> {
        Self::new(img.as_raw().clone(), img.width(), img.height())
    }

    pub fn to_image(&self) -> RgbImage {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .expect("frame buffer length is validated at construction")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("zero-sized frame: {width}x{height}")]
    ZeroSized { width: u32, height: u32 },
    #[error("invalid RGB buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid() {
        let frame = Frame::new(vec![0u8; 2 * 3 * 3], 2, 3).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 3);
    }

    #[test]
    fn test_new_zero_sized() {
        assert!(matches!(
            Frame::new(vec![], 0, 4),
            Err(FrameError::ZeroSized { .. })
        ));
        assert!(matches!(
            Frame::new(vec![], 4, 0),
            Err(FrameError::ZeroSized { .. })
        ));
    }

    #[test]
    fn test_new_length_mismatch() {
        let result = Frame::new(vec![0u8; 10], 2, 2);
        assert!(matches!(result, Err(FrameError::InvalidLength { .. })));
    }

    #[test]
    fn test_pixel_access() {
        // 2x1 frame: red pixel then blue pixel
        let frame = Frame::new(vec![255, 0, 0, 0, 0, 255], 2, 1).unwrap();
        assert_eq!(frame.pixel(0, 0), [255, 0, 0]);
        assert_eq!(frame.pixel(1, 0), [0, 0, 255]);
    }

    #[test]
    fn test_image_roundtrip() {
        let frame = Frame::new(vec![10, 20, 30, 40, 50, 60], 2, 1).unwrap();
        let img = frame.to_image();
        let back = Frame::from_image(&img).unwrap();
        assert_eq!(back.data(), frame.data());
    }
}
