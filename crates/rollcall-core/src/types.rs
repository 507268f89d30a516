//! Shared pipeline types: points, rectangles, detections, embeddings, records.

use serde::{Deserialize, Serialize};

/// A 2D point in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }
}

/// A 3D landmark point: x,y in pixel space of the region the landmark model
/// ran on, z a unitless relative depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// An axis-aligned rectangle in pixel coordinates (left/top inclusive edges).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    /// Clamp all edges to `[0, width] x [0, height]`.
    pub fn clamped(&self, width: u32, height: u32) -> Rect {
        let w = width as f32;
        let h = height as f32;
        Rect::new(
            self.left.clamp(0.0, w),
            self.top.clamp(0.0, h),
            self.right.clamp(0.0, w),
            self.bottom.clamp(0.0, h),
        )
    }

    /// Shrink the rectangle by `fraction` of its width/height on each side.
    pub fn inset(&self, fraction: f32) -> Rect {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Rect::new(self.left + dx, self.top + dy, self.right - dx, self.bottom - dy)
    }
}

/// Indices into [`Detection::keypoints`]. The ordering is fixed by the
/// detector's regressor layout: keypoint `j` lives at regressor offsets
/// `4 + 2j` / `5 + 2j`.
pub mod keypoint {
    pub const LEFT_EYE: usize = 0;
    pub const RIGHT_EYE: usize = 1;
    pub const NOSE_TIP: usize = 2;
    pub const MOUTH_LEFT: usize = 3;
    pub const MOUTH_RIGHT: usize = 4;
    pub const TRAGION: usize = 5;

    /// Number of sparse keypoints the detector regresses.
    pub const COUNT: usize = 6;
}

/// A single face detection: bounding box plus 6 sparse keypoints, all in
/// pixel coordinates of the original frame. Coordinates may fall outside the
/// frame bounds; downstream cropping clamps.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bounds: Rect,
    /// Ordered per [`keypoint`]; always 6 entries from a correct detector.
    pub keypoints: Vec<Point>,
    pub score: f32,
}

/// A face embedding: fixed-length float vector, raw model output.
///
/// Embeddings produced by the same model version are directly comparable via
/// cosine similarity. No L2 normalization is applied here — whether the
/// embedding space expects unit vectors is a property of the concrete model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// An enrolled identity: metadata plus one embedding. Owned by the gallery
/// collaborator; the matcher only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub name: String,
    pub roll_no: String,
    pub embedding: Embedding,
}
