//! Dense 478-point facial landmark detector via ONNX Runtime.
//!
//! The model takes a 256×256 face region normalized to `[0, 1]` — unit range,
//! unlike the detector and embedder which take signed input; the asymmetry is
//! a per-model property and must be preserved. It always outputs 478 (x, y, z)
//! points with x, y in pixel space of the 256×256 input region.

use crate::frame::Frame;
use crate::tensor::to_unit_tensor;
use crate::types::{Point, Point3, Rect};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

/// Landmark model input edge length.
pub const LANDMARK_INPUT_SIZE: u32 = 256;
/// Number of dense landmarks the model always produces.
pub const LANDMARK_COUNT: usize = 478;

/// Semantic landmark indices used on the recognition and debug paths.
pub const NOSE_TIP: usize = 1;
pub const MOUTH_LEFT: usize = 61;
pub const MOUTH_RIGHT: usize = 291;
pub const RIGHT_IRIS: [usize; 4] = [469, 470, 471, 472];
pub const LEFT_IRIS: [usize; 4] = [474, 475, 476, 477];

/// Face-oval contour, ordered for polyline rendering. Visualization only.
pub const FACE_OVAL: [usize; 36] = [
    10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377, 152,
    148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
];

/// Upper lip contour. Visualization only.
pub const UPPER_LIP: [usize; 19] = [
    185, 40, 39, 37, 0, 267, 269, 270, 409, 415, 310, 311, 312, 13, 82, 81, 42, 183, 78,
];

/// Lower lip contour. Visualization only.
pub const LOWER_LIP: [usize; 21] = [
    61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 308, 324, 318, 402, 317, 14, 87, 178, 88,
    95,
];

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("expected {expected} landmark floats (478 x,y,z points), got {actual}")]
    InvalidPointCount { expected: usize, actual: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Exactly 478 dense 3D facial landmarks.
#[derive(Debug, Clone)]
pub struct LandmarkSet {
    points: Vec<Point3>,
}

impl LandmarkSet {
    /// Build from the model's flat `(x0, y0, z0, x1, y1, z1, ...)` output.
    pub fn from_flat(flat: &[f32]) -> Result<Self, LandmarkError> {
        if flat.len() != LANDMARK_COUNT * 3 {
            return Err(LandmarkError::InvalidPointCount {
                expected: LANDMARK_COUNT * 3,
                actual: flat.len(),
            });
        }
        let points = flat
            .chunks_exact(3)
            .map(|c| Point3 {
                x: c[0],
                y: c[1],
                z: c[2],
            })
            .collect();
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Point3 {
        self.points[index]
    }

    pub fn nose_tip(&self) -> Point {
        let p = self.points[NOSE_TIP];
        Point::new(p.x, p.y)
    }

    pub fn mouth_left(&self) -> Point {
        let p = self.points[MOUTH_LEFT];
        Point::new(p.x, p.y)
    }

    pub fn mouth_right(&self) -> Point {
        let p = self.points[MOUTH_RIGHT];
        Point::new(p.x, p.y)
    }

    pub fn left_iris_center(&self) -> Point {
        self.mean_of(&LEFT_IRIS)
    }

    pub fn right_iris_center(&self) -> Point {
        self.mean_of(&RIGHT_IRIS)
    }

    fn mean_of(&self, indices: &[usize]) -> Point {
        let n = indices.len() as f32;
        let (sx, sy) = indices.iter().fold((0.0, 0.0), |(sx, sy), &i| {
            (sx + self.points[i].x, sy + self.points[i].y)
        });
        Point::new(sx / n, sy / n)
    }

    /// Min/max x,y over all points, clamped to `[0, width] x [0, height]`.
    pub fn bounding_rect(&self, width: u32, height: u32) -> Rect {
        let mut rect = Rect::new(f32::MAX, f32::MAX, f32::MIN, f32::MIN);
        for p in &self.points {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        rect.clamped(width, height)
    }
}

/// Dense landmark detector. One loaded model instance per value.
pub struct FaceMeshLandmarker {
    session: Session,
}

impl FaceMeshLandmarker {
    /// Load the landmark ONNX model from the given path. Fatal on failure.
    pub fn load(model_path: &str) -> Result<Self, LandmarkError> {
        if !Path::new(model_path).exists() {
            return Err(LandmarkError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded landmark model"
        );

        Ok(Self { session })
    }

    /// Run the landmark model over a face region.
    ///
    /// The region must already be 256×256; coordinates come back in its pixel
    /// space. There is no "no landmarks" outcome — the model always returns
    /// 478 points, meaningful or not.
    pub fn detect(&mut self, region: &Frame) -> Result<LandmarkSet, LandmarkError> {
        debug_assert_eq!(region.width(), LANDMARK_INPUT_SIZE);
        debug_assert_eq!(region.height(), LANDMARK_INPUT_SIZE);

        let input = to_unit_tensor(region);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, flat) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| LandmarkError::InferenceFailed(format!("landmarks: {e}")))?;

        LandmarkSet::from_flat(flat)
    }
}
