//! BlazeFace-style face detector via ONNX Runtime.
//!
//! The model scores 896 fixed anchors over a 128×128 input and regresses a
//! 16-float row per anchor: a bounding box plus 6 sparse keypoints, all as
//! normalized fractions of the original frame dimensions. Only the single
//! best anchor above the confidence threshold is kept — no NMS.

use crate::frame::Frame;
use crate::geometry::resize_bilinear;
use crate::tensor::to_signed_tensor;
use crate::types::{keypoint, Detection, Point, Rect};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const BLAZEFACE_INPUT_SIZE: u32 = 128;
const BLAZEFACE_NUM_ANCHORS: usize = 896;
const BLAZEFACE_REGRESSOR_LEN: usize = 16;
const BLAZEFACE_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Anchor-based face detector. Holds its own loaded model instance; calls
/// take `&mut self`, so a shared instance is serialized by the borrow checker.
pub struct BlazeFaceDetector {
    session: Session,
}

impl BlazeFaceDetector {
    /// Load the detector ONNX model from the given path. Fatal on failure —
    /// the pipeline cannot run without it.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let num_outputs = session.outputs().len();
        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded face detector model"
        );

        if num_outputs < 2 {
            return Err(DetectorError::InferenceFailed(format!(
                "detector model requires 2 outputs (regressors, scores), got {num_outputs}"
            )));
        }

        Ok(Self { session })
    }

    /// Detect the single best-scoring face in a frame.
    ///
    /// Returns `Ok(None)` when no anchor clears the confidence threshold —
    /// absence of a face is an outcome, not an error.
    pub fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, DetectorError> {
        let resized = resize_bilinear(frame, BLAZEFACE_INPUT_SIZE, BLAZEFACE_INPUT_SIZE);
        let input = to_signed_tensor(&resized);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, regressors) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("regressors: {e}")))?;
        let (_, scores) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;

        if regressors.len() != scores.len() * BLAZEFACE_REGRESSOR_LEN {
            return Err(DetectorError::InferenceFailed(format!(
                "regressor/score shape mismatch: {} regressor floats for {} anchors",
                regressors.len(),
                scores.len()
            )));
        }
        if scores.len() != BLAZEFACE_NUM_ANCHORS {
            tracing::debug!(anchors = scores.len(), "non-standard anchor count");
        }

        let detection = decode_best(
            regressors,
            scores,
            frame.width() as f32,
            frame.height() as f32,
            BLAZEFACE_SCORE_THRESHOLD,
        );

        match &detection {
            Some(d) => tracing::debug!(score = d.score, bounds = ?d.bounds, "face detected"),
            None => tracing::debug!("no anchor above threshold"),
        }

        Ok(detection)
    }
}

/// Decode the single best anchor above `threshold` (strictly greater).
///
/// Each regressor row holds `[ymin, xmin, ymax, xmax]` followed by six (x, y)
/// keypoint pairs, all normalized `[0, 1]` fractions of the ORIGINAL frame —
/// not of the 128×128 detector input. Decoded coordinates may fall outside
/// the frame; downstream cropping clamps.
pub fn decode_best(
    regressors: &[f32],
    scores: &[f32],
    frame_width: f32,
    frame_height: f32,
    threshold: f32,
) -> Option<Detection> {
    let mut best_index = None;
    let mut best_score = threshold;

    for (i, &score) in scores.iter().enumerate() {
        if score > best_score {
            best_score = score;
            best_index = Some(i);
        }
    }

    let index = best_index?;
    let row = &regressors[index * BLAZEFACE_REGRESSOR_LEN..(index + 1) * BLAZEFACE_REGRESSOR_LEN];

    let bounds = Rect::new(
        row[1] * frame_width,  // xmin
        row[0] * frame_height, // ymin
        row[3] * frame_width,  // xmax
        row[2] * frame_height, // ymax
    );

    let mut keypoints = Vec::with_capacity(keypoint::COUNT);
    for j in 0..keypoint::COUNT {
        keypoints.push(Point::new(
            row[4 + 2 * j] * frame_width,
            row[5 + 2 * j] * frame_height,
        ));
    }

    Some(Detection {
        bounds,
        keypoints,
        score: best_score,
    })
}
