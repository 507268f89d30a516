//! The recognition pipeline: detect → normalize → (landmarks) → embed.
//!
//! [`RecognitionPipeline`] owns its three model instances as private fields —
//! there is no ambient model state — and exposes a single synchronous
//! `recognize(frame)` entry point. Per-frame recoverable failures (no face,
//! degenerate geometry) come back as [`RecognizeOutcome`] variants, never as
//! errors; `Err` is reserved for inference faults and invariant violations.

use crate::detector::{BlazeFaceDetector, DetectorError};
use crate::embedder::{EmbedderError, MobileFaceNetEmbedder, EMBEDDER_INPUT_SIZE};
use crate::frame::Frame;
use crate::geometry::{resize_bilinear, GeometryError};
use crate::landmarks::{FaceMeshLandmarker, LandmarkError, LandmarkSet, LANDMARK_INPUT_SIZE};
use crate::normalizer::{
    KeypointRatioAligner, LandmarkBoundingBoxCropper, DEFAULT_BBOX_INSET, DEFAULT_FACE_RATIO,
};
use crate::overlay::render_landmarks;
use crate::types::{Detection, Embedding};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// File names of the three model assets inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "face_detector.onnx";
pub const LANDMARK_MODEL_FILE: &str = "face_landmarks.onnx";
pub const EMBEDDER_MODEL_FILE: &str = "face_embedder.onnx";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("detector: {0}")]
    Detector(#[from] DetectorError),
    #[error("landmarks: {0}")]
    Landmarks(#[from] LandmarkError),
    #[error("embedder: {0}")]
    Embedder(#[from] EmbedderError),
    /// Geometry failure that indicates a broken upstream contract rather
    /// than an unlucky frame (e.g. a detector returning <5 keypoints).
    #[error("geometry invariant violated: {0}")]
    Geometry(GeometryError),
}

/// Which normalization path feeds the embedder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlignStrategy {
    /// Strategy A alone: keypoint-ratio crop with eye-angle rotation.
    #[default]
    KeypointRatio,
    /// Strategy B alone: dense landmarks over the whole frame, tight crop.
    LandmarkBox,
    /// A then B: rotation-corrected region, then landmark-tightened crop.
    KeypointThenLandmark,
}

/// Pipeline tuning knobs. The geometric constants are defaults inherited
/// from the reference preprocessing, not verified ground truth — validate
/// them against the concrete embedding model before changing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: AlignStrategy,
    pub face_ratio: f32,
    pub bbox_inset: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: AlignStrategy::default(),
            face_ratio: DEFAULT_FACE_RATIO,
            bbox_inset: DEFAULT_BBOX_INSET,
        }
    }
}

/// Outcome of one recognition attempt over one frame.
#[derive(Debug, Clone)]
pub enum RecognizeOutcome {
    /// A face was found, normalized, and embedded.
    Embedded(Embedding),
    /// No anchor cleared the detection threshold. Retry with a new frame.
    NoFace,
    /// The face was detected but its geometry degenerated under cropping.
    /// No embedding for this frame; the reason is carried for inspection.
    GeometryRejected(GeometryError),
}

/// Face detection seam. Implemented by [`BlazeFaceDetector`]; tests
/// substitute synthetic-tensor stubs.
pub trait FaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, DetectorError>;
}

impl FaceDetector for BlazeFaceDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, DetectorError> {
        BlazeFaceDetector::detect(self, frame)
    }
}

/// Dense landmark seam.
pub trait LandmarkDetector {
    fn detect(&mut self, region: &Frame) -> Result<LandmarkSet, LandmarkError>;
}

impl LandmarkDetector for FaceMeshLandmarker {
    fn detect(&mut self, region: &Frame) -> Result<LandmarkSet, LandmarkError> {
        FaceMeshLandmarker::detect(self, region)
    }
}

/// Embedding seam.
pub trait FaceEmbedder {
    fn embed(&mut self, face: &Frame) -> Result<Embedding, EmbedderError>;
}

impl FaceEmbedder for MobileFaceNetEmbedder {
    fn embed(&mut self, face: &Frame) -> Result<Embedding, EmbedderError> {
        MobileFaceNetEmbedder::embed(self, face)
    }
}

/// The full pipeline over three owned model instances.
pub struct RecognitionPipeline<D, L, E> {
    detector: D,
    landmarker: L,
    embedder: E,
    aligner: KeypointRatioAligner,
    cropper: LandmarkBoundingBoxCropper,
    strategy: AlignStrategy,
}

impl RecognitionPipeline<BlazeFaceDetector, FaceMeshLandmarker, MobileFaceNetEmbedder> {
    /// Load all three ONNX models from `model_dir`. Any load failure aborts
    /// initialization — the pipeline is unusable without its models.
    pub fn load(model_dir: &Path, config: PipelineConfig) -> Result<Self, PipelineError> {
        let path = |file: &str| model_dir.join(file).to_string_lossy().into_owned();

        let detector = BlazeFaceDetector::load(&path(DETECTOR_MODEL_FILE))?;
        let landmarker = FaceMeshLandmarker::load(&path(LANDMARK_MODEL_FILE))?;
        let embedder = MobileFaceNetEmbedder::load(&path(EMBEDDER_MODEL_FILE))?;

        tracing::info!(dir = %model_dir.display(), strategy = ?config.strategy, "pipeline ready");
        Ok(Self::with_models(detector, landmarker, embedder, config))
    }
}

impl<D: FaceDetector, L: LandmarkDetector, E: FaceEmbedder> RecognitionPipeline<D, L, E> {
    /// Assemble a pipeline from already-constructed model adapters.
    pub fn with_models(detector: D, landmarker: L, embedder: E, config: PipelineConfig) -> Self {
        Self {
            detector,
            landmarker,
            embedder,
            aligner: KeypointRatioAligner {
                face_ratio: config.face_ratio,
                bbox_inset: config.bbox_inset,
            },
            cropper: LandmarkBoundingBoxCropper,
            strategy: config.strategy,
        }
    }

    /// Run one recognition attempt over one frame.
    pub fn recognize(&mut self, frame: &Frame) -> Result<RecognizeOutcome, PipelineError> {
        let Some(detection) = self.detector.detect(frame)? else {
            return Ok(RecognizeOutcome::NoFace);
        };

        let face = match self.strategy {
            AlignStrategy::KeypointRatio => {
                let region = match self.aligner.align(frame, &detection) {
                    Ok(region) => region,
                    Err(e) => return geometry_outcome(e),
                };
                resize_bilinear(&region, EMBEDDER_INPUT_SIZE, EMBEDDER_INPUT_SIZE)
            }
            AlignStrategy::LandmarkBox => {
                let region = resize_bilinear(frame, LANDMARK_INPUT_SIZE, LANDMARK_INPUT_SIZE);
                let landmarks = self.landmarker.detect(&region)?;
                match self.cropper.crop(&region, &landmarks) {
                    Ok(face) => face,
                    Err(e) => return geometry_outcome(e),
                }
            }
            AlignStrategy::KeypointThenLandmark => {
                let region = match self.aligner.align(frame, &detection) {
                    Ok(region) => region,
                    Err(e) => return geometry_outcome(e),
                };
                let landmarks = self.landmarker.detect(&region)?;
                match self.cropper.crop(&region, &landmarks) {
                    Ok(face) => face,
                    Err(e) => return geometry_outcome(e),
                }
            }
        };

        let embedding = self.embedder.embed(&face)?;
        Ok(RecognizeOutcome::Embedded(embedding))
    }

    /// Debug sink support: detect, align, landmark, and render the landmark
    /// overlay. Returns `Ok(None)` when the frame yields no usable face.
    /// Not on the recognition path.
    pub fn landmark_overlay(&mut self, frame: &Frame) -> Result<Option<Frame>, PipelineError> {
        let Some(detection) = self.detector.detect(frame)? else {
            return Ok(None);
        };

        let region = match self.aligner.align(frame, &detection) {
            Ok(region) => region,
            Err(e @ GeometryError::InsufficientKeypoints { .. }) => {
                return Err(PipelineError::Geometry(e))
            }
            Err(e) => {
                tracing::debug!(error = %e, "overlay: geometry rejected");
                return Ok(None);
            }
        };

        let landmarks = self.landmarker.detect(&region)?;
        Ok(Some(render_landmarks(&region, &landmarks)))
    }
}

/// Route a geometry failure: degenerate crops are per-frame outcomes, a
/// keypoint shortfall is a detector contract violation and escalates.
fn geometry_outcome(e: GeometryError) -> Result<RecognizeOutcome, PipelineError> {
    match e {
        GeometryError::InsufficientKeypoints { .. } => Err(PipelineError::Geometry(e)),
        GeometryError::InvalidCropRegion { .. } => {
            tracing::debug!(error = %e, "geometry rejected; no embedding for this frame");
            Ok(RecognizeOutcome::GeometryRejected(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::decode_best;
    use crate::landmarks::LANDMARK_COUNT;
    use crate::matcher::{CosineMatcher, Matcher};
    use crate::types::{Point, Rect, StudentRecord};

    /// Detector stub that runs the real anchor decode over synthetic tensors.
    struct TensorDetector {
        regressors: Vec<f32>,
        scores: Vec<f32>,
    }

    impl FaceDetector for TensorDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Option<Detection>, DetectorError> {
            Ok(decode_best(
                &self.regressors,
                &self.scores,
                frame.width() as f32,
                frame.height() as f32,
                0.5,
            ))
        }
    }

    /// Detector stub that returns a canned detection verbatim.
    struct FixedDetector(Option<Detection>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Option<Detection>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    /// Landmarker stub: a synthetic grid spread over the region interior.
    struct GridLandmarker;

    impl LandmarkDetector for GridLandmarker {
        fn detect(&mut self, _region: &Frame) -> Result<LandmarkSet, LandmarkError> {
            let mut flat = Vec::with_capacity(LANDMARK_COUNT * 3);
            for i in 0..LANDMARK_COUNT {
                let x = 40.0 + (i % 22) as f32 * 8.0;
                let y = 50.0 + (i / 22) as f32 * 7.0;
                flat.extend_from_slice(&[x, y, 0.0]);
            }
            LandmarkSet::from_flat(&flat)
        }
    }

    /// Embedder stub: fixed vector regardless of input, for wiring tests
    /// independent of real model weights.
    struct FixedEmbedder(Vec<f32>);

    impl FaceEmbedder for FixedEmbedder {
        fn embed(&mut self, _face: &Frame) -> Result<Embedding, EmbedderError> {
            Ok(Embedding::new(self.0.clone()))
        }
    }

    fn gray_frame(w: u32, h: u32) -> Frame {
        Frame::new(vec![120u8; (w * h * 3) as usize], w, h).unwrap()
    }

    fn synthetic_face_tensors() -> (Vec<f32>, Vec<f32>) {
        let mut scores = vec![0.0f32; 896];
        scores[100] = 0.9;
        let mut regressors = vec![0.0f32; 896 * 16];
        let row = &mut regressors[100 * 16..101 * 16];
        // Box over the frame center
        row[0] = 0.2; // ymin
        row[1] = 0.2; // xmin
        row[2] = 0.8; // ymax
        row[3] = 0.8; // xmax
        // Frontal keypoints: eyes, nose, mouth corners, tragion
        let kps = [
            (0.35, 0.40),
            (0.65, 0.40),
            (0.50, 0.50),
            (0.40, 0.65),
            (0.60, 0.65),
            (0.70, 0.50),
        ];
        for (j, (x, y)) in kps.iter().enumerate() {
            row[4 + 2 * j] = *x;
            row[5 + 2 * j] = *y;
        }
        (regressors, scores)
    }

    fn pipeline_with(
        detector: TensorDetector,
        strategy: AlignStrategy,
    ) -> RecognitionPipeline<TensorDetector, GridLandmarker, FixedEmbedder> {
        let config = PipelineConfig {
            strategy,
            ..PipelineConfig::default()
        };
        RecognitionPipeline::with_models(
            detector,
            GridLandmarker,
            FixedEmbedder(vec![0.5; 512]),
            config,
        )
    }

    #[test]
    fn test_no_face_is_outcome_not_error() {
        let (regressors, mut scores) = synthetic_face_tensors();
        for s in scores.iter_mut() {
            *s = 0.3; // everything below threshold
        }
        let mut pipeline = pipeline_with(
            TensorDetector { regressors, scores },
            AlignStrategy::KeypointRatio,
        );

        let outcome = pipeline.recognize(&gray_frame(100, 100)).unwrap();
        assert!(matches!(outcome, RecognizeOutcome::NoFace));
    }

    #[test]
    fn test_keypoint_ratio_path_embeds() {
        let (regressors, scores) = synthetic_face_tensors();
        let mut pipeline = pipeline_with(
            TensorDetector { regressors, scores },
            AlignStrategy::KeypointRatio,
        );

        let outcome = pipeline.recognize(&gray_frame(100, 100)).unwrap();
        let RecognizeOutcome::Embedded(embedding) = outcome else {
            panic!("expected embedding, got {outcome:?}");
        };
        assert_eq!(embedding.len(), 512);
    }

    #[test]
    fn test_landmark_box_path_embeds() {
        let (regressors, scores) = synthetic_face_tensors();
        let mut pipeline = pipeline_with(
            TensorDetector { regressors, scores },
            AlignStrategy::LandmarkBox,
        );

        let outcome = pipeline.recognize(&gray_frame(100, 100)).unwrap();
        assert!(matches!(outcome, RecognizeOutcome::Embedded(_)));
    }

    #[test]
    fn test_chained_path_embeds() {
        let (regressors, scores) = synthetic_face_tensors();
        let mut pipeline = pipeline_with(
            TensorDetector { regressors, scores },
            AlignStrategy::KeypointThenLandmark,
        );

        let outcome = pipeline.recognize(&gray_frame(100, 100)).unwrap();
        assert!(matches!(outcome, RecognizeOutcome::Embedded(_)));
    }

    #[test]
    fn test_same_identity_verifies_against_gallery() {
        // Two different frames of the same synthetic identity: the stub
        // embedder stands in for a model that maps them to the same vector.
        let (regressors, scores) = synthetic_face_tensors();
        let mut pipeline = pipeline_with(
            TensorDetector {
                regressors: regressors.clone(),
                scores: scores.clone(),
            },
            AlignStrategy::KeypointRatio,
        );

        let first = pipeline.recognize(&gray_frame(100, 100)).unwrap();
        let second = pipeline.recognize(&gray_frame(200, 160)).unwrap();

        let (RecognizeOutcome::Embedded(enrolled), RecognizeOutcome::Embedded(query)) =
            (first, second)
        else {
            panic!("both frames should embed");
        };

        let gallery = vec![StudentRecord {
            name: "Ada".into(),
            roll_no: "17".into(),
            embedding: enrolled,
        }];
        let result = CosineMatcher.compare(&query, &gallery, 0.7).unwrap();
        assert!(result.verified);
        assert!(result.similarity > 0.7);
        assert_eq!(result.roll_no.as_deref(), Some("17"));
    }

    #[test]
    fn test_degenerate_geometry_rejected_not_fatal() {
        // All keypoints collapsed on one point: zero-area ratio crop
        let detection = Detection {
            bounds: Rect::new(20.0, 20.0, 80.0, 80.0),
            keypoints: vec![Point::new(50.0, 50.0); 6],
            score: 0.9,
        };
        let config = PipelineConfig::default();
        let mut pipeline = RecognitionPipeline::with_models(
            FixedDetector(Some(detection)),
            GridLandmarker,
            FixedEmbedder(vec![0.5; 512]),
            config,
        );

        let outcome = pipeline.recognize(&gray_frame(100, 100)).unwrap();
        assert!(matches!(outcome, RecognizeOutcome::GeometryRejected(_)));
    }

    #[test]
    fn test_insufficient_keypoints_is_invariant_violation() {
        let detection = Detection {
            bounds: Rect::new(20.0, 20.0, 80.0, 80.0),
            keypoints: vec![Point::new(40.0, 40.0), Point::new(60.0, 40.0)],
            score: 0.9,
        };
        let mut pipeline = RecognitionPipeline::with_models(
            FixedDetector(Some(detection)),
            GridLandmarker,
            FixedEmbedder(vec![0.5; 512]),
            PipelineConfig::default(),
        );

        let result = pipeline.recognize(&gray_frame(100, 100));
        assert!(matches!(result, Err(PipelineError::Geometry(_))));
    }

    #[test]
    fn test_landmark_overlay_none_without_face() {
        let mut pipeline = RecognitionPipeline::with_models(
            FixedDetector(None),
            GridLandmarker,
            FixedEmbedder(vec![0.5; 512]),
            PipelineConfig::default(),
        );

        let overlay = pipeline.landmark_overlay(&gray_frame(100, 100)).unwrap();
        assert!(overlay.is_none());
    }

    #[test]
    fn test_landmark_overlay_dimensions() {
        let (regressors, scores) = synthetic_face_tensors();
        let mut pipeline = pipeline_with(
            TensorDetector { regressors, scores },
            AlignStrategy::KeypointRatio,
        );

        let overlay = pipeline
            .landmark_overlay(&gray_frame(100, 100))
            .unwrap()
            .expect("synthetic face should produce an overlay");
        assert_eq!(overlay.width(), LANDMARK_INPUT_SIZE);
        assert_eq!(overlay.height(), LANDMARK_INPUT_SIZE);
    }

    #[test]
    fn test_strategy_deserializes_from_kebab_case() {
        let config: PipelineConfig =
            toml::from_str("strategy = \"keypoint-then-landmark\"").unwrap();
        assert_eq!(config.strategy, AlignStrategy::KeypointThenLandmark);
        assert_eq!(config.face_ratio, DEFAULT_FACE_RATIO);
    }
}
