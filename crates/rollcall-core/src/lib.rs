//! rollcall-core — Face recognition pipeline.
//!
//! Given an RGB frame: detect a face (BlazeFace-style anchor model), refine it
//! with a 478-point landmark model, normalize the face region geometrically,
//! and extract a 512-dimensional identity embedding, all running via ONNX
//! Runtime for CPU inference. Embeddings are compared with cosine similarity
//! against a gallery of enrolled records.

pub mod detector;
pub mod embedder;
pub mod frame;
pub mod geometry;
pub mod landmarks;
pub mod matcher;
pub mod normalizer;
pub mod overlay;
pub mod pipeline;
pub mod tensor;
pub mod types;

pub use detector::BlazeFaceDetector;
pub use embedder::MobileFaceNetEmbedder;
pub use frame::Frame;
pub use landmarks::{FaceMeshLandmarker, LandmarkSet};
pub use matcher::{CosineMatcher, MatchResult, Matcher};
pub use pipeline::{
    AlignStrategy, PipelineConfig, PipelineError, RecognitionPipeline, RecognizeOutcome,
};
pub use types::{Detection, Embedding, Point, Rect, StudentRecord};
