//! Face embedding extraction via ONNX Runtime.
//!
//! Takes a canonical 112×112 face crop normalized to `[-1, 1]` and produces a
//! 512-dimensional identity vector. The raw model output is returned as-is —
//! no L2 normalization. If the concrete model's embedding space expects unit
//! vectors, that belongs to the model version, not this adapter.

use crate::frame::Frame;
use crate::tensor::to_signed_tensor;
use crate::types::Embedding;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

/// Embedding model input edge length.
pub const EMBEDDER_INPUT_SIZE: u32 = 112;
/// Embedding vector dimensionality.
pub const EMBEDDING_DIM: usize = 512;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Face embedder. One loaded model instance per value; `&mut self` serializes
/// concurrent callers of a shared instance.
pub struct MobileFaceNetEmbedder {
    session: Session,
}

impl MobileFaceNetEmbedder {
    /// Load the embedding ONNX model from the given path. Fatal on failure.
    pub fn load(model_path: &str) -> Result<Self, EmbedderError> {
        if !Path::new(model_path).exists() {
            return Err(EmbedderError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| (i.name(), i.dtype())).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded embedding model"
        );

        Ok(Self { session })
    }

    /// Extract a 512-dimensional embedding from a 112×112 face crop.
    pub fn embed(&mut self, face: &Frame) -> Result<Embedding, EmbedderError> {
        debug_assert_eq!(face.width(), EMBEDDER_INPUT_SIZE);
        debug_assert_eq!(face.height(), EMBEDDER_INPUT_SIZE);

        let input = to_signed_tensor(face);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(raw.to_vec()))
    }
}
