//! Cosine similarity matching against a gallery of enrolled records.

use crate::types::{Embedding, StudentRecord};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("gallery embedding for {roll_no:?} has {actual} dims, query has {expected}")]
    DimensionMismatch {
        roll_no: String,
        expected: usize,
        actual: usize,
    },
}

/// Result of matching a query embedding against a gallery.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// True iff the best score reached the threshold.
    pub verified: bool,
    /// Best cosine similarity seen, or -1.0 for an empty gallery.
    pub similarity: f32,
    pub roll_no: Option<String>,
    pub name: Option<String>,
}

/// Cosine similarity: `dot(a, b) / (‖a‖ · ‖b‖)`.
///
/// Returns the sentinel -1.0 when either vector has zero norm — "undefined,
/// cannot match" — rather than dividing by zero. Callers must pass
/// equal-length vectors; the matcher checks dimensionality first.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom > 0.0 {
        dot / denom
    } else {
        -1.0
    }
}

/// Strategy for comparing a query embedding against a gallery.
pub trait Matcher {
    fn compare(
        &self,
        query: &Embedding,
        gallery: &[StudentRecord],
        threshold: f32,
    ) -> Result<MatchResult, MatchError>;
}

/// Linear-scan cosine matcher.
///
/// Iterates the gallery in insertion order with a strict `>` comparison, so
/// on ties the first maximum wins — match resolution is deterministic for a
/// given gallery ordering. The threshold is a parameter, never baked in.
pub struct CosineMatcher;

impl Matcher for CosineMatcher {
    fn compare(
        &self,
        query: &Embedding,
        gallery: &[StudentRecord],
        threshold: f32,
    ) -> Result<MatchResult, MatchError> {
        let mut best_sim = -1.0f32;
        let mut best: Option<&StudentRecord> = None;

        for record in gallery {
            // Reject the whole call on a dimensionality mismatch — a gallery
            // holding incomparable embeddings is corrupt, and truncating or
            // padding would silently produce wrong scores.
            if record.embedding.len() != query.len() {
                return Err(MatchError::DimensionMismatch {
                    roll_no: record.roll_no.clone(),
                    expected: query.len(),
                    actual: record.embedding.len(),
                });
            }

            let sim = cosine_similarity(&query.values, &record.embedding.values);
            tracing::debug!(roll_no = %record.roll_no, similarity = sim, "gallery comparison");
            if sim > best_sim {
                best_sim = sim;
                best = Some(record);
            }
        }

        let verified = best.is_some() && best_sim >= threshold;
        Ok(MatchResult {
            verified,
            similarity: best_sim,
            roll_no: best.map(|r| r.roll_no.clone()),
            name: best.map(|r| r.name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(roll_no: &str, values: Vec<f32>) -> StudentRecord {
        StudentRecord {
            name: format!("student-{roll_no}"),
            roll_no: roll_no.into(),
            embedding: Embedding::new(values),
        }
    }

    #[test]
    fn test_similarity_self_is_one() {
        let v = vec![0.3, -1.2, 4.5, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_similarity_symmetric() {
        let a = vec![1.0, 2.0, -0.5];
        let b = vec![-3.0, 0.25, 7.0];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_zero_norm_sentinel() {
        let zero = vec![0.0, 0.0];
        let v = vec![1.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &v), -1.0);
        assert_eq!(cosine_similarity(&v, &zero), -1.0);
        assert_eq!(cosine_similarity(&zero, &zero), -1.0);
    }

    #[test]
    fn test_compare_verified_above_threshold() {
        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let gallery = vec![
            record("1", vec![0.0, 1.0, 0.0]),
            record("2", vec![0.9, 0.1, 0.0]),
        ];

        let result = CosineMatcher.compare(&query, &gallery, 0.7).unwrap();
        assert!(result.verified);
        assert_eq!(result.roll_no.as_deref(), Some("2"));
        assert!(result.similarity > 0.7);
    }

    #[test]
    fn test_compare_best_reported_even_when_unverified() {
        let query = Embedding::new(vec![1.0, 0.0]);
        let gallery = vec![record("1", vec![0.5, 0.5])];

        let result = CosineMatcher.compare(&query, &gallery, 0.99).unwrap();
        assert!(!result.verified);
        assert_eq!(result.roll_no.as_deref(), Some("1"));
        assert!(result.similarity > 0.0);
    }

    #[test]
    fn test_compare_threshold_is_inclusive() {
        let query = Embedding::new(vec![1.0, 0.0]);
        let gallery = vec![record("1", vec![2.0, 0.0])];

        let result = CosineMatcher.compare(&query, &gallery, 1.0).unwrap();
        assert!(result.verified, "best >= threshold must verify");
    }

    #[test]
    fn test_compare_first_maximum_wins_on_tie() {
        let query = Embedding::new(vec![1.0, 0.0]);
        let gallery = vec![
            record("first", vec![3.0, 0.0]),
            record("second", vec![5.0, 0.0]),
        ];

        let result = CosineMatcher.compare(&query, &gallery, 0.5).unwrap();
        assert_eq!(result.roll_no.as_deref(), Some("first"));
    }

    #[test]
    fn test_compare_empty_gallery() {
        let query = Embedding::new(vec![1.0, 0.0]);
        let result = CosineMatcher.compare(&query, &[], 0.5).unwrap();
        assert!(!result.verified);
        assert_eq!(result.similarity, -1.0);
        assert!(result.roll_no.is_none());
    }

    #[test]
    fn test_compare_dimension_mismatch_rejects_call() {
        let query = Embedding::new(vec![1.0, 0.0, 0.0]);
        let gallery = vec![
            record("ok", vec![1.0, 0.0, 0.0]),
            record("bad", vec![1.0, 0.0]),
        ];

        let result = CosineMatcher.compare(&query, &gallery, 0.5);
        assert!(matches!(
            result,
            Err(MatchError::DimensionMismatch {
                expected: 3,
                actual: 2,
                ..
            })
        ));
    }
}
