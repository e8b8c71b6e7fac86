//! Embedding provider trait and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait that all embedding backends
//! implement, plus pure helpers for normalization and similarity.
//!
//! Concrete providers (fastembed, Ollama, disabled) live in the
//! `recipe-harness` app crate. The core only calls [`EmbeddingProvider::embed`]
//! while building a catalog snapshot, never on the request path.

use anyhow::Result;

/// Trait for sentence-embedding backends.
///
/// `embed` is synchronous: it runs once per catalog build, and the app
/// wraps catalog builds in a blocking task.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;
    /// Returns the embedding vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
    /// Whether the provider is configured to produce vectors at all.
    ///
    /// A provider reporting `false` is skipped without an embedding
    /// attempt and without a warning.
    fn is_available(&self) -> bool {
        true
    }
    /// Embed a batch of texts, returning one vector per input, in order.
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Scale a vector to unit length in place.
///
/// A zero vector is left as the zero vector.
pub fn l2_normalize(vec: &mut [f32]) {
    // Accumulate in f64: squares of large f32 components overflow.
    let norm = vec
        .iter()
        .map(|x| f64::from(*x) * f64::from(*x))
        .sum::<f64>()
        .sqrt();
    if norm < f64::from(f32::EPSILON) {
        vec.iter_mut().for_each(|x| *x = 0.0);
        return;
    }
    vec.iter_mut().for_each(|x| *x = (f64::from(*x) / norm) as f32);
}

/// Compute cosine similarity between two vectors.
///
/// Returns a value in `[-1.0, 1.0]`:
/// - `1.0` = identical direction
/// - `0.0` = orthogonal (unrelated)
/// - `-1.0` = opposite direction
///
/// Returns `0.0` for empty vectors, vectors of different lengths, and
/// whenever either vector has zero magnitude.
///
/// # Formula
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Cosine similarity clipped into `[0.0, 1.0]`.
pub fn unit_similarity(a: &[f32], b: &[f32]) -> f64 {
    (cosine_similarity(a, b) as f64).clamp(0.0, 1.0)
}
