//! Feature builder: per-ingredient vectors for similarity ranking.
//!
//! For every ingredient in a catalog snapshot this module derives
//!
//! 1. a 6-dimensional nutrition vector over
//!    `{energy, carb, protein, fat, sugar, fiber}` (water is left out),
//!    with unknown values imputed to `0.0` and the result L2-normalized;
//! 2. a lowercased name key used for string matching;
//! 3. optionally, an L2-normalized sentence embedding of the display name.
//!
//! Features are computed once per snapshot and never patched in place. If
//! the embedding provider is unavailable or misbehaves, the whole snapshot
//! falls back to string-only text scoring instead of failing the build.

use std::collections::HashMap;
use std::sync::Arc;

use crate::embedding::{l2_normalize, EmbeddingProvider};
use crate::error::{CoreError, CoreResult};
use crate::models::{Ingredient, Nutrient, NutritionProfile};
use crate::similarity::{SemanticTextScorer, StringTextScorer, TextScorer};

/// Dimensionality of the nutrition feature vector.
pub const NUTRITION_DIMS: usize = 6;

/// Nutrients that make up the nutrition vector, in order.
pub const FEATURE_NUTRIENTS: [Nutrient; NUTRITION_DIMS] = [
    Nutrient::Energy,
    Nutrient::Carb,
    Nutrient::Protein,
    Nutrient::Fat,
    Nutrient::Sugar,
    Nutrient::Fiber,
];

/// Precomputed features for one ingredient.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// Unit-length nutrition vector, or all zeros for an all-zero profile.
    pub nutrition: [f32; NUTRITION_DIMS],
    /// Lowercased display name.
    pub name_key: String,
    /// Unit-length name embedding. Shared between ingredients with the same name.
    pub name_embedding: Option<Arc<[f32]>>,
}

/// Output of a feature build: one [`FeatureSet`] per ingredient (same order
/// as the input) and the text strategy the snapshot will score with.
pub struct BuiltFeatures {
    pub sets: Vec<FeatureSet>,
    pub text_scorer: Box<dyn TextScorer>,
    pub embedding_model: Option<String>,
}

/// Build the L2-normalized nutrition vector for a profile.
///
/// Normalization runs in `f64` after dividing by the largest component, so
/// any finite non-negative profile yields a unit vector (or all zeros).
pub fn nutrition_vector(profile: &NutritionProfile) -> [f32; NUTRITION_DIMS] {
    let raw = FEATURE_NUTRIENTS.map(|n| profile.value_or_zero(n));
    let mut vec = [0.0f32; NUTRITION_DIMS];

    let max = raw.iter().fold(0.0f64, |m, v| m.max(*v));
    if !max.is_finite() || max <= 0.0 {
        return vec;
    }
    let scaled = raw.map(|v| v / max);
    let norm = scaled.iter().map(|v| v * v).sum::<f64>().sqrt();
    for (slot, v) in vec.iter_mut().zip(scaled) {
        *slot = (v / norm) as f32;
    }
    vec
}

/// Build features for every ingredient.
///
/// `batch_size` bounds the number of names sent to the provider per call.
pub fn build_features(
    ingredients: &[Ingredient],
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> BuiltFeatures {
    let mut sets: Vec<FeatureSet> = ingredients
        .iter()
        .map(|ing| FeatureSet {
            nutrition: nutrition_vector(&ing.nutrition),
            name_key: ing.name.to_lowercase(),
            name_embedding: None,
        })
        .collect();

    if !provider.is_available() {
        tracing::info!("embedding provider disabled, using string-only text similarity");
        return BuiltFeatures {
            sets,
            text_scorer: Box::new(StringTextScorer),
            embedding_model: None,
        };
    }

    match embed_names(ingredients, provider, batch_size) {
        Ok(vectors) => {
            for (set, vector) in sets.iter_mut().zip(vectors) {
                set.name_embedding = Some(vector);
            }
            tracing::info!(
                model = provider.model_name(),
                ingredients = ingredients.len(),
                "built semantic name embeddings"
            );
            BuiltFeatures {
                sets,
                text_scorer: Box::new(SemanticTextScorer),
                embedding_model: Some(provider.model_name().to_string()),
            }
        }
        Err(e) => {
            tracing::warn!(
                model = provider.model_name(),
                error = %e,
                "falling back to string-only text similarity"
            );
            BuiltFeatures {
                sets,
                text_scorer: Box::new(StringTextScorer),
                embedding_model: None,
            }
        }
    }
}

/// Embed every distinct display name once and hand back one shared vector
/// per ingredient.
fn embed_names(
    ingredients: &[Ingredient],
    provider: &dyn EmbeddingProvider,
    batch_size: usize,
) -> CoreResult<Vec<Arc<[f32]>>> {
    let mut unique: Vec<String> = Vec::new();
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut slots: Vec<usize> = Vec::with_capacity(ingredients.len());

    for ing in ingredients {
        let slot = *slot_of.entry(ing.name.as_str()).or_insert_with(|| {
            unique.push(ing.name.clone());
            unique.len() - 1
        });
        slots.push(slot);
    }

    let expected_dims = provider.dims();
    let mut vectors: Vec<Arc<[f32]>> = Vec::with_capacity(unique.len());

    for batch in unique.chunks(batch_size.max(1)) {
        let embedded = provider
            .embed(batch)
            .map_err(|e| CoreError::DependencyUnavailable(e.to_string()))?;

        if embedded.len() != batch.len() {
            return Err(CoreError::DependencyUnavailable(format!(
                "provider returned {} vectors for {} names",
                embedded.len(),
                batch.len()
            )));
        }

        for mut vector in embedded {
            let dims = vector.len();
            let consistent = dims > 0
                && (expected_dims == 0 || dims == expected_dims)
                && vectors.first().map_or(true, |first| first.len() == dims);
            if !consistent {
                return Err(CoreError::DependencyUnavailable(format!(
                    "provider returned a {}-dim vector, expected {}",
                    dims, expected_dims
                )));
            }
            if vector.iter().any(|x| !x.is_finite()) {
                return Err(CoreError::DependencyUnavailable(
                    "provider returned a non-finite embedding value".to_string(),
                ));
            }
            l2_normalize(&mut vector);
            vectors.push(Arc::from(vector));
        }
    }

    Ok(slots.into_iter().map(|s| vectors[s].clone()).collect())
}
