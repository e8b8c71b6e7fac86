//! Substitute ranking by weighted multi-modal similarity.
//!
//! # Scoring
//!
//! For a query ingredient `q` and every other catalog ingredient `c`:
//!
//! ```text
//! nutrition = clip01(cos(nutrition_vec(q), nutrition_vec(c)))
//! semantic  = clip01(cos(name_embedding(q), name_embedding(c)))
//! string    = sequence_ratio(lower(name(q)), lower(name(c)))
//! text      = w_semantic × semantic + w_string × string
//! combined  = w_nutrition × nutrition + w_text × text
//! ```
//!
//! Candidates are sorted by `combined` (desc), then by identifier (asc).
//! The query ingredient itself is never returned.
//!
//! # Text strategies
//!
//! The textual component is a [`TextScorer`]. A snapshot built with
//! working embeddings uses [`SemanticTextScorer`]; otherwise it uses
//! [`StringTextScorer`], which drops the semantic term and keeps the
//! string term at its configured weight.

use serde::{Deserialize, Serialize};

use crate::aggregate::round_to;
use crate::catalog::CatalogSnapshot;
use crate::embedding::unit_similarity;
use crate::error::{CoreError, CoreResult};
use crate::features::FeatureSet;
use crate::ids::IngredientId;
use crate::models::NutritionProfile;

/// Decimal places of `similarity_score` in results.
pub const SCORE_DECIMALS: u32 = 4;

const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Blend weights for the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Weight of nutrition similarity in the combined score.
    pub nutrition: f64,
    /// Weight of the text score in the combined score.
    pub text: f64,
    /// Weight of semantic (embedding) similarity inside the text score.
    pub semantic: f64,
    /// Weight of string similarity inside the text score.
    pub string: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            nutrition: 0.6,
            text: 0.4,
            semantic: 0.7,
            string: 0.3,
        }
    }
}

impl ScoringWeights {
    /// Each weight must lie in `[0, 1]` and each pair must sum to 1, which
    /// keeps every combined score inside `[0, 1]`.
    pub fn validate(&self) -> CoreResult<()> {
        let named = [
            ("nutrition", self.nutrition),
            ("text", self.text),
            ("semantic", self.semantic),
            ("string", self.string),
        ];
        for (name, w) in named {
            if !(0.0..=1.0).contains(&w) {
                return Err(CoreError::invalid(format!(
                    "scoring.{} must be in [0.0, 1.0], got {}",
                    name, w
                )));
            }
        }
        if (self.nutrition + self.text - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(CoreError::invalid(
                "scoring.nutrition + scoring.text must equal 1.0",
            ));
        }
        if (self.semantic + self.string - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(CoreError::invalid(
                "scoring.semantic + scoring.string must equal 1.0",
            ));
        }
        Ok(())
    }
}

/// Which text strategy a snapshot scores with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMode {
    Semantic,
    StringOnly,
}

impl std::fmt::Display for TextMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextMode::Semantic => write!(f, "semantic"),
            TextMode::StringOnly => write!(f, "string_only"),
        }
    }
}

/// Textual similarity between two ingredients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextScore {
    /// `None` when the snapshot has no embeddings.
    pub semantic: Option<f64>,
    pub string: f64,
    /// Weighted text score.
    pub text: f64,
}

/// Strategy for the textual half of the combined score.
pub trait TextScorer: Send + Sync {
    fn mode(&self) -> TextMode;
    fn score(&self, query: &FeatureSet, candidate: &FeatureSet, weights: &ScoringWeights)
        -> TextScore;
}

/// Embedding similarity blended with string similarity.
pub struct SemanticTextScorer;

impl TextScorer for SemanticTextScorer {
    fn mode(&self) -> TextMode {
        TextMode::Semantic
    }

    fn score(
        &self,
        query: &FeatureSet,
        candidate: &FeatureSet,
        weights: &ScoringWeights,
    ) -> TextScore {
        let semantic = match (&query.name_embedding, &candidate.name_embedding) {
            (Some(a), Some(b)) => unit_similarity(a, b),
            _ => 0.0,
        };
        let string = sequence_ratio(&query.name_key, &candidate.name_key);
        TextScore {
            semantic: Some(semantic),
            string,
            text: weights.semantic * semantic + weights.string * string,
        }
    }
}

/// String similarity only; the semantic term contributes nothing.
pub struct StringTextScorer;

impl TextScorer for StringTextScorer {
    fn mode(&self) -> TextMode {
        TextMode::StringOnly
    }

    fn score(
        &self,
        query: &FeatureSet,
        candidate: &FeatureSet,
        weights: &ScoringWeights,
    ) -> TextScore {
        let string = sequence_ratio(&query.name_key, &candidate.name_key);
        TextScore {
            semantic: None,
            string,
            text: weights.string * string,
        }
    }
}

/// Per-candidate scoring breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub nutrition: f64,
    pub semantic: Option<f64>,
    pub string: f64,
    pub text: f64,
    pub combined: f64,
}

/// One ranked substitute, carrying everything a caller needs without
/// another catalog lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstituteResult {
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    /// Combined score in `[0, 1]`, rounded to [`SCORE_DECIMALS`] places.
    pub similarity_score: f64,
    pub nutrition: NutritionProfile,
    pub cost_per_gram: f64,
    pub supplier_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<ScoreBreakdown>,
}

/// Score one candidate against the query.
pub fn score_pair(
    query: &FeatureSet,
    candidate: &FeatureSet,
    text_scorer: &dyn TextScorer,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let nutrition = unit_similarity(&query.nutrition, &candidate.nutrition);
    let text = text_scorer.score(query, candidate, weights);
    let combined = (weights.nutrition * nutrition + weights.text * text.text).clamp(0.0, 1.0);
    ScoreBreakdown {
        nutrition,
        semantic: text.semantic,
        string: text.string,
        text: text.text,
        combined,
    }
}

/// Rank every other ingredient in `snapshot` against `query`.
///
/// `limit` must be positive and is clamped to `snapshot.len() - 1`.
pub fn rank_substitutes(
    snapshot: &CatalogSnapshot,
    query: IngredientId,
    limit: usize,
    explain: bool,
) -> CoreResult<Vec<SubstituteResult>> {
    if limit == 0 {
        return Err(CoreError::invalid("limit must be a positive integer"));
    }

    let query_pos = snapshot
        .position(query)
        .ok_or_else(|| CoreError::ingredient_not_found(query))?;

    let limit = limit.min(snapshot.len().saturating_sub(1));
    if limit == 0 {
        return Ok(Vec::new());
    }

    let ingredients = snapshot.ingredients();
    let features = snapshot.features();
    let query_features = &features[query_pos];
    let weights = snapshot.weights();
    let text_scorer = snapshot.text_scorer();

    let mut scored: Vec<(usize, ScoreBreakdown)> = features
        .iter()
        .enumerate()
        .filter(|(pos, _)| *pos != query_pos)
        .map(|(pos, candidate)| {
            (
                pos,
                score_pair(query_features, candidate, text_scorer, weights),
            )
        })
        .collect();

    scored.sort_by(|(pa, a), (pb, b)| {
        b.combined
            .total_cmp(&a.combined)
            .then_with(|| ingredients[*pa].id.cmp(&ingredients[*pb].id))
    });
    scored.truncate(limit);

    Ok(scored
        .into_iter()
        .map(|(pos, breakdown)| {
            let ing = &ingredients[pos];
            SubstituteResult {
                ingredient_id: ing.id,
                ingredient_name: ing.name.clone(),
                similarity_score: round_to(breakdown.combined, SCORE_DECIMALS),
                nutrition: ing.nutrition.clone(),
                cost_per_gram: ing.cost_per_gram,
                supplier_name: ing.supplier_name.clone(),
                explain: explain.then_some(breakdown),
            }
        })
        .collect())
}

/// Sequence-matching similarity ratio in `[0, 1]`.
///
/// Finds the longest common block of characters, recurses on the pieces to
/// its left and right, and returns `2·M / (|a| + |b|)` where `M` is the
/// total number of matched characters. Two empty strings have ratio `1.0`.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matched_chars(&a, &b) as f64 / total as f64
}

fn matched_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, k) = longest_block(a, b);
    if k == 0 {
        return 0;
    }
    k + matched_chars(&a[..i], &b[..j]) + matched_chars(&a[i + k..], &b[j + k..])
}

/// Longest common contiguous block as `(start_a, start_b, len)`.
///
/// Ties resolve to the block starting earliest in `a`, then earliest in `b`.
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        for (j, cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb { prev[j] + 1 } else { 0 };
            let k = cur[j + 1];
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}
