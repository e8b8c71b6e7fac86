//! Ingredient catalog: immutable snapshots and the service that swaps them.
//!
//! A [`CatalogSnapshot`] holds the ingredient records together with the
//! features derived from them. Snapshots are never mutated. A reload builds
//! a complete new snapshot off to the side and publishes it with a single
//! `Arc` swap, so a reader sees either the old snapshot or the new one and
//! never a mixture.
//!
//! ```text
//! Catalog
//!   current: RwLock<Arc<CatalogSnapshot>>   read lock held only to clone the Arc
//!   rebuild_lock: Mutex<u64>                serializes rebuilds, owns the generation
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, RecipeTotals};
use crate::embedding::EmbeddingProvider;
use crate::error::{CoreError, CoreResult};
use crate::features::{build_features, FeatureSet};
use crate::ids::IngredientId;
use crate::models::{Ingredient, RecipeLine};
use crate::similarity::{
    rank_substitutes, ScoringWeights, StringTextScorer, SubstituteResult, TextMode, TextScorer,
};

/// Settings fixed for the lifetime of a [`Catalog`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    pub weights: ScoringWeights,
    /// Maximum number of names per embedding call.
    pub embedding_batch_size: usize,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            embedding_batch_size: 64,
        }
    }
}

/// Provider used when a snapshot is built without embeddings.
struct NoEmbeddings;

impl EmbeddingProvider for NoEmbeddings {
    fn model_name(&self) -> &str {
        "none"
    }

    fn dims(&self) -> usize {
        0
    }

    fn is_available(&self) -> bool {
        false
    }

    fn embed(&self, _texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        anyhow::bail!("embeddings are not available")
    }
}

/// An immutable, fully-featured view of the ingredient catalog.
pub struct CatalogSnapshot {
    generation: u64,
    /// Sorted by identifier.
    ingredients: Vec<Ingredient>,
    index: HashMap<IngredientId, usize>,
    features: Vec<FeatureSet>,
    text_scorer: Box<dyn TextScorer>,
    embedding_model: Option<String>,
    weights: ScoringWeights,
}

impl std::fmt::Debug for CatalogSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogSnapshot")
            .field("generation", &self.generation)
            .field("ingredients", &self.ingredients.len())
            .field("text_mode", &self.text_mode())
            .field("embedding_model", &self.embedding_model)
            .finish()
    }
}

impl CatalogSnapshot {
    /// The snapshot a catalog starts with before its first load.
    pub fn empty(weights: ScoringWeights) -> Self {
        Self {
            generation: 0,
            ingredients: Vec::new(),
            index: HashMap::new(),
            features: Vec::new(),
            text_scorer: Box::new(StringTextScorer),
            embedding_model: None,
            weights,
        }
    }

    /// Validate `ingredients` and derive their features.
    ///
    /// Fails with [`CoreError::InvalidArgument`] on a duplicate identifier,
    /// an invalid record, or invalid weights. An embedding failure does not
    /// fail the build; the snapshot scores text by string similarity only.
    pub fn build(
        generation: u64,
        mut ingredients: Vec<Ingredient>,
        provider: &dyn EmbeddingProvider,
        settings: &CatalogSettings,
    ) -> CoreResult<Self> {
        settings.weights.validate()?;
        for ingredient in &ingredients {
            ingredient.validate()?;
        }

        ingredients.sort_by_key(|i| i.id);
        let mut index = HashMap::with_capacity(ingredients.len());
        for (pos, ingredient) in ingredients.iter().enumerate() {
            if index.insert(ingredient.id, pos).is_some() {
                return Err(CoreError::invalid(format!(
                    "duplicate ingredient id {}",
                    ingredient.id
                )));
            }
        }

        let built = build_features(&ingredients, provider, settings.embedding_batch_size);

        Ok(Self {
            generation,
            ingredients,
            index,
            features: built.sets,
            text_scorer: built.text_scorer,
            embedding_model: built.embedding_model,
            weights: settings.weights,
        })
    }

    /// Build a snapshot that scores text by string similarity only, with
    /// default settings.
    pub fn string_only(generation: u64, ingredients: Vec<Ingredient>) -> CoreResult<Self> {
        Self::build(
            generation,
            ingredients,
            &NoEmbeddings,
            &CatalogSettings::default(),
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.ingredients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty()
    }

    /// All ingredients, sorted by identifier.
    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn get(&self, id: IngredientId) -> Option<&Ingredient> {
        self.position(id).map(|pos| &self.ingredients[pos])
    }

    pub fn position(&self, id: IngredientId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Features, aligned with [`ingredients`](Self::ingredients).
    pub fn features(&self) -> &[FeatureSet] {
        &self.features
    }

    pub fn text_scorer(&self) -> &dyn TextScorer {
        self.text_scorer.as_ref()
    }

    pub fn text_mode(&self) -> TextMode {
        self.text_scorer.mode()
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Model the name embeddings came from, if any.
    pub fn embedding_model(&self) -> Option<&str> {
        self.embedding_model.as_deref()
    }

    /// Top `limit` substitutes for the ingredient named by `raw_id`.
    pub fn find_substitutes(&self, raw_id: &str, limit: usize) -> CoreResult<Vec<SubstituteResult>> {
        let id = IngredientId::parse(raw_id)?;
        rank_substitutes(self, id, limit, false)
    }

    /// Like [`find_substitutes`](Self::find_substitutes), with a per-result
    /// score breakdown attached.
    pub fn explain_substitutes(
        &self,
        raw_id: &str,
        limit: usize,
    ) -> CoreResult<Vec<SubstituteResult>> {
        let id = IngredientId::parse(raw_id)?;
        rank_substitutes(self, id, limit, true)
    }

    pub fn compute_recipe_totals(&self, lines: &[RecipeLine]) -> CoreResult<RecipeTotals> {
        aggregate(lines, self)
    }
}

/// Owner of the active snapshot and the embedding capability.
pub struct Catalog {
    current: RwLock<Arc<CatalogSnapshot>>,
    rebuild_lock: Mutex<u64>,
    provider: Arc<dyn EmbeddingProvider>,
    settings: CatalogSettings,
}

impl Catalog {
    /// Create a catalog holding an empty snapshot (generation 0).
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: CatalogSettings) -> CoreResult<Self> {
        settings.weights.validate()?;
        Ok(Self {
            current: RwLock::new(Arc::new(CatalogSnapshot::empty(settings.weights))),
            rebuild_lock: Mutex::new(0),
            provider,
            settings,
        })
    }

    /// The active snapshot. Holding the returned `Arc` keeps that snapshot
    /// alive across a concurrent reload.
    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn settings(&self) -> &CatalogSettings {
        &self.settings
    }

    pub fn provider(&self) -> &dyn EmbeddingProvider {
        self.provider.as_ref()
    }

    /// Build a new snapshot from `ingredients` and make it active.
    ///
    /// Blocks for the duration of the embedding pass. Concurrent calls are
    /// serialized. On error the previous snapshot stays active.
    pub fn rebuild(&self, ingredients: Vec<Ingredient>) -> CoreResult<Arc<CatalogSnapshot>> {
        let mut generation = self
            .rebuild_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let next = *generation + 1;

        let snapshot = Arc::new(CatalogSnapshot::build(
            next,
            ingredients,
            self.provider.as_ref(),
            &self.settings,
        )?);

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        *generation = next;

        tracing::info!(
            generation = next,
            ingredients = snapshot.len(),
            text_mode = %snapshot.text_mode(),
            "catalog snapshot published"
        );
        Ok(snapshot)
    }

    pub fn find_substitutes(&self, raw_id: &str, limit: usize) -> CoreResult<Vec<SubstituteResult>> {
        self.snapshot().find_substitutes(raw_id, limit)
    }

    pub fn explain_substitutes(
        &self,
        raw_id: &str,
        limit: usize,
    ) -> CoreResult<Vec<SubstituteResult>> {
        self.snapshot().explain_substitutes(raw_id, limit)
    }

    pub fn compute_recipe_totals(&self, lines: &[RecipeLine]) -> CoreResult<RecipeTotals> {
        self.snapshot().compute_recipe_totals(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutritionProfile;
    use std::thread;

    fn ingredient(id: u64, name: &str, nutrition: NutritionProfile) -> Ingredient {
        Ingredient {
            id: IngredientId::new(id),
            name: name.to_string(),
            nutrition,
            cost_per_gram: 0.01,
            supplier_name: "Acme".to_string(),
        }
    }

    fn profile(energy: f64, carb: f64, protein: f64, fat: f64) -> NutritionProfile {
        NutritionProfile {
            energy: Some(energy),
            carb: Some(carb),
            protein: Some(protein),
            fat: Some(fat),
            sugar: Some(1.0),
            water: Some(10.0),
            fiber: Some(2.0),
        }
    }

    fn pantry() -> Vec<Ingredient> {
        vec![
            ingredient(1, "Butter", profile(717.0, 0.1, 0.9, 81.0)),
            ingredient(2, "Margarine", profile(717.0, 0.1, 0.9, 81.0)),
            ingredient(3, "White rice", profile(130.0, 28.0, 2.7, 0.3)),
            ingredient(4, "Brown rice", profile(112.0, 23.0, 2.3, 0.8)),
            ingredient(5, "Chicken breast", profile(165.0, 0.0, 31.0, 3.6)),
            ingredient(6, "Olive oil", profile(884.0, 0.0, 0.0, 100.0)),
        ]
    }

    /// Embeds names onto two axes: "rice" vs everything else.
    struct KeywordProvider;

    impl EmbeddingProvider for KeywordProvider {
        fn model_name(&self) -> &str {
            "keyword"
        }
        fn dims(&self) -> usize {
            2
        }
        fn embed(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.to_lowercase().contains("rice") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    fn catalog() -> Catalog {
        let catalog = Catalog::new(Arc::new(KeywordProvider), CatalogSettings::default()).unwrap();
        catalog.rebuild(pantry()).unwrap();
        catalog
    }

    #[test]
    fn test_identical_nutrition_ranks_first() {
        let catalog = catalog();
        let results = catalog.explain_substitutes("ing_001", 1).unwrap();
        assert_eq!(results.len(), 1);
        let top = &results[0];
        assert_eq!(top.ingredient_id, IngredientId::new(2));
        let breakdown = top.explain.unwrap();
        assert!((breakdown.nutrition - 1.0).abs() < 1e-6);
        assert!(top.similarity_score >= 0.6);
    }

    #[test]
    fn test_results_exclude_query() {
        let catalog = catalog();
        for id in 1..=6u64 {
            let results = catalog.find_substitutes(&id.to_string(), 10).unwrap();
            assert!(results
                .iter()
                .all(|r| r.ingredient_id != IngredientId::new(id)));
        }
    }

    #[test]
    fn test_limit_clamped_to_catalog_size() {
        let catalog = catalog();
        assert_eq!(catalog.find_substitutes("3", 5).unwrap().len(), 5);
        assert_eq!(catalog.find_substitutes("3", 500).unwrap().len(), 5);
        assert_eq!(catalog.find_substitutes("3", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_scores_bounded_and_sorted() {
        let catalog = catalog();
        let results = catalog.explain_substitutes("4", 10).unwrap();
        for pair in results.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
        for r in &results {
            assert!((0.0..=1.0).contains(&r.similarity_score));
            let b = r.explain.unwrap();
            assert!((0.0..=1.0).contains(&b.combined));
            assert!(b.semantic.is_some());
        }
    }

    #[test]
    fn test_semantic_pulls_related_names_up() {
        let catalog = catalog();
        let results = catalog.find_substitutes("ing_004", 1).unwrap();
        assert_eq!(results[0].ingredient_name, "White rice");
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let catalog = catalog();
        let first = catalog.find_substitutes("5", 5).unwrap();
        for _ in 0..10 {
            assert_eq!(catalog.find_substitutes("5", 5).unwrap(), first);
        }
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let same = profile(100.0, 10.0, 10.0, 10.0);
        let snapshot = CatalogSnapshot::string_only(
            1,
            vec![
                ingredient(10, "Flour", same.clone()),
                ingredient(1, "Salt", same.clone()),
                ingredient(7, "Flour", same.clone()),
                ingredient(3, "Flour", same),
            ],
        )
        .unwrap();
        let ids: Vec<u64> = snapshot
            .find_substitutes("1", 3)
            .unwrap()
            .iter()
            .map(|r| r.ingredient_id.value())
            .collect();
        assert_eq!(ids, vec![3, 7, 10]);
    }

    #[test]
    fn test_single_ingredient_catalog_returns_empty() {
        let snapshot =
            CatalogSnapshot::string_only(1, vec![ingredient(1, "Salt", profile(0.0, 0.0, 0.0, 0.0))])
                .unwrap();
        assert!(snapshot.find_substitutes("1", 3).unwrap().is_empty());
    }

    #[test]
    fn test_identical_huge_nutrition_scores_one() {
        let huge = NutritionProfile {
            energy: Some(1e39),
            carb: Some(1.0),
            ..Default::default()
        };
        let snapshot = CatalogSnapshot::string_only(
            1,
            vec![
                ingredient(1, "Mystery paste", huge.clone()),
                ingredient(2, "Mystery paste", huge),
                ingredient(3, "Salt", profile(0.0, 0.0, 0.0, 0.0)),
            ],
        )
        .unwrap();
        let results = snapshot.explain_substitutes("1", 2).unwrap();
        assert_eq!(results[0].ingredient_id, IngredientId::new(2));
        let b = results[0].explain.unwrap();
        assert!((b.nutrition - 1.0).abs() < 1e-6);
        assert!(results.iter().all(|r| r.similarity_score.is_finite()));
    }

    #[test]
    fn test_zero_nutrition_scores_zero_nutrition_similarity() {
        let snapshot = CatalogSnapshot::string_only(
            1,
            vec![
                ingredient(1, "Water", NutritionProfile::default()),
                ingredient(2, "Water", profile(10.0, 1.0, 1.0, 1.0)),
            ],
        )
        .unwrap();
        let results = snapshot.explain_substitutes("1", 1).unwrap();
        let b = results[0].explain.unwrap();
        assert_eq!(b.nutrition, 0.0);
        assert_eq!(b.semantic, None);
    }

    #[test]
    fn test_error_kinds() {
        let catalog = catalog();
        assert!(matches!(
            catalog.find_substitutes("1", 0),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(matches!(
            catalog.find_substitutes("ing_999", 3),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.find_substitutes("butter", 3),
            Err(CoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_duplicate_ids_rejected_and_old_snapshot_kept() {
        let catalog = catalog();
        let before = catalog.snapshot();
        let mut dupes = pantry();
        dupes.push(ingredient(3, "Wild rice", profile(101.0, 21.0, 4.0, 0.3)));
        assert!(matches!(
            catalog.rebuild(dupes),
            Err(CoreError::InvalidArgument(_))
        ));
        assert!(Arc::ptr_eq(&before, &catalog.snapshot()));
    }

    #[test]
    fn test_rebuild_swaps_and_bumps_generation() {
        let catalog = catalog();
        let old = catalog.snapshot();
        assert_eq!(old.generation(), 1);
        assert_eq!(old.text_mode(), TextMode::Semantic);

        let mut smaller = pantry();
        smaller.truncate(2);
        catalog.rebuild(smaller).unwrap();

        let new = catalog.snapshot();
        assert_eq!(new.generation(), 2);
        assert_eq!(new.len(), 2);
        // A reader holding the old snapshot still sees all of it.
        assert_eq!(old.len(), 6);
        assert!(old.get(IngredientId::new(6)).is_some());
        assert!(new.get(IngredientId::new(6)).is_none());
    }

    #[test]
    fn test_recipe_totals_follow_active_snapshot() {
        let catalog = catalog();
        let lines = vec![RecipeLine::new("ing_006", 10.0).unwrap()];
        assert!(catalog.compute_recipe_totals(&lines).is_ok());

        let mut without_oil = pantry();
        without_oil.retain(|i| i.id != IngredientId::new(6));
        catalog.rebuild(without_oil).unwrap();
        assert!(matches!(
            catalog.compute_recipe_totals(&lines),
            Err(CoreError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_concurrent_reads_during_rebuild() {
        let catalog = Arc::new(catalog());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let c = catalog.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let snap = c.snapshot();
                    let results = snap.find_substitutes("1", 10).unwrap();
                    assert_eq!(results.len(), snap.len() - 1);
                }
            }));
        }
        for _ in 0..10 {
            catalog.rebuild(pantry()).unwrap();
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(catalog.snapshot().generation(), 11);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let settings = CatalogSettings {
            weights: ScoringWeights {
                nutrition: 0.9,
                text: 0.4,
                semantic: 0.7,
                string: 0.3,
            },
            embedding_batch_size: 8,
        };
        assert!(Catalog::new(Arc::new(KeywordProvider), settings).is_err());
    }
}
