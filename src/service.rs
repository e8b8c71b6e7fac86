//! Application service: the store, the catalog, and the request shapes
//! shared by the CLI and the HTTP server.
//!
//! [`RecipeService`] is the one object both front ends hold. It owns the
//! [`Catalog`] (and through it the embedding provider), reads and writes
//! through a [`Store`], and converts core results into response views.
//!
//! Recipe totals are computed on every read from the active snapshot; a
//! recipe whose ingredient has since left the catalog reports
//! [`CoreError::Inconsistent`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use recipe_harness_core::aggregate::{NutritionTotals, RecipeTotals};
use recipe_harness_core::embedding::EmbeddingProvider;
use recipe_harness_core::ids::IngredientId;
use recipe_harness_core::models::{
    Ingredient, NewRecipe, NutritionProfile, Recipe, RecipeLine, RecipeSummary,
};
use recipe_harness_core::similarity::{SubstituteResult, TextMode};
use recipe_harness_core::store::Store;
use recipe_harness_core::{Catalog, CatalogSettings, CatalogSnapshot, CoreError, CoreResult};

use crate::config::{Config, SubstitutesConfig};
use crate::embedding::create_provider;
use crate::sqlite_store::SqliteStore;
use crate::{db, migrate};

/// An ingredient identifier as it arrives in JSON: `"ing_007"`, `"7"`, or `7`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawIngredientId {
    Text(String),
    Number(u64),
}

impl RawIngredientId {
    pub fn parse(&self) -> CoreResult<IngredientId> {
        match self {
            RawIngredientId::Text(s) => IngredientId::parse(s),
            RawIngredientId::Number(n) => Ok(IngredientId::new(*n)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeLineRequest {
    pub ingredient_id: RawIngredientId,
    pub quantity_in_grams: f64,
}

/// Body of a recipe-creation request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecipeRequest {
    pub recipe_name: String,
    #[serde(default)]
    pub recipe_type: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    pub ingredients: Vec<RecipeLineRequest>,
}

impl CreateRecipeRequest {
    pub fn into_new_recipe(self) -> CoreResult<NewRecipe> {
        let lines = self
            .ingredients
            .iter()
            .map(|l| RecipeLine::from_parts(l.ingredient_id.parse()?, l.quantity_in_grams))
            .collect::<CoreResult<Vec<_>>>()?;
        let recipe = NewRecipe {
            name: self.recipe_name,
            recipe_type: self.recipe_type.filter(|s| !s.trim().is_empty()),
            cuisine: self.cuisine.filter(|s| !s.trim().is_empty()),
            lines,
        };
        recipe.validate()?;
        Ok(recipe)
    }
}

/// Catalog listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientView {
    pub id: IngredientId,
    pub ingredient_name: String,
    pub nutrition: NutritionProfile,
    pub cost_per_gram: f64,
    pub supplier_name: String,
}

impl From<&Ingredient> for IngredientView {
    fn from(i: &Ingredient) -> Self {
        Self {
            id: i.id,
            ingredient_name: i.name.clone(),
            nutrition: i.nutrition.clone(),
            cost_per_gram: i.cost_per_gram,
            supplier_name: i.supplier_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLineView {
    pub ingredient_id: IngredientId,
    pub ingredient_name: String,
    pub quantity_in_grams: f64,
}

/// A recipe with its lines resolved and totals computed against the
/// active catalog, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDetail {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub recipe_type: Option<String>,
    pub cuisine: Option<String>,
    pub ingredients: Vec<RecipeLineView>,
    pub total_cost: f64,
    pub total_nutrition: NutritionTotals,
}

impl RecipeDetail {
    fn build(recipe: &Recipe, snapshot: &CatalogSnapshot) -> CoreResult<Self> {
        let RecipeTotals {
            total_cost,
            total_nutrition,
        } = snapshot.compute_recipe_totals(&recipe.lines)?.rounded();

        let ingredients = recipe
            .lines
            .iter()
            .map(|line| {
                // Every line resolved during aggregation.
                let name = snapshot
                    .get(line.ingredient_id)
                    .map(|i| i.name.clone())
                    .unwrap_or_default();
                RecipeLineView {
                    ingredient_id: line.ingredient_id,
                    ingredient_name: name,
                    quantity_in_grams: line.quantity_grams,
                }
            })
            .collect();

        Ok(Self {
            recipe_id: recipe.id,
            recipe_name: recipe.name.clone(),
            recipe_type: recipe.recipe_type.clone(),
            cuisine: recipe.cuisine.clone(),
            ingredients,
            total_cost,
            total_nutrition,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub ingredients_count: u64,
    pub recipes_count: u64,
    pub catalog_generation: u64,
    pub catalog_size: usize,
    pub text_mode: TextMode,
    pub embedding_model: Option<String>,
}

/// Open the configured SQLite database, applying migrations.
///
/// For commands that only touch storage and need no catalog.
pub async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;
    Ok(SqliteStore::new(pool))
}

/// The application's single owner of catalog and storage.
pub struct RecipeService {
    store: Arc<dyn Store>,
    catalog: Arc<Catalog>,
    substitutes: SubstitutesConfig,
}

impl RecipeService {
    /// Assemble a service. The catalog starts empty; call
    /// [`reload`](Self::reload) to load it from the store.
    pub fn new(
        store: Arc<dyn Store>,
        provider: Arc<dyn EmbeddingProvider>,
        settings: CatalogSettings,
        substitutes: SubstitutesConfig,
    ) -> Result<Self> {
        let catalog = Catalog::new(provider, settings)?;
        Ok(Self {
            store,
            catalog: Arc::new(catalog),
            substitutes,
        })
    }

    /// Open the configured database (applying migrations), create the
    /// embedding provider, and load the catalog.
    pub async fn open(config: &Config) -> Result<Self> {
        let store: Arc<dyn Store> = Arc::new(open_store(config).await?);
        let provider = create_provider(&config.embedding)?;

        let service = Self::new(
            store,
            provider,
            config.catalog_settings(),
            config.substitutes.clone(),
        )?;
        service.reload().await?;
        Ok(service)
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Rebuild the catalog from the store and publish it.
    ///
    /// Feature building (including model inference) runs on a blocking
    /// thread. Readers keep using the previous snapshot until the swap.
    pub async fn reload(&self) -> Result<Arc<CatalogSnapshot>> {
        let ingredients = self.store.list_ingredients().await?;
        let catalog = self.catalog.clone();
        let snapshot = tokio::task::spawn_blocking(move || catalog.rebuild(ingredients))
            .await
            .context("catalog rebuild task failed")??;
        Ok(snapshot)
    }

    /// `None` means the configured default. Requests beyond the catalog are
    /// clamped by the ranking engine; zero is rejected there.
    pub fn resolve_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.substitutes.default_limit)
    }

    pub fn find_substitutes(
        &self,
        raw_id: &str,
        limit: Option<usize>,
        explain: bool,
    ) -> Result<Vec<SubstituteResult>> {
        let limit = self.resolve_limit(limit);
        let results = if explain {
            self.catalog.explain_substitutes(raw_id, limit)?
        } else {
            self.catalog.find_substitutes(raw_id, limit)?
        };
        Ok(results)
    }

    /// Catalog listing in id order.
    pub fn list_ingredients(&self, skip: usize, limit: usize) -> Vec<IngredientView> {
        self.catalog
            .snapshot()
            .ingredients()
            .iter()
            .skip(skip)
            .take(limit)
            .map(IngredientView::from)
            .collect()
    }

    /// Validate, price, and store a new recipe.
    ///
    /// Unknown ingredients are rejected as [`CoreError::NotFound`] before
    /// anything is written.
    pub async fn create_recipe(&self, request: CreateRecipeRequest) -> Result<RecipeDetail> {
        let new_recipe = request.into_new_recipe()?;

        let snapshot = self.catalog.snapshot();
        if let Some(missing) = new_recipe
            .lines
            .iter()
            .find(|l| snapshot.get(l.ingredient_id).is_none())
        {
            return Err(CoreError::ingredient_not_found(missing.ingredient_id).into());
        }

        let id = self.store.insert_recipe(&new_recipe).await?;
        let recipe = new_recipe.with_id(id);
        let detail = RecipeDetail::build(&recipe, &snapshot)?;

        tracing::info!(
            recipe_id = id,
            lines = recipe.lines.len(),
            total_cost = detail.total_cost,
            "created recipe"
        );
        Ok(detail)
    }

    pub async fn get_recipe(&self, id: i64) -> Result<RecipeDetail> {
        let recipe = self
            .store
            .get_recipe(id)
            .await?
            .ok_or_else(|| CoreError::recipe_not_found(id))?;
        let snapshot = self.catalog.snapshot();
        Ok(RecipeDetail::build(&recipe, &snapshot)?)
    }

    pub async fn list_recipes(&self, skip: usize, limit: usize) -> Result<Vec<RecipeSummary>> {
        self.store.list_recipes(skip, limit).await
    }

    pub async fn health(&self) -> Result<HealthReport> {
        let counts = self.store.counts().await?;
        let snapshot = self.catalog.snapshot();
        Ok(HealthReport {
            status: "healthy".to_string(),
            ingredients_count: counts.ingredients,
            recipes_count: counts.recipes,
            catalog_generation: snapshot.generation(),
            catalog_size: snapshot.len(),
            text_mode: snapshot.text_mode(),
            embedding_model: snapshot.embedding_model().map(str::to_string),
        })
    }
}
