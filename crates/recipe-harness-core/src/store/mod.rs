//! Storage abstraction for Recipe Harness.
//!
//! The [`Store`] trait defines the persistence operations the application
//! needs: the ingredient collection a catalog is built from, and recipes
//! (lines only, never totals). Backends are pluggable: SQLite in the app
//! crate, [`memory::InMemoryStore`] for tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Ingredient, NewRecipe, Recipe, RecipeSummary};

/// Row counts for health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub ingredients: u64,
    pub recipes: u64,
}

/// Abstract storage backend for Recipe Harness.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_ingredients`](Store::upsert_ingredients) | Insert or replace ingredient records |
/// | [`list_ingredients`](Store::list_ingredients) | Every ingredient, ordered by id |
/// | [`insert_recipe`](Store::insert_recipe) | Store a new recipe, assigning its id |
/// | [`upsert_recipe`](Store::upsert_recipe) | Store a recipe under a known id, replacing its lines |
/// | [`get_recipe`](Store::get_recipe) | Retrieve one recipe with its lines |
/// | [`list_recipes`](Store::list_recipes) | Paginated recipe summaries, ordered by id |
/// | [`counts`](Store::counts) | Row counts |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or replace ingredients by id. Returns the number written.
    async fn upsert_ingredients(&self, ingredients: &[Ingredient]) -> Result<usize>;

    /// Every stored ingredient, ordered by ascending id.
    async fn list_ingredients(&self) -> Result<Vec<Ingredient>>;

    /// Store a new recipe. Ids increase monotonically and are never reused.
    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<i64>;

    /// Store a recipe under `recipe.id`, replacing any existing lines.
    async fn upsert_recipe(&self, recipe: &Recipe) -> Result<()>;

    async fn get_recipe(&self, id: i64) -> Result<Option<Recipe>>;

    async fn list_recipes(&self, skip: usize, limit: usize) -> Result<Vec<RecipeSummary>>;

    async fn counts(&self) -> Result<StoreCounts>;
}
