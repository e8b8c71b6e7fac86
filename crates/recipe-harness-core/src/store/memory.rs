//! In-memory [`Store`] implementation for testing.
//!
//! Uses `BTreeMap` behind `std::sync::RwLock`, so iteration order is the
//! id order the trait promises.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::ids::IngredientId;
use crate::models::{Ingredient, NewRecipe, Recipe, RecipeSummary};

use super::{Store, StoreCounts};

#[derive(Default)]
struct Recipes {
    rows: BTreeMap<i64, Recipe>,
    last_id: i64,
}

/// In-memory store for tests and throwaway catalogs.
pub struct InMemoryStore {
    ingredients: RwLock<BTreeMap<IngredientId, Ingredient>>,
    recipes: RwLock<Recipes>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            ingredients: RwLock::new(BTreeMap::new()),
            recipes: RwLock::new(Recipes::default()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn upsert_ingredients(&self, ingredients: &[Ingredient]) -> Result<usize> {
        let mut stored = self
            .ingredients
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for ingredient in ingredients {
            stored.insert(ingredient.id, ingredient.clone());
        }
        Ok(ingredients.len())
    }

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        let stored = self
            .ingredients
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(stored.values().cloned().collect())
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<i64> {
        let mut recipes = self.recipes.write().unwrap_or_else(PoisonError::into_inner);
        let id = recipes.last_id + 1;
        recipes.last_id = id;
        recipes.rows.insert(id, recipe.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_recipe(&self, recipe: &Recipe) -> Result<()> {
        let mut recipes = self.recipes.write().unwrap_or_else(PoisonError::into_inner);
        recipes.last_id = recipes.last_id.max(recipe.id);
        recipes.rows.insert(recipe.id, recipe.clone());
        Ok(())
    }

    async fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        let recipes = self.recipes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(recipes.rows.get(&id).cloned())
    }

    async fn list_recipes(&self, skip: usize, limit: usize) -> Result<Vec<RecipeSummary>> {
        let recipes = self.recipes.read().unwrap_or_else(PoisonError::into_inner);
        Ok(recipes
            .rows
            .values()
            .skip(skip)
            .take(limit)
            .map(RecipeSummary::from)
            .collect())
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let ingredients = self
            .ingredients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len() as u64;
        let recipes = self
            .recipes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len() as u64;
        Ok(StoreCounts {
            ingredients,
            recipes,
        })
    }
}
