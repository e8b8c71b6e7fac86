//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation to queries against the `ingredients`,
//! `recipes`, and `recipe_lines` tables created by [`crate::migrate`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use recipe_harness_core::ids::IngredientId;
use recipe_harness_core::models::{
    Ingredient, NewRecipe, NutritionProfile, Recipe, RecipeLine, RecipeSummary,
};
use recipe_harness_core::store::{Store, StoreCounts};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn id_to_sql(id: IngredientId) -> Result<i64> {
    i64::try_from(id.value()).with_context(|| format!("ingredient id {} exceeds i64 range", id))
}

fn id_from_sql(raw: i64) -> Result<IngredientId> {
    let value = u64::try_from(raw).with_context(|| format!("negative ingredient id {}", raw))?;
    Ok(IngredientId::new(value))
}

/// SQLite reads a negative OFFSET as 0, so out-of-range counts saturate.
fn to_sql_count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn ingredient_from_row(row: &SqliteRow) -> Result<Ingredient> {
    Ok(Ingredient {
        id: id_from_sql(row.get("id"))?,
        name: row.get("name"),
        nutrition: NutritionProfile {
            energy: row.get("energy"),
            carb: row.get("carb"),
            protein: row.get("protein"),
            fat: row.get("fat"),
            sugar: row.get("sugar"),
            water: row.get("water"),
            fiber: row.get("fiber"),
        },
        cost_per_gram: row.get("cost_per_gram"),
        supplier_name: row.get("supplier_name"),
    })
}

async fn write_lines(
    tx: &mut Transaction<'_, Sqlite>,
    recipe_id: i64,
    lines: &[RecipeLine],
) -> Result<()> {
    sqlx::query("DELETE FROM recipe_lines WHERE recipe_id = ?")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await?;

    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            "INSERT INTO recipe_lines (recipe_id, position, ingredient_id, quantity_grams) VALUES (?, ?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(position as i64)
        .bind(id_to_sql(line.ingredient_id)?)
        .bind(line.quantity_grams)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_ingredients(&self, ingredients: &[Ingredient]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for ing in ingredients {
            sqlx::query(
                r#"
                INSERT INTO ingredients (id, name, energy, carb, protein, fat, sugar, water,
                                         fiber, cost_per_gram, supplier_name)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    energy = excluded.energy,
                    carb = excluded.carb,
                    protein = excluded.protein,
                    fat = excluded.fat,
                    sugar = excluded.sugar,
                    water = excluded.water,
                    fiber = excluded.fiber,
                    cost_per_gram = excluded.cost_per_gram,
                    supplier_name = excluded.supplier_name
                "#,
            )
            .bind(id_to_sql(ing.id)?)
            .bind(&ing.name)
            .bind(ing.nutrition.energy)
            .bind(ing.nutrition.carb)
            .bind(ing.nutrition.protein)
            .bind(ing.nutrition.fat)
            .bind(ing.nutrition.sugar)
            .bind(ing.nutrition.water)
            .bind(ing.nutrition.fiber)
            .bind(ing.cost_per_gram)
            .bind(&ing.supplier_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(ingredients.len())
    }

    async fn list_ingredients(&self) -> Result<Vec<Ingredient>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, energy, carb, protein, fat, sugar, water, fiber,
                   cost_per_gram, supplier_name
            FROM ingredients
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(ingredient_from_row).collect()
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO recipes (name, recipe_type, cuisine, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&recipe.name)
        .bind(&recipe.recipe_type)
        .bind(&recipe.cuisine)
        .bind(chrono::Utc::now().timestamp())
        .fetch_one(&mut *tx)
        .await?;

        write_lines(&mut tx, id, &recipe.lines).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn upsert_recipe(&self, recipe: &Recipe) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO recipes (id, name, recipe_type, cuisine, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                recipe_type = excluded.recipe_type,
                cuisine = excluded.cuisine
            "#,
        )
        .bind(recipe.id)
        .bind(&recipe.name)
        .bind(&recipe.recipe_type)
        .bind(&recipe.cuisine)
        .bind(chrono::Utc::now().timestamp())
        .execute(&mut *tx)
        .await?;

        write_lines(&mut tx, recipe.id, &recipe.lines).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_recipe(&self, id: i64) -> Result<Option<Recipe>> {
        let row = sqlx::query("SELECT id, name, recipe_type, cuisine FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let line_rows = sqlx::query(
            "SELECT ingredient_id, quantity_grams FROM recipe_lines WHERE recipe_id = ? ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .iter()
            .map(|r| {
                Ok(RecipeLine {
                    ingredient_id: id_from_sql(r.get("ingredient_id"))?,
                    quantity_grams: r.get("quantity_grams"),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Recipe {
            id: row.get("id"),
            name: row.get("name"),
            recipe_type: row.get("recipe_type"),
            cuisine: row.get("cuisine"),
            lines,
        }))
    }

    async fn list_recipes(&self, skip: usize, limit: usize) -> Result<Vec<RecipeSummary>> {
        let rows = sqlx::query(
            "SELECT id, name, recipe_type, cuisine FROM recipes ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(to_sql_count(limit))
        .bind(to_sql_count(skip))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RecipeSummary {
                recipe_id: row.get("id"),
                recipe_name: row.get("name"),
                recipe_type: row.get("recipe_type"),
                cuisine: row.get("cuisine"),
            })
            .collect())
    }

    async fn counts(&self) -> Result<StoreCounts> {
        let ingredients: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
            .fetch_one(&self.pool)
            .await?;
        let recipes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes")
            .fetch_one(&self.pool)
            .await?;
        Ok(StoreCounts {
            ingredients: ingredients as u64,
            recipes: recipes as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};

    async fn open(dir: &tempfile::TempDir) -> SqliteStore {
        let toml = format!(
            "[db]\npath = \"{}\"\n",
            dir.path().join("store.sqlite").display()
        );
        let config: Config = toml::from_str(&toml).unwrap();
        let pool = db::connect(&config).await.unwrap();
        migrate::apply(&pool).await.unwrap();
        SqliteStore::new(pool)
    }

    fn ingredient(id: u64, name: &str, fat: Option<f64>) -> Ingredient {
        Ingredient {
            id: IngredientId::new(id),
            name: name.to_string(),
            nutrition: NutritionProfile {
                energy: Some(100.0),
                fat,
                ..Default::default()
            },
            cost_per_gram: 0.02,
            supplier_name: "Farm Co".to_string(),
        }
    }

    #[tokio::test]
    async fn test_ingredient_upsert_and_nullable_nutrition() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&dir).await;

        store
            .upsert_ingredients(&[ingredient(3, "Oats", None), ingredient(1, "Milk", Some(3.5))])
            .await
            .unwrap();
        store
            .upsert_ingredients(&[ingredient(3, "Rolled oats", Some(6.9))])
            .await
            .unwrap();

        let all = store.list_ingredients().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, IngredientId::new(1));
        assert_eq!(all[1].name, "Rolled oats");
        assert_eq!(all[1].nutrition.fat, Some(6.9));
        assert_eq!(all[1].nutrition.sugar, None);
    }

    #[tokio::test]
    async fn test_recipe_insert_get_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&dir).await;

        let recipe = NewRecipe {
            name: "Porridge".to_string(),
            recipe_type: Some("breakfast".to_string()),
            cuisine: None,
            lines: vec![
                RecipeLine::new("ing_003", 50.0).unwrap(),
                RecipeLine::new("ing_001", 200.0).unwrap(),
            ],
        };
        let id = store.insert_recipe(&recipe).await.unwrap();
        let second = store.insert_recipe(&recipe).await.unwrap();
        assert!(second > id);

        let loaded = store.get_recipe(id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Porridge");
        assert_eq!(loaded.cuisine, None);
        assert_eq!(loaded.lines, recipe.lines);

        let page = store.list_recipes(1, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].recipe_id, second);

        assert!(store.get_recipe(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_recipes_huge_skip_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&dir).await;
        store
            .insert_recipe(&NewRecipe {
                name: "Toast".to_string(),
                recipe_type: None,
                cuisine: None,
                lines: vec![RecipeLine::new("1", 30.0).unwrap()],
            })
            .await
            .unwrap();

        assert!(store.list_recipes(usize::MAX, 10).await.unwrap().is_empty());
        assert_eq!(store.list_recipes(0, usize::MAX).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upsert_recipe_replaces_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&dir).await;

        let mut recipe = Recipe {
            id: 7,
            name: "Soup".to_string(),
            recipe_type: None,
            cuisine: Some("french".to_string()),
            lines: vec![
                RecipeLine::new("1", 10.0).unwrap(),
                RecipeLine::new("2", 20.0).unwrap(),
            ],
        };
        store.upsert_recipe(&recipe).await.unwrap();
        recipe.lines = vec![RecipeLine::new("3", 30.0).unwrap()];
        store.upsert_recipe(&recipe).await.unwrap();

        let loaded = store.get_recipe(7).await.unwrap().unwrap();
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.lines[0].ingredient_id, IngredientId::new(3));

        let next = store
            .insert_recipe(&NewRecipe {
                name: "After import".to_string(),
                recipe_type: None,
                cuisine: None,
                lines: vec![RecipeLine::new("1", 1.0).unwrap()],
            })
            .await
            .unwrap();
        assert_eq!(next, 8);

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.recipes, 2);
    }

    #[tokio::test]
    async fn test_lines_require_existing_recipe() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&dir).await;
        let orphan = sqlx::query(
            "INSERT INTO recipe_lines (recipe_id, position, ingredient_id, quantity_grams) VALUES (404, 0, 1, 5.0)",
        )
        .execute(store.pool())
        .await;
        assert!(orphan.is_err());
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = open(&dir).await;
        migrate::apply(store.pool()).await.unwrap();
        migrate::apply(store.pool()).await.unwrap();
    }
}
