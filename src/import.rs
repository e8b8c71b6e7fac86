//! CSV seed-data import.
//!
//! Two formats, both with a header row:
//!
//! ```text
//! ingredients.csv  id,ingredient_name,energy,carb,protein,fat,sugar,water,fiber,cost_per_gram,supplier_name
//! recipes.csv      recipe_id,recipe_name,recipe_type,cuisine,ingredient_id,quantity_in_grams
//! ```
//!
//! Nutrition cells may be empty (unknown). Ingredient ids may be plain
//! (`7`) or labelled (`ing_007`). Recipe files carry one row per line;
//! rows are grouped by `recipe_id` in order of first appearance.
//!
//! Import is an upsert: existing ingredients are updated in place and
//! existing recipes have their lines replaced.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use recipe_harness_core::ids::IngredientId;
use recipe_harness_core::models::{Ingredient, NewRecipe, NutritionProfile, Recipe, RecipeLine};
use recipe_harness_core::store::Store;

#[derive(Debug, Deserialize)]
struct IngredientRow {
    id: String,
    ingredient_name: String,
    energy: Option<f64>,
    carb: Option<f64>,
    protein: Option<f64>,
    fat: Option<f64>,
    sugar: Option<f64>,
    water: Option<f64>,
    fiber: Option<f64>,
    cost_per_gram: f64,
    #[serde(default)]
    supplier_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecipeRow {
    recipe_id: i64,
    recipe_name: String,
    #[serde(default)]
    recipe_type: Option<String>,
    #[serde(default)]
    cuisine: Option<String>,
    ingredient_id: String,
    quantity_in_grams: f64,
}

/// What an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub ingredients: usize,
    pub recipes: usize,
    pub recipe_lines: usize,
}

fn csv_reader<R: Read>(input: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(input)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse and validate ingredient rows.
pub fn read_ingredients<R: Read>(input: R) -> Result<Vec<Ingredient>> {
    let mut reader = csv_reader(input);
    let mut ingredients = Vec::new();

    for (i, row) in reader.deserialize::<IngredientRow>().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = row.with_context(|| format!("ingredients: malformed row at line {}", line))?;
        let ingredient = Ingredient {
            id: IngredientId::parse(&row.id)
                .with_context(|| format!("ingredients: line {}", line))?,
            name: row.ingredient_name,
            nutrition: NutritionProfile {
                energy: row.energy,
                carb: row.carb,
                protein: row.protein,
                fat: row.fat,
                sugar: row.sugar,
                water: row.water,
                fiber: row.fiber,
            },
            cost_per_gram: row.cost_per_gram,
            supplier_name: row.supplier_name.unwrap_or_default(),
        };
        ingredient
            .validate()
            .with_context(|| format!("ingredients: line {}", line))?;
        ingredients.push(ingredient);
    }

    Ok(ingredients)
}

/// Parse recipe rows and group them into recipes.
pub fn read_recipes<R: Read>(input: R) -> Result<Vec<Recipe>> {
    let mut reader = csv_reader(input);
    let mut recipes: Vec<Recipe> = Vec::new();

    for (i, row) in reader.deserialize::<RecipeRow>().enumerate() {
        let line = i + 2;
        let row = row.with_context(|| format!("recipes: malformed row at line {}", line))?;
        let recipe_line = RecipeLine::new(&row.ingredient_id, row.quantity_in_grams)
            .with_context(|| format!("recipes: line {}", line))?;

        match recipes.iter_mut().find(|r| r.id == row.recipe_id) {
            Some(existing) => existing.lines.push(recipe_line),
            None => recipes.push(Recipe {
                id: row.recipe_id,
                name: row.recipe_name,
                recipe_type: non_empty(row.recipe_type),
                cuisine: non_empty(row.cuisine),
                lines: vec![recipe_line],
            }),
        }
    }

    for recipe in &recipes {
        NewRecipe {
            name: recipe.name.clone(),
            recipe_type: None,
            cuisine: None,
            lines: recipe.lines.clone(),
        }
        .validate()
        .with_context(|| format!("recipes: recipe {}", recipe.id))?;
    }

    Ok(recipes)
}

/// Import the given files into `store`. Either path may be omitted.
///
/// Everything is parsed and validated before anything is written.
pub async fn import_files(
    store: &dyn Store,
    ingredients_path: Option<&Path>,
    recipes_path: Option<&Path>,
) -> Result<ImportReport> {
    let ingredients = match ingredients_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_ingredients(file)?
        }
        None => Vec::new(),
    };
    let recipes = match recipes_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            read_recipes(file)?
        }
        None => Vec::new(),
    };

    let mut report = ImportReport::default();
    if !ingredients.is_empty() {
        report.ingredients = store.upsert_ingredients(&ingredients).await?;
    }
    for recipe in &recipes {
        store.upsert_recipe(recipe).await?;
        report.recipes += 1;
        report.recipe_lines += recipe.lines.len();
    }

    tracing::info!(
        ingredients = report.ingredients,
        recipes = report.recipes,
        recipe_lines = report.recipe_lines,
        "import finished"
    );
    Ok(report)
}
