//! CLI command implementations.
//!
//! Each `run_*` function backs one `recipe` subcommand and prints
//! human-readable output to stdout. Commands that only read or write
//! storage open the database directly; commands that rank or price open
//! the full [`RecipeService`] so the catalog is built first.

use anyhow::Result;
use std::path::Path;

use recipe_harness_core::models::NutritionProfile;
use recipe_harness_core::store::Store;

use crate::config::Config;
use crate::import::import_files;
use crate::service::{open_store, RecipeService};

fn fmt_nutrient(value: Option<f64>) -> String {
    value.map(|v| format!("{}", v)).unwrap_or_else(|| "-".to_string())
}

fn nutrition_line(n: &NutritionProfile) -> String {
    format!(
        "energy {} | carb {} | protein {} | fat {} | sugar {} | water {} | fiber {}",
        fmt_nutrient(n.energy),
        fmt_nutrient(n.carb),
        fmt_nutrient(n.protein),
        fmt_nutrient(n.fat),
        fmt_nutrient(n.sugar),
        fmt_nutrient(n.water),
        fmt_nutrient(n.fiber),
    )
}

pub async fn run_import(
    config: &Config,
    ingredients: Option<&Path>,
    recipes: Option<&Path>,
) -> Result<()> {
    if ingredients.is_none() && recipes.is_none() {
        anyhow::bail!("nothing to import: pass --ingredients and/or --recipes");
    }

    let store = open_store(config).await?;
    let report = import_files(&store, ingredients, recipes).await?;
    store.pool().close().await;

    println!(
        "Imported {} ingredients, {} recipes ({} lines).",
        report.ingredients, report.recipes, report.recipe_lines
    );
    Ok(())
}

pub async fn run_ingredients(config: &Config, skip: usize, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let ingredients = store.list_ingredients().await?;
    store.pool().close().await;

    let page: Vec<_> = ingredients.iter().skip(skip).take(limit).collect();
    if page.is_empty() {
        println!("No ingredients.");
        return Ok(());
    }

    for ing in page {
        println!("{:>5}  {}", ing.id, ing.name);
        println!(
            "       cost/g: {}  supplier: {}",
            ing.cost_per_gram,
            if ing.supplier_name.is_empty() {
                "-"
            } else {
                ing.supplier_name.as_str()
            }
        );
        println!("       {}", nutrition_line(&ing.nutrition));
    }
    Ok(())
}

pub async fn run_substitutes(
    config: &Config,
    id: &str,
    limit: Option<usize>,
    explain: bool,
) -> Result<()> {
    let service = RecipeService::open(config).await?;
    let results = service.find_substitutes(id, limit, explain)?;

    if results.is_empty() {
        println!("No substitutes.");
        return Ok(());
    }

    let snapshot = service.catalog().snapshot();
    println!(
        "Substitutes for {} (text mode: {}):",
        id.trim(),
        snapshot.text_mode()
    );
    for (i, r) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} (id {})",
            i + 1,
            r.similarity_score,
            r.ingredient_name,
            r.ingredient_id
        );
        println!("    cost/g: {}  supplier: {}", r.cost_per_gram, r.supplier_name);
        if let Some(b) = &r.explain {
            let semantic = b
                .semantic
                .map(|s| format!("{:.4}", s))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "    nutrition={:.4} semantic={} string={:.4} text={:.4} combined={:.4}",
                b.nutrition, semantic, b.string, b.text, b.combined
            );
        }
    }
    Ok(())
}

pub async fn run_recipe(config: &Config, id: i64) -> Result<()> {
    let service = RecipeService::open(config).await?;
    let detail = service.get_recipe(id).await?;

    println!("--- Recipe {} ---", detail.recipe_id);
    println!("name:    {}", detail.recipe_name);
    println!("type:    {}", detail.recipe_type.as_deref().unwrap_or("-"));
    println!("cuisine: {}", detail.cuisine.as_deref().unwrap_or("-"));
    println!();
    println!("--- Ingredients ({}) ---", detail.ingredients.len());
    for line in &detail.ingredients {
        println!(
            "{:>8} g  {} (id {})",
            line.quantity_in_grams, line.ingredient_name, line.ingredient_id
        );
    }
    println!();
    let n = &detail.total_nutrition;
    println!("--- Totals ---");
    println!("cost:    {:.2}", detail.total_cost);
    println!("energy:  {:.2}", n.energy);
    println!("carb:    {:.2}", n.carb);
    println!("protein: {:.2}", n.protein);
    println!("fat:     {:.2}", n.fat);
    println!("sugar:   {:.2}", n.sugar);
    println!("water:   {:.2}", n.water);
    println!("fiber:   {:.2}", n.fiber);
    Ok(())
}

pub async fn run_recipes(config: &Config, skip: usize, limit: usize) -> Result<()> {
    let store = open_store(config).await?;
    let recipes = store.list_recipes(skip, limit).await?;
    store.pool().close().await;

    if recipes.is_empty() {
        println!("No recipes.");
        return Ok(());
    }
    for r in recipes {
        println!(
            "{:>5}  {}  [{} / {}]",
            r.recipe_id,
            r.recipe_name,
            r.recipe_type.as_deref().unwrap_or("-"),
            r.cuisine.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
