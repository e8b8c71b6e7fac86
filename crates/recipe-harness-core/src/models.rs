//! Core data types: ingredients, nutrition profiles, recipes.
//!
//! Ingredients are immutable once they enter a catalog snapshot. Recipes
//! store only their lines; totals are always derived from the active
//! catalog (see [`crate::aggregate`]).

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::ids::IngredientId;

/// One of the seven tracked nutrients, all expressed per 100 grams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Energy,
    Carb,
    Protein,
    Fat,
    Sugar,
    Water,
    Fiber,
}

impl Nutrient {
    pub const ALL: [Nutrient; 7] = [
        Nutrient::Energy,
        Nutrient::Carb,
        Nutrient::Protein,
        Nutrient::Fat,
        Nutrient::Sugar,
        Nutrient::Water,
        Nutrient::Fiber,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Nutrient::Energy => "energy",
            Nutrient::Carb => "carb",
            Nutrient::Protein => "protein",
            Nutrient::Fat => "fat",
            Nutrient::Sugar => "sugar",
            Nutrient::Water => "water",
            Nutrient::Fiber => "fiber",
        }
    }
}

/// Nutrition per 100 grams. Unknown values are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionProfile {
    pub energy: Option<f64>,
    pub carb: Option<f64>,
    pub protein: Option<f64>,
    pub fat: Option<f64>,
    pub sugar: Option<f64>,
    pub water: Option<f64>,
    pub fiber: Option<f64>,
}

impl NutritionProfile {
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        match nutrient {
            Nutrient::Energy => self.energy,
            Nutrient::Carb => self.carb,
            Nutrient::Protein => self.protein,
            Nutrient::Fat => self.fat,
            Nutrient::Sugar => self.sugar,
            Nutrient::Water => self.water,
            Nutrient::Fiber => self.fiber,
        }
    }

    /// Value with unknowns imputed to zero.
    pub fn value_or_zero(&self, nutrient: Nutrient) -> f64 {
        self.get(nutrient).unwrap_or(0.0)
    }

    fn check_values(&self) -> Result<(), String> {
        for nutrient in Nutrient::ALL {
            if let Some(v) = self.get(nutrient) {
                if !v.is_finite() || v < 0.0 {
                    return Err(format!(
                        "{} must be a non-negative number, got {}",
                        nutrient.as_str(),
                        v
                    ));
                }
            }
        }
        Ok(())
    }
}

/// An ingredient record as held in a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub nutrition: NutritionProfile,
    pub cost_per_gram: f64,
    #[serde(default)]
    pub supplier_name: String,
}

impl Ingredient {
    /// Check the record invariants: non-empty name, non-negative finite
    /// cost and nutrition values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid(format!(
                "ingredient {} has an empty name",
                self.id
            )));
        }
        if !self.cost_per_gram.is_finite() || self.cost_per_gram < 0.0 {
            return Err(CoreError::invalid(format!(
                "ingredient {}: cost_per_gram must be a non-negative number, got {}",
                self.id, self.cost_per_gram
            )));
        }
        self.nutrition
            .check_values()
            .map_err(|e| CoreError::invalid(format!("ingredient {}: {}", self.id, e)))
    }
}

/// An ingredient reference plus a quantity in grams.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient_id: IngredientId,
    pub quantity_grams: f64,
}

impl RecipeLine {
    /// Build a line from a raw identifier, normalizing it and rejecting
    /// non-positive quantities.
    pub fn new(raw_id: &str, quantity_grams: f64) -> CoreResult<Self> {
        let ingredient_id = IngredientId::parse(raw_id)?;
        Self::from_parts(ingredient_id, quantity_grams)
    }

    pub fn from_parts(ingredient_id: IngredientId, quantity_grams: f64) -> CoreResult<Self> {
        if !quantity_grams.is_finite() || quantity_grams <= 0.0 {
            return Err(CoreError::invalid(format!(
                "quantity for ingredient {} must be positive, got {}",
                ingredient_id, quantity_grams
            )));
        }
        Ok(Self {
            ingredient_id,
            quantity_grams,
        })
    }
}

/// A recipe before it has been assigned an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    #[serde(default)]
    pub recipe_type: Option<String>,
    #[serde(default)]
    pub cuisine: Option<String>,
    pub lines: Vec<RecipeLine>,
}

impl NewRecipe {
    /// Creation-time rules: a name and at least one line.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::invalid("recipe name must not be empty"));
        }
        if self.lines.is_empty() {
            return Err(CoreError::invalid("recipe must have at least one ingredient"));
        }
        for line in &self.lines {
            RecipeLine::from_parts(line.ingredient_id, line.quantity_grams)?;
        }
        Ok(())
    }

    pub fn with_id(self, id: i64) -> Recipe {
        Recipe {
            id,
            name: self.name,
            recipe_type: self.recipe_type,
            cuisine: self.cuisine,
            lines: self.lines,
        }
    }
}

/// A stored recipe. Carries no totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub recipe_type: Option<String>,
    pub cuisine: Option<String>,
    pub lines: Vec<RecipeLine>,
}

/// Listing view of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub recipe_type: Option<String>,
    pub cuisine: Option<String>,
}

impl From<&Recipe> for RecipeSummary {
    fn from(r: &Recipe) -> Self {
        Self {
            recipe_id: r.id,
            recipe_name: r.name.clone(),
            recipe_type: r.recipe_type.clone(),
            cuisine: r.cuisine.clone(),
        }
    }
}
