//! Recipe cost and nutrition totals.
//!
//! Totals are a pure function of a recipe's lines and the active catalog
//! snapshot. Nothing here is persisted; callers recompute on every read.
//!
//! ```text
//! total_cost        = Σ cost_per_gram × grams
//! total[nutrient]   = Σ per_100g[nutrient] × grams / 100
//! ```
//!
//! Accumulation runs at full `f64` precision. Rounding to two decimals
//! happens only in [`RecipeTotals::rounded`].

use serde::{Deserialize, Serialize};

use crate::catalog::CatalogSnapshot;
use crate::error::{CoreError, CoreResult};
use crate::models::{Nutrient, NutritionProfile, RecipeLine};

/// Decimal places used when totals leave the core.
pub const TOTAL_DECIMALS: u32 = 2;

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Summed nutrition for a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    pub energy: f64,
    pub carb: f64,
    pub protein: f64,
    pub fat: f64,
    pub sugar: f64,
    pub water: f64,
    pub fiber: f64,
}

impl NutritionTotals {
    pub fn get(&self, nutrient: Nutrient) -> f64 {
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

    fn slot(&mut self, nutrient: Nutrient) -> &mut f64 {
        match nutrient {
            Nutrient::Energy => &mut self.energy,
            Nutrient::Carb => &mut self.carb,
            Nutrient::Protein => &mut self.protein,
            Nutrient::Fat => &mut self.fat,
            Nutrient::Sugar => &mut self.sugar,
            Nutrient::Water => &mut self.water,
            Nutrient::Fiber => &mut self.fiber,
        }
    }

    /// Add `grams` worth of a per-100 g profile. Absent values add nothing.
    pub fn add_scaled(&mut self, per_100g: &NutritionProfile, grams: f64) {
        for nutrient in Nutrient::ALL {
            *self.slot(nutrient) += per_100g.value_or_zero(nutrient) * grams / 100.0;
        }
    }

    pub fn rounded(&self, places: u32) -> Self {
        let mut out = *self;
        for nutrient in Nutrient::ALL {
            let slot = out.slot(nutrient);
            *slot = round_to(*slot, places);
        }
        out
    }
}

/// Total cost and nutrition of a list of recipe lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecipeTotals {
    pub total_cost: f64,
    pub total_nutrition: NutritionTotals,
}

impl RecipeTotals {
    /// Output-boundary view, rounded to [`TOTAL_DECIMALS`] places.
    pub fn rounded(&self) -> Self {
        Self {
            total_cost: round_to(self.total_cost, TOTAL_DECIMALS),
            total_nutrition: self.total_nutrition.rounded(TOTAL_DECIMALS),
        }
    }
}

/// Compute totals for `lines` against `snapshot`.
///
/// Fails with [`CoreError::Inconsistent`] if any line references an
/// ingredient the snapshot does not hold. No partial totals are returned.
pub fn aggregate(lines: &[RecipeLine], snapshot: &CatalogSnapshot) -> CoreResult<RecipeTotals> {
    let mut totals = RecipeTotals::default();

    for line in lines {
        let ingredient = snapshot.get(line.ingredient_id).ok_or_else(|| {
            CoreError::Inconsistent(format!(
                "recipe references ingredient {} which is not in catalog generation {}",
                line.ingredient_id,
                snapshot.generation()
            ))
        })?;

        totals.total_cost += ingredient.cost_per_gram * line.quantity_grams;
        totals
            .total_nutrition
            .add_scaled(&ingredient.nutrition, line.quantity_grams);
    }

    Ok(totals)
}
