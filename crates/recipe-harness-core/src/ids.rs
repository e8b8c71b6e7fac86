//! Ingredient identifier normalization.
//!
//! Identifiers arrive in two shapes: plain numbers (`"7"`, `"007"`) and
//! labelled numbers (`"ing_007"`, `"ING-12"`). Both normalize to the same
//! canonical numeric identifier. [`IngredientId::parse`] is the only parser;
//! every ingress point (substitute lookup, recipe lines, CSV import, storage)
//! goes through it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Canonical ingredient identifier.
///
/// Ordered numerically, which is the tie-break order used when ranking
/// substitutes. Serialized as a decimal string (`"7"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IngredientId(u64);

impl IngredientId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    /// Parse a raw identifier into canonical form.
    ///
    /// Accepts an optional non-numeric label followed by a numeric suffix.
    /// Leading zeros in the numeric part are dropped.
    ///
    /// ```rust
    /// use recipe_harness_core::ids::IngredientId;
    ///
    /// assert_eq!(IngredientId::parse("ing_007").unwrap().to_string(), "7");
    /// assert_eq!(IngredientId::parse("12").unwrap().to_string(), "12");
    /// assert!(IngredientId::parse("sugar").is_err());
    /// ```
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::invalid("ingredient id must not be empty"));
        }

        let digits_start = trimmed
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_digit())
            .last()
            .map(|(i, _)| i)
            .ok_or_else(|| malformed(raw))?;

        let (label, digits) = trimmed.split_at(digits_start);
        if label.chars().any(|c| c.is_ascii_digit() || c.is_whitespace()) {
            return Err(malformed(raw));
        }

        digits.parse::<u64>().map(Self).map_err(|_| malformed(raw))
    }
}

fn malformed(raw: &str) -> CoreError {
    CoreError::invalid(format!("malformed ingredient id: '{}'", raw))
}

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for IngredientId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for IngredientId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IngredientId> for String {
    fn from(id: IngredientId) -> Self {
        id.to_string()
    }
}
