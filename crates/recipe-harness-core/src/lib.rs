//! # Recipe Harness Core
//!
//! Runtime-free logic for Recipe Harness: ingredient and recipe models,
//! identifier normalization, the feature builder, the substitute-ranking
//! engine, recipe aggregation, the catalog service, and the store
//! abstraction.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or network access.
//! Embedding backends plug in through [`embedding::EmbeddingProvider`].
//!
//! ```text
//! Store ──► Vec<Ingredient> ──► Catalog::rebuild
//!                                   │
//!                                   ▼
//!                         CatalogSnapshot (Arc, swapped whole)
//!                          ├─ features::build_features   (once per snapshot)
//!                          ├─ similarity::rank_substitutes (per request)
//!                          └─ aggregate::aggregate         (per request)
//! ```

pub mod aggregate;
pub mod catalog;
pub mod embedding;
pub mod error;
pub mod features;
pub mod ids;
pub mod models;
pub mod similarity;
pub mod store;

pub use catalog::{Catalog, CatalogSettings, CatalogSnapshot};
pub use error::{CoreError, CoreResult};
pub use ids::IngredientId;
