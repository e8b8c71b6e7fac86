//! Error kinds reported by the core.
//!
//! Every core operation either fully succeeds or fails with one of these
//! kinds. None of them is retried internally: lookups are deterministic, so
//! a failure is reported straight back to the caller.

use thiserror::Error;

/// Result alias used throughout the core.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in catalog, similarity, and aggregation operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// An ingredient or recipe identifier did not resolve.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A caller-supplied value was rejected (non-positive quantity or limit,
    /// malformed identifier, invalid weights).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A capability needed at catalog-build time was missing. The feature
    /// builder recovers from this locally; it is never a request error.
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Stored state references something absent from the active catalog,
    /// e.g. a recipe line pointing at an ingredient that no longer exists.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),
}

impl CoreError {
    pub fn ingredient_not_found(id: impl ToString) -> Self {
        CoreError::NotFound {
            kind: "ingredient",
            id: id.to_string(),
        }
    }

    pub fn recipe_not_found(id: impl ToString) -> Self {
        CoreError::NotFound {
            kind: "recipe",
            id: id.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        CoreError::InvalidArgument(message.into())
    }

    /// Machine-readable code used by the HTTP error contract.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "not_found",
            CoreError::InvalidArgument(_) => "bad_request",
            CoreError::DependencyUnavailable(_) => "dependency_unavailable",
            CoreError::Inconsistent(_) => "inconsistent",
        }
    }
}
