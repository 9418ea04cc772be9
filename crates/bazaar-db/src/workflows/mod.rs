//! # Workflows
//!
//! Composite operations built on the repositories: cart manipulation and
//! the checkout transaction. These are the pieces the routing layer calls
//! directly; repositories stay free of cross-entity policy.

pub mod cart;
pub mod checkout;

use thiserror::Error;

use crate::error::DbError;
use bazaar_core::ValidationError;

/// Failures surfaced by the cart and checkout workflows.
///
/// Repositories report the narrowest storage error they can (NotFound,
/// unique violation, validation); the workflows translate those plus
/// their own domain checks into this taxonomy for the routing layer.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// A payload field failed validation. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist (or is not visible to the
    /// calling user).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Checkout was invoked on an empty cart. Nothing was written.
    #[error("cart is empty")]
    EmptyCart,

    /// A line's quantity exceeds the product's available stock. Carries
    /// the offending product's identity.
    #[error("insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// The checkout commit phase aborted — e.g. a concurrent writer
    /// conflict. No partial effects are visible; safe to retry.
    #[error("checkout transaction aborted: {0}")]
    Transaction(#[source] DbError),

    /// Any other storage failure (including unique-constraint conflicts).
    #[error(transparent)]
    Storage(#[from] DbError),
}

impl CommerceError {
    fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CommerceError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
