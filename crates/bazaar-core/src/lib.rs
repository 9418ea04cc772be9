//! # bazaar-core: Pure Domain Logic for Bazaar
//!
//! This crate is the heart of the bazaar commerce backend. It contains the
//! entity types, money arithmetic, the query-descriptor AST, and input
//! validation — all as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Bazaar Architecture                      │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        Routing layer (HTTP, auth) — out of scope       │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                              │                               │
//! │  ┌───────────────────────────▼────────────────────────────┐  │
//! │  │                bazaar-db (storage layer)               │  │
//! │  │     repositories, transactions, cart + checkout        │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                              │                               │
//! │  ┌───────────────────────────▼────────────────────────────┐  │
//! │  │            ★ bazaar-core (THIS CRATE) ★                │  │
//! │  │                                                        │  │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌────────────┐   │  │
//! │  │   │  types  │ │  money  │ │  query  │ │ validation │   │  │
//! │  │   │ Product │ │  Money  │ │ Filter  │ │   rules    │   │  │
//! │  │   │  Order  │ │ (cents) │ │  Page   │ │   checks   │   │  │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └────────────┘   │  │
//! │  │                                                        │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS   │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Entity types (User, Product, CartItem, Order, Post, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`query`] - Declarative filter/sort/paginate descriptors
//! - [`error`] - Validation error types
//! - [`validation`] - Field-level validation rules

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod query;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::ValidationError;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single product in a cart line.
///
/// Prevents accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Role assigned to newly registered users when none is given.
pub const DEFAULT_ROLE: types::Role = types::Role::Customer;
