//! # bazaar-db: Database Layer for Bazaar
//!
//! This crate provides storage and the composite commerce workflows for
//! the bazaar backend. It uses SQLite via sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Bazaar Data Flow                        │
//! │                                                              │
//! │  Routing layer (out of scope)                                │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │                 bazaar-db (THIS CRATE)                 │  │
//! │  │                                                        │  │
//! │  │  ┌──────────┐  ┌──────────────┐  ┌─────────────────┐   │  │
//! │  │  │ Database │  │ Repositories │  │    Workflows    │   │  │
//! │  │  │ (pool.rs)│  │ users        │  │ cart (merge-on- │   │  │
//! │  │  │          │◄─│ products     │◄─│  add, totals)   │   │  │
//! │  │  │SqlitePool│  │ cart_items   │  │ checkout (atomic│   │  │
//! │  │  │ WriteTx  │  │ orders,posts │  │  commit phase)  │   │  │
//! │  │  └──────────┘  └──────────────┘  └─────────────────┘   │  │
//! │  │        │                                               │  │
//! │  │  ┌─────▼─────┐  ┌──────────────┐                       │  │
//! │  │  │ query.rs  │  │ migrations   │                       │  │
//! │  │  │(translator│  │ (embedded)   │                       │  │
//! │  │  └───────────┘  └──────────────┘                       │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  SQLite database (WAL mode)                                  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Storage error types
//! - [`query`] - Query descriptor → SQL translation
//! - [`repository`] - Repository implementations (one per entity)
//! - [`tx`] - The write-transaction scope used by checkout
//! - [`workflows`] - Cart and checkout workflows
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bazaar_db::{Database, DbConfig};
//! use bazaar_db::workflows::checkout::checkout;
//!
//! let db = Database::new(DbConfig::new("path/to/bazaar.db")).await?;
//!
//! // Simple operations go through repositories...
//! let page = db.products().page(&filter, &page, &sort).await?;
//!
//! // ...composite ones through workflows.
//! let order = checkout(&db, &user_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod query;
pub mod repository;
pub mod tx;
pub mod workflows;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use tx::WriteTx;
pub use workflows::CommerceError;

// Repository re-exports for convenience
pub use repository::cart_items::CartItemRepository;
pub use repository::orders::OrderRepository;
pub use repository::posts::PostRepository;
pub use repository::products::ProductRepository;
pub use repository::users::UserRepository;
