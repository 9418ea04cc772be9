//! # Database Error Types
//!
//! Error types for storage operations.
//!
//! ## Error Flow
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Error Propagation                        │
//! │                                                              │
//! │  SQLite error (sqlx::Error)                                  │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  DbError (this module) ← classifies constraint violations    │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  CommerceError (workflows) ← domain-specific kinds           │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  Routing layer maps to user-facing responses                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use bazaar_core::ValidationError;
use thiserror::Error;

/// Storage operation errors.
///
/// Repositories surface the narrowest kind they can detect: a key that
/// doesn't resolve is `NotFound`, a duplicate email/username/cart line is
/// `UniqueViolation` (the taxonomy's Conflict), a rejected payload is
/// `Validation`.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in the database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique constraint violation (duplicate email, username, or
    /// (user, product) cart line).
    #[error("duplicate value for {constraint}")]
    UniqueViolation { constraint: String },

    /// Foreign key constraint violation (referencing a missing row).
    #[error("foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Payload failed field validation before any write happened.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Database connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed. Fatal at startup: the process cannot serve
    /// without a valid schema.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A transaction could not commit (e.g. a concurrent writer conflict).
    /// Safe to retry: a failed commit leaves no partial state.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and key.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "record",
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if msg.contains("UNIQUE constraint failed") {
                    let constraint = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { constraint }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for storage operations.
pub type DbResult<T> = Result<T, DbError>;
