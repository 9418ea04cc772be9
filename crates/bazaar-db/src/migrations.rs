//! # Database Migrations
//!
//! Embedded SQL migrations for the bazaar schema.
//!
//! ## How This Works
//! The `sqlx::migrate!()` macro embeds all SQL files from
//! `migrations/sqlite/` into the binary at compile time. On startup the
//! migrator compares embedded migrations against the `_sqlx_migrations`
//! table and applies whatever is pending, in filename order, each inside
//! its own transaction. Running it against an up-to-date database is a
//! no-op, so it is safe to call on every process start.
//!
//! ## Adding New Migrations
//! 1. Create a new file in `migrations/sqlite/` with the next sequence
//!    number (`NNN_description.sql`)
//! 2. NEVER modify an already-shipped migration — always add a new one

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Failure here is fatal to startup: the process cannot serve without a
/// valid schema.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns (total embedded migrations, applied migrations), for
/// diagnostics and health checks.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
