//! # Write-Transaction Scope
//!
//! [`WriteTx`] is the transaction coordinator's scope object: it owns a
//! SQLite transaction and exposes only the operations the checkout commit
//! phase is allowed to perform. All of them either commit together via
//! [`WriteTx::commit`] or none take effect — dropping the scope without
//! committing rolls back, so every early-error path leaves no partial
//! state behind.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Checkout Commit Phase                        │
//! │                                                              │
//! │  begin_write()                                               │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  create_order ─► add_order_item (×N)                         │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  decrement_stock (×N, guarded: stock >= qty)                 │
//! │       │                ├── guard miss → drop scope → rollback│
//! │       ▼                                                      │
//! │  clear_cart ─► commit()                                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! There are no savepoints and no nested transactions; the scope cannot
//! be re-entered once committed or rolled back (both consume it).

use chrono::Utc;
use sqlx::{Sqlite, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use bazaar_core::{Money, Order, OrderItem, OrderStatus};

/// An open write transaction over the checkout tables.
pub struct WriteTx {
    tx: Transaction<'static, Sqlite>,
}

impl WriteTx {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        WriteTx { tx }
    }

    /// Inserts a new pending order and returns it.
    pub async fn create_order(&mut self, user_id: &str, total: Money) -> DbResult<Order> {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            total_cents: total.cents(),
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        debug!(order_id = %order.id, total = %total, "Creating order");

        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, total_cents, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&order.id)
        .bind(&order.user_id)
        .bind(order.total_cents)
        .bind(order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(order)
    }

    /// Inserts an order line with the unit price snapshotted at purchase
    /// time. Later product price changes never touch this row.
    pub async fn add_order_item(
        &mut self,
        order_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price: Money,
    ) -> DbResult<OrderItem> {
        let item = OrderItem {
            id: Uuid::new_v4().to_string(),
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            price_cents: unit_price.cents(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO order_items (id, order_id, product_id, quantity, price_cents, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.order_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.price_cents)
        .bind(item.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(item)
    }

    /// Decrements a product's stock, guarded against overselling.
    ///
    /// The `stock >= ?` predicate re-validates availability under the
    /// transaction: two checkouts that both passed the pre-check against
    /// stale stock cannot both pass here. Returns whether the guard
    /// matched; `false` means the decrement did not happen and the caller
    /// must abandon the scope.
    pub async fn decrement_stock(&mut self, product_id: &str, by: i64) -> DbResult<bool> {
        let now = Utc::now();

        debug!(product_id = %product_id, by = %by, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - ?2, updated_at = ?3
            WHERE id = ?1 AND stock >= ?2
            "#,
        )
        .bind(product_id)
        .bind(by)
        .bind(now)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Reads a product's current stock inside the transaction. Used to
    /// report availability after a failed guard.
    pub async fn stock_of(&mut self, product_id: &str) -> DbResult<Option<i64>> {
        let stock = sqlx::query_scalar::<_, i64>("SELECT stock FROM products WHERE id = ?1")
            .bind(product_id)
            .fetch_optional(&mut *self.tx)
            .await?;

        Ok(stock)
    }

    /// Deletes all cart lines for a user. Returns the number removed.
    pub async fn clear_cart(&mut self, user_id: &str) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(result.rows_affected())
    }

    /// Commits the scope. Consumes it; a failed commit leaves no partial
    /// state and is safe for the caller to retry.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }

    /// Rolls the scope back explicitly. Dropping it has the same effect.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
