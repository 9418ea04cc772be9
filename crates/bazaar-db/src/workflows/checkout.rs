//! # Checkout Workflow
//!
//! Atomically converts a user's cart into a persisted order.
//!
//! ## State Machine (single forward path)
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  1. Load cart (product include)                              │
//! │       └── empty → EmptyCart, nothing written                 │
//! │  2. Validate stock per line                                  │
//! │       └── violation → InsufficientStock, nothing written     │
//! │  3. Total = Σ price × quantity (current prices, about to be  │
//! │     snapshotted)                                             │
//! │  4. Commit phase, one WriteTx:                               │
//! │       create order (pending, total)                          │
//! │       create one order item per line (price snapshot)        │
//! │       guarded stock decrement per line ──┐                   │
//! │       clear the cart                     │ guard miss:       │
//! │       commit                             │ scope dropped,    │
//! │                                          ▼ full rollback     │
//! │  5. Return the order with items + product summaries          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 2 and 4 are deliberately redundant: the pre-check gives a
//! precise early error, while the in-transaction guard re-validates so
//! two checkouts racing on stale stock cannot jointly oversell. Callers
//! supply only the user id — prices and totals are read internally, so a
//! tampered request cannot influence what is charged.
//!
//! There is no cancellation: once the commit phase starts it runs to
//! commit or full rollback, and a failed commit is safe to retry.

use tracing::info;

use super::CommerceError;
use crate::error::DbError;
use crate::pool::Database;
use bazaar_core::{CartEntry, Money, OrderLine, OrderWithItems, ProductSummary};

/// Converts the user's cart into an order. See the module docs for the
/// state machine.
pub async fn checkout(db: &Database, user_id: &str) -> Result<OrderWithItems, CommerceError> {
    // 1. Load the cart with products expanded.
    let lines = db.cart_items().find_for_user(user_id).await?;
    if lines.is_empty() {
        return Err(CommerceError::EmptyCart);
    }

    // 2. Validate stock against what we just read.
    for line in &lines {
        if !line.product.can_fulfill(line.quantity) {
            return Err(insufficient(line, line.product.stock));
        }
    }

    // 3. Total from current prices; the same prices get snapshotted into
    //    the order items below.
    let total: Money = lines.iter().map(CartEntry::line_total).sum();

    // 4. Commit phase.
    let mut tx = db.begin_write().await.map_err(tx_err)?;

    let order = tx.create_order(user_id, total).await.map_err(tx_err)?;

    let mut order_items = Vec::with_capacity(lines.len());
    for line in &lines {
        let item = tx
            .add_order_item(&order.id, &line.product.id, line.quantity, line.product.price())
            .await
            .map_err(tx_err)?;
        order_items.push(OrderLine {
            item,
            product: ProductSummary::from(&line.product),
        });
    }

    for line in &lines {
        let applied = tx
            .decrement_stock(&line.product.id, line.quantity)
            .await
            .map_err(tx_err)?;
        if !applied {
            // A concurrent checkout drained the stock between our read
            // and this statement. Read the surviving value for the
            // error, then let the scope drop: full rollback, no order,
            // no decrements, cart untouched.
            let available = tx
                .stock_of(&line.product.id)
                .await
                .map_err(tx_err)?
                .unwrap_or(0);
            return Err(insufficient(line, available));
        }
    }

    tx.clear_cart(user_id).await.map_err(tx_err)?;
    tx.commit().await.map_err(tx_err)?;

    info!(
        order_id = %order.id,
        user_id = %user_id,
        total = %total,
        lines = order_items.len(),
        "Checkout complete"
    );

    // 5. Assembled from the rows written above.
    Ok(OrderWithItems { order, order_items })
}

fn insufficient(line: &CartEntry, available: i64) -> CommerceError {
    CommerceError::InsufficientStock {
        product_id: line.product.id.clone(),
        name: line.product.name.clone(),
        available,
        requested: line.quantity,
    }
}

fn tx_err(err: DbError) -> CommerceError {
    CommerceError::Transaction(err)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::workflows::cart::{add_to_cart, view_cart};
    use bazaar_core::query::Filter;
    use bazaar_core::{NewProduct, NewUser, OrderStatus, ProductPatch};
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_user(db: &Database, name: &str) -> String {
        db.users()
            .create(NewUser {
                email: format!("{name}@example.com"),
                username: name.into(),
                password_hash: "hash".into(),
                role: None,
            })
            .await
            .unwrap()
            .id
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
        db.products()
            .create(NewProduct {
                name: name.into(),
                description: None,
                price_cents,
                image_url: None,
                category: "Misc".into(),
                stock: Some(stock),
            })
            .await
            .unwrap()
            .id
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().find_by_id(id).await.unwrap().unwrap().stock
    }

    async fn order_count(db: &Database) -> i64 {
        db.orders().count(&Filter::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_checkout_totals_stock_and_cart() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let a = seed_product(&db, "A", 1000, 5).await;
        let b = seed_product(&db, "B", 500, 3).await;

        add_to_cart(&db, &user, &a, 2).await.unwrap();
        add_to_cart(&db, &user, &b, 1).await.unwrap();

        let result = checkout(&db, &user).await.unwrap();

        // total == Σ price × quantity
        assert_eq!(result.order.total_cents, 2500);
        assert_eq!(result.order.status, OrderStatus::Pending);
        assert_eq!(result.order_items.len(), 2);
        let items_total: i64 = result
            .order_items
            .iter()
            .map(|line| line.item.line_total().cents())
            .sum();
        assert_eq!(items_total, result.order.total_cents);

        // Stock decremented by exactly the line quantities.
        assert_eq!(stock_of(&db, &a).await, 3);
        assert_eq!(stock_of(&db, &b).await, 2);

        // Cart emptied.
        assert!(view_cart(&db, &user).await.unwrap().items.is_empty());

        // And the order is persisted with the same shape.
        let fetched = db
            .orders()
            .find_for_user_scoped(&result.order.id, &user)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched.order.total_cents, 2500);
        assert_eq!(fetched.order_items.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_cart_creates_nothing() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;

        let err = checkout(&db, &user).await.unwrap_err();
        assert!(matches!(err, CommerceError::EmptyCart));
        assert_eq!(order_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_insufficient_stock_names_product_and_rolls_back() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let c = seed_product(&db, "C", 700, 3).await;

        add_to_cart(&db, &user, &c, 3).await.unwrap();

        // Stock drops after the cart was filled (admin correction).
        db.products()
            .update(
                &c,
                ProductPatch {
                    stock: Some(2),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = checkout(&db, &user).await.unwrap_err();
        match err {
            CommerceError::InsufficientStock {
                name,
                available,
                requested,
                ..
            } => {
                assert_eq!(name, "C");
                assert_eq!(available, 2);
                assert_eq!(requested, 3);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Nothing happened: no order rows, stock unchanged, cart intact.
        assert_eq!(order_count(&db).await, 0);
        assert_eq!(stock_of(&db, &c).await, 2);
        assert_eq!(view_cart(&db, &user).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_checkout_is_retryable() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let c = seed_product(&db, "C", 700, 2).await;

        add_to_cart(&db, &user, &c, 2).await.unwrap();
        db.products()
            .update(
                &c,
                ProductPatch {
                    stock: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(checkout(&db, &user).await.is_err());

        // Restock and retry the same cart — no manual cleanup needed.
        db.products()
            .update(
                &c,
                ProductPatch {
                    stock: Some(5),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = checkout(&db, &user).await.unwrap();
        assert_eq!(result.order.total_cents, 1400);
        assert_eq!(stock_of(&db, &c).await, 3);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_for_last_unit() {
        // File-backed database so both checkouts hold real connections.
        let path = std::env::temp_dir().join(format!("bazaar-test-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path)).await.unwrap();

        let ada = seed_user(&db, "ada").await;
        let bob = seed_user(&db, "bob").await;
        let product = seed_product(&db, "Last One", 9900, 1).await;

        add_to_cart(&db, &ada, &product, 1).await.unwrap();
        add_to_cart(&db, &bob, &product, 1).await.unwrap();

        let (ada_result, bob_result) = tokio::join!(checkout(&db, &ada), checkout(&db, &bob));

        // Exactly one side wins, whatever the interleaving.
        let successes = [ada_result.is_ok(), bob_result.is_ok()]
            .iter()
            .filter(|ok| **ok)
            .count();
        assert_eq!(successes, 1);

        // The loser saw a stock failure or a transaction conflict —
        // never a partial write.
        for result in [&ada_result, &bob_result] {
            if let Err(err) = result {
                assert!(matches!(
                    err,
                    CommerceError::InsufficientStock { .. } | CommerceError::Transaction(_)
                ));
            }
        }

        // Stock never goes negative; exactly one order exists.
        assert_eq!(stock_of(&db, &product).await, 0);
        assert_eq!(order_count(&db).await, 1);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
