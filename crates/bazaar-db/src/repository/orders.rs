//! # Order Repository
//!
//! Database operations for orders and their lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Order Lifecycle                          │
//! │                                                              │
//! │  1. CREATE (checkout transaction scope only)                 │
//! │     └── order + order_items written atomically               │
//! │                                                              │
//! │  2. READ                                                     │
//! │     └── always expanded: items with product summaries        │
//! │                                                              │
//! │  3. STATUS UPDATES                                           │
//! │     └── pending / processing / shipped / delivered /         │
//! │         cancelled — any value may overwrite any other        │
//! │                                                              │
//! │  Everything else about an order is immutable after creation. │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Creation lives on [`WriteTx`](crate::tx::WriteTx), not here: order and
//! order-item rows only ever come into existence inside the checkout
//! commit phase.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::query;
use bazaar_core::query::{Field, Filter, Page, PageResult, Sort, SortDir};
use bazaar_core::{
    AdminOrderEntry, Order, OrderItem, OrderLine, OrderStatus, OrderWithItems, ProductSummary,
    UserSummary,
};

/// Filterable columns of the order listing (orders aliased `o`).
pub const STATUS: Field = Field::new("o.status");
pub const ORDER_USER_ID: Field = Field::new("o.user_id");

const SELECT_ORDER: &str =
    "SELECT o.id, o.user_id, o.total_cents, o.status, o.created_at, o.updated_at FROM orders o";

/// Items joined with catalog data for the include expansion.
const SELECT_LINES: &str = "\
    SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price_cents, oi.created_at, \
           p.name AS p_name, p.description AS p_description, \
           p.image_url AS p_image_url, p.category AS p_category \
    FROM order_items oi \
    JOIN products p ON p.id = oi.product_id \
    WHERE oi.order_id = ?1 \
    ORDER BY oi.created_at, oi.rowid";

#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: String,
    order_id: String,
    product_id: String,
    quantity: i64,
    price_cents: i64,
    created_at: DateTime<Utc>,
    p_name: String,
    p_description: Option<String>,
    p_image_url: Option<String>,
    p_category: String,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            product: ProductSummary {
                id: row.product_id.clone(),
                name: row.p_name,
                description: row.p_description,
                image_url: row.p_image_url,
                category: row.p_category,
            },
            item: OrderItem {
                id: row.id,
                order_id: row.order_id,
                product_id: row.product_id,
                quantity: row.quantity,
                price_cents: row.price_cents,
                created_at: row.created_at,
            },
        }
    }
}

/// Order joined with its purchaser for the admin listing.
#[derive(Debug, sqlx::FromRow)]
struct AdminOrderRow {
    id: String,
    user_id: String,
    total_cents: i64,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    u_username: String,
    u_email: String,
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Items of an order, each with its product summary.
    pub async fn find_items(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let rows = sqlx::query_as::<_, OrderLineRow>(SELECT_LINES)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Gets an order by id, items expanded.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<OrderWithItems>> {
        let order = sqlx::query_as::<_, Order>(&format!("{SELECT_ORDER} WHERE o.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match order {
            Some(order) => {
                let order_items = self.find_items(&order.id).await?;
                Ok(Some(OrderWithItems { order, order_items }))
            }
            None => Ok(None),
        }
    }

    /// Gets an order scoped to its owner: None when the id exists but
    /// belongs to someone else.
    pub async fn find_for_user_scoped(
        &self,
        id: &str,
        user_id: &str,
    ) -> DbResult<Option<OrderWithItems>> {
        match self.find_by_id(id).await? {
            Some(expanded) if expanded.order.user_id == user_id => Ok(Some(expanded)),
            _ => Ok(None),
        }
    }

    /// A user's order history, newest first, items expanded.
    pub async fn find_for_user(&self, user_id: &str) -> DbResult<Vec<OrderWithItems>> {
        let filter = Filter::new().eq(ORDER_USER_ID, user_id);
        let orders = self
            .find_many(&filter, &Page::default(), &Self::default_sort())
            .await?;

        let mut expanded = Vec::with_capacity(orders.len());
        for order in orders {
            let order_items = self.find_items(&order.id).await?;
            expanded.push(OrderWithItems { order, order_items });
        }

        Ok(expanded)
    }

    /// Bare order rows matching a filter.
    pub async fn find_many(
        &self,
        filter: &Filter,
        page: &Page,
        sort: &Sort,
    ) -> DbResult<Vec<Order>> {
        let mut qb = QueryBuilder::new(SELECT_ORDER);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, sort, "o.rowid");
        query::push_page(&mut qb, page);

        let orders = qb.build_query_as::<Order>().fetch_all(&self.pool).await?;

        Ok(orders)
    }

    /// Counts orders matching the filter — same filter logic as the row
    /// variants, no pagination.
    pub async fn count(&self, filter: &Filter) -> DbResult<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM orders o");
        query::push_where(&mut qb, filter);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok(count)
    }

    /// Admin listing: a page of all orders (optionally filtered by
    /// status), each with the purchaser's summary and expanded items.
    pub async fn page_admin(
        &self,
        status: Option<OrderStatus>,
        page: &Page,
    ) -> DbResult<PageResult<AdminOrderEntry>> {
        let mut filter = Filter::new();
        if let Some(status) = status {
            filter = filter.eq(STATUS, status.as_str());
        }

        let mut qb = QueryBuilder::new(
            "SELECT o.id, o.user_id, o.total_cents, o.status, o.created_at, o.updated_at, \
             u.username AS u_username, u.email AS u_email \
             FROM orders o JOIN users u ON u.id = o.user_id",
        );
        query::push_where(&mut qb, &filter);
        query::push_order_by(&mut qb, &Self::default_sort(), "o.rowid");
        query::push_page(&mut qb, page);

        let rows = qb
            .build_query_as::<AdminOrderRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let order_items = self.find_items(&row.id).await?;
            entries.push(AdminOrderEntry {
                user: UserSummary {
                    id: row.user_id.clone(),
                    username: row.u_username,
                    email: row.u_email,
                },
                order: Order {
                    id: row.id,
                    user_id: row.user_id,
                    total_cents: row.total_cents,
                    status: row.status,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                },
                order_items,
            });
        }

        let total = self.count(&filter).await?;
        Ok(PageResult::new(entries, total, page.offset()))
    }

    /// Sets an order's status.
    ///
    /// Any of the five statuses may overwrite any other — there is
    /// deliberately no transition-ordering guard. Returns the refreshed
    /// order with items.
    pub async fn update_status(&self, id: &str, status: OrderStatus) -> DbResult<OrderWithItems> {
        let now = Utc::now();

        debug!(id = %id, status = %status.as_str(), "Updating order status");

        let result = sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(status)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    fn default_sort() -> Sort {
        Sort::new(Field::new("o.created_at"), SortDir::Desc)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bazaar_core::{Money, NewProduct, NewUser, ProductPatch};

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

    async fn seed_product(db: &Database, name: &str, price_cents: i64) -> String {
        db.products()
            .create(NewProduct {
                name: name.into(),
                description: None,
                price_cents,
                image_url: None,
                category: "Misc".into(),
                stock: Some(100),
            })
            .await
            .unwrap()
            .id
    }

    /// Orders are only born inside the transaction scope.
    async fn seed_order(db: &Database, user_id: &str, product_id: &str, qty: i64) -> String {
        let mut tx = db.begin_write().await.unwrap();
        let order = tx
            .create_order(user_id, Money::from_cents(qty * 1000))
            .await
            .unwrap();
        tx.add_order_item(&order.id, product_id, qty, Money::from_cents(1000))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        order.id
    }

    #[tokio::test]
    async fn test_include_expands_items_and_product_summary() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 1000).await;
        let order_id = seed_order(&db, &user, &product, 2).await;

        let expanded = db.orders().find_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(expanded.order_items.len(), 1);
        let line = &expanded.order_items[0];
        assert_eq!(line.product.name, "Soap");
        assert_eq!(line.item.quantity, 2);
        assert_eq!(line.item.price_cents, 1000);
    }

    #[tokio::test]
    async fn test_price_snapshot_survives_product_changes() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 1000).await;
        let order_id = seed_order(&db, &user, &product, 1).await;

        db.products()
            .update(
                &product,
                ProductPatch {
                    price_cents: Some(9999),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let expanded = db.orders().find_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(expanded.order_items[0].item.price_cents, 1000);
    }

    #[tokio::test]
    async fn test_scoped_lookup_hides_other_users_orders() {
        let db = test_db().await;
        let ada = seed_user(&db, "ada").await;
        let bob = seed_user(&db, "bob").await;
        let product = seed_product(&db, "Soap", 1000).await;
        let order_id = seed_order(&db, &ada, &product, 1).await;

        assert!(db
            .orders()
            .find_for_user_scoped(&order_id, &ada)
            .await
            .unwrap()
            .is_some());
        assert!(db
            .orders()
            .find_for_user_scoped(&order_id, &bob)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_status_accepts_any_transition() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 1000).await;
        let order_id = seed_order(&db, &user, &product, 1).await;

        // Straight from pending to delivered, then reopened from
        // cancelled: no ordering guard, by design.
        for status in [
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Processing,
        ] {
            let updated = db.orders().update_status(&order_id, status).await.unwrap();
            assert_eq!(updated.order.status, status);
        }

        let err = db
            .orders()
            .update_status("missing", OrderStatus::Shipped)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_admin_page_filters_by_status() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 1000).await;

        let first = seed_order(&db, &user, &product, 1).await;
        seed_order(&db, &user, &product, 1).await;
        db.orders()
            .update_status(&first, OrderStatus::Shipped)
            .await
            .unwrap();

        let page = db
            .orders()
            .page_admin(Some(OrderStatus::Shipped), &Page::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].order.id, first);
        assert_eq!(page.rows[0].user.username, "ada");
        assert!(!page.has_more);

        let all = db.orders().page_admin(None, &Page::default()).await.unwrap();
        assert_eq!(all.total, 2);
    }
}
