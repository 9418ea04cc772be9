//! # Cart Item Repository
//!
//! Database operations for cart lines. A `(user_id, product_id)` pair is
//! unique — merging quantities when the same product is added again is
//! decided by the cart workflow via
//! [`find_by_user_and_product`](CartItemRepository::find_by_user_and_product).
//!
//! Reads that feed the UI and the checkout expand the linked product into
//! each row (the include shape, [`CartEntry`]).

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::query;
use bazaar_core::query::{Field, Filter, Sort, SortDir};
use bazaar_core::validation::validate_quantity;
use bazaar_core::{CartEntry, CartItem, NewCartItem, Product};

/// Filterable columns of the joined cart query (cart_items aliased `c`).
pub const USER_ID: Field = Field::new("c.user_id");
pub const ITEM_ID: Field = Field::new("c.id");

const SELECT_ITEM: &str =
    "SELECT id, user_id, product_id, quantity, created_at, updated_at FROM cart_items";

/// Joined select feeding [`CartEntryRow`]; product columns are aliased
/// with a `p_` prefix.
const SELECT_ENTRY: &str = "\
    SELECT c.id, c.user_id, c.product_id, c.quantity, c.created_at, c.updated_at, \
           p.name AS p_name, p.description AS p_description, \
           p.price_cents AS p_price_cents, p.image_url AS p_image_url, \
           p.category AS p_category, p.stock AS p_stock, \
           p.created_at AS p_created_at, p.updated_at AS p_updated_at \
    FROM cart_items c \
    JOIN products p ON p.id = c.product_id";

/// Flat row shape of the cart/product join.
#[derive(Debug, sqlx::FromRow)]
struct CartEntryRow {
    id: String,
    user_id: String,
    product_id: String,
    quantity: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    p_name: String,
    p_description: Option<String>,
    p_price_cents: i64,
    p_image_url: Option<String>,
    p_category: String,
    p_stock: i64,
    p_created_at: DateTime<Utc>,
    p_updated_at: DateTime<Utc>,
}

impl From<CartEntryRow> for CartEntry {
    fn from(row: CartEntryRow) -> Self {
        CartEntry {
            id: row.id,
            user_id: row.user_id,
            product: Product {
                id: row.product_id.clone(),
                name: row.p_name,
                description: row.p_description,
                price_cents: row.p_price_cents,
                image_url: row.p_image_url,
                category: row.p_category,
                stock: row.p_stock,
                created_at: row.p_created_at,
                updated_at: row.p_updated_at,
            },
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for cart line database operations.
#[derive(Debug, Clone)]
pub struct CartItemRepository {
    pool: SqlitePool,
}

impl CartItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CartItemRepository { pool }
    }

    /// Inserts a new cart line and returns it with the product expanded.
    ///
    /// A second line for the same (user, product) pair violates the
    /// unique constraint and surfaces as `DbError::UniqueViolation`;
    /// callers that want merge semantics check
    /// [`find_by_user_and_product`](Self::find_by_user_and_product) first.
    pub async fn create(&self, new_item: NewCartItem) -> DbResult<CartEntry> {
        validate_quantity(new_item.quantity)?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(user_id = %new_item.user_id, product_id = %new_item.product_id, "Inserting cart line");

        sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(&new_item.user_id)
        .bind(&new_item.product_id)
        .bind(new_item.quantity)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.entry_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart item", id))
    }

    /// Gets a bare cart line by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(&format!("{SELECT_ITEM} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Composite-key lookup: the user's line for a given product, if any.
    pub async fn find_by_user_and_product(
        &self,
        user_id: &str,
        product_id: &str,
    ) -> DbResult<Option<CartItem>> {
        let item = sqlx::query_as::<_, CartItem>(&format!(
            "{SELECT_ITEM} WHERE user_id = ?1 AND product_id = ?2"
        ))
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// All of a user's cart lines with products expanded, newest first.
    pub async fn find_for_user(&self, user_id: &str) -> DbResult<Vec<CartEntry>> {
        self.find_many(&Filter::new().eq(USER_ID, user_id)).await
    }

    /// A single line with product expanded, scoped to its owner. Returns
    /// None when the id exists but belongs to someone else.
    pub async fn find_for_user_scoped(
        &self,
        id: &str,
        user_id: &str,
    ) -> DbResult<Option<CartEntry>> {
        let entries = self
            .find_many(&Filter::new().eq(ITEM_ID, id).eq(USER_ID, user_id))
            .await?;

        Ok(entries.into_iter().next())
    }

    /// Expanded lines matching a filter over the joined select.
    async fn find_many(&self, filter: &Filter) -> DbResult<Vec<CartEntry>> {
        let mut qb = QueryBuilder::new(SELECT_ENTRY);
        query::push_where(&mut qb, filter);
        query::push_order_by(
            &mut qb,
            &Sort::new(Field::new("c.created_at"), SortDir::Desc),
            "c.rowid",
        );

        let rows = qb
            .build_query_as::<CartEntryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CartEntry::from).collect())
    }

    async fn entry_by_id(&self, id: &str) -> DbResult<Option<CartEntry>> {
        let entries = self.find_many(&Filter::new().eq(ITEM_ID, id)).await?;
        Ok(entries.into_iter().next())
    }

    /// Sets a line's quantity and returns the refreshed entry.
    pub async fn set_quantity(&self, id: &str, quantity: i64) -> DbResult<CartEntry> {
        validate_quantity(quantity)?;

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE cart_items SET quantity = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Cart item", id));
        }

        self.entry_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Cart item", id))
    }

    /// Deletes a cart line. Removing an absent row is not an error.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting cart line");

        sqlx::query("DELETE FROM cart_items WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Removes every line in a user's cart. Returns the number removed.
    pub async fn clear_for_user(&self, user_id: &str) -> DbResult<u64> {
        debug!(user_id = %user_id, "Clearing cart");

        let result = sqlx::query("DELETE FROM cart_items WHERE user_id = ?1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use bazaar_core::{NewProduct, NewUser};

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

    #[tokio::test]
    async fn test_create_expands_product() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 350, 10).await;

        let entry = db
            .cart_items()
            .create(NewCartItem {
                user_id: user.clone(),
                product_id: product.clone(),
                quantity: 2,
            })
            .await
            .unwrap();

        assert_eq!(entry.product.name, "Soap");
        assert_eq!(entry.product.price_cents, 350);
        assert_eq!(entry.line_total().cents(), 700);
    }

    #[tokio::test]
    async fn test_duplicate_line_is_a_conflict() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 350, 10).await;

        let item = NewCartItem {
            user_id: user,
            product_id: product,
            quantity: 1,
        };
        db.cart_items().create(item.clone()).await.unwrap();

        let err = db.cart_items().create(item).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_composite_key_lookup() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 350, 10).await;

        assert!(db
            .cart_items()
            .find_by_user_and_product(&user, &product)
            .await
            .unwrap()
            .is_none());

        db.cart_items()
            .create(NewCartItem {
                user_id: user.clone(),
                product_id: product.clone(),
                quantity: 1,
            })
            .await
            .unwrap();

        let found = db
            .cart_items()
            .find_by_user_and_product(&user, &product)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.quantity, 1);
    }

    #[tokio::test]
    async fn test_scoped_lookup_hides_other_users_lines() {
        let db = test_db().await;
        let ada = seed_user(&db, "ada").await;
        let bob = seed_user(&db, "bob").await;
        let product = seed_product(&db, "Soap", 350, 10).await;

        let entry = db
            .cart_items()
            .create(NewCartItem {
                user_id: ada.clone(),
                product_id: product,
                quantity: 1,
            })
            .await
            .unwrap();

        assert!(db
            .cart_items()
            .find_for_user_scoped(&entry.id, &ada)
            .await
            .unwrap()
            .is_some());
        assert!(db
            .cart_items()
            .find_for_user_scoped(&entry.id, &bob)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cascade_on_product_delete() {
        let db = test_db().await;
        let user = seed_user(&db, "ada").await;
        let product = seed_product(&db, "Soap", 350, 10).await;

        db.cart_items()
            .create(NewCartItem {
                user_id: user.clone(),
                product_id: product.clone(),
                quantity: 1,
            })
            .await
            .unwrap();

        db.products().delete(&product).await.unwrap();
        assert!(db.cart_items().find_for_user(&user).await.unwrap().is_empty());
    }
}
