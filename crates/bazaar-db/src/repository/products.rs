//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Catalog Browsing
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │            How catalog filtering composes                    │
//! │                                                              │
//! │  category="Skincare", search="Vitamin"                       │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  WHERE category = 'Skincare'                                 │
//! │    AND (name LIKE '%Vitamin%' OR description LIKE ...)       │
//! │  ORDER BY created_at DESC, rowid                             │
//! │  LIMIT 50 OFFSET 0                                           │
//! │                                                              │
//! │  count() applies the identical WHERE with no pagination,     │
//! │  so hasMore = total > offset + returned always holds.        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stock is only ever decremented inside the checkout transaction scope;
//! this repository touches it through admin updates alone.

use chrono::Utc;
use sqlx::{QueryBuilder, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::query;
use bazaar_core::query::{Field, Filter, Page, PageResult, Predicate, Sort};
use bazaar_core::validation::{
    validate_category, validate_name, validate_price_cents, validate_stock,
};
use bazaar_core::{NewProduct, Product, ProductPatch, ValidationError};

/// Filterable columns of the `products` table.
pub const NAME: Field = Field::new("name");
pub const DESCRIPTION: Field = Field::new("description");
pub const CATEGORY: Field = Field::new("category");

const SELECT_PRODUCT: &str = "SELECT id, name, description, price_cents, image_url, category, \
                              stock, created_at, updated_at FROM products";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Builds the canonical browsing filter: optional category equality
    /// ANDed with an optional name-or-description substring disjunction.
    pub fn browse_filter(
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Filter, ValidationError> {
        let mut filter = Filter::new();

        if let Some(category) = category {
            let category = category.trim();
            if !category.is_empty() {
                filter = filter.eq(CATEGORY, category);
            }
        }

        if let Some(term) = search {
            let term = term.trim();
            if !term.is_empty() {
                filter = filter.or_any([
                    Predicate::contains(NAME, term)?,
                    Predicate::contains(DESCRIPTION, term)?,
                ]);
            }
        }

        Ok(filter)
    }

    /// Inserts a new product. Stock defaults to 0.
    pub async fn create(&self, new_product: NewProduct) -> DbResult<Product> {
        validate_name(&new_product.name)?;
        validate_category(&new_product.category)?;
        validate_price_cents(new_product.price_cents)?;
        let stock = new_product.stock.unwrap_or(0);
        validate_stock(stock)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new_product.name.trim().to_string(),
            description: new_product.description,
            price_cents: new_product.price_cents,
            image_url: new_product.image_url,
            category: new_product.category.trim().to_string(),
            stock,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price_cents, image_url, category,
                                  stock, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(product.stock)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by id.
    pub async fn find_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!("{SELECT_PRODUCT} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Returns the first product matching the filter, newest first.
    pub async fn find_first(&self, filter: &Filter) -> DbResult<Option<Product>> {
        let mut qb = QueryBuilder::new(SELECT_PRODUCT);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, &Sort::created_desc(), "rowid");
        qb.push(" LIMIT 1");

        let product = qb
            .build_query_as::<Product>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists products matching the filter.
    pub async fn find_many(
        &self,
        filter: &Filter,
        page: &Page,
        sort: &Sort,
    ) -> DbResult<Vec<Product>> {
        debug!(limit = page.limit(), offset = page.offset(), "Listing products");

        let mut qb = QueryBuilder::new(SELECT_PRODUCT);
        query::push_where(&mut qb, filter);
        query::push_order_by(&mut qb, sort, "rowid");
        query::push_page(&mut qb, page);

        let products = qb
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts products matching the filter — identical filter logic to
    /// [`find_many`](Self::find_many), no pagination.
    pub async fn count(&self, filter: &Filter) -> DbResult<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM products");
        query::push_where(&mut qb, filter);

        let count = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        Ok(count)
    }

    /// A filtered page plus the unpaginated total and the has-more flag.
    pub async fn page(
        &self,
        filter: &Filter,
        page: &Page,
        sort: &Sort,
    ) -> DbResult<PageResult<Product>> {
        let rows = self.find_many(filter, page, sort).await?;
        let total = self.count(filter).await?;
        Ok(PageResult::new(rows, total, page.offset()))
    }

    /// Applies a partial update and returns the merged record.
    pub async fn update(&self, id: &str, patch: ProductPatch) -> DbResult<Product> {
        let current = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let mut product = current;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(description) = patch.description {
            product.description = Some(description);
        }
        if let Some(price_cents) = patch.price_cents {
            product.price_cents = price_cents;
        }
        if let Some(image_url) = patch.image_url {
            product.image_url = Some(image_url);
        }
        if let Some(category) = patch.category {
            product.category = category;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        product.updated_at = Utc::now();

        validate_name(&product.name)?;
        validate_category(&product.category)?;
        validate_price_cents(product.price_cents)?;
        validate_stock(product.stock)?;

        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, description = ?3, price_cents = ?4, image_url = ?5,
                category = ?6, stock = ?7, updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(&product.image_url)
        .bind(&product.category)
        .bind(product.stock)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Deletes a product. Cart lines referencing it cascade away;
    /// historical order items keep their snapshots.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Distinct non-empty categories, for the browse menu.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products WHERE category != '' ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_product(name: &str, category: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            name: name.into(),
            description: None,
            price_cents,
            image_url: None,
            category: category.into(),
            stock: Some(stock),
        }
    }

    #[tokio::test]
    async fn test_create_validates_fields() {
        let db = test_db().await;

        let err = db
            .products()
            .create(new_product("", "Skincare", 100, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let err = db
            .products()
            .create(new_product("Serum", "Skincare", -1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_category_and_search_compose() {
        let db = test_db().await;
        let repo = db.products();

        repo.create(NewProduct {
            description: Some("Brightening Vitamin C serum".into()),
            ..new_product("Vitamin C Serum", "Skincare", 1999, 10)
        })
        .await
        .unwrap();
        repo.create(new_product("Hyaluronic Moisturizer", "Skincare", 1499, 10))
            .await
            .unwrap();
        repo.create(new_product("Vitamin D Gummies", "Supplements", 999, 10))
            .await
            .unwrap();

        // category AND (name contains OR description contains)
        let filter = ProductRepository::browse_filter(Some("Skincare"), Some("Vitamin")).unwrap();
        let rows = repo
            .find_many(&filter, &Page::default(), &Sort::default())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Vitamin C Serum");

        // The search arm alone matches across categories.
        let filter = ProductRepository::browse_filter(None, Some("Vitamin")).unwrap();
        assert_eq!(repo.count(&filter).await.unwrap(), 2);

        // Substring search is case-insensitive.
        let filter = ProductRepository::browse_filter(None, Some("vitamin")).unwrap();
        assert_eq!(repo.count(&filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_case_sensitive_contains() {
        let db = test_db().await;
        let repo = db.products();
        repo.create(new_product("Vitamin C Serum", "Skincare", 1999, 10))
            .await
            .unwrap();

        let filter =
            Filter::new().and(Predicate::contains_case_sensitive(NAME, "vitamin").unwrap());
        assert_eq!(repo.count(&filter).await.unwrap(), 0);

        let filter =
            Filter::new().and(Predicate::contains_case_sensitive(NAME, "Vitamin").unwrap());
        assert_eq!(repo.count(&filter).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_pagination_invariant() {
        let db = test_db().await;
        let repo = db.products();

        for i in 0..25 {
            repo.create(new_product(&format!("Product {i}"), "Misc", 100, 1))
                .await
                .unwrap();
        }

        // 25 rows, limit 10, offset 20 → 5 rows, hasMore = false.
        let result = repo
            .page(&Filter::new(), &Page::new(10, 20), &Sort::default())
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 5);
        assert_eq!(result.total, 25);
        assert!(!result.has_more);

        // Middle page still reports more.
        let result = repo
            .page(&Filter::new(), &Page::new(10, 10), &Sort::default())
            .await
            .unwrap();
        assert_eq!(result.rows.len(), 10);
        assert!(result.has_more);
    }

    #[tokio::test]
    async fn test_deterministic_order_across_identical_queries() {
        let db = test_db().await;
        let repo = db.products();

        for i in 0..10 {
            repo.create(new_product(&format!("P{i}"), "Misc", 100, 1))
                .await
                .unwrap();
        }

        let a = repo
            .find_many(&Filter::new(), &Page::default(), &Sort::default())
            .await
            .unwrap();
        let b = repo
            .find_many(&Filter::new(), &Page::default(), &Sort::default())
            .await
            .unwrap();
        let ids_a: Vec<_> = a.iter().map(|p| &p.id).collect();
        let ids_b: Vec<_> = b.iter().map(|p| &p.id).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let db = test_db().await;
        let repo = db.products();
        let product = repo
            .create(new_product("Serum", "Skincare", 1999, 5))
            .await
            .unwrap();

        let updated = repo
            .update(
                &product.id,
                ProductPatch {
                    price_cents: Some(2499),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.price_cents, 2499);
        assert_eq!(updated.name, "Serum");
        assert_eq!(updated.stock, 5);

        let err = repo
            .update("missing", ProductPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_categories_are_distinct_and_sorted() {
        let db = test_db().await;
        let repo = db.products();
        repo.create(new_product("A", "Skincare", 100, 1)).await.unwrap();
        repo.create(new_product("B", "Skincare", 100, 1)).await.unwrap();
        repo.create(new_product("C", "Bath", 100, 1)).await.unwrap();

        assert_eq!(repo.categories().await.unwrap(), vec!["Bath", "Skincare"]);
    }
}
