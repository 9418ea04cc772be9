//! # Cart Workflow
//!
//! Cart manipulation on behalf of an authenticated user: viewing,
//! adding (with quantity merge), resizing, removing, clearing.
//!
//! ## Merge-on-add
//! ```text
//! add_to_cart(user, product X, qty 1)
//!      │
//!      ▼
//! composite-key lookup (user, X)
//!      ├── no line  → insert new row
//!      └── line qty 2 → same row becomes qty 3
//!
//! Either way the (user, product) pair stays a single row, and the
//! merged quantity is checked against stock before anything is written.
//! ```
//!
//! Ownership checks happen here, not in the repository: operating on a
//! cart line that exists but belongs to another user reports NotFound,
//! exactly like a line that doesn't exist.

use tracing::{debug, info};

use super::CommerceError;
use crate::pool::Database;
use bazaar_core::validation::validate_quantity;
use bazaar_core::{CartEntry, CartView, NewCartItem};

/// Returns the user's cart with products expanded plus derived totals.
pub async fn view_cart(db: &Database, user_id: &str) -> Result<CartView, CommerceError> {
    let items = db.cart_items().find_for_user(user_id).await?;

    let total_cents = items.iter().map(|entry| entry.line_total().cents()).sum();
    let item_count = items.iter().map(|entry| entry.quantity).sum();

    Ok(CartView {
        items,
        total_cents,
        item_count,
    })
}

/// Adds a product to the user's cart, merging into an existing line when
/// one exists. The merged quantity must be coverable by current stock.
pub async fn add_to_cart(
    db: &Database,
    user_id: &str,
    product_id: &str,
    quantity: i64,
) -> Result<CartEntry, CommerceError> {
    validate_quantity(quantity)?;

    let product = db
        .products()
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| CommerceError::not_found("Product", product_id))?;

    let existing = db
        .cart_items()
        .find_by_user_and_product(user_id, product_id)
        .await?;

    let merged = existing.as_ref().map_or(0, |item| item.quantity) + quantity;
    if !product.can_fulfill(merged) {
        return Err(CommerceError::InsufficientStock {
            product_id: product.id,
            name: product.name,
            available: product.stock,
            requested: merged,
        });
    }

    let entry = match existing {
        Some(item) => {
            debug!(item_id = %item.id, merged = %merged, "Merging cart line");
            db.cart_items().set_quantity(&item.id, merged).await?
        }
        None => {
            db.cart_items()
                .create(NewCartItem {
                    user_id: user_id.to_string(),
                    product_id: product_id.to_string(),
                    quantity,
                })
                .await?
        }
    };

    Ok(entry)
}

/// Sets a cart line to an absolute quantity. The line must belong to the
/// calling user and the quantity must be coverable by stock.
pub async fn update_quantity(
    db: &Database,
    user_id: &str,
    item_id: &str,
    quantity: i64,
) -> Result<CartEntry, CommerceError> {
    validate_quantity(quantity)?;

    let entry = db
        .cart_items()
        .find_for_user_scoped(item_id, user_id)
        .await?
        .ok_or_else(|| CommerceError::not_found("Cart item", item_id))?;

    if !entry.product.can_fulfill(quantity) {
        return Err(CommerceError::InsufficientStock {
            product_id: entry.product.id,
            name: entry.product.name,
            available: entry.product.stock,
            requested: quantity,
        });
    }

    Ok(db.cart_items().set_quantity(&entry.id, quantity).await?)
}

/// Removes a cart line owned by the calling user.
pub async fn remove_item(
    db: &Database,
    user_id: &str,
    item_id: &str,
) -> Result<(), CommerceError> {
    let entry = db
        .cart_items()
        .find_for_user_scoped(item_id, user_id)
        .await?
        .ok_or_else(|| CommerceError::not_found("Cart item", item_id))?;

    db.cart_items().delete(&entry.id).await?;
    Ok(())
}

/// Empties the user's cart. Returns the number of lines removed.
pub async fn clear_cart(db: &Database, user_id: &str) -> Result<u64, CommerceError> {
    let removed = db.cart_items().clear_for_user(user_id).await?;
    info!(user_id = %user_id, removed = %removed, "Cart cleared");
    Ok(removed)
}

// =============================================================================
// Unit Tests
// =============================================================================
