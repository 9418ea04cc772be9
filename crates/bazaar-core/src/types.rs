//! # Domain Types
//!
//! Core entity types used throughout bazaar.
//!
//! ## Type Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Domain Types                           │
//! │                                                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐           │
//! │  │    User     │  │   Product   │  │  CartItem   │           │
//! │  │ ─────────── │  │ ─────────── │  │ ─────────── │           │
//! │  │ id (UUID)   │  │ id (UUID)   │  │ id (UUID)   │           │
//! │  │ email       │  │ price_cents │  │ user_id     │           │
//! │  │ username    │  │ category    │  │ product_id  │           │
//! │  │ role        │  │ stock       │  │ quantity    │           │
//! │  └─────────────┘  └─────────────┘  └─────────────┘           │
//! │                                                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────┐           │
//! │  │    Order    │  │  OrderItem  │  │    Post     │           │
//! │  │ ─────────── │  │ ─────────── │  │ ─────────── │           │
//! │  │ total_cents │  │ price_cents │  │ title       │           │
//! │  │ status      │  │  (snapshot) │  │ published   │           │
//! │  └─────────────┘  └─────────────┘  └─────────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entity carries a UUID v4 `id` plus `created_at`/`updated_at`
//! stamps assigned by the repository layer. The `New*` payloads describe
//! creation input; the `*Patch` payloads describe partial updates where
//! `None` means "leave unchanged".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Role
// =============================================================================

/// Account role. Stored lowercase in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Customer
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Login email. Globally unique.
    pub email: String,

    /// Display name. Globally unique.
    pub username: String,

    /// Hashed password. Hashing itself happens in the auth layer;
    /// this value is opaque here and never serialized outward.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Account role.
    pub role: Role,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The safe projection of a user embedded in include expansions
/// (post author, admin order listing). Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        UserSummary {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

/// Payload for creating a user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    /// Defaults to [`Role::Customer`] when absent.
    pub role: Option<Role>,
}

/// Partial update for a user. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional long-form description.
    pub description: Option<String>,

    /// Unit price in cents. Never negative.
    pub price_cents: i64,

    /// Optional image URL for the storefront.
    pub image_url: Option<String>,

    /// Browsing category (e.g. "Skincare").
    pub category: String,

    /// Units on hand. Mutated only by checkout decrements and admin
    /// updates; never negative.
    pub stock: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether `quantity` units can be fulfilled from stock.
    #[inline]
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

/// The product projection nested under order items: catalog data only,
/// no live price or stock (those are snapshotted on the item itself).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        ProductSummary {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            image_url: product.image_url.clone(),
            category: product.category.clone(),
        }
    }
}

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub image_url: Option<String>,
    pub category: String,
    /// Defaults to 0 when absent.
    pub stock: Option<i64>,
}

/// Partial update for a product. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i64>,
}

// =============================================================================
// Cart
// =============================================================================

/// A line in a user's cart. One row per (user, product) pair; adding the
/// same product again merges quantities instead of inserting a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line with its product expanded (the `include` shape).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub id: String,
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub product: Product,
}

impl CartEntry {
    /// Line total at the product's current price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.product.price().multiply_quantity(self.quantity)
    }
}

/// Payload for inserting a new cart line.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub user_id: String,
    pub product_id: String,
    pub quantity: i64,
}

/// The assembled cart returned to the caller: entries plus derived totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartEntry>,
    pub total_cents: i64,
    pub item_count: i64,
}

// =============================================================================
// Order
// =============================================================================

/// Order fulfillment status.
///
/// Any status may overwrite any other; there is deliberately no
/// transition-ordering guard beyond membership in this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(ValidationError::NotAllowed {
                field: "status",
                allowed: "pending, processing, shipped, delivered, cancelled",
            }),
        }
    }
}

/// A placed order. Created exactly once by checkout; immutable afterwards
/// except for `status` and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub user_id: String,
    /// Sum of line price snapshots × quantities at creation time.
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item in an order.
///
/// `price_cents` is frozen at purchase time; later product price changes
/// never touch it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub price_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    /// Returns the snapshotted unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Line total from the snapshotted price.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.price().multiply_quantity(self.quantity)
    }
}

/// An order item with its product summary expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    #[serde(flatten)]
    pub item: OrderItem,
    pub product: ProductSummary,
}

/// An order with its items (and their product summaries) expanded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub order_items: Vec<OrderLine>,
}

/// Admin listing shape: order + items + the purchasing user's summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderEntry {
    #[serde(flatten)]
    pub order: Order,
    pub user: UserSummary,
    pub order_items: Vec<OrderLine>,
}

// =============================================================================
// Post
// =============================================================================

/// A blog/announcement post authored by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub published: bool,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post with its author expanded (id, username, email only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: UserSummary,
}

/// Payload for creating a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub published: bool,
    pub author_id: String,
}

/// Partial update for a post. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub published: Option<bool>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_status_parse() {
        assert_eq!(OrderStatus::from_str("shipped").unwrap(), OrderStatus::Shipped);
        assert!(OrderStatus::from_str("returned").is_err());
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Role::default(), Role::Customer);
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_order_item_line_total() {
        let item = OrderItem {
            id: "i".into(),
            order_id: "o".into(),
            product_id: "p".into(),
            quantity: 3,
            price_cents: 250,
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total().cents(), 750);
    }

    #[test]
    fn test_user_summary_never_carries_hash() {
        let user = User {
            id: "u1".into(),
            email: "a@example.com".into(),
            username: "a".into(),
            password_hash: "secret-hash".into(),
            role: Role::Customer,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let summary = UserSummary::from(&user);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("secret-hash"));

        // The full user also refuses to serialize the hash.
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
