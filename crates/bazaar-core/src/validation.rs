//! # Validation Module
//!
//! Field-level validation rules applied by the repository layer before any
//! row is written. The database enforces the same invariants again through
//! NOT NULL / CHECK / UNIQUE constraints; these checks exist to fail early
//! with a precise [`ValidationError`] instead of a storage error.

use crate::error::{ValidationError, ValidationResult};
use crate::MAX_LINE_QUANTITY;

/// Validates an email address.
///
/// Deliberately shallow: non-empty, bounded, contains an `@` with text on
/// both sides. Real deliverability checks belong to the auth layer.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required { field: "email" });
    }
    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email",
            max: 254,
        });
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ValidationError::InvalidFormat {
            field: "email",
            reason: "expected local@domain",
        }),
    }
}

/// Validates a username: non-empty, at most 50 characters.
pub fn validate_username(username: &str) -> ValidationResult<()> {
    validate_required_text("username", username, 50)
}

/// Validates a product or display name: non-empty, at most 200 characters.
pub fn validate_name(name: &str) -> ValidationResult<()> {
    validate_required_text("name", name, 200)
}

/// Validates a product category: non-empty, at most 100 characters.
pub fn validate_category(category: &str) -> ValidationResult<()> {
    validate_required_text("category", category, 100)
}

/// Validates a post title: non-empty, at most 200 characters.
pub fn validate_title(title: &str) -> ValidationResult<()> {
    validate_required_text("title", title, 200)
}

/// Validates a unit price in cents (must be non-negative).
pub fn validate_price_cents(price_cents: i64) -> ValidationResult<()> {
    if price_cents < 0 {
        return Err(ValidationError::Negative { field: "price" });
    }
    Ok(())
}

/// Validates a stock level (must be non-negative).
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::Negative { field: "stock" });
    }
    Ok(())
}

/// Validates a cart/order line quantity: at least 1, bounded above.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity < 1 || quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates an opaque password hash (required, bounded).
pub fn validate_password_hash(hash: &str) -> ValidationResult<()> {
    validate_required_text("password", hash, 512)
}

fn validate_required_text(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    if value.len() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
