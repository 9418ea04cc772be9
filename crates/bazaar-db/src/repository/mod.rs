//! # Repositories
//!
//! One repository per entity, each a thin struct over a pool clone.
//!
//! Shared conventions:
//! - `create` validates the payload, stamps a UUID v4 id and
//!   created/updated timestamps, and returns the persisted record.
//! - `update` is partial: the current row is fetched (NotFound if the key
//!   doesn't resolve), supplied fields are merged over it, and the merged
//!   record is written back with a fresh `updated_at`.
//! - `delete` is idempotent at this layer; workflows perform the
//!   existence checks where user-facing 404 semantics are required.
//! - Filtered reads go through the query-descriptor translator so the
//!   row and count variants of a listing always share filter logic.

pub mod cart_items;
pub mod orders;
pub mod posts;
pub mod products;
pub mod users;
