//! Shared types for the store order backend.

pub mod types;

pub use types::{LineItemId, OrderId, ProductId};
