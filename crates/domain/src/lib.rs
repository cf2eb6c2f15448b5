//! Domain layer for the store order backend.
//!
//! This crate provides the services that sit on top of the store:
//! - [`OrderService`]: atomic order creation, the paid transition, and order queries
//! - [`CatalogService`]: product registration and lookup
//! - [`OrderView`]: the presentation read model of an order

pub mod catalog;
pub mod error;
pub mod order;

pub use catalog::CatalogService;
pub use error::DomainError;
pub use order::{LineItemRequest, OrderService, OrderView};
