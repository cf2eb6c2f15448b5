//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;

use std::sync::Arc;

use domain::{CatalogService, OrderService};
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub order_service: OrderService<S>,
    pub catalog: CatalogService<S>,
}

impl<S: Store> AppState<S> {
    /// Builds the services over a shared store.
    pub fn new(store: S) -> Arc<Self> {
        Arc::new(Self {
            order_service: OrderService::new(store.clone()),
            catalog: CatalogService::new(store),
        })
    }
}

/// Parses a numeric path identifier.
fn parse_id(id: &str) -> Result<i64, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))
}
