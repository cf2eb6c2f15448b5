//! Order requests and read models.

use chrono::{DateTime, Utc};
use common::{OrderId, ProductId};
use serde::{Deserialize, Serialize};
use store::{OrderAggregate, OrderLine};

/// A requested (product, quantity) pair for a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl LineItemRequest {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// An order with its line items resolved against the catalog.
///
/// Assembled from an [`OrderAggregate`]; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub paid: bool,
    pub items: Vec<OrderLine>,
}

impl OrderView {
    /// Returns the total number of units across all line items.
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

impl From<OrderAggregate> for OrderView {
    fn from(aggregate: OrderAggregate) -> Self {
        Self {
            id: aggregate.order.id,
            created_at: aggregate.order.created_at,
            paid: aggregate.order.paid,
            items: aggregate.lines,
        }
    }
}
