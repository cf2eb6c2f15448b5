//! Order and line item records.

use chrono::{DateTime, Utc};
use common::{LineItemId, OrderId, ProductId};
use serde::{Deserialize, Serialize};

use crate::product::Product;

/// A persisted order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub paid: bool,
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub created_at: DateTime<Utc>,
    pub paid: bool,
}

impl NewOrder {
    /// Creates an unpaid order stamped with the given creation time.
    pub fn unpaid(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            paid: false,
        }
    }
}

/// A persisted line item. Owned by exactly one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A line item that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// A line item joined with the product it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: Product,
    pub quantity: u32,
}

/// An order together with its resolved line items, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAggregate {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}
