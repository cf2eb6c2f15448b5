//! Product records and stock arithmetic.

use common::ProductId;
use serde::{Deserialize, Serialize};

/// A catalog product with its on-hand stock.
///
/// `stock_quantity` is unsigned, so a committed product can never hold
/// negative stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock_quantity: u32,
}

impl Product {
    /// Returns true if at least `quantity` units are on hand.
    pub fn has_stock(&self, quantity: u32) -> bool {
        self.stock_quantity >= quantity
    }

    /// Returns a copy of the product with `quantity` units withdrawn.
    ///
    /// Returns `None` when fewer than `quantity` units are on hand.
    pub fn withdraw(&self, quantity: u32) -> Option<Product> {
        let stock_quantity = self.stock_quantity.checked_sub(quantity)?;
        Some(Product {
            stock_quantity,
            ..self.clone()
        })
    }
}

/// A product that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub stock_quantity: u32,
}

impl NewProduct {
    pub fn new(name: impl Into<String>, stock_quantity: u32) -> Self {
        Self {
            name: name.into(),
            stock_quantity,
        }
    }
}
