//! Domain error types.

use common::{OrderId, ProductId};
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during order and catalog operations.
///
/// Every variant raised inside a unit of work aborts it, so none of them
/// leave partial writes behind.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A referenced product does not exist.
    #[error("Product not found")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order with ID {0} not found")]
    OrderNotFound(OrderId),

    /// A line item asks for more units than the product has on hand.
    #[error("Insufficient stock: {product_name}")]
    InsufficientStock { product_name: String },

    /// The order has already been paid.
    #[error("Order with ID {0} already paid")]
    AlreadyPaid(OrderId),

    /// An order must contain at least one line item.
    #[error("Order has no items")]
    NoItems,

    /// Line item quantities must be positive.
    #[error("Invalid quantity for product {product_id}: must be greater than 0")]
    InvalidQuantity { product_id: ProductId },

    /// A product definition was rejected.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Short machine-readable label, used for metric labels.
    pub fn reason(&self) -> &'static str {
        match self {
            DomainError::ProductNotFound(_) => "product_not_found",
            DomainError::OrderNotFound(_) => "order_not_found",
            DomainError::InsufficientStock { .. } => "insufficient_stock",
            DomainError::AlreadyPaid(_) => "already_paid",
            DomainError::NoItems => "no_items",
            DomainError::InvalidQuantity { .. } => "invalid_quantity",
            DomainError::InvalidProduct(_) => "invalid_product",
            DomainError::Store(_) => "store",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_client_facing_wording() {
        assert_eq!(
            DomainError::ProductNotFound(ProductId::new(3)).to_string(),
            "Product not found"
        );
        assert_eq!(
            DomainError::InsufficientStock {
                product_name: "Milk".to_string()
            }
            .to_string(),
            "Insufficient stock: Milk"
        );
        assert_eq!(
            DomainError::AlreadyPaid(OrderId::new(9)).to_string(),
            "Order with ID 9 already paid"
        );
        assert_eq!(
            DomainError::OrderNotFound(OrderId::new(9)).to_string(),
            "Order with ID 9 not found"
        );
    }
}
