//! Order service: atomic order creation, payment, and queries.

use std::time::Instant;

use chrono::Utc;
use common::OrderId;
use store::{
    LineItemStore, NewLineItem, NewOrder, OrderAggregate, OrderLine, OrderStore, ProductStore,
    Store, UnitOfWork,
};

use super::{LineItemRequest, OrderView};
use crate::error::DomainError;

/// Service for creating, paying, and reading orders.
///
/// Each call runs inside a single unit of work on the store it was built
/// with. A failing call drops its unit of work uncommitted, so callers never
/// observe partial stock decrements or half-written orders.
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    /// Creates a new order service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates an order, withdrawing stock for every line item.
    ///
    /// Line items are processed in request order. The first missing product
    /// or short stock aborts the whole order.
    #[tracing::instrument(skip(self, items), fields(line_items = items.len()))]
    pub async fn create_order(&self, items: Vec<LineItemRequest>) -> Result<OrderView, DomainError> {
        let started = Instant::now();
        let result = self.create_order_in_unit(items).await;

        metrics::histogram!("order_creation_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        match &result {
            Ok(_) => metrics::counter!("orders_created_total").increment(1),
            Err(e) => metrics::counter!("orders_rejected_total", "reason" => e.reason()).increment(1),
        }

        result
    }

    async fn create_order_in_unit(
        &self,
        items: Vec<LineItemRequest>,
    ) -> Result<OrderView, DomainError> {
        validate_line_items(&items)?;

        tracing::info!("creating a new order");
        let mut tx = self.store.begin().await?;
        let product_ids: Vec<_> = items.iter().map(|item| item.product_id).collect();
        tx.lock_products(&product_ids).await?;
        let order = tx.insert_order(NewOrder::unpaid(Utc::now())).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = tx.find_product(item.product_id).await?.ok_or_else(|| {
                tracing::warn!(
                    product_id = %item.product_id,
                    "product not found, order cannot be created"
                );
                DomainError::ProductNotFound(item.product_id)
            })?;

            if !product.has_stock(item.quantity) {
                tracing::warn!(
                    product = %product.name,
                    available = product.stock_quantity,
                    requested = item.quantity,
                    "out of stock"
                );
                return Err(DomainError::InsufficientStock {
                    product_name: product.name,
                });
            }

            tracing::info!(product = %product.name, quantity = item.quantity, "reserving item");
            // Another writer may have consumed the stock since the read above.
            let Some(product) = tx.withdraw_stock(product.id, item.quantity).await? else {
                tracing::warn!(product = %product.name, "stock changed concurrently");
                return Err(DomainError::InsufficientStock {
                    product_name: product.name,
                });
            };

            tx.insert_line_item(NewLineItem {
                order_id: order.id,
                product_id: product.id,
                quantity: item.quantity,
            })
            .await?;

            lines.push(OrderLine {
                product,
                quantity: item.quantity,
            });
        }

        tx.commit().await?;

        let view = OrderView::from(OrderAggregate { order, lines });
        tracing::info!(
            order_id = %view.id,
            total_units = view.total_quantity(),
            "order created"
        );
        Ok(view)
    }

    /// Marks an unpaid order as paid.
    ///
    /// Paying is a single transition: a second attempt fails with
    /// [`DomainError::AlreadyPaid`] and changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn pay_order(&self, id: OrderId) -> Result<OrderView, DomainError> {
        tracing::info!("paying for order");
        let mut tx = self.store.begin().await?;

        let mut aggregate = tx.find_order(id).await?.ok_or_else(|| {
            tracing::warn!("attempt to pay for a non-existent order");
            DomainError::OrderNotFound(id)
        })?;

        if aggregate.order.paid || !tx.mark_order_paid(id).await? {
            tracing::warn!("attempt to pay for an order that is already paid");
            return Err(DomainError::AlreadyPaid(id));
        }

        tx.commit().await?;
        aggregate.order.paid = true;

        metrics::counter!("orders_paid_total").increment(1);
        tracing::info!("order paid");
        Ok(aggregate.into())
    }

    /// Loads a single order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<OrderView, DomainError> {
        tracing::info!("getting order");
        let mut tx = self.store.begin().await?;
        let aggregate = tx.find_order(id).await?.ok_or_else(|| {
            tracing::warn!("order not found");
            DomainError::OrderNotFound(id)
        })?;
        Ok(aggregate.into())
    }

    /// Lists all orders, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_all_orders(&self) -> Result<Vec<OrderView>, DomainError> {
        tracing::info!("getting all orders");
        let mut tx = self.store.begin().await?;
        let orders = tx.find_all_orders().await?;
        Ok(orders.into_iter().map(OrderView::from).collect())
    }

    /// Lists orders with the given paid status, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn get_orders_by_paid_status(
        &self,
        paid: bool,
    ) -> Result<Vec<OrderView>, DomainError> {
        tracing::info!("getting orders by paid status");
        let mut tx = self.store.begin().await?;
        let orders = tx.find_orders_by_paid(paid).await?;
        Ok(orders.into_iter().map(OrderView::from).collect())
    }
}

fn validate_line_items(items: &[LineItemRequest]) -> Result<(), DomainError> {
    if items.is_empty() {
        return Err(DomainError::NoItems);
    }
    if let Some(item) = items.iter().find(|item| item.quantity == 0) {
        return Err(DomainError::InvalidQuantity {
            product_id: item.product_id,
        });
    }
    Ok(())
}
