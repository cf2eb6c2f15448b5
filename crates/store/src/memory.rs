use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    LineItemId, NewLineItem, NewOrder, NewProduct, Order, OrderAggregate, OrderId, OrderLine,
    OrderLineItem, Product, ProductId, Result, StoreError,
    store::{LineItemStore, OrderStore, ProductStore, Store, UnitOfWork},
};

#[derive(Debug, Clone, Copy, Default)]
struct IdCounters {
    product: i64,
    order: i64,
    line_item: i64,
}

#[derive(Debug, Default)]
struct StoreState {
    products: BTreeMap<ProductId, Product>,
    orders: BTreeMap<OrderId, Order>,
    line_items: BTreeMap<LineItemId, OrderLineItem>,
    /// Line item ids per order, in insertion order.
    order_lines: BTreeMap<OrderId, Vec<LineItemId>>,
    last_ids: IdCounters,
}

impl StoreState {
    fn aggregate(&self, order: &Order) -> Result<OrderAggregate> {
        let ids = self.order_lines.get(&order.id).map(Vec::as_slice).unwrap_or_default();
        let lines = ids
            .iter()
            .map(|id| {
                let item = self.line_items.get(id).ok_or_else(|| {
                    StoreError::Corrupt(format!("order {} indexes missing line item {id}", order.id))
                })?;
                let product = self.products.get(&item.product_id).ok_or_else(|| {
                    StoreError::Corrupt(format!(
                        "line item {} references missing product {}",
                        item.id, item.product_id
                    ))
                })?;
                Ok(OrderLine {
                    product: product.clone(),
                    quantity: item.quantity,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderAggregate {
            order: order.clone(),
            lines,
        })
    }

    fn aggregates<'a>(
        &self,
        orders: impl Iterator<Item = &'a Order>,
    ) -> Result<Vec<OrderAggregate>> {
        orders.map(|order| self.aggregate(order)).collect()
    }

    fn revert(&mut self, change: Change) {
        match change {
            Change::ProductInserted(id) => {
                self.products.remove(&id);
            }
            Change::StockWithdrawn(previous) => {
                self.products.insert(previous.id, previous);
            }
            Change::OrderInserted(id) => {
                self.orders.remove(&id);
                self.order_lines.remove(&id);
            }
            Change::OrderPaid(id) => {
                if let Some(order) = self.orders.get_mut(&id) {
                    order.paid = false;
                }
            }
            Change::LineItemInserted { id, order_id } => {
                self.line_items.remove(&id);
                if let Some(ids) = self.order_lines.get_mut(&order_id) {
                    ids.retain(|line| *line != id);
                    if ids.is_empty() {
                        self.order_lines.remove(&order_id);
                    }
                }
            }
        }
    }
}

/// A write made by an open unit of work, kept so it can be undone.
#[derive(Debug)]
enum Change {
    ProductInserted(ProductId),
    StockWithdrawn(Product),
    OrderInserted(OrderId),
    OrderPaid(OrderId),
    LineItemInserted { id: LineItemId, order_id: OrderId },
}

/// In-memory store implementation for tests and database-less runs.
///
/// A unit of work holds the lock on the shared state for its whole lifetime,
/// so units of work are serialized. Writes go straight to the shared state
/// and are recorded in an undo log that is replayed if the unit of work is
/// dropped without committing.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.lock().await.orders.len()
    }

    /// Returns the number of committed line items.
    pub async fn line_item_count(&self) -> usize {
        self.state.lock().await.line_items.len()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Tx = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let state = self.state.clone().lock_owned().await;
        let ids_at_begin = state.last_ids;
        Ok(InMemoryTransaction {
            state,
            ids_at_begin,
            undo: Vec::new(),
        })
    }
}

/// Unit of work over an [`InMemoryStore`].
pub struct InMemoryTransaction {
    state: OwnedMutexGuard<StoreState>,
    ids_at_begin: IdCounters,
    undo: Vec<Change>,
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if self.undo.is_empty() {
            return;
        }
        tracing::debug!(changes = self.undo.len(), "rolling back in-memory unit of work");
        while let Some(change) = self.undo.pop() {
            self.state.revert(change);
        }
        self.state.last_ids = self.ids_at_begin;
    }
}

#[async_trait]
impl ProductStore for InMemoryTransaction {
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product> {
        self.state.last_ids.product += 1;
        let product = Product {
            id: ProductId::new(self.state.last_ids.product),
            name: product.name,
            stock_quantity: product.stock_quantity,
        };
        self.state.products.insert(product.id, product.clone());
        self.undo.push(Change::ProductInserted(product.id));
        Ok(product)
    }

    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.products.get(&id).cloned())
    }

    async fn list_products(&mut self) -> Result<Vec<Product>> {
        Ok(self.state.products.values().cloned().collect())
    }

    // Units of work already hold the whole state exclusively.
    async fn lock_products(&mut self, _ids: &[ProductId]) -> Result<()> {
        Ok(())
    }

    async fn withdraw_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<Product>> {
        let Some(product) = self.state.products.get_mut(&id) else {
            return Ok(None);
        };
        let Some(updated) = product.withdraw(quantity) else {
            return Ok(None);
        };
        let previous = std::mem::replace(product, updated.clone());
        self.undo.push(Change::StockWithdrawn(previous));
        Ok(Some(updated))
    }
}

#[async_trait]
impl OrderStore for InMemoryTransaction {
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        self.state.last_ids.order += 1;
        let order = Order {
            id: OrderId::new(self.state.last_ids.order),
            created_at: order.created_at,
            paid: order.paid,
        };
        self.state.orders.insert(order.id, order.clone());
        self.undo.push(Change::OrderInserted(order.id));
        Ok(order)
    }

    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderAggregate>> {
        let state = &*self.state;
        state
            .orders
            .get(&id)
            .map(|order| state.aggregate(order))
            .transpose()
    }

    async fn find_all_orders(&mut self) -> Result<Vec<OrderAggregate>> {
        let state = &*self.state;
        state.aggregates(state.orders.values())
    }

    async fn find_orders_by_paid(&mut self, paid: bool) -> Result<Vec<OrderAggregate>> {
        let state = &*self.state;
        state.aggregates(state.orders.values().filter(|o| o.paid == paid))
    }

    async fn mark_order_paid(&mut self, id: OrderId) -> Result<bool> {
        match self.state.orders.get_mut(&id) {
            Some(order) if !order.paid => {
                order.paid = true;
                self.undo.push(Change::OrderPaid(id));
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl LineItemStore for InMemoryTransaction {
    async fn insert_line_item(&mut self, item: NewLineItem) -> Result<OrderLineItem> {
        if !self.state.orders.contains_key(&item.order_id) {
            return Err(StoreError::Corrupt(format!(
                "line item references missing order {}",
                item.order_id
            )));
        }
        if !self.state.products.contains_key(&item.product_id) {
            return Err(StoreError::Corrupt(format!(
                "line item references missing product {}",
                item.product_id
            )));
        }

        self.state.last_ids.line_item += 1;
        let item = OrderLineItem {
            id: LineItemId::new(self.state.last_ids.line_item),
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
        };
        let state = &mut *self.state;
        state.line_items.insert(item.id, item.clone());
        state.order_lines.entry(item.order_id).or_default().push(item.id);
        self.undo.push(Change::LineItemInserted {
            id: item.id,
            order_id: item.order_id,
        });
        Ok(item)
    }
}

#[async_trait]
impl UnitOfWork for InMemoryTransaction {
    async fn commit(mut self) -> Result<()> {
        self.undo.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    async fn seed_product(store: &InMemoryStore, name: &str, stock: u32) -> Product {
        let mut tx = store.begin().await.unwrap();
        let product = tx.insert_product(NewProduct::new(name, stock)).await.unwrap();
        tx.commit().await.unwrap();
        product
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = InMemoryStore::new();
        let p1 = seed_product(&store, "Apple", 1).await;
        let p2 = seed_product(&store, "Pear", 1).await;

        assert_eq!(p1.id, ProductId::new(1));
        assert_eq!(p2.id, ProductId::new(2));
    }

    #[tokio::test]
    async fn committed_writes_are_visible() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Apple", 3).await;

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_product(product.id).await.unwrap();
        assert_eq!(found, Some(product));
    }

    #[tokio::test]
    async fn dropped_unit_of_work_rolls_back() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Apple", 10).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.withdraw_stock(product.id, 4).await.unwrap();
            tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let found = tx.find_product(product.id).await.unwrap().unwrap();
        assert_eq!(found.stock_quantity, 10);
        assert_eq!(tx.find_all_orders().await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn withdraw_stock_is_conditional() {
        let store = InMemoryStore::new();
        let product = seed_product(&store, "Apple", 5).await;

        let mut tx = store.begin().await.unwrap();
        let updated = tx.withdraw_stock(product.id, 5).await.unwrap().unwrap();
        assert_eq!(updated.stock_quantity, 0);

        assert!(tx.withdraw_stock(product.id, 1).await.unwrap().is_none());
        assert!(
            tx.withdraw_stock(ProductId::new(99), 1)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn find_order_joins_line_items_in_insertion_order() {
        let store = InMemoryStore::new();
        let apple = seed_product(&store, "Apple", 10).await;
        let pear = seed_product(&store, "Pear", 10).await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
        for (product_id, quantity) in [(pear.id, 2), (apple.id, 1)] {
            tx.insert_line_item(NewLineItem {
                order_id: order.id,
                product_id,
                quantity,
            })
            .await
            .unwrap();
        }
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let aggregate = tx.find_order(order.id).await.unwrap().unwrap();
        assert_eq!(aggregate.order, order);
        assert_eq!(aggregate.lines.len(), 2);
        assert_eq!(aggregate.lines[0].product.name, "Pear");
        assert_eq!(aggregate.lines[0].quantity, 2);
        assert_eq!(aggregate.lines[1].product.name, "Apple");
    }

    #[tokio::test]
    async fn line_item_requires_existing_order_and_product() {
        let store = InMemoryStore::new();
        let apple = seed_product(&store, "Apple", 10).await;

        let mut tx = store.begin().await.unwrap();
        let result = tx
            .insert_line_item(NewLineItem {
                order_id: OrderId::new(1),
                product_id: apple.id,
                quantity: 1,
            })
            .await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));

        let order = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
        let result = tx
            .insert_line_item(NewLineItem {
                order_id: order.id,
                product_id: ProductId::new(42),
                quantity: 1,
            })
            .await;
        assert!(matches!(result, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn mark_order_paid_flips_once() {
        let store = InMemoryStore::new();

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
        assert!(tx.mark_order_paid(order.id).await.unwrap());
        assert!(!tx.mark_order_paid(order.id).await.unwrap());
        assert!(!tx.mark_order_paid(OrderId::new(99)).await.unwrap());
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.find_orders_by_paid(true).await.unwrap().len(), 1);
        assert!(tx.find_orders_by_paid(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counts_reflect_committed_state() {
        let store = InMemoryStore::new();
        let apple = seed_product(&store, "Apple", 10).await;

        let mut tx = store.begin().await.unwrap();
        let order = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
        tx.insert_line_item(NewLineItem {
            order_id: order.id,
            product_id: apple.id,
            quantity: 1,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.order_count().await, 1);
        assert_eq!(store.line_item_count().await, 1);
    }

    #[tokio::test]
    async fn rollback_undoes_payment_and_line_items_but_keeps_committed_data() {
        let store = InMemoryStore::new();
        let apple = seed_product(&store, "Apple", 10).await;

        let mut tx = store.begin().await.unwrap();
        let kept = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
        tx.insert_line_item(NewLineItem {
            order_id: kept.id,
            product_id: apple.id,
            quantity: 1,
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            assert!(tx.mark_order_paid(kept.id).await.unwrap());
            tx.withdraw_stock(apple.id, 3).await.unwrap();
            tx.insert_line_item(NewLineItem {
                order_id: kept.id,
                product_id: apple.id,
                quantity: 3,
            })
            .await
            .unwrap();
            let dropped = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
            tx.insert_line_item(NewLineItem {
                order_id: dropped.id,
                product_id: apple.id,
                quantity: 2,
            })
            .await
            .unwrap();
        }

        let mut tx = store.begin().await.unwrap();
        let aggregate = tx.find_order(kept.id).await.unwrap().unwrap();
        assert!(!aggregate.order.paid);
        assert_eq!(aggregate.lines.len(), 1);
        assert_eq!(aggregate.lines[0].quantity, 1);
        assert_eq!(tx.find_all_orders().await.unwrap().len(), 1);
        assert_eq!(
            tx.find_product(apple.id).await.unwrap().unwrap().stock_quantity,
            10
        );
        drop(tx);
        assert_eq!(store.line_item_count().await, 1);
    }

    #[tokio::test]
    async fn rollback_releases_assigned_ids() {
        let store = InMemoryStore::new();
        seed_product(&store, "Apple", 1).await;

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_product(NewProduct::new("Discarded", 1)).await.unwrap();
        }

        let pear = seed_product(&store, "Pear", 1).await;
        assert_eq!(pear.id, ProductId::new(2));
    }

    #[tokio::test]
    async fn find_order_reads_only_its_own_lines() {
        let store = InMemoryStore::new();
        let apple = seed_product(&store, "Apple", 100).await;

        let mut tx = store.begin().await.unwrap();
        let mut orders = Vec::new();
        for quantity in 1..=20 {
            let order = tx.insert_order(NewOrder::unpaid(Utc::now())).await.unwrap();
            tx.insert_line_item(NewLineItem {
                order_id: order.id,
                product_id: apple.id,
                quantity,
            })
            .await
            .unwrap();
            orders.push((order.id, quantity));
        }
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        for (order_id, quantity) in orders {
            let aggregate = tx.find_order(order_id).await.unwrap().unwrap();
            assert_eq!(aggregate.lines.len(), 1);
            assert_eq!(aggregate.lines[0].quantity, quantity);
        }
    }
}
