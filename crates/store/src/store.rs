use async_trait::async_trait;

use crate::{
    NewLineItem, NewOrder, NewProduct, Order, OrderAggregate, OrderId, OrderLineItem, Product,
    ProductId, Result,
};

/// Product persistence and stock movements.
#[async_trait]
pub trait ProductStore: Send {
    /// Inserts a product, assigning its identity.
    async fn insert_product(&mut self, product: NewProduct) -> Result<Product>;

    /// Retrieves a product by ID.
    ///
    /// Returns None if the product doesn't exist.
    async fn find_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Retrieves all products ordered by ID.
    async fn list_products(&mut self) -> Result<Vec<Product>>;

    /// Locks the given products for the rest of the unit of work.
    ///
    /// Locks are taken in ascending id order whatever the order of `ids`, so
    /// two units of work touching overlapping products cannot deadlock.
    /// Missing ids are ignored.
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<()>;

    /// Withdraws `quantity` units from a product's stock.
    ///
    /// The decrement is conditional: it only applies when at least `quantity`
    /// units are on hand at the moment of the write, so two writers can never
    /// both consume the same units. Returns the updated product, or None if the
    /// product is missing or short.
    async fn withdraw_stock(&mut self, id: ProductId, quantity: u32) -> Result<Option<Product>>;
}

/// Order header persistence and aggregate reads.
#[async_trait]
pub trait OrderStore: Send {
    /// Inserts an order header, assigning its identity.
    async fn insert_order(&mut self, order: NewOrder) -> Result<Order>;

    /// Retrieves an order with its resolved line items.
    ///
    /// Returns None if the order doesn't exist.
    async fn find_order(&mut self, id: OrderId) -> Result<Option<OrderAggregate>>;

    /// Retrieves all orders ordered by ID.
    async fn find_all_orders(&mut self) -> Result<Vec<OrderAggregate>>;

    /// Retrieves orders with the given paid flag, ordered by ID.
    async fn find_orders_by_paid(&mut self, paid: bool) -> Result<Vec<OrderAggregate>>;

    /// Flips an unpaid order to paid.
    ///
    /// Returns false if the order is missing or was already paid.
    async fn mark_order_paid(&mut self, id: OrderId) -> Result<bool>;
}

/// Line item persistence. Line items are read back through [`OrderStore`].
#[async_trait]
pub trait LineItemStore: Send {
    /// Inserts a line item for an existing order, assigning its identity.
    async fn insert_line_item(&mut self, item: NewLineItem) -> Result<OrderLineItem>;
}

/// An open transaction spanning all three stores.
///
/// Writes become visible to other units of work only after [`commit`].
/// Dropping a unit of work without committing discards every write made
/// through it.
///
/// [`commit`]: UnitOfWork::commit
#[async_trait]
pub trait UnitOfWork: ProductStore + OrderStore + LineItemStore {
    /// Makes all writes of this unit of work durable and visible.
    async fn commit(self) -> Result<()>;
}

/// A storage backend that hands out units of work.
///
/// Implementations are cheap handles over shared state and must be
/// thread-safe.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    /// The unit-of-work type of this backend.
    type Tx: UnitOfWork + 'static;

    /// Begins a new unit of work.
    async fn begin(&self) -> Result<Self::Tx>;
}
