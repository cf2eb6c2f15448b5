pub mod error;
pub mod memory;
pub mod order;
pub mod postgres;
pub mod product;
pub mod store;

pub use common::{LineItemId, OrderId, ProductId};
pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use order::{NewLineItem, NewOrder, Order, OrderAggregate, OrderLine, OrderLineItem};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use product::{NewProduct, Product};
pub use store::{LineItemStore, OrderStore, ProductStore, Store, UnitOfWork};
