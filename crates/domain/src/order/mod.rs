//! Order creation, payment, and queries.

mod service;
mod view;

pub use service::OrderService;
pub use view::{LineItemRequest, OrderView};
