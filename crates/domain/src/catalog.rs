//! Product catalog service.

use common::ProductId;
use store::{NewProduct, Product, ProductStore, Store, UnitOfWork};

use crate::error::DomainError;

/// Registers and looks up products.
///
/// The catalog only adds products. Stock of an existing product changes
/// solely through [`crate::OrderService::create_order`].
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    /// Creates a new catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a product with its initial stock.
    #[tracing::instrument(skip(self, name))]
    pub async fn create_product(
        &self,
        name: impl Into<String>,
        stock_quantity: u32,
    ) -> Result<Product, DomainError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::InvalidProduct(
                "product name must not be blank".to_string(),
            ));
        }

        let mut tx = self.store.begin().await?;
        let product = tx
            .insert_product(NewProduct::new(name, stock_quantity))
            .await?;
        tx.commit().await?;

        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        Ok(product)
    }

    /// Loads a single product.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, DomainError> {
        let mut tx = self.store.begin().await?;
        tx.find_product(id)
            .await?
            .ok_or(DomainError::ProductNotFound(id))
    }

    /// Lists all products ordered by ID.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, DomainError> {
        let mut tx = self.store.begin().await?;
        Ok(tx.list_products().await?)
    }
}
