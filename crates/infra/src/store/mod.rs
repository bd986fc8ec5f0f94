//! Storage ports for the back office.
//!
//! Three traits cover the catalog, the customer book, and the order book.
//! Multi-row operations (`adjust_stock`, `insert_order`, `update_order`) are
//! single trait methods so each backend can make them atomic its own way: the
//! in-memory store under one lock, Postgres inside one transaction.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use comptoir_catalog::{Category, Product, StockAdjustment};
use comptoir_core::{CategoryId, CustomerId, OrderId, ProductId};
use comptoir_customers::Customer;
use comptoir_orders::{Order, OrderDetail, OrderWithDetails};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors surfaced by the storage ports.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("order number {0} is already allocated")]
    DuplicateOrderNum(String),
    #[error("insufficient stock for product {product_id}")]
    InsufficientStock { product_id: ProductId },
    #[error("{entity} is still referenced")]
    Referenced { entity: &'static str },
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// One-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    /// Clamps both numbers to at least 1.
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Page numbers are one-based; a literal with `page: 0` built around
    /// [`Page::new`] still maps to the first page instead of underflowing.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// One page of results plus the total the query matched.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: Page,
}

impl<T> Paginated<T> {
    pub fn has_more(&self) -> bool {
        u64::from(self.page.page) * u64::from(self.page.per_page) < self.total
    }
}

/// Products, categories, and the stock both backends guard.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError>;
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;
    /// Newest first.
    async fn list_categories(&self, page: Page) -> Result<Paginated<Category>, StoreError>;
    async fn update_category(&self, category: &Category) -> Result<(), StoreError>;
    /// Fails with [`StoreError::Referenced`] while products point at the category.
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError>;

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
    /// Existing products among `ids`, in no particular order. Missing ids
    /// are simply absent from the result.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;
    /// Newest first.
    async fn list_products(&self, page: Page) -> Result<Paginated<Product>, StoreError>;
    async fn update_product(&self, product: &Product) -> Result<(), StoreError>;
    /// Fails with [`StoreError::Referenced`] while order details point at the product.
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;

    /// Applies every movement or none of them. Fails with
    /// [`StoreError::InsufficientStock`] when a negative delta would push a
    /// product below zero, and with [`StoreError::NotFound`] when a movement
    /// names a product that does not exist.
    async fn adjust_stock(&self, movements: &[StockAdjustment]) -> Result<(), StoreError>;

    /// Hands stock back after a cancellation. Movements naming products that
    /// no longer exist are skipped instead of failing the restore.
    async fn restore_stock(&self, movements: &[StockAdjustment]) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError>;
    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;
    /// Newest first.
    async fn list_customers(&self, page: Page) -> Result<Paginated<Customer>, StoreError>;
    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError>;
    /// Fails with [`StoreError::Referenced`] while orders point at the customer.
    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError>;
}

#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes the header and its detail rows in one step. Fails with
    /// [`StoreError::DuplicateOrderNum`] when the reference is already taken.
    async fn insert_order(&self, order: &Order, details: &[OrderDetail])
    -> Result<(), StoreError>;
    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithDetails>, StoreError>;
    /// Newest first.
    async fn list_orders(&self, page: Page) -> Result<Paginated<Order>, StoreError>;
    /// Replaces the header fields and the whole detail set in one step.
    async fn update_order(&self, order: &Order, details: &[OrderDetail])
    -> Result<(), StoreError>;
    /// Removes the header and its details.
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError>;
    /// Every order of one customer, newest first, details included.
    async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderWithDetails>, StoreError>;
}
