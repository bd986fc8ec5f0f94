//! Order lifecycle orchestration.
//!
//! `OrderWorkflow` composes the three storage ports and owns every stock
//! consequence of an order mutation:
//!
//! ```text
//! place   validate lines → check customer and products → reserve stock
//!         (atomic, all lines or none) → insert header + details, retrying
//!         the order number on collision
//! update  diff stored details against the requested lines → apply the
//!         per-product deltas atomically → replace header fields and details
//! cancel  delete the order (the claim under racing cancels) → hand every
//!         reserved unit back
//! ```
//!
//! Reservation happens before the order rows are written; when a write then
//! fails, the workflow hands the reserved stock back and surfaces the error.
//! The availability check before reserving exists to produce a message with
//! the product's display name; the store's guarded update remains the
//! authority under concurrency.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use comptoir_catalog::{Product, StockAdjustment};
use comptoir_core::{CustomerId, DomainError, OrderId, ProductId};
use comptoir_orders::{
    MAX_ORDER_NUM_ATTEMPTS, Order, OrderDetail, OrderWithDetails, PlaceOrder, UpdateOrder,
    fold_line_items, generate_order_num, reservation_deltas, restoration_deltas, stock_deltas,
    validate_line_items,
};

use crate::store::{CatalogStore, CustomerStore, OrderStore, Page, Paginated, StoreError};

/// Errors surfaced by the order workflow, mapped to HTTP by the API layer.
#[derive(Debug)]
pub enum WorkflowError {
    /// Deterministic validation failure in the request itself.
    Validation(String),
    /// A referenced record does not exist.
    NotFound,
    /// Stock cannot cover the request; carries the product's display name.
    InsufficientStock { product: String },
    /// The operation clashes with existing records.
    Conflict(String),
    /// The storage backend failed.
    Store(StoreError),
}

impl From<DomainError> for WorkflowError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => WorkflowError::Validation(msg),
            DomainError::InvalidId(msg) => WorkflowError::Validation(msg),
            DomainError::NotFound => WorkflowError::NotFound,
            DomainError::InsufficientStock { product } => {
                WorkflowError::InsufficientStock { product }
            }
            DomainError::Conflict(msg) => WorkflowError::Conflict(msg),
        }
    }
}

impl From<StoreError> for WorkflowError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => WorkflowError::NotFound,
            StoreError::DuplicateOrderNum(num) => {
                WorkflowError::Conflict(format!("order number {num} is already allocated"))
            }
            StoreError::Referenced { entity } => {
                WorkflowError::Conflict(format!("{entity} is still referenced"))
            }
            // The id stands in for the name when nobody resolved it upstream.
            StoreError::InsufficientStock { product_id } => WorkflowError::InsufficientStock {
                product: product_id.to_string(),
            },
            other => WorkflowError::Store(other),
        }
    }
}

/// What the order-entry form needs to know about a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSnapshot {
    pub price: i64,
    pub quantity: i64,
}

/// What the order-entry form needs to know about a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSnapshot {
    pub address: String,
    pub phone: String,
}

/// Coordinates orders against stock so that every committed mutation keeps
/// `units on hand + units reserved by orders` constant per product.
pub struct OrderWorkflow {
    catalog: Arc<dyn CatalogStore>,
    customers: Arc<dyn CustomerStore>,
    orders: Arc<dyn OrderStore>,
}

impl OrderWorkflow {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        customers: Arc<dyn CustomerStore>,
        orders: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            catalog,
            customers,
            orders,
        }
    }

    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<OrderWithDetails, WorkflowError> {
        validate_line_items(&cmd.line_items)?;
        if self
            .customers
            .get_customer(cmd.customer_id)
            .await?
            .is_none()
        {
            return Err(WorkflowError::NotFound);
        }

        let requested = fold_line_items(&cmd.line_items);
        let ids: Vec<ProductId> = requested.keys().copied().collect();
        let products = self.required_products(&ids).await?;

        for (product_id, quantity) in &requested {
            let product = &products[product_id];
            if !product.has_stock_for(*quantity) {
                warn!(
                    product = %product.name,
                    requested = *quantity,
                    available = product.quantity,
                    "rejecting order for lack of stock"
                );
                return Err(WorkflowError::InsufficientStock {
                    product: product.name.clone(),
                });
            }
        }

        self.reserve(&reservation_deltas(&cmd.line_items), &products)
            .await?;

        let order_id = OrderId::new();
        let details: Vec<OrderDetail> = cmd
            .line_items
            .iter()
            .map(|item| OrderDetail::from_line_item(order_id, item))
            .collect();

        for attempt in 1..=MAX_ORDER_NUM_ATTEMPTS {
            let order = Order::new(
                order_id,
                cmd.customer_id,
                generate_order_num(&mut rand::thread_rng()),
                cmd.order_date,
                Utc::now(),
            );
            match self.orders.insert_order(&order, &details).await {
                Ok(()) => {
                    info!(
                        order_id = %order.id,
                        order_num = %order.order_num,
                        lines = details.len(),
                        "order placed"
                    );
                    return Ok(OrderWithDetails { order, details });
                }
                Err(StoreError::DuplicateOrderNum(num)) => {
                    warn!(order_num = %num, attempt, "order number collision, drawing another");
                }
                Err(e) => {
                    self.release(&restoration_deltas(&details)).await;
                    return Err(e.into());
                }
            }
        }

        self.release(&restoration_deltas(&details)).await;
        Err(WorkflowError::Conflict(
            "could not allocate a unique order number".to_string(),
        ))
    }

    pub async fn update_order(&self, cmd: UpdateOrder) -> Result<OrderWithDetails, WorkflowError> {
        validate_line_items(&cmd.line_items)?;
        let existing = self
            .orders
            .get_order(cmd.order_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;
        if self
            .customers
            .get_customer(cmd.customer_id)
            .await?
            .is_none()
        {
            return Err(WorkflowError::NotFound);
        }

        let deltas = stock_deltas(&existing.details, &cmd.line_items);

        // Name lookup covers the new lines plus every product with a movement.
        let mut ids: Vec<ProductId> = fold_line_items(&cmd.line_items).keys().copied().collect();
        for movement in &deltas {
            if !ids.contains(&movement.product_id) {
                ids.push(movement.product_id);
            }
        }
        let products = self.required_products(&ids).await?;

        for movement in &deltas {
            if movement.delta >= 0 {
                continue;
            }
            let product = &products[&movement.product_id];
            if product.quantity + movement.delta < 0 {
                warn!(
                    product = %product.name,
                    available = product.quantity,
                    missing = -(product.quantity + movement.delta),
                    "rejecting order update for lack of stock"
                );
                return Err(WorkflowError::InsufficientStock {
                    product: product.name.clone(),
                });
            }
        }

        self.reserve(&deltas, &products).await?;

        let order = Order {
            id: existing.order.id,
            customer_id: cmd.customer_id,
            order_num: existing.order.order_num.clone(),
            order_date: cmd.order_date,
            created_at: existing.order.created_at,
        };
        let details: Vec<OrderDetail> = cmd
            .line_items
            .iter()
            .map(|item| OrderDetail::from_line_item(order.id, item))
            .collect();

        if let Err(e) = self.orders.update_order(&order, &details).await {
            // The inverse can carry negative deltas (re-reserving what the
            // failed update had freed), so it goes through the guarded
            // adjustment; a refusal means a concurrent order took the
            // briefly-freed units and is logged, not compounded.
            let inverse: Vec<StockAdjustment> = deltas
                .iter()
                .map(|d| StockAdjustment::new(d.product_id, -d.delta))
                .collect();
            if !inverse.is_empty() {
                if let Err(rollback) = self.catalog.adjust_stock(&inverse).await {
                    warn!(error = %rollback, "failed to roll back stock after update write error");
                }
            }
            return Err(e.into());
        }

        info!(
            order_id = %order.id,
            order_num = %order.order_num,
            lines = details.len(),
            "order updated"
        );
        Ok(OrderWithDetails { order, details })
    }

    pub async fn cancel_order(&self, order_id: OrderId) -> Result<(), WorkflowError> {
        let existing = self
            .orders
            .get_order(order_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;

        // The delete is the claim on the cancellation: when two cancels race,
        // only one delete succeeds, so the reserved units are handed back
        // exactly once. The loser sees NotFound and restores nothing.
        self.orders.delete_order(order_id).await?;
        let restored = restoration_deltas(&existing.details);
        self.catalog.restore_stock(&restored).await?;

        info!(
            order_id = %order_id,
            order_num = %existing.order.order_num,
            units_restored = restored.iter().map(|m| m.delta).sum::<i64>(),
            "order cancelled"
        );
        Ok(())
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<OrderWithDetails, WorkflowError> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or(WorkflowError::NotFound)
    }

    pub async fn list_orders(&self, page: Page) -> Result<Paginated<Order>, WorkflowError> {
        Ok(self.orders.list_orders(page).await?)
    }

    pub async fn customer_order_history(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderWithDetails>, WorkflowError> {
        if self.customers.get_customer(customer_id).await?.is_none() {
            return Err(WorkflowError::NotFound);
        }
        Ok(self.orders.orders_for_customer(customer_id).await?)
    }

    pub async fn product_snapshot(
        &self,
        product_id: ProductId,
    ) -> Result<ProductSnapshot, WorkflowError> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;
        Ok(ProductSnapshot {
            price: product.price,
            quantity: product.quantity,
        })
    }

    pub async fn customer_snapshot(
        &self,
        customer_id: CustomerId,
    ) -> Result<CustomerSnapshot, WorkflowError> {
        let customer = self
            .customers
            .get_customer(customer_id)
            .await?
            .ok_or(WorkflowError::NotFound)?;
        Ok(CustomerSnapshot {
            address: customer.address,
            phone: customer.phone,
        })
    }

    async fn required_products(
        &self,
        ids: &[ProductId],
    ) -> Result<BTreeMap<ProductId, Product>, WorkflowError> {
        let products = self.catalog.get_products(ids).await?;
        let map: BTreeMap<ProductId, Product> =
            products.into_iter().map(|p| (p.id, p)).collect();
        for id in ids {
            if !map.contains_key(id) {
                return Err(WorkflowError::NotFound);
            }
        }
        Ok(map)
    }

    /// Applies the movements atomically, resolving a refused decrement to the
    /// product's display name.
    async fn reserve(
        &self,
        movements: &[StockAdjustment],
        products: &BTreeMap<ProductId, Product>,
    ) -> Result<(), WorkflowError> {
        if movements.is_empty() {
            return Ok(());
        }
        match self.catalog.adjust_stock(movements).await {
            Ok(()) => Ok(()),
            Err(StoreError::InsufficientStock { product_id }) => {
                let product = products
                    .get(&product_id)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| product_id.to_string());
                warn!(%product_id, "stock reservation lost a concurrent race");
                Err(WorkflowError::InsufficientStock { product })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Best-effort give-back after a failed write. A failure here is logged
    /// and swallowed: the original error is the one the caller needs.
    async fn release(&self, movements: &[StockAdjustment]) {
        if movements.is_empty() {
            return;
        }
        if let Err(e) = self.catalog.restore_stock(movements).await {
            warn!(error = %e, "failed to hand reserved stock back");
        }
    }
}
