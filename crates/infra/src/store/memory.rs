//! In-memory backend for tests and development runs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use comptoir_catalog::{Category, Product, StockAdjustment};
use comptoir_core::{CategoryId, CustomerId, OrderDetailId, OrderId, ProductId};
use comptoir_customers::Customer;
use comptoir_orders::{Order, OrderDetail, OrderWithDetails};

use super::{CatalogStore, CustomerStore, OrderStore, Page, Paginated, StoreError};

#[derive(Debug, Default)]
struct State {
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, Order>,
    details: HashMap<OrderDetailId, OrderDetail>,
}

/// Single-process store. One lock over the whole state keeps multi-row
/// operations atomic, which is all the atomicity the ports promise.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("state lock poisoned".to_string()))
    }
}

fn page_slice<T>(mut items: Vec<T>, page: Page) -> Paginated<T> {
    let total = items.len() as u64;
    let start = (page.offset() as usize).min(items.len());
    let end = (start + page.per_page as usize).min(items.len());
    let items = items.drain(start..end).collect();
    Paginated { items, total, page }
}

fn details_of(state: &State, order_id: OrderId) -> Vec<OrderDetail> {
    let mut details: Vec<OrderDetail> = state
        .details
        .values()
        .filter(|d| d.order_id == order_id)
        .cloned()
        .collect();
    details.sort_by(|a, b| a.id.as_uuid().cmp(b.id.as_uuid()));
    details
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    async fn list_categories(&self, page: Page) -> Result<Paginated<Category>, StoreError> {
        let state = self.read()?;
        let mut items: Vec<Category> = state.categories.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(page_slice(items, page))
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&category.id) {
            return Err(StoreError::NotFound);
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.products.values().any(|p| p.category_id == id) {
            return Err(StoreError::Referenced { entity: "category" });
        }
        state
            .categories
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&product.category_id) {
            return Err(StoreError::NotFound);
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.read()?.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    async fn list_products(&self, page: Page) -> Result<Paginated<Product>, StoreError> {
        let state = self.read()?;
        let mut items: Vec<Product> = state.products.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(page_slice(items, page))
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&product.id) {
            return Err(StoreError::NotFound);
        }
        if !state.categories.contains_key(&product.category_id) {
            return Err(StoreError::NotFound);
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.details.values().any(|d| d.product_id == id) {
            return Err(StoreError::Referenced { entity: "product" });
        }
        state
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn adjust_stock(&self, movements: &[StockAdjustment]) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for movement in movements {
            let product = state
                .products
                .get(&movement.product_id)
                .ok_or(StoreError::NotFound)?;
            if product.quantity + movement.delta < 0 {
                return Err(StoreError::InsufficientStock {
                    product_id: movement.product_id,
                });
            }
        }
        for movement in movements {
            if let Some(product) = state.products.get_mut(&movement.product_id) {
                product.quantity += movement.delta;
            }
        }
        Ok(())
    }

    async fn restore_stock(&self, movements: &[StockAdjustment]) -> Result<(), StoreError> {
        let mut state = self.write()?;
        for movement in movements {
            if let Some(product) = state.products.get_mut(&movement.product_id) {
                product.quantity += movement.delta;
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CustomerStore for MemoryStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.read()?.customers.get(&id).cloned())
    }

    async fn list_customers(&self, page: Page) -> Result<Paginated<Customer>, StoreError> {
        let state = self.read()?;
        let mut items: Vec<Customer> = state.customers.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(page_slice(items, page))
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.customers.contains_key(&customer.id) {
            return Err(StoreError::NotFound);
        }
        state.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.orders.values().any(|o| o.customer_id == id) {
            return Err(StoreError::Referenced { entity: "customer" });
        }
        state
            .customers
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait::async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(
        &self,
        order: &Order,
        details: &[OrderDetail],
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.orders.values().any(|o| o.order_num == order.order_num) {
            return Err(StoreError::DuplicateOrderNum(order.order_num.clone()));
        }
        if !state.customers.contains_key(&order.customer_id) {
            return Err(StoreError::NotFound);
        }
        if details
            .iter()
            .any(|d| !state.products.contains_key(&d.product_id))
        {
            return Err(StoreError::NotFound);
        }
        state.orders.insert(order.id, order.clone());
        for detail in details {
            state.details.insert(detail.id, detail.clone());
        }
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithDetails>, StoreError> {
        let state = self.read()?;
        Ok(state.orders.get(&id).cloned().map(|order| {
            let details = details_of(&state, id);
            OrderWithDetails { order, details }
        }))
    }

    async fn list_orders(&self, page: Page) -> Result<Paginated<Order>, StoreError> {
        let state = self.read()?;
        let mut items: Vec<Order> = state.orders.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(page_slice(items, page))
    }

    async fn update_order(
        &self,
        order: &Order,
        details: &[OrderDetail],
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.orders.contains_key(&order.id) {
            return Err(StoreError::NotFound);
        }
        if state
            .orders
            .values()
            .any(|o| o.id != order.id && o.order_num == order.order_num)
        {
            return Err(StoreError::DuplicateOrderNum(order.order_num.clone()));
        }
        if !state.customers.contains_key(&order.customer_id) {
            return Err(StoreError::NotFound);
        }
        if details
            .iter()
            .any(|d| !state.products.contains_key(&d.product_id))
        {
            return Err(StoreError::NotFound);
        }
        state.orders.insert(order.id, order.clone());
        state.details.retain(|_, d| d.order_id != order.id);
        for detail in details {
            state.details.insert(detail.id, detail.clone());
        }
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.orders.remove(&id).ok_or(StoreError::NotFound)?;
        state.details.retain(|_, d| d.order_id != id);
        Ok(())
    }

    async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderWithDetails>, StoreError> {
        let state = self.read()?;
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(orders
            .into_iter()
            .map(|order| {
                let details = details_of(&state, order.id);
                OrderWithDetails { order, details }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use comptoir_catalog::{CategoryFields, ProductFields};
    use comptoir_customers::CustomerFields;

    use super::*;

    async fn seed_category(store: &MemoryStore) -> Category {
        let category = Category::new(
            CategoryId::new(),
            CategoryFields {
                name: "Kitchen".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_category(&category).await.unwrap();
        category
    }

    async fn seed_product(store: &MemoryStore, category: &Category, quantity: i64) -> Product {
        let product = Product::new(
            ProductId::new(),
            ProductFields {
                name: "Moka pot".to_string(),
                price: 2450,
                quantity,
                description: "Six-cup aluminium moka pot".to_string(),
                image: None,
                category_id: category.id,
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_product(&product).await.unwrap();
        product
    }

    #[tokio::test]
    async fn adjust_stock_applies_all_or_nothing() {
        let store = MemoryStore::new();
        let category = seed_category(&store).await;
        let a = seed_product(&store, &category, 10).await;
        let b = seed_product(&store, &category, 2).await;

        let err = store
            .adjust_stock(&[
                StockAdjustment::new(a.id, -5),
                StockAdjustment::new(b.id, -3),
            ])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InsufficientStock { product_id } if product_id == b.id
        ));

        // The passing movement must not have been applied.
        let a_now = store.get_product(a.id).await.unwrap().unwrap();
        assert_eq!(a_now.quantity, 10);
    }

    #[tokio::test]
    async fn restore_stock_skips_missing_products() {
        let store = MemoryStore::new();
        let category = seed_category(&store).await;
        let product = seed_product(&store, &category, 1).await;
        let gone = ProductId::new();

        store
            .restore_stock(&[
                StockAdjustment::new(product.id, 4),
                StockAdjustment::new(gone, 9),
            ])
            .await
            .unwrap();

        let now = store.get_product(product.id).await.unwrap().unwrap();
        assert_eq!(now.quantity, 5);
    }

    #[tokio::test]
    async fn category_with_products_cannot_be_deleted() {
        let store = MemoryStore::new();
        let category = seed_category(&store).await;
        seed_product(&store, &category, 1).await;

        let err = store.delete_category(category.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Referenced { entity: "category" }));
    }

    #[tokio::test]
    async fn duplicate_order_numbers_are_rejected() {
        let store = MemoryStore::new();
        let customer = Customer::new(
            CustomerId::new(),
            CustomerFields {
                name: "Amina Benali".to_string(),
                address: "12 rue des Lilas, Lyon".to_string(),
                phone: "+33 6 12 34 56 78".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        store.insert_customer(&customer).await.unwrap();

        let date = Utc::now().date_naive();
        let first = Order::new(
            OrderId::new(),
            customer.id,
            "COM123".to_string(),
            date,
            Utc::now(),
        );
        store.insert_order(&first, &[]).await.unwrap();

        let second = Order::new(
            OrderId::new(),
            customer.id,
            "COM123".to_string(),
            date,
            Utc::now(),
        );
        let err = store.insert_order(&second, &[]).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateOrderNum(num) if num == "COM123"));
    }

    #[tokio::test]
    async fn lists_come_back_newest_first_and_paginated() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5i64 {
            let category = Category::new(
                CategoryId::new(),
                CategoryFields {
                    name: format!("Category {i}"),
                },
                base + chrono::Duration::seconds(i),
            )
            .unwrap();
            store.insert_category(&category).await.unwrap();
        }

        let first = store.list_categories(Page::new(1, 2)).await.unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].name, "Category 4");
        assert!(first.has_more());

        let last = store.list_categories(Page::new(3, 2)).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].name, "Category 0");
        assert!(!last.has_more());
    }
}
