//! Postgres backend.
//!
//! Schema lives in `migrations/` and is applied by [`PostgresStore::connect`].
//! Referential rules are enforced by the database itself: detail rows cascade
//! with their order, while products, categories and customers refuse deletion
//! while referenced. Stock decrements are guarded in SQL so two concurrent
//! orders can never drive a quantity below zero.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use comptoir_catalog::{Category, Product, StockAdjustment};
use comptoir_core::{CategoryId, CustomerId, OrderDetailId, OrderId, ProductId};
use comptoir_customers::Customer;
use comptoir_orders::{Order, OrderDetail, OrderWithDetails};

use super::{CatalogStore, CustomerStore, OrderStore, Page, Paginated, StoreError};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connects and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// For inserts and updates a foreign-key violation means the referenced row
/// is gone.
fn fk_means_missing(err: sqlx::Error) -> StoreError {
    if db_code(&err).as_deref() == Some(FOREIGN_KEY_VIOLATION) {
        StoreError::NotFound
    } else {
        StoreError::Database(err)
    }
}

/// For deletes a foreign-key violation means something still points at the
/// row being removed.
fn fk_means_referenced(err: sqlx::Error, entity: &'static str) -> StoreError {
    if db_code(&err).as_deref() == Some(FOREIGN_KEY_VIOLATION) {
        StoreError::Referenced { entity }
    } else {
        StoreError::Database(err)
    }
}

/// Order writes can trip the order-number unique index or a foreign key.
fn map_order_write(err: sqlx::Error, order_num: &str) -> StoreError {
    match db_code(&err).as_deref() {
        Some(UNIQUE_VIOLATION) => StoreError::DuplicateOrderNum(order_num.to_string()),
        Some(FOREIGN_KEY_VIOLATION) => StoreError::NotFound,
        _ => StoreError::Database(err),
    }
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn product_from_row(row: &PgRow) -> Result<Product, sqlx::Error> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        price: row.try_get("price")?,
        quantity: row.try_get("quantity")?,
        description: row.try_get("description")?,
        image: row.try_get("image")?,
        category_id: CategoryId::from_uuid(row.try_get("category_id")?),
        created_at: row.try_get("created_at")?,
    })
}

fn customer_from_row(row: &PgRow) -> Result<Customer, sqlx::Error> {
    Ok(Customer {
        id: CustomerId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        created_at: row.try_get("created_at")?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id")?),
        customer_id: CustomerId::from_uuid(row.try_get("customer_id")?),
        order_num: row.try_get("order_num")?,
        order_date: row.try_get("order_date")?,
        created_at: row.try_get("created_at")?,
    })
}

fn detail_from_row(row: &PgRow) -> Result<OrderDetail, sqlx::Error> {
    Ok(OrderDetail {
        id: OrderDetailId::from_uuid(row.try_get("id")?),
        order_id: OrderId::from_uuid(row.try_get("order_id")?),
        product_id: ProductId::from_uuid(row.try_get("product_id")?),
        order_quantity: row.try_get("order_quantity")?,
    })
}

impl PostgresStore {
    async fn details_for_orders(
        &self,
        order_ids: Vec<Uuid>,
    ) -> Result<Vec<OrderDetail>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, order_id, product_id, order_quantity FROM order_details \
             WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;
        let details = rows
            .iter()
            .map(detail_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(details)
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresStore {
    async fn insert_category(&self, category: &Category) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO categories (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, name, created_at FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(category_from_row).transpose()?)
    }

    async fn list_categories(&self, page: Page) -> Result<Paginated<Category>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT id, name, created_at FROM categories \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(category_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated {
            items,
            total: total as u64,
            page,
        })
    }

    async fn update_category(&self, category: &Category) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE categories SET name = $1 WHERE id = $2")
            .bind(&category.name)
            .bind(category.id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| fk_means_referenced(e, "category"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO products (id, name, price, quantity, description, image, category_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.category_id.as_uuid())
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(fk_means_missing)?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, price, quantity, description, image, category_id, created_at \
             FROM products WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(product_from_row).transpose()?)
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();
        let rows = sqlx::query(
            "SELECT id, name, price, quantity, description, image, category_id, created_at \
             FROM products WHERE id = ANY($1)",
        )
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    async fn list_products(&self, page: Page) -> Result<Paginated<Product>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT id, name, price, quantity, description, image, category_id, created_at \
             FROM products ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(product_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated {
            items,
            total: total as u64,
            page,
        })
    }

    async fn update_product(&self, product: &Product) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE products SET name = $1, price = $2, quantity = $3, description = $4, \
             image = $5, category_id = $6 WHERE id = $7",
        )
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.category_id.as_uuid())
        .bind(product.id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(fk_means_missing)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| fk_means_referenced(e, "product"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn adjust_stock(&self, movements: &[StockAdjustment]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for movement in movements {
            let result = sqlx::query(
                "UPDATE products SET quantity = quantity + $1 \
                 WHERE id = $2 AND quantity + $1 >= 0",
            )
            .bind(movement.delta)
            .bind(movement.product_id.as_uuid())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Zero rows means the product vanished or the guard refused
                // the decrement. Dropping the transaction rolls back the
                // movements already applied.
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
                        .bind(movement.product_id.as_uuid())
                        .fetch_one(&mut *tx)
                        .await?;
                return Err(if exists {
                    StoreError::InsufficientStock {
                        product_id: movement.product_id,
                    }
                } else {
                    StoreError::NotFound
                });
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn restore_stock(&self, movements: &[StockAdjustment]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for movement in movements {
            sqlx::query("UPDATE products SET quantity = quantity + $1 WHERE id = $2")
                .bind(movement.delta)
                .bind(movement.product_id.as_uuid())
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CustomerStore for PostgresStore {
    async fn insert_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO customers (id, name, address, phone, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(customer.id.as_uuid())
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            "SELECT id, name, address, phone, created_at FROM customers WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(customer_from_row).transpose()?)
    }

    async fn list_customers(&self, page: Page) -> Result<Paginated<Customer>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT id, name, address, phone, created_at FROM customers \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(customer_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated {
            items,
            total: total as u64,
            page,
        })
    }

    async fn update_customer(&self, customer: &Customer) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE customers SET name = $1, address = $2, phone = $3 WHERE id = $4",
        )
        .bind(&customer.name)
        .bind(&customer.address)
        .bind(&customer.phone)
        .bind(customer.id.as_uuid())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_customer(&self, id: CustomerId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| fk_means_referenced(e, "customer"))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OrderStore for PostgresStore {
    async fn insert_order(
        &self,
        order: &Order,
        details: &[OrderDetail],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO orders (id, customer_id, order_num, order_date, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(&order.order_num)
        .bind(order.order_date)
        .bind(order.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_order_write(e, &order.order_num))?;

        for detail in details {
            sqlx::query(
                "INSERT INTO order_details (id, order_id, product_id, order_quantity) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(detail.id.as_uuid())
            .bind(detail.order_id.as_uuid())
            .bind(detail.product_id.as_uuid())
            .bind(detail.order_quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_order_write(e, &order.order_num))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<OrderWithDetails>, StoreError> {
        let row = sqlx::query(
            "SELECT id, customer_id, order_num, order_date, created_at FROM orders WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let order = order_from_row(&row)?;
        let details = self.details_for_orders(vec![*id.as_uuid()]).await?;
        Ok(Some(OrderWithDetails { order, details }))
    }

    async fn list_orders(&self, page: Page) -> Result<Paginated<Order>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT id, customer_id, order_num, order_date, created_at FROM orders \
             ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Paginated {
            items,
            total: total as u64,
            page,
        })
    }

    async fn update_order(
        &self,
        order: &Order,
        details: &[OrderDetail],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("UPDATE orders SET customer_id = $1, order_date = $2 WHERE id = $3")
            .bind(order.customer_id.as_uuid())
            .bind(order.order_date)
            .bind(order.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(fk_means_missing)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        sqlx::query("DELETE FROM order_details WHERE order_id = $1")
            .bind(order.id.as_uuid())
            .execute(&mut *tx)
            .await?;
        for detail in details {
            sqlx::query(
                "INSERT INTO order_details (id, order_id, product_id, order_quantity) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(detail.id.as_uuid())
            .bind(detail.order_id.as_uuid())
            .bind(detail.product_id.as_uuid())
            .bind(detail.order_quantity)
            .execute(&mut *tx)
            .await
            .map_err(fk_means_missing)?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn orders_for_customer(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<OrderWithDetails>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, customer_id, order_num, order_date, created_at FROM orders \
             WHERE customer_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(customer_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        let orders = rows
            .iter()
            .map(order_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<Uuid> = orders.iter().map(|o| *o.id.as_uuid()).collect();
        let mut grouped: std::collections::HashMap<OrderId, Vec<OrderDetail>> =
            std::collections::HashMap::new();
        for detail in self.details_for_orders(ids).await? {
            grouped.entry(detail.order_id).or_default().push(detail);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let details = grouped.remove(&order.id).unwrap_or_default();
                OrderWithDetails { order, details }
            })
            .collect())
    }
}
