//! Order records and the commands the order workflow accepts.
//!
//! An order is a header row (customer, reference, date) plus one detail row
//! per line item the caller submitted. Details are replaced wholesale on
//! update; the stock consequences of doing so are computed in [`crate::stock`]
//! and applied by the workflow.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use comptoir_core::{CustomerId, DomainError, DomainResult, OrderDetailId, OrderId, ProductId};

/// One (product, quantity) pair within an order request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    /// Human-facing order reference, unique across all orders.
    pub order_num: String,
    pub order_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        id: OrderId,
        customer_id: CustomerId,
        order_num: String,
        order_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_id,
            order_num,
            order_date,
            created_at,
        }
    }
}

/// One line of an order as stored: which product and how many units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: OrderDetailId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub order_quantity: i64,
}

impl OrderDetail {
    pub fn from_line_item(order_id: OrderId, item: &LineItem) -> Self {
        Self {
            id: OrderDetailId::new(),
            order_id,
            product_id: item.product_id,
            order_quantity: item.quantity,
        }
    }
}

/// An order header together with all of its detail rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderWithDetails {
    pub order: Order,
    pub details: Vec<OrderDetail>,
}

/// Request to place a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceOrder {
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub line_items: Vec<LineItem>,
}

/// Full-replace update of an existing order: customer, date and the whole
/// set of line items. The order keeps its reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOrder {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub order_date: NaiveDate,
    pub line_items: Vec<LineItem>,
}

/// Checks the line items of a place or update request: at least one line,
/// and every line asks for at least one unit.
pub fn validate_line_items(items: &[LineItem]) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::validation(
            "an order needs at least one line item",
        ));
    }
    for item in items {
        if item.quantity < 1 {
            return Err(DomainError::validation(
                "order quantity must be at least 1",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_line_items_are_rejected() {
        let err = validate_line_items(&[]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        let items = vec![LineItem {
            product_id: ProductId::new(),
            quantity: 0,
        }];
        assert!(validate_line_items(&items).is_err());

        let items = vec![
            LineItem {
                product_id: ProductId::new(),
                quantity: 3,
            },
            LineItem {
                product_id: ProductId::new(),
                quantity: -2,
            },
        ];
        assert!(validate_line_items(&items).is_err());
    }

    #[test]
    fn single_unit_lines_pass() {
        let items = vec![LineItem {
            product_id: ProductId::new(),
            quantity: 1,
        }];
        assert!(validate_line_items(&items).is_ok());
    }

    #[test]
    fn detail_rows_mirror_the_submitted_line() {
        let order_id = OrderId::new();
        let item = LineItem {
            product_id: ProductId::new(),
            quantity: 4,
        };
        let detail = OrderDetail::from_line_item(order_id, &item);
        assert_eq!(detail.order_id, order_id);
        assert_eq!(detail.product_id, item.product_id);
        assert_eq!(detail.order_quantity, 4);
    }
}
