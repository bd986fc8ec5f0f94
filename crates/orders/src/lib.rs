//! `comptoir-orders` — orders, their line items, and the pure stock math the
//! order workflow runs on.

pub mod number;
pub mod order;
pub mod stock;

pub use number::{MAX_ORDER_NUM_ATTEMPTS, ORDER_NUM_PREFIX, generate_order_num};
pub use order::{
    LineItem, Order, OrderDetail, OrderWithDetails, PlaceOrder, UpdateOrder, validate_line_items,
};
pub use stock::{fold_line_items, reservation_deltas, restoration_deltas, stock_deltas};
