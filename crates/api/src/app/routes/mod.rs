//! HTTP routes, one module per resource.

use axum::Router;

pub mod categories;
pub mod customers;
pub mod orders;
pub mod products;
pub mod system;

pub fn router() -> Router {
    Router::new()
        .merge(categories::router())
        .merge(customers::router())
        .merge(orders::router())
        .merge(products::router())
}
