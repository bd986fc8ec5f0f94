//! Order routes. Success bodies carry the French wording the back-office UI
//! displays; the stock consequences of each mutation live in the workflow.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use comptoir_core::{CustomerId, OrderId};
use comptoir_orders::{LineItem, PlaceOrder, UpdateOrder};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(place_order))
        .route(
            "/orders/:id",
            get(get_order).put(update_order).delete(cancel_order),
        )
}

fn parse_line_items(
    items: Vec<dto::LineItemRequest>,
) -> Result<Vec<LineItem>, axum::response::Response> {
    items
        .into_iter()
        .map(|item| {
            let product_id = item
                .product_id
                .parse()
                .map_err(errors::domain_error_to_response)?;
            Ok(LineItem {
                product_id,
                quantity: item.quantity,
            })
        })
        .collect()
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    // The back-office UI lists five orders per page.
    match services.workflow.list_orders(query.to_page(5)).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::PlaceOrderRequest>,
) -> axum::response::Response {
    let customer_id: CustomerId = match body.customer_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let line_items = match parse_line_items(body.line_items) {
        Ok(items) => items,
        Err(response) => return response,
    };

    let placed = match services
        .workflow
        .place_order(PlaceOrder {
            customer_id,
            order_date: body.order_date,
            line_items,
        })
        .await
    {
        Ok(placed) => placed,
        Err(e) => return errors::workflow_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Commande ajoutée avec succès.",
            "order": placed,
        })),
    )
        .into_response()
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.workflow.get_order(id).await {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn update_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateOrderRequest>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let customer_id: CustomerId = match body.customer_id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let line_items = match parse_line_items(body.line_items) {
        Ok(items) => items,
        Err(response) => return response,
    };

    let updated = match services
        .workflow
        .update_order(UpdateOrder {
            order_id,
            customer_id,
            order_date: body.order_date,
            line_items,
        })
        .await
    {
        Ok(updated) => updated,
        Err(e) => return errors::workflow_error_to_response(e),
    };

    Json(json!({
        "message": "Commande mise à jour avec succès.",
        "order": updated,
    }))
    .into_response()
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.workflow.cancel_order(id).await {
        Ok(()) => Json(json!({
            "message": "Commande supprimée avec succès et le stock a été restauré.",
        }))
        .into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
