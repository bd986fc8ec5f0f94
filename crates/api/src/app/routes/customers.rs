use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;

use comptoir_core::CustomerId;
use comptoir_customers::{Customer, CustomerFields};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/:id/snapshot", get(customer_snapshot))
        .route("/customers/:id/orders", get(customer_order_history))
}

fn to_fields(body: dto::CustomerRequest) -> CustomerFields {
    CustomerFields {
        name: body.name,
        address: body.address,
        phone: body.phone,
    }
}

pub async fn list_customers(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    match services.customers.list_customers(query.to_page(10)).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::CustomerRequest>,
) -> axum::response::Response {
    let customer = match Customer::new(CustomerId::new(), to_fields(body), Utc::now()) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.customers.insert_customer(&customer).await {
        return errors::store_error_to_response(e);
    }
    (StatusCode::CREATED, Json(customer)).into_response()
}

pub async fn get_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.customers.get_customer(id).await {
        Ok(Some(customer)) => Json(customer).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "customer not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::CustomerRequest>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let mut customer = match services.customers.get_customer(id).await {
        Ok(Some(c)) => c,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "customer not found");
        }
        Err(e) => return errors::store_error_to_response(e),
    };

    if let Err(e) = customer.apply_fields(to_fields(body)) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.customers.update_customer(&customer).await {
        return errors::store_error_to_response(e);
    }
    Json(customer).into_response()
}

pub async fn delete_customer(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.customers.delete_customer(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn customer_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.workflow.customer_snapshot(id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}

pub async fn customer_order_history(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CustomerId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.workflow.customer_order_history(id).await {
        Ok(orders) => Json(orders).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
