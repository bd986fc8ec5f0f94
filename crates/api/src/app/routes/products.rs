use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use serde_json::json;

use comptoir_catalog::{Product, ProductFields};
use comptoir_core::{CategoryId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/products/:id/snapshot", get(product_snapshot))
}

fn parse_fields(body: dto::ProductRequest) -> Result<ProductFields, axum::response::Response> {
    let category_id: CategoryId = body
        .category_id
        .parse()
        .map_err(errors::domain_error_to_response)?;
    Ok(ProductFields {
        name: body.name,
        price: body.price,
        quantity: body.quantity,
        description: body.description,
        image: body.image,
        category_id,
    })
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::PageQuery>,
) -> axum::response::Response {
    // The back-office UI lists three products per page.
    match services.catalog.list_products(query.to_page(3)).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ProductRequest>,
) -> axum::response::Response {
    let fields = match parse_fields(body) {
        Ok(f) => f,
        Err(response) => return response,
    };
    let product = match Product::new(ProductId::new(), fields, Utc::now()) {
        Ok(p) => p,
        Err(e) => return errors::domain_error_to_response(e),
    };

    if let Err(e) = services.catalog.insert_product(&product).await {
        return errors::store_error_to_response(e);
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "New product is added successfully.",
            "product": product,
        })),
    )
        .into_response()
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.catalog.get_product(id).await {
        Ok(Some(product)) => Json(product).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ProductRequest>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let fields = match parse_fields(body) {
        Ok(f) => f,
        Err(response) => return response,
    };

    let mut product = match services.catalog.get_product(id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found");
        }
        Err(e) => return errors::store_error_to_response(e),
    };
    if let Err(e) = product.apply_fields(fields) {
        return errors::domain_error_to_response(e);
    }
    if let Err(e) = services.catalog.update_product(&product).await {
        return errors::store_error_to_response(e);
    }
    Json(json!({
        "message": "Product is updated successfully.",
        "product": product,
    }))
    .into_response()
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.catalog.delete_product(id).await {
        Ok(()) => Json(json!({ "message": "Product is deleted successfully" })).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn product_snapshot(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.workflow.product_snapshot(id).await {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => errors::workflow_error_to_response(e),
    }
}
