//! Consistent error responses.
//!
//! Every failure body is `{"error": <code>, "message": <text>}`. The stock
//! rejection carries the French wording, product name included, because the
//! back-office UI displays it verbatim.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use comptoir_core::DomainError;
use comptoir_infra::{StoreError, WorkflowError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn insufficient_stock_message(product: &str) -> String {
    format!("La quantité demandée n'est pas disponible en stock pour le produit {product}")
}

pub fn workflow_error_to_response(err: WorkflowError) -> axum::response::Response {
    match err {
        WorkflowError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        WorkflowError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        WorkflowError::InsufficientStock { product } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            insufficient_stock_message(&product),
        ),
        WorkflowError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        WorkflowError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::InsufficientStock { product } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            insufficient_stock_message(&product),
        ),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        StoreError::DuplicateOrderNum(num) => json_error(
            StatusCode::CONFLICT,
            "conflict",
            format!("order number {num} is already allocated"),
        ),
        StoreError::Referenced { entity } => referenced_to_response(entity),
        StoreError::InsufficientStock { .. } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            "insufficient stock",
        ),
        other => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            other.to_string(),
        ),
    }
}

fn referenced_to_response(entity: &'static str) -> axum::response::Response {
    let message = match entity {
        // Wording the UI displays verbatim, quirks and all.
        "product" => "can not delete this commande".to_string(),
        "category" => "cannot delete a category that still has products".to_string(),
        "customer" => "cannot delete a customer with orders on file".to_string(),
        other => format!("{other} is still referenced"),
    };
    json_error(StatusCode::CONFLICT, "conflict", message)
}
