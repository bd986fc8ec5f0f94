//! End-to-end test over HTTP: real server on an ephemeral port, in-memory
//! stores, the full order lifecycle from catalog setup to cancellation.

use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use comptoir_api::app::{app_with_services, services};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, bound to an ephemeral port over in-memory
        // stores so tests need no database.
        let app = app_with_services(Arc::new(services::build_in_memory_services()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{addr}");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn post_json(
    client: &reqwest::Client,
    url: String,
    body: Value,
) -> (StatusCode, Value) {
    let res = client.post(url).json(&body).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

/// Seeds one category, one product (10 on hand) and one customer; returns
/// (product id, customer id).
async fn seed_catalog(client: &reqwest::Client, server: &TestServer) -> (String, String) {
    let (status, category) = post_json(
        client,
        server.url("/categories"),
        json!({ "name": "Kitchen" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let category_id = category["id"].as_str().unwrap().to_string();

    let (status, created) = post_json(
        client,
        server.url("/products"),
        json!({
            "name": "Moka pot",
            "price": 2450,
            "quantity": 10,
            "description": "Six-cup aluminium moka pot",
            "category_id": category_id,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["message"], "New product is added successfully.");
    let product_id = created["product"]["id"].as_str().unwrap().to_string();

    let (status, customer) = post_json(
        client,
        server.url("/customers"),
        json!({
            "name": "Amina Benali",
            "address": "12 rue des Lilas, Lyon",
            "phone": "+33 6 12 34 56 78",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let customer_id = customer["id"].as_str().unwrap().to_string();

    (product_id, customer_id)
}

async fn stock_of(client: &reqwest::Client, server: &TestServer, product_id: &str) -> i64 {
    let res = client
        .get(server.url(&format!("/products/{product_id}/snapshot")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snapshot: Value = res.json().await.unwrap();
    snapshot["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn health_answers_ok() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn full_order_lifecycle_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (product_id, customer_id) = seed_catalog(&client, &server).await;

    // Customer snapshot feeds the order-entry form.
    let res = client
        .get(server.url(&format!("/customers/{customer_id}/snapshot")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let snapshot: Value = res.json().await.unwrap();
    assert_eq!(snapshot["address"], "12 rue des Lilas, Lyon");
    assert_eq!(snapshot["phone"], "+33 6 12 34 56 78");

    // Place an order for 4 of the 10 on hand.
    let (status, placed) = post_json(
        &client,
        server.url("/orders"),
        json!({
            "customer_id": customer_id,
            "order_date": "2024-05-17",
            "line_items": [{ "product_id": product_id, "quantity": 4 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(placed["message"], "Commande ajoutée avec succès.");
    let order = &placed["order"]["order"];
    let order_id = order["id"].as_str().unwrap().to_string();
    assert!(order["order_num"].as_str().unwrap().starts_with("COM"));
    assert_eq!(stock_of(&client, &server, &product_id).await, 6);

    // A second order for 7 must name the product and move nothing.
    let (status, rejected) = post_json(
        &client,
        server.url("/orders"),
        json!({
            "customer_id": customer_id,
            "order_date": "2024-05-18",
            "line_items": [{ "product_id": product_id, "quantity": 7 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rejected["error"], "insufficient_stock");
    assert_eq!(
        rejected["message"],
        "La quantité demandée n'est pas disponible en stock pour le produit Moka pot"
    );
    assert_eq!(stock_of(&client, &server, &product_id).await, 6);

    // The product is referenced by an order now; deleting it is refused.
    let res = client
        .delete(server.url(&format!("/products/{product_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "can not delete this commande");

    // Shrinking the order to 2 hands two units back.
    let res = client
        .put(server.url(&format!("/orders/{order_id}")))
        .json(&json!({
            "customer_id": customer_id,
            "order_date": "2024-05-17",
            "line_items": [{ "product_id": product_id, "quantity": 2 }],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["message"], "Commande mise à jour avec succès.");
    assert_eq!(updated["order"]["order"]["order_num"], order["order_num"]);
    assert_eq!(stock_of(&client, &server, &product_id).await, 8);

    // History shows the single live order with its line.
    let res = client
        .get(server.url(&format!("/customers/{customer_id}/orders")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let history: Value = res.json().await.unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["details"][0]["order_quantity"], 2);

    // Cancelling restores the full pre-order quantity.
    let res = client
        .delete(server.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["message"],
        "Commande supprimée avec succès et le stock a été restauré."
    );
    assert_eq!(stock_of(&client, &server, &product_id).await, 10);

    // Cancelling again finds nothing.
    let res = client
        .delete(server.url(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // With no order left the product can go, and then its category.
    let res = client
        .delete(server.url(&format!("/products/{product_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Product is deleted successfully");
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted_over_http() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (product_id, _) = seed_catalog(&client, &server).await;

    let res = client
        .get(server.url(&format!("/products/{product_id}")))
        .send()
        .await
        .unwrap();
    let product: Value = res.json().await.unwrap();
    let category_id = product["category_id"].as_str().unwrap();

    let res = client
        .delete(server.url(&format!("/categories/{category_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .delete(server.url(&format!("/products/{product_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .delete(server.url(&format!("/categories/{category_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn malformed_ids_and_bad_line_items_answer_400() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let (product_id, customer_id) = seed_catalog(&client, &server).await;

    let res = client
        .get(server.url("/products/not-a-uuid/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // A zero-quantity line is a validation failure, before any stock check.
    let (status, body) = post_json(
        &client,
        server.url("/orders"),
        json!({
            "customer_id": customer_id,
            "order_date": "2024-05-17",
            "line_items": [{ "product_id": product_id, "quantity": 0 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    // Unknown customer: 404 with the shared error body shape.
    let (status, body) = post_json(
        &client,
        server.url("/orders"),
        json!({
            "customer_id": "00000000-0000-0000-0000-000000000000",
            "order_date": "2024-05-17",
            "line_items": [{ "product_id": product_id, "quantity": 1 }],
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}
