use reqwest::StatusCode;
use serde_json::{json, Value};

use stockroom_core::{CustomerId, ProductId};
use stockroom_infra::StockroomConfig;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Build app (same router as prod), but bind to an ephemeral port.
        let app = stockroom_api::app::build_app(&StockroomConfig::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self
            .client
            .put(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn location(&self, code: &str) -> String {
        let (status, body) = self
            .post("/locations", json!({ "code": code, "name": code, "kind": "warehouse" }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "body={body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn stock(&self, product: &str, location: &str, quantity: i32) -> String {
        let (status, body) = self
            .post(
                "/stock",
                json!({
                    "product_id": product,
                    "sku": "SKU-API",
                    "location_id": location,
                    "initial_quantity": quantity,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "body={body}");
        body["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_endpoint_is_public() {
    let srv = TestServer::spawn().await;
    let (status, _) = srv.get("/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn reservations_respect_availability() {
    let srv = TestServer::spawn().await;
    let loc = srv.location("DC-1").await;
    let id = srv.stock(&ProductId::new().to_string(), &loc, 10).await;

    let (status, body) = srv.post(&format!("/stock/{id}/reserve"), json!({ "quantity": 7 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reserved"], 7);
    assert_eq!(body["available"], 3);

    let (status, body) = srv.post(&format!("/stock/{id}/reserve"), json!({ "quantity": 5 })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "insufficient_stock");

    let (status, body) = srv.post(&format!("/stock/{id}/reserve"), json!({ "quantity": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let (status, body) = srv.post(&format!("/stock/{id}/release"), json!({ "quantity": 7 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reserved"], 0);

    let (status, body) = srv.get(&format!("/stock/{}", ProductId::new())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn stock_settings_update_is_version_checked() {
    let srv = TestServer::spawn().await;
    let loc = srv.location("DC-1").await;
    let id = srv.stock(&ProductId::new().to_string(), &loc, 2).await;

    let (status, body) = srv
        .put(&format!("/stock/{id}"), json!({ "expected_version": 1, "reorder_point": 5 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["needs_reorder"], true);

    let (status, body) = srv
        .put(&format!("/stock/{id}"), json!({ "expected_version": 1, "reorder_point": 1 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "optimistic_lock_failed");

    let (status, body) = srv
        .put(&format!("/stock/{id}"), json!({ "expected_version": u64::MAX }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let (status, body) = srv.get(&format!("/stock?location_id={loc}&low_stock_only=true")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn transfer_lifecycle_moves_stock() {
    let srv = TestServer::spawn().await;
    let a = srv.location("WH-A").await;
    let b = srv.location("WH-B").await;
    let product = ProductId::new().to_string();
    let source = srv.stock(&product, &a, 20).await;

    let (status, transfer) = srv
        .post(
            "/transfers",
            json!({
                "product_id": product,
                "sku": "SKU-API",
                "source_location_id": a,
                "destination_location_id": b,
                "quantity": 5,
                "requested_by": "alice",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body={transfer}");
    assert_eq!(transfer["status"], "requested");
    let id = transfer["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(&format!("/transfers/{id}/approve"), json!({ "approved_by": "manager" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, body) = srv
        .post(&format!("/transfers/{id}/complete"), json!({ "received_by": "bob" }))
        .await;
    assert_eq!(status, StatusCode::OK, "body={body}");
    assert_eq!(body["status"], "completed");

    let (_, src) = srv.get(&format!("/stock/{source}")).await;
    assert_eq!(src["quantity"], 15);
    let (_, dest) = srv.get(&format!("/stock?product_id={product}&location_id={b}")).await;
    assert_eq!(dest["items"][0]["quantity"], 5);

    let (status, body) = srv.post(&format!("/transfers/{id}/cancel"), json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "already_terminal");

    let (status, body) = srv.get("/transfers/pending-settlements").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn inactive_location_blocks_transfer_requests() {
    let srv = TestServer::spawn().await;
    let a = srv.location("WH-A").await;
    let b = srv.location("WH-B").await;
    let product = ProductId::new().to_string();
    srv.stock(&product, &a, 20).await;

    let (status, _) = srv.post(&format!("/locations/{b}/deactivate"), json!({})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = srv
        .post(
            "/transfers",
            json!({
                "product_id": product,
                "sku": "SKU-API",
                "source_location_id": a,
                "destination_location_id": b,
                "quantity": 5,
                "requested_by": "alice",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "location_inactive");
}

#[tokio::test]
async fn cancelled_transfer_cannot_be_approved() {
    let srv = TestServer::spawn().await;
    let a = srv.location("WH-A").await;
    let b = srv.location("WH-B").await;
    let product = ProductId::new().to_string();
    srv.stock(&product, &a, 20).await;

    let (_, transfer) = srv
        .post(
            "/transfers",
            json!({
                "product_id": product,
                "sku": "SKU-API",
                "source_location_id": a,
                "destination_location_id": b,
                "quantity": 5,
                "requested_by": "alice",
            }),
        )
        .await;
    let id = transfer["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .post(&format!("/transfers/{id}/cancel"), json!({ "reason": "duplicate" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, body) = srv
        .post(&format!("/transfers/{id}/approve"), json!({ "approved_by": "manager" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_transfer_state");
}

#[tokio::test]
async fn stale_order_update_is_rejected() {
    let srv = TestServer::spawn().await;
    let lines = json!([{
        "product_id": ProductId::new().to_string(),
        "sku": "SKU-API",
        "quantity": 2,
        "unit_price": 450,
    }]);

    let (status, order) = srv
        .post(
            "/orders",
            json!({ "customer_id": CustomerId::new().to_string(), "lines": lines }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body={order}");
    assert_eq!(order["total"], 900);
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = srv
        .put(
            &format!("/orders/{id}"),
            json!({ "lines": lines, "notes": "leave at door", "expected_version": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (status, body) = srv
        .put(&format!("/orders/{id}"), json!({ "lines": lines, "expected_version": 1 }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "optimistic_lock_failed");

    let (status, body) = srv
        .put(&format!("/orders/{id}"), json!({ "lines": lines, "expected_version": u64::MAX }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let (status, body) = srv
        .post(
            &format!("/orders/{id}/status"),
            json!({ "status": "confirmed", "expected_version": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "confirmed");

    let (status, body) = srv.get("/orders?status=confirmed").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
}
