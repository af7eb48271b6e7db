//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{Money, ProductId, UserId};
use domain::TransitionPolicy;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use store::{CatalogStore, FailPoint, InMemoryStore};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    _state: Arc<api::AppState<InMemoryStore>>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_policy(TransitionPolicy::Permissive)
    }

    fn with_policy(policy: TransitionPolicy) -> Self {
        let store = InMemoryStore::new();
        let state = api::create_state(store.clone(), policy);
        let app = api::create_app(state.clone(), get_metrics_handle());
        Self {
            app,
            store,
            _state: state,
        }
    }

    async fn product(&self, name: &str, cents: i64) -> ProductId {
        self.store
            .insert_product(name, Money::from_cents(cents))
            .await
            .unwrap()
            .id
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        caller: Option<(UserId, bool)>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user, admin)) = caller {
            builder = builder.header("x-user-id", user.to_string());
            if admin {
                builder = builder.header("x-user-role", "admin");
            }
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn fill_standard_cart(&self, user: UserId) {
        let widget = self.product("Widget", 2000).await;
        let gadget = self.product("Gadget", 1550).await;
        for (product, quantity) in [(widget, 2), (gadget, 1)] {
            let (status, _) = self
                .send(
                    "POST",
                    "/cart/items",
                    Some((user, false)),
                    Some(json!({ "product_id": product, "quantity": quantity })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
        }
    }

    async fn checkout(&self, user: UserId) -> Value {
        let (status, json) = self
            .send(
                "POST",
                "/checkout",
                Some((user, false)),
                Some(json!({ "shipping_info": "Name: Ada\nAddress: 1 Main St" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, json) = app.send("GET", "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = TestApp::new();

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let app = TestApp::new();

    let (status, json) = app.send("GET", "/cart", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn test_malformed_identity_is_unauthorized() {
    let app = TestApp::new();

    let response = app
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/cart")
                .header("x-user-id", "not-a-uuid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_flow() {
    let app = TestApp::new();
    let user = UserId::new();
    app.fill_standard_cart(user).await;

    let (status, cart) = app.send("GET", "/cart", Some((user, false)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["subtotal"]["cents"], 5550);

    let line_id = cart["items"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(
            "PATCH",
            &format!("/cart/items/{line_id}"),
            Some((user, false)),
            Some(json!({ "quantity": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, cart) = app.send("GET", "/cart", Some((user, false)), None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let app = TestApp::new();

    let (status, json) = app
        .send(
            "POST",
            "/cart/items",
            Some((UserId::new(), false)),
            Some(json!({ "product_id": ProductId::new(), "quantity": 1 })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_oversized_quantity_is_bad_request() {
    let app = TestApp::new();
    let product = app.product("Widget", 2000).await;
    let user = UserId::new();

    for quantity in [json!(3_000_000_000u64), json!(10_000_000_000u64)] {
        let (status, json) = app
            .send(
                "POST",
                "/cart/items",
                Some((user, false)),
                Some(json!({ "product_id": product, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
        assert!(json["error"].is_string());
    }

    let (_, cart) = app.send("GET", "/cart", Some((user, false)), None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request_with_error() {
    let app = TestApp::new();
    let product = app.product("Widget", 2000).await;
    let user = UserId::new();

    let (status, json) = app
        .send(
            "POST",
            &format!("/products/{product}/ratings"),
            Some((user, false)),
            Some(json!({ "rating": 4.5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string(), "{json}");

    let (status, json) = app
        .send("POST", "/checkout", Some((user, false)), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("shipping_info"));
}

#[tokio::test]
async fn test_non_json_body_is_bad_request() {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/checkout")
        .header("x-user-id", UserId::new().to_string())
        .body(Body::from("shipping_info=1 Main St"))
        .unwrap();

    let response = app.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_checkout_then_confirm() {
    let app = TestApp::new();
    let user = UserId::new();
    let admin = UserId::new();
    app.fill_standard_cart(user).await;

    let receipt = app.checkout(user).await;
    assert_eq!(receipt["total_price"]["cents"], 5550);
    assert_eq!(receipt["status"], "PENDING");
    assert!(receipt["order_number"].is_null());
    assert_eq!(receipt["items"].as_array().unwrap().len(), 2);

    let (_, cart) = app.send("GET", "/cart", Some((user, false)), None).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let order_id = receipt["id"].as_str().unwrap().to_string();
    let uri = format!("/orders/{order_id}/status");

    let (status, first) = app
        .send(
            "PATCH",
            &uri,
            Some((admin, true)),
            Some(json!({ "status": "CONFIRMED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let number = first["order"]["order_number"].as_str().unwrap().to_string();
    assert!(number.starts_with("ORD-"));
    assert!(first["message"].as_str().unwrap().contains(&number));

    let (_, second) = app
        .send(
            "PATCH",
            &uri,
            Some((admin, true)),
            Some(json!({ "status": "CONFIRMED" })),
        )
        .await;
    assert_eq!(second["order"]["order_number"], number.as_str());
}

#[tokio::test]
async fn test_empty_cart_checkout_is_bad_request() {
    let app = TestApp::new();

    let (status, _) = app
        .send(
            "POST",
            "/checkout",
            Some((UserId::new(), false)),
            Some(json!({ "shipping_info": "Address: 1 Main St" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_failed_checkout_is_server_error_without_orphan() {
    let app = TestApp::new();
    let user = UserId::new();
    app.fill_standard_cart(user).await;
    app.store.fail_order_items_after(1).await;

    let (status, json) = app
        .send(
            "POST",
            "/checkout",
            Some((user, false)),
            Some(json!({ "shipping_info": "Address: 1 Main St" })),
        )
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].is_string());
    assert_eq!(app.store.order_count().await, 0);
}

#[tokio::test]
async fn test_cart_clear_failure_reports_warning() {
    let app = TestApp::new();
    let user = UserId::new();
    app.fill_standard_cart(user).await;
    app.store.fail_on(FailPoint::ClearCart).await;

    let receipt = app.checkout(user).await;

    assert_eq!(receipt["warnings"][0]["kind"], "cart_not_cleared");
}

#[tokio::test]
async fn test_status_update_requires_admin() {
    let app = TestApp::new();
    let user = UserId::new();
    app.fill_standard_cart(user).await;
    let receipt = app.checkout(user).await;
    let order_id = receipt["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            Some((user, false)),
            Some(json!({ "status": "CONFIRMED" })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unknown_status_is_bad_request() {
    let app = TestApp::new();
    let user = UserId::new();
    app.fill_standard_cart(user).await;
    let receipt = app.checkout(user).await;
    let order_id = receipt["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/orders/{order_id}/status"),
            Some((UserId::new(), true)),
            Some(json!({ "status": "DELIVERED" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forward_only_policy_conflict() {
    let app = TestApp::with_policy(TransitionPolicy::ForwardOnly);
    let user = UserId::new();
    let admin = UserId::new();
    app.fill_standard_cart(user).await;
    let receipt = app.checkout(user).await;
    let uri = format!("/orders/{}/status", receipt["id"].as_str().unwrap());

    let (status, _) = app
        .send("PATCH", &uri, Some((admin, true)), Some(json!({ "status": "COMPLETED" })))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send("PATCH", &uri, Some((admin, true)), Some(json!({ "status": "PENDING" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_order_visibility() {
    let app = TestApp::new();
    let owner = UserId::new();
    let stranger = UserId::new();
    app.fill_standard_cart(owner).await;
    let receipt = app.checkout(owner).await;
    let uri = format!("/orders/{}", receipt["id"].as_str().unwrap());

    let (status, details) = app.send("GET", &uri, Some((owner, false)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["items"].as_array().unwrap().len(), 2);

    let (status, _) = app.send("GET", &uri, Some((stranger, false)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, own_list) = app.send("GET", "/orders", Some((stranger, false)), None).await;
    assert!(own_list.as_array().unwrap().is_empty());

    let (_, all) = app
        .send("GET", "/orders", Some((UserId::new(), true)), None)
        .await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_deletes_order() {
    let app = TestApp::new();
    let owner = UserId::new();
    let admin = UserId::new();
    app.fill_standard_cart(owner).await;
    let receipt = app.checkout(owner).await;
    let uri = format!("/orders/{}", receipt["id"].as_str().unwrap());

    let (status, _) = app.send("DELETE", &uri, Some((owner, false)), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app.send("DELETE", &uri, Some((admin, true)), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].is_string());

    let (status, _) = app.send("DELETE", &uri, Some((admin, true)), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_order_id_is_bad_request() {
    let app = TestApp::new();

    let (status, _) = app
        .send("GET", "/orders/not-a-uuid", Some((UserId::new(), false)), None)
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_flow() {
    let app = TestApp::new();
    let product = app.product("Widget", 2000).await;
    let admin = UserId::new();
    let ratings_uri = format!("/products/{product}/ratings");

    let mut ids = Vec::new();
    for score in [5, 3, 4] {
        let (status, json) = app
            .send(
                "POST",
                &ratings_uri,
                Some((UserId::new(), false)),
                Some(json!({ "rating": score, "review": "ok" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(json["rating"]["id"].as_str().unwrap().to_string());
    }

    let (_, public) = app
        .send("GET", &ratings_uri, Some((UserId::new(), false)), None)
        .await;
    assert!(public.as_array().unwrap().is_empty());

    let mut last = Value::Null;
    for id in &ids {
        let (status, json) = app
            .send(
                "PATCH",
                &format!("/ratings/{id}/moderation"),
                Some((admin, true)),
                Some(json!({ "moderated": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        last = json;
    }
    assert_eq!(last["average_rating"], 4.0);

    let (status, json) = app
        .send("DELETE", &format!("/ratings/{}", ids[0]), Some((admin, true)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["average_rating"], 3.5);
}

#[tokio::test]
async fn test_rating_conflicts_and_validation() {
    let app = TestApp::new();
    let product = app.product("Widget", 2000).await;
    let user = UserId::new();
    let uri = format!("/products/{product}/ratings");

    let (status, _) = app
        .send("POST", &uri, Some((user, false)), Some(json!({ "rating": 6 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send("POST", &uri, Some((user, false)), Some(json!({ "rating": 4 })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = app
        .send("POST", &uri, Some((user, false)), Some(json!({ "rating": 2 })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("already rated"));
}

#[tokio::test]
async fn test_rating_ownership() {
    let app = TestApp::new();
    let product = app.product("Widget", 2000).await;
    let owner = UserId::new();
    let stranger = UserId::new();

    let (_, json) = app
        .send(
            "POST",
            &format!("/products/{product}/ratings"),
            Some((owner, false)),
            Some(json!({ "rating": 4 })),
        )
        .await;
    let rating_uri = format!("/ratings/{}", json["rating"]["id"].as_str().unwrap());

    let (status, _) = app
        .send("PATCH", &rating_uri, Some((stranger, false)), Some(json!({ "rating": 1 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send("DELETE", &rating_uri, Some((stranger, false)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = app
        .send("PATCH", &rating_uri, Some((owner, false)), Some(json!({ "rating": 2 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["rating"]["moderated"], false);

    let (status, _) = app.send("DELETE", &rating_uri, Some((owner, false)), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_moderation_requires_admin() {
    let app = TestApp::new();
    let product = app.product("Widget", 2000).await;
    let user = UserId::new();

    let (_, json) = app
        .send(
            "POST",
            &format!("/products/{product}/ratings"),
            Some((user, false)),
            Some(json!({ "rating": 4 })),
        )
        .await;
    let id = json["rating"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            "PATCH",
            &format!("/ratings/{id}/moderation"),
            Some((user, false)),
            Some(json!({ "moderated": true })),
        )
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}
