use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use courier_dispatch::api::rest::router;
use courier_dispatch::config::Config;
use courier_dispatch::models::courier::Courier;
use courier_dispatch::models::user::User;
use courier_dispatch::security::authorization::AuthorizationMode;
use courier_dispatch::state::AppState;
use courier_dispatch::store::{IdentityStore, MemoryStore, StoreError};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

fn setup() -> axum::Router {
    router(Arc::new(AppState::new(Config::default())))
}

fn setup_strict() -> axum::Router {
    let config = Config {
        authorization_mode: AuthorizationMode::Strict,
        ..Config::default()
    };
    router(Arc::new(AppState::new(config)))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn json_request_as(method: &str, uri: &str, user_id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("userId", user_id)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_request_as(uri: &str, user_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("userId", user_id)
        .body(Body::empty())
        .unwrap()
}

fn delete_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn register_and_login(app: &axum::Router, email: &str, name: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            json!({ "name": name, "email": email, "phone": "555-0100", "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            json!({ "email": email, "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    body_json(res).await["userId"].as_str().unwrap().to_string()
}

async fn register_courier(app: &axum::Router, email: &str, name: &str, phone: &str) {
    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register-courier",
            json!({
                "name": name,
                "email": email,
                "phone": phone,
                "password": "pw",
                "vehicleType": "van",
                "plateNumber": "HH-CD-1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

async fn create_order(app: &axum::Router, user_id: &str) -> String {
    let res = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            "/orders",
            user_id,
            json!({
                "pickupLocation": "Depot 4",
                "dropOffLocation": "Harbour St 12",
                "packageDetails": "2 boxes",
                "deliveryTime": "18:00"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    body_json(res).await["orderId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["orders"], 0);
}

/// Identity store whose user count never answers.
struct StalledUserCount(Arc<MemoryStore>);

#[async_trait]
impl IdentityStore for StalledUserCount {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.0.insert_user(user).await
    }

    async fn insert_courier(&self, courier: Courier) -> Result<(), StoreError> {
        self.0.insert_courier(courier).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.0.find_user_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.0.find_user_by_email(email).await
    }

    async fn find_admin_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.0.find_admin_by_email(email).await
    }

    async fn find_courier_by_email(&self, email: &str) -> Result<Option<Courier>, StoreError> {
        self.0.find_courier_by_email(email).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.0.list_users().await
    }

    async fn user_count(&self) -> Result<usize, StoreError> {
        std::future::pending().await
    }

    async fn courier_count(&self) -> Result<usize, StoreError> {
        self.0.courier_count().await
    }
}

#[tokio::test]
async fn health_gives_up_on_a_stalled_store() {
    let store = Arc::new(MemoryStore::new());
    let config = Config {
        store_timeout: Duration::from_millis(50),
        ..Config::default()
    };
    let state = AppState::with_backends(
        store.clone(),
        Arc::new(StalledUserCount(store)),
        config,
    );
    let app = router(Arc::new(state));

    let response = tokio::time::timeout(
        Duration::from_secs(5),
        app.oneshot(get_request("/health")),
    )
    .await
    .expect("health should answer within the store timeout")
    .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("timed out"));
}

#[tokio::test]
async fn duplicate_registration_returns_409() {
    let app = setup();
    register_and_login(&app, "a@x.com", "Ann").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/register",
            json!({ "name": "Ann 2", "email": "a@x.com", "phone": "1", "password": "other" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app.oneshot(get_request("/users")).await.unwrap();
    let users = body_json(res).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert!(users[0].get("password").is_none());
}

#[tokio::test]
async fn malformed_registration_body_returns_400() {
    let app = setup();
    let res = app
        .oneshot(json_request("POST", "/register", json!({ "name": 7 })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn wrong_password_returns_401() {
    let app = setup();
    register_and_login(&app, "a@x.com", "Ann").await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/login",
            json!({ "email": "a@x.com", "password": "nope" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .oneshot(json_request(
            "POST",
            "/login",
            json!({ "email": "ghost@x.com", "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn regular_user_cannot_use_admin_login() {
    let app = setup();
    register_and_login(&app, "a@x.com", "Ann").await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/admin/login",
            json!({ "email": "a@x.com", "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_order_requires_identity_header() {
    let app = setup();

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "pickupLocation": "A", "dropOffLocation": "B" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(json_request_as(
            "POST",
            "/orders",
            "not-an-id",
            json!({ "pickupLocation": "A", "dropOffLocation": "B" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn order_owner_comes_from_header_not_body() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    let forged = "00000000-0000-0000-0000-000000000001";

    let res = app
        .clone()
        .oneshot(json_request_as(
            "POST",
            "/orders",
            &user_id,
            json!({ "pickupLocation": "A", "dropOffLocation": "B", "userId": forged, "status": "Accepted" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order_id = body_json(res).await["orderId"].as_str().unwrap().to_string();

    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let order = body_json(res).await;
    assert_eq!(order["userId"], user_id);
    assert_eq!(order["status"], "Pending");
    assert_eq!(order["reassigned"], false);
}

#[tokio::test]
async fn get_order_with_bad_id_returns_400_and_unknown_id_404() {
    let app = setup();

    let res = app.clone().oneshot(get_request("/orders/xyz")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = app
        .oneshot(get_request("/orders/00000000-0000-0000-0000-000000000000"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_removes_order_and_second_cancel_is_404() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    let order_id = create_order(&app, &user_id).await;

    let res = app
        .clone()
        .oneshot(delete_request(&format!("/orders/{order_id}/cancel")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .oneshot(delete_request(&format!("/orders/{order_id}/cancel")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_orders_enriches_owner_and_assigned_courier() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    register_courier(&app, "c@x.com", "Cara", "555-0199").await;
    let assigned = create_order(&app, &user_id).await;
    let open = create_order(&app, &user_id).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/admin/orders/{assigned}/assign-courier"),
            json!({ "email": "c@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(get_request_as("/orders", &user_id))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let orders = body_json(res).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    for order in orders {
        assert_eq!(order["userName"], "Ann");
        if order["id"] == assigned.as_str() {
            assert_eq!(order["courierName"], "Cara");
            assert_eq!(order["courierPhone"], "555-0199");
        } else {
            assert_eq!(order["id"], open.as_str());
            assert!(order.get("courierName").is_none());
        }
    }
}

#[tokio::test]
async fn list_orders_for_unknown_owner_returns_404() {
    let app = setup();
    let res = app
        .oneshot(get_request_as(
            "/orders",
            "00000000-0000-0000-0000-000000000000",
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn full_assignment_flow() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    register_courier(&app, "c@x.com", "Cara", "555-0101").await;
    register_courier(&app, "d@x.com", "Dev", "555-0102").await;
    let order_id = create_order(&app, &user_id).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/admin/orders/{order_id}/reassign-courier"),
            json!({ "email": "d@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/admin/orders/{order_id}/assign-courier"),
            json!({ "email": "c@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["order"]["courierEmail"], "c@x.com");
    assert_eq!(body["order"]["reassigned"], false);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/admin/orders/{order_id}/assign-courier"),
            json!({ "email": "d@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/admin/orders/{order_id}/reassign-courier"),
            json!({ "email": "d@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let order = body_json(res).await;
    assert_eq!(order["courierEmail"], "d@x.com");
    assert_eq!(order["courierName"], "Dev");
    assert_eq!(order["reassigned"], true);

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/courier/orders/{order_id}/accept"),
            json!({ "email": "d@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["order"]["status"], "Accepted");

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/courier/orders/{order_id}/accept"),
            json!({ "email": "d@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = app
        .oneshot(json_request(
            "GET",
            "/courier/orders",
            json!({ "email": "d@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let orders = body_json(res).await;
    assert_eq!(orders.as_array().unwrap().len(), 1);
    assert_eq!(orders[0]["id"], order_id.as_str());
}

#[tokio::test]
async fn assign_unknown_courier_returns_404() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    let order_id = create_order(&app, &user_id).await;

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/admin/orders/{order_id}/assign-courier"),
            json!({ "email": "ghost@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn accept_unknown_order_returns_404() {
    let app = setup();
    register_courier(&app, "c@x.com", "Cara", "555-0101").await;

    let res = app
        .oneshot(json_request(
            "POST",
            &format!("/courier/orders/{}/accept", Uuid::new_v4()),
            json!({ "email": "c@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn admin_status_update_and_delete() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    let order_id = create_order(&app, &user_id).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/admin/orders/{order_id}/status"),
            json!({ "status": "Out for delivery" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(get_request("/admin/orders"))
        .await
        .unwrap();
    let orders = body_json(res).await;
    assert_eq!(orders[0]["status"], "Out for delivery");
    assert!(orders[0].get("userName").is_none());

    let res = app
        .clone()
        .oneshot(delete_request(&format!("/admin/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(delete_request(&format!("/admin/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app
        .oneshot(json_request(
            "PUT",
            &format!("/admin/orders/{order_id}/status"),
            json!({ "status": "Delivered" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn decline_sets_declined_status() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    register_courier(&app, "c@x.com", "Cara", "555").await;
    let order_id = create_order(&app, &user_id).await;

    let res = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/courier/orders/{order_id}/decline"),
            json!({ "email": "c@x.com" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    assert_eq!(body_json(res).await["status"], "Declined");
}

#[tokio::test]
async fn courier_login_returns_username() {
    let app = setup();
    register_courier(&app, "c@x.com", "Cara", "555").await;

    let res = app
        .oneshot(json_request(
            "POST",
            "/login-courier",
            json!({ "email": "c@x.com", "password": "pw" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await["username"], "Cara");
}

#[tokio::test]
async fn courier_orders_without_email_returns_400() {
    let app = setup();
    let res = app
        .oneshot(json_request("GET", "/courier/orders", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn strict_mode_rejects_cancel_by_non_owner() {
    let app = setup_strict();
    let owner = register_and_login(&app, "a@x.com", "Ann").await;
    let other = register_and_login(&app, "b@x.com", "Ben").await;
    let order_id = create_order(&app, &owner).await;

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/orders/{order_id}/cancel"))
                .header("userId", other.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/orders/{order_id}/cancel"))
                .header("userId", owner.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_count_lifecycle_transitions() {
    let app = setup();
    let user_id = register_and_login(&app, "a@x.com", "Ann").await;
    create_order(&app, &user_id).await;

    let res = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(body.contains("order_transitions_total"));
    assert!(body.contains("operation=\"create\""));
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin_and_user_id_header() {
    let app = setup();
    let res = app
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/orders")
                .header("origin", "http://localhost:3000")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,userid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()
            .get("access-control-allow-origin")
            .unwrap()
            .to_str()
            .unwrap(),
        "http://localhost:3000"
    );
}
