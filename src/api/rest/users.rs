use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::Json;
use axum::Router;
use serde_json::{json, Value};

use crate::api::rest::{user_actor, user_id_header};
use crate::engine::enrichment::EnrichedOrder;
use crate::engine::parse_order_id;
use crate::error::AppError;
use crate::models::order::{DeliveryOrder, OrderDraft};
use crate::models::user::{Credentials, User, UserRegistration};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/users", get(list_users))
        .route("/login", post(login))
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/cancel", delete(cancel_order))
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UserRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let user = state.accounts.register_user(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "userId": user.id,
        })),
    ))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.accounts.list_users().await?))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(credentials) = payload?;
    let user_id = state.accounts.login_user(credentials).await?;

    Ok(Json(json!({
        "userId": user_id,
        "message": "Login successful!",
    })))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<OrderDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(draft) = payload?;
    let order = state
        .lifecycle
        .create(user_id_header(&headers), draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Order created successfully",
            "orderId": order.id,
        })),
    ))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<EnrichedOrder>>, AppError> {
    let orders = state
        .enrichment
        .orders_for_user(user_id_header(&headers))
        .await?;
    Ok(Json(orders))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryOrder>, AppError> {
    let order_id = parse_order_id(&id)?;
    Ok(Json(state.lifecycle.get(order_id).await?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    state
        .lifecycle
        .cancel(&user_actor(&headers), order_id)
        .await?;

    Ok(Json(json!({ "message": "Order canceled successfully" })))
}
