use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde_json::{json, Value};

use crate::api::rest::EmailRequest;
use crate::engine::parse_order_id;
use crate::error::AppError;
use crate::models::courier::CourierRegistration;
use crate::models::order::DeliveryOrder;
use crate::models::user::Credentials;
use crate::security::authorization::Actor;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register-courier", post(register_courier))
        .route("/login-courier", post(login_courier))
        .route("/courier/orders", get(assigned_orders))
        .route("/courier/orders/:id/accept", post(accept_order))
        .route("/courier/orders/:id/decline", post(decline_order))
}

async fn register_courier(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CourierRegistration>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    state.accounts.register_courier(payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Courier registered successfully" })),
    ))
}

async fn login_courier(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(credentials) = payload?;
    let name = state.accounts.login_courier(credentials).await?;

    Ok(Json(json!({
        "message": "Login successful!",
        "username": name,
    })))
}

async fn assigned_orders(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    let Json(request) = payload?;
    Ok(Json(state.lifecycle.orders_for_courier(&request.email).await?))
}

async fn accept_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    let Json(request) = payload?;
    let actor = Actor::Courier(request.email.clone());

    let order = state
        .lifecycle
        .accept(&actor, order_id, &request.email)
        .await?;

    Ok(Json(json!({
        "message": "Order accepted successfully",
        "order": order,
    })))
}

async fn decline_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    let Json(request) = payload?;
    let actor = Actor::Courier(request.email.clone());

    let order = state
        .lifecycle
        .decline(&actor, order_id, &request.email)
        .await?;

    Ok(Json(json!({
        "message": "Order declined successfully",
        "order": order,
    })))
}
