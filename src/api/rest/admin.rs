use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::rest::EmailRequest;
use crate::engine::parse_order_id;
use crate::error::AppError;
use crate::models::order::DeliveryOrder;
use crate::models::user::Credentials;
use crate::security::authorization::Actor;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/login", post(login_admin))
        .route("/admin/orders", get(list_all_orders))
        .route("/admin/orders/:id", delete(delete_order))
        .route("/admin/orders/:id/status", put(update_status))
        .route("/admin/orders/:id/assign-courier", post(assign_courier))
        .route("/admin/orders/:id/reassign-courier", put(reassign_courier))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

async fn login_admin(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let Json(credentials) = payload?;
    let admin_id = state.accounts.login_admin(credentials).await?;

    Ok(Json(json!({
        "adminId": admin_id,
        "message": "Admin login successful!",
    })))
}

async fn list_all_orders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    Ok(Json(state.lifecycle.list_all().await?))
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    let Json(request) = payload?;

    let order = state
        .lifecycle
        .set_status(&Actor::Admin, order_id, request.status)
        .await?;

    Ok(Json(json!({
        "message": "Order status updated successfully",
        "order": order,
    })))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    state.lifecycle.delete(&Actor::Admin, order_id).await?;

    Ok(Json(json!({ "message": "Order deleted successfully" })))
}

async fn assign_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    let Json(request) = payload?;

    let order = state
        .lifecycle
        .assign_courier(&Actor::Admin, order_id, &request.email)
        .await?;

    Ok(Json(json!({
        "message": "Courier assigned successfully",
        "order": order,
    })))
}

async fn reassign_courier(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let order_id = parse_order_id(&id)?;
    let Json(request) = payload?;

    let order = state
        .lifecycle
        .reassign_courier(&Actor::Admin, order_id, &request.email)
        .await?;

    Ok(Json(json!({
        "message": "Courier reassigned successfully",
        "order": order,
    })))
}
