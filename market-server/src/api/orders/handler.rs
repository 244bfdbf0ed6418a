//! Order API Handlers
//!
//! Reads go straight to the repository; every status mutation goes through
//! the lifecycle engine so ownership and the transition table are enforced
//! in one place.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use shared::order::LifecycleAction;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::models::Order;
use crate::utils::{AppError, AppResult};

/// List orders for the authenticated identity
///
/// Customers see the orders they placed; partners see the orders addressed
/// to them. Newest first.
pub async fn list(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<Vec<Order>>> {
    let repo = state.order_repo();
    let orders = match user.role {
        Role::Customer => repo.find_by_customer(&user.id).await,
        Role::Partner => repo.find_by_partner(&user.id).await,
    }
    .map_err(|e| AppError::database(e.to_string()))?;
    Ok(Json(orders))
}

/// Get order by id (owning customer or owning partner only)
pub async fn get_by_id(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state
        .order_repo()
        .find_by_id(&id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;

    let is_owner = match user.role {
        Role::Customer => order.customer_id == user.id,
        Role::Partner => order.partner_id == user.id,
    };
    if !is_owner {
        return Err(AppError::forbidden("Not your order"));
    }

    Ok(Json(order))
}

pub async fn accept(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    apply(state, user, id, LifecycleAction::Accept).await
}

pub async fn mark_ready(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    apply(state, user, id, LifecycleAction::MarkReady).await
}

pub async fn complete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    apply(state, user, id, LifecycleAction::Complete).await
}

pub async fn cancel(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    apply(state, user, id, LifecycleAction::Cancel).await
}

async fn apply(
    state: ServerState,
    user: CurrentUser,
    id: String,
    action: LifecycleAction,
) -> AppResult<Json<Order>> {
    let order = state.lifecycle.apply(&user, &id, action).await?;
    Ok(Json(order))
}

#[derive(Serialize)]
pub struct DeleteResponse {
    pub deleted: bool,
}

/// Hard-delete a completed order (owning partner only)
pub async fn delete(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<DeleteResponse>> {
    state.lifecycle.delete(&user, &id).await?;
    Ok(Json(DeleteResponse { deleted: true }))
}
