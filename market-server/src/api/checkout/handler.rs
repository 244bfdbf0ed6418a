//! Checkout API Handlers

use axum::{Json, extract::State};
use shared::cart::{CheckoutReport, CheckoutRequest};
use validator::Validate;

use crate::auth::{CurrentUser, Role};
use crate::core::ServerState;
use crate::db::models::Order;
use crate::utils::{AppError, AppResult};

/// Check out the submitted cart
///
/// Returns one outcome per partner group; HTTP status is 200 even for
/// partial failure. The report body says which groups succeeded, and the
/// client clears only those groups' cart lines.
pub async fn checkout(
    State(state): State<ServerState>,
    user: CurrentUser,
    Json(request): Json<CheckoutRequest>,
) -> AppResult<Json<CheckoutReport<Order>>> {
    if user.role != Role::Customer {
        return Err(AppError::forbidden("Only customers can check out"));
    }
    request.validate()?;

    let report = state.checkout.checkout(&user, request).await;
    Ok(Json(report))
}
