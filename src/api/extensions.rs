//! Due date extension endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::extension::BorrowExtension,
    services::extensions::ExtensionDecision,
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExtensionRequest {
    /// Requested due date, must be after the current one
    pub new_due_date: DateTime<Utc>,
}

/// Request a later due date for an active loan
#[utoipa::path(
    post,
    path = "/borrowings/{id}/extensions",
    tag = "extensions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    request_body = ExtensionRequest,
    responses(
        (status = 201, description = "Extension requested", body = BorrowExtension),
        (status = 400, description = "Date is not after the current due date"),
        (status = 409, description = "Loan is not active or already has a pending extension")
    )
)]
pub async fn request_extension(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<ExtensionRequest>,
) -> AppResult<(StatusCode, Json<BorrowExtension>)> {
    let extension = state
        .services
        .extensions
        .request(&session, id, body.new_due_date)
        .await?;
    Ok((StatusCode::CREATED, Json(extension)))
}

/// Approve a pending extension
#[utoipa::path(
    post,
    path = "/extensions/{id}/approve",
    tag = "extensions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Extension ID")),
    responses(
        (status = 200, description = "Extension approved", body = ExtensionDecision),
        (status = 409, description = "Extension already decided")
    )
)]
pub async fn approve_extension(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ExtensionDecision>> {
    let decision = state.services.extensions.decide(&session, id, true).await?;
    Ok(Json(decision))
}

/// Reject a pending extension
#[utoipa::path(
    post,
    path = "/extensions/{id}/reject",
    tag = "extensions",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Extension ID")),
    responses(
        (status = 200, description = "Extension rejected", body = ExtensionDecision),
        (status = 409, description = "Extension already decided")
    )
)]
pub async fn reject_extension(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ExtensionDecision>> {
    let decision = state.services.extensions.decide(&session, id, false).await?;
    Ok(Json(decision))
}
