//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        borrow::{BorrowQuery, BorrowRequest},
        delivery::DeliveryManager,
        fine::FineAssessment,
    },
    services::borrowings::{BorrowActions, LocationView},
    AppState,
};

use super::AuthenticatedUser;

/// Delivery manager to assign
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AssignManagerRequest {
    #[validate(range(min = 1, message = "Select a delivery manager"))]
    pub delivery_manager_id: i64,
}

/// Rejection of a pending request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RejectRequest {
    #[validate(length(min = 1, message = "A rejection reason is required"))]
    pub reason: String,
}

/// List borrow requests visible to the caller
#[utoipa::path(
    get,
    path = "/borrowings",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(BorrowQuery),
    responses(
        (status = 200, description = "Borrow requests", body = Vec<BorrowRequest>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_borrowings(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Query(query): Query<BorrowQuery>,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    let requests = state.services.borrowings.list(&session, &query).await?;
    Ok(Json(requests))
}

/// Get one borrow request
#[utoipa::path(
    get,
    path = "/borrowings/{id}",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Borrow request", body = BorrowRequest),
        (status = 403, description = "Belongs to another customer"),
        (status = 404, description = "Borrow request not found")
    )
)]
pub async fn get_borrowing(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.get(&session, id).await?;
    Ok(Json(request))
}

/// Actions and display flags for the caller
#[utoipa::path(
    get,
    path = "/borrowings/{id}/actions",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Allowed actions", body = BorrowActions)
    )
)]
pub async fn get_actions(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowActions>> {
    let actions = state.services.borrowings.actions(&session, id).await?;
    Ok(Json(actions))
}

/// Fine owed if the book came back now
#[utoipa::path(
    get,
    path = "/borrowings/{id}/fine-preview",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Fine assessment", body = FineAssessment)
    )
)]
pub async fn get_fine_preview(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<FineAssessment>> {
    let assessment = state.services.borrowings.fine_preview(&session, id).await?;
    Ok(Json(assessment))
}

/// Approve a pending request and assign a delivery manager
#[utoipa::path(
    post,
    path = "/borrowings/{id}/approve",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    request_body = AssignManagerRequest,
    responses(
        (status = 200, description = "Request approved", body = BorrowRequest),
        (status = 400, description = "Delivery manager missing or unavailable"),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AssignManagerRequest>,
) -> AppResult<Json<BorrowRequest>> {
    body.validate()?;
    let request = state
        .services
        .borrowings
        .approve(&session, id, body.delivery_manager_id)
        .await?;
    Ok(Json(request))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/borrowings/{id}/reject",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    request_body = RejectRequest,
    responses(
        (status = 200, description = "Request rejected", body = BorrowRequest),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn reject(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<RejectRequest>,
) -> AppResult<Json<BorrowRequest>> {
    body.validate()?;
    let request = state.services.borrowings.reject(&session, id, &body.reason).await?;
    Ok(Json(request))
}

/// Cancel a pending request
#[utoipa::path(
    post,
    path = "/borrowings/{id}/cancel",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Request cancelled", body = BorrowRequest),
        (status = 409, description = "Request is no longer pending")
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.cancel(&session, id).await?;
    Ok(Json(request))
}

/// Confirm the book reached the customer
#[utoipa::path(
    post,
    path = "/borrowings/{id}/deliver",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Loan is active", body = BorrowRequest),
        (status = 409, description = "Request is not approved")
    )
)]
pub async fn mark_delivered(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.mark_delivered(&session, id).await?;
    Ok(Json(request))
}

/// Ask to return an active loan
#[utoipa::path(
    post,
    path = "/borrowings/{id}/request-return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Return requested", body = BorrowRequest),
        (status = 409, description = "Loan is not active")
    )
)]
pub async fn request_return(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.request_return(&session, id).await?;
    Ok(Json(request))
}

/// Approve a return request
#[utoipa::path(
    post,
    path = "/borrowings/{id}/approve-return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Return approved", body = BorrowRequest),
        (status = 409, description = "No return was requested")
    )
)]
pub async fn approve_return(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.approve_return(&session, id).await?;
    Ok(Json(request))
}

/// Assign a delivery manager to collect the book
#[utoipa::path(
    post,
    path = "/borrowings/{id}/assign-return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    request_body = AssignManagerRequest,
    responses(
        (status = 200, description = "Return assigned", body = BorrowRequest),
        (status = 409, description = "Return is not approved")
    )
)]
pub async fn assign_return(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<AssignManagerRequest>,
) -> AppResult<Json<BorrowRequest>> {
    body.validate()?;
    let request = state
        .services
        .borrowings
        .assign_return(&session, id, body.delivery_manager_id)
        .await?;
    Ok(Json(request))
}

/// Pick up the book from the customer
#[utoipa::path(
    post,
    path = "/borrowings/{id}/start-return-delivery",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Book is on its way back", body = BorrowRequest),
        (status = 409, description = "Return is not assigned")
    )
)]
pub async fn start_return_delivery(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.start_return_delivery(&session, id).await?;
    Ok(Json(request))
}

/// Hand the book back to the library and settle the fine
#[utoipa::path(
    post,
    path = "/borrowings/{id}/complete-return",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Book returned", body = BorrowRequest),
        (status = 409, description = "Book is not out for delivery")
    )
)]
pub async fn complete_return(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.borrowings.complete_return(&session, id).await?;
    Ok(Json(request))
}

/// Live courier position while the book is out for delivery
#[utoipa::path(
    get,
    path = "/borrowings/{id}/delivery-location",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Borrow request ID")),
    responses(
        (status = 200, description = "Location, or a notice explaining why there is none", body = LocationView)
    )
)]
pub async fn delivery_location(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<LocationView>> {
    let view = state.services.borrowings.delivery_location(&session, id).await?;
    Ok(Json(view))
}

/// Delivery managers and their availability
#[utoipa::path(
    get,
    path = "/delivery-managers",
    tag = "borrowings",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Delivery managers", body = Vec<DeliveryManager>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn list_delivery_managers(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
) -> AppResult<Json<Vec<DeliveryManager>>> {
    let managers = state.services.borrowings.delivery_managers(&session).await?;
    Ok(Json(managers))
}
