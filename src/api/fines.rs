//! Fine payment endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::fine::{BorrowFine, PaymentMethod},
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentMethodRequest {
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CardConfirmationRequest {
    /// Reference returned by the payment gateway
    #[validate(length(min = 1, message = "A payment transaction reference is required"))]
    pub transaction_reference: String,
}

/// Get a fine
#[utoipa::path(
    get,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Fine ID")),
    responses(
        (status = 200, description = "Fine", body = BorrowFine),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn get_fine(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BorrowFine>> {
    let fine = state.services.fines.get(&session, id).await?;
    Ok(Json(fine))
}

/// Choose how an unpaid fine will be settled
#[utoipa::path(
    post,
    path = "/fines/{id}/payment-method",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Fine ID")),
    request_body = PaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method recorded", body = BorrowFine),
        (status = 409, description = "Fine is already settled")
    )
)]
pub async fn select_payment_method(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<PaymentMethodRequest>,
) -> AppResult<Json<BorrowFine>> {
    let fine = state
        .services
        .fines
        .select_payment_method(&session, id, body.payment_method)
        .await?;
    Ok(Json(fine))
}

/// Confirm a card payment
#[utoipa::path(
    post,
    path = "/fines/{id}/confirm-card-payment",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Fine ID")),
    request_body = CardConfirmationRequest,
    responses(
        (status = 200, description = "Fine paid", body = BorrowFine),
        (status = 409, description = "Fine is settled or not set to card")
    )
)]
pub async fn confirm_card_payment(
    State(state): State<AppState>,
    AuthenticatedUser(session): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(body): Json<CardConfirmationRequest>,
) -> AppResult<Json<BorrowFine>> {
    body.validate()?;
    let fine = state
        .services
        .fines
        .confirm_card_payment(&session, id, &body.transaction_reference)
        .await?;
    Ok(Json(fine))
}
