//! Discount quote endpoint

use axum::{extract::State, Json};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::discount::Discount,
    services::discounts::DiscountQuote,
    AppState,
};

use super::AuthenticatedUser;

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub discount: Discount,
    #[schema(value_type = String)]
    pub amount: Decimal,
}

/// Price after applying a discount
#[utoipa::path(
    post,
    path = "/discounts/quote",
    tag = "discounts",
    security(("bearer_auth" = [])),
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quoted price", body = DiscountQuote),
        (status = 400, description = "Negative amount")
    )
)]
pub async fn quote(
    State(state): State<AppState>,
    AuthenticatedUser(_session): AuthenticatedUser,
    Json(body): Json<QuoteRequest>,
) -> AppResult<Json<DiscountQuote>> {
    let quote = state
        .services
        .discounts
        .quote(&body.discount, body.amount, Utc::now())?;
    Ok(Json(quote))
}
