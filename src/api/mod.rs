//! API handlers for the borrow gateway

pub mod borrowings;
pub mod discounts;
pub mod extensions;
pub mod fines;
pub mod health;
pub mod openapi;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{
    error::AppError,
    models::user::{Session, UserClaims},
    AppState,
};

/// Extractor for the caller's session from the JWT bearer token.
///
/// The raw token is kept on the session so it can be forwarded upstream.
pub struct AuthenticatedUser(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|e| AppError::Authentication(e.to_string()))?;

        let claims = UserClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(Session::from_claims(bearer.token(), &claims)))
    }
}
