//! Roles, JWT claims and the per-call session context

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

use super::status::normalize_status;

/// Actor role as carried in the token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Admin,
    DeliveryManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
            Role::DeliveryManager => "delivery_manager",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_status(s).as_str() {
            "customer" => Ok(Role::Customer),
            "admin" | "library_admin" => Ok(Role::Admin),
            "delivery_manager" | "delivery_admin" => Ok(Role::DeliveryManager),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

/// Explicit context passed to every service call.
///
/// The raw token is forwarded to the upstream; the role decides which
/// transitions the caller may trigger.
#[derive(Debug, Clone)]
pub struct Session {
    token: String,
    pub user_id: i64,
    pub role: Role,
}

impl Session {
    pub fn new(token: impl Into<String>, user_id: i64, role: Role) -> Self {
        Self {
            token: token.into(),
            user_id,
            role,
        }
    }

    pub fn from_claims(token: impl Into<String>, claims: &UserClaims) -> Self {
        Self::new(token, claims.user_id, claims.role)
    }

    /// Bearer token, or a precondition failure when there is none
    pub fn token(&self) -> Result<&str, AppError> {
        let token = self.token.trim();
        if token.is_empty() {
            return Err(AppError::Precondition(
                "No authentication token, please sign in again".to_string(),
            ));
        }
        Ok(token)
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_any(&[Role::Admin])
    }

    pub fn require_any(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Authorization(format!(
                "Role '{}' is not allowed to perform this action",
                self.role
            )))
        }
    }
}
