//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{borrowings, discounts, extensions, fines, health};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Bookstore Borrow API",
        version = "1.0.0",
        description = "Borrow request lifecycle, fines and delivery tracking",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Borrowings
        borrowings::list_borrowings,
        borrowings::get_borrowing,
        borrowings::get_actions,
        borrowings::get_fine_preview,
        borrowings::approve,
        borrowings::reject,
        borrowings::cancel,
        borrowings::mark_delivered,
        borrowings::request_return,
        borrowings::approve_return,
        borrowings::assign_return,
        borrowings::start_return_delivery,
        borrowings::complete_return,
        borrowings::delivery_location,
        borrowings::list_delivery_managers,
        // Extensions
        extensions::request_extension,
        extensions::approve_extension,
        extensions::reject_extension,
        // Fines
        fines::get_fine,
        fines::select_payment_method,
        fines::confirm_card_payment,
        // Discounts
        discounts::quote,
    ),
    components(
        schemas(
            // Borrowings
            crate::models::borrow::BorrowRequest,
            crate::models::borrow::BorrowQuery,
            crate::models::borrow::BorrowAction,
            crate::models::return_request::ReturnRequest,
            crate::models::status::ReturnStatus,
            crate::models::delivery::DeliveryPerson,
            crate::models::delivery::DeliveryManager,
            crate::models::delivery::DeliveryLocation,
            crate::models::delivery::Availability,
            crate::services::borrowings::BorrowActions,
            crate::services::borrowings::LocationView,
            borrowings::AssignManagerRequest,
            borrowings::RejectRequest,
            // Extensions
            crate::models::extension::BorrowExtension,
            crate::models::extension::ExtensionStatus,
            crate::services::extensions::ExtensionDecision,
            extensions::ExtensionRequest,
            // Fines
            crate::models::fine::BorrowFine,
            crate::models::fine::FineStatus,
            crate::models::fine::PaymentMethod,
            crate::models::fine::FineAssessment,
            fines::PaymentMethodRequest,
            fines::CardConfirmationRequest,
            // Discounts
            crate::models::discount::Discount,
            crate::models::discount::DiscountType,
            crate::services::discounts::DiscountQuote,
            discounts::QuoteRequest,
            // Health
            health::HealthResponse,
            health::ReadinessResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::error::Notice,
            crate::error::Severity,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "borrowings", description = "Borrow request lifecycle"),
        (name = "extensions", description = "Due date extensions"),
        (name = "fines", description = "Fine payment"),
        (name = "discounts", description = "Discount quotes")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::openapi::{PathItemType, RefOr};

    #[test]
    fn test_document_lists_lifecycle_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/borrowings/{id}/approve"));
        assert!(doc.paths.paths.contains_key("/fines/{id}/confirm-card-payment"));

        let deliver = &doc.paths.paths["/borrowings/{id}/deliver"].operations[&PathItemType::Post];
        match &deliver.responses.responses["409"] {
            RefOr::T(response) => assert_eq!(response.description, "Request is not approved"),
            RefOr::Ref(_) => panic!("inline response expected"),
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
