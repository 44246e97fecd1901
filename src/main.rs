//! Bookstore borrow gateway
//!
//! REST front for the borrow request lifecycle, forwarding to the bookstore
//! backend.

use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookstore_borrow::{
    api,
    config::{AppConfig, LoggingConfig},
    repository::Repository,
    services::Services,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    init_tracing(&config.logging);

    tracing::info!("Starting bookstore borrow gateway v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Forwarding to {}", config.upstream.base_url);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    let repository = Repository::new(&config.upstream)?;
    let services = Services::new(Arc::new(repository), &config);

    let state = AppState {
        config: Arc::new(config),
        services: Arc::new(services),
    };

    let app = create_router(state);

    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bookstore_borrow={},tower_http=debug", logging.level).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        .route("/ready", get(api::health::readiness_check))
        // Borrow requests
        .route("/borrowings", get(api::borrowings::list_borrowings))
        .route("/borrowings/:id", get(api::borrowings::get_borrowing))
        .route("/borrowings/:id/actions", get(api::borrowings::get_actions))
        .route("/borrowings/:id/fine-preview", get(api::borrowings::get_fine_preview))
        .route("/borrowings/:id/approve", post(api::borrowings::approve))
        .route("/borrowings/:id/reject", post(api::borrowings::reject))
        .route("/borrowings/:id/cancel", post(api::borrowings::cancel))
        .route("/borrowings/:id/deliver", post(api::borrowings::mark_delivered))
        .route("/borrowings/:id/request-return", post(api::borrowings::request_return))
        .route("/borrowings/:id/approve-return", post(api::borrowings::approve_return))
        .route("/borrowings/:id/assign-return", post(api::borrowings::assign_return))
        .route(
            "/borrowings/:id/start-return-delivery",
            post(api::borrowings::start_return_delivery),
        )
        .route("/borrowings/:id/complete-return", post(api::borrowings::complete_return))
        .route("/borrowings/:id/delivery-location", get(api::borrowings::delivery_location))
        .route("/delivery-managers", get(api::borrowings::list_delivery_managers))
        // Extensions
        .route("/borrowings/:id/extensions", post(api::extensions::request_extension))
        .route("/extensions/:id/approve", post(api::extensions::approve_extension))
        .route("/extensions/:id/reject", post(api::extensions::reject_extension))
        // Fines
        .route("/fines/:id", get(api::fines::get_fine))
        .route("/fines/:id/payment-method", post(api::fines::select_payment_method))
        .route("/fines/:id/confirm-card-payment", post(api::fines::confirm_card_payment))
        // Discounts
        .route("/discounts/quote", post(api::discounts::quote))
        .with_state(state);

    let openapi = api::openapi::create_openapi_router();

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
}
