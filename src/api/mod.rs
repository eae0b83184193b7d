pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings);

    Router::new()
        // Root and health endpoints
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        // API routes
        .nest("/api", api_routes())
        // Add state to the router
        .with_state(app_state)
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive()) // Configure properly for production
        .layer(TraceLayer::new_for_http())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/weddings/:wedding_id/gifts", gift_routes())
        // Public confirmation endpoint, called by the payment processor
        .route("/payments/webhook/stripe", post(handlers::webhooks::stripe_webhook))
}

fn gift_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::gifts::list))
        .route("/:gift_id", get(handlers::gifts::get))
        .route("/:gift_id/reconcile", post(handlers::gifts::reconcile))
        .route(
            "/:gift_id/contributions",
            get(handlers::contributions::list).post(handlers::contributions::attest),
        )
        .route("/:gift_id/checkout", post(handlers::contributions::create_checkout))
        .route("/:gift_id/swish-code", post(handlers::contributions::swish_code))
        .route("/:gift_id/swish-qr", get(handlers::contributions::swish_qr))
}
