pub mod adapters;
pub mod config;
pub mod domain;
pub mod infra;
pub mod services;

use {
    adapters::{http, stripe_webhook},
    axum::{
        Router,
        extract::DefaultBodyLimit,
        routing::{get, post},
    },
    domain::store::BookingStore,
    services::{
        cancellation::CancellationService, checkout::CheckoutService,
        confirmation::ConfirmationService,
    },
    std::sync::Arc,
};

/// Stripe events are typically under 20 KB.
const WEBHOOK_BODY_LIMIT: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
    pub checkout: Arc<CheckoutService>,
    pub confirmation: Arc<ConfirmationService>,
    pub cancellation: Arc<CancellationService>,
    pub stripe_webhook_secret: Arc<str>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/checkout", post(http::checkout))
        .route("/bookings/{id}/confirm", post(http::confirm))
        .route("/bookings/{id}/cancel", post(http::cancel))
        .route("/bookings/{id}/refund", post(http::refund))
        .route("/bookings/{id}/reissue", post(http::reissue))
        .route("/tiers/{id}/availability", get(http::tier_availability))
        .route("/customers/{id}/loyalty", get(http::loyalty))
        .route(
            "/webhook",
            post(stripe_webhook::wh_handler).layer(DefaultBodyLimit::max(WEBHOOK_BODY_LIMIT)),
        )
        .with_state(state)
}
