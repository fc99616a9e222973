use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order (outermost runs first on
/// request, last on response):
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — answers preflights for the beacon endpoint (the snippet
///    runs on third-party pages). The origin is mirrored here only so the
///    preflight succeeds; the actual authorization is the gatekeeper's exact
///    match against the registered origin, and the success response carries
///    that origin in `Access-Control-Allow-Origin`.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/event", post(routes::event::ingest))
        .route(
            "/api/sites",
            post(routes::sites::create_site).get(routes::sites::list_sites),
        )
        .route(
            "/api/sites/{id}",
            get(routes::sites::get_site).delete(routes::sites::deactivate_site),
        )
        .route("/api/sites/{id}/stats", get(routes::stats::site_stats))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
