pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod content;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod services;
pub mod state;
pub mod uploads;

use axum::{
    extract::DefaultBodyLimit, http::HeaderValue, middleware::map_response_with_state,
    routing::get, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub use state::AppState;

/// Build the full HTTP application around `state`.
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/api/health", get(handlers::health::health))
        .merge(handlers::auth::routes(&state))
        .merge(handlers::team::routes(&state))
        .merge(handlers::content::routes(&state));

    let public_base = state.uploads.public_base();
    if public_base.starts_with('/') && public_base.len() > 1 {
        router = router.nest_service(public_base, ServeDir::new(state.uploads.dir()));
    } else {
        tracing::warn!("Upload base '{}' is not a local path; uploads are not served", public_base);
    }

    let layers = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.security.cors_origins))
        .layer(DefaultBodyLimit::max(state.config.api.max_request_size_bytes));

    router
        .layer(map_response_with_state(state.clone(), error::attach_error_detail))
        .layer(layers)
        .with_state(state)
}

/// An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}
