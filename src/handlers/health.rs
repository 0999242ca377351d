use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "message": "Portfolio API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "auth": "/api/auth/login, /api/auth/verify",
            "team": "/api/team-structure/{categories,roles,members,structure/public}",
            "content": "/api/{blogs,careers,career-applications,projects,services,testimonials,partners,contacts,contact-info,faqs,categories,courses,batches,enrollments}",
        }
    }))
}

/// GET /api/health - liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let now = chrono::Utc::now();
    let version = env!("CARGO_PKG_VERSION");

    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "version": version,
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "version": version,
                })),
            )
        }
    }
}
