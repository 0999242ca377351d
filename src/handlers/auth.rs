use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::post,
    Extension, Router,
};
use serde_json::{json, Value};

use crate::api::Payload;
use crate::auth::{credentials_match, generate_jwt, Claims, ADMIN_ROLE};
use crate::error::ApiError;
use crate::middleware::{jwt_auth_middleware, AuthUser};
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/auth/login", post(login))
        .route(
            "/api/auth/verify",
            post(verify).route_layer(middleware::from_fn_with_state(
                state.clone(),
                jwt_auth_middleware,
            )),
        )
}

fn field<'a>(payload: &'a Payload, name: &str) -> Option<&'a str> {
    payload
        .fields
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// POST /api/auth/login - exchange the admin credentials for a token.
/// Accepts `email` or `username` as the identity field.
async fn login(State(state): State<AppState>, payload: Payload) -> Result<Json<Value>, ApiError> {
    let identity = field(&payload, "email").or_else(|| field(&payload, "username"));
    let password = payload.fields.get("password").and_then(Value::as_str);

    let (Some(identity), Some(password)) = (identity, password.filter(|p| !p.is_empty())) else {
        return Err(ApiError::bad_request("Email and password are required"));
    };

    if !credentials_match(&state.config.admin, identity, password) {
        tracing::warn!("Failed login attempt for {}", identity);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::new(&state.config.admin.email, ADMIN_ROLE, state.config.security.jwt_expiry_hours);
    let token = generate_jwt(&claims, &state.config.security).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_with_detail("Failed to issue token", e.to_string())
    })?;

    tracing::info!("Admin {} logged in", claims.email);
    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": {
            "email": claims.email,
            "role": claims.role,
        }
    })))
}

/// POST /api/auth/verify - echo the caller behind a valid token.
async fn verify(Extension(user): Extension<AuthUser>) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": {
            "email": user.email,
            "role": user.role,
        }
    }))
}
