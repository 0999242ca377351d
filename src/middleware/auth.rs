use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Claims, ADMIN_ROLE};
use crate::error::ApiError;
use crate::state::AppState;

/// Authenticated caller extracted from the bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub email: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            email: claims.email,
            role: claims.role,
        }
    }
}

/// Validates the bearer token and injects [`AuthUser`] into the request.
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&state, &headers)?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Like [`jwt_auth_middleware`], and additionally requires the admin role.
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&state, &headers)?;
    if auth_user.role != ADMIN_ROLE {
        tracing::warn!("Role '{}' refused on {}", auth_user.role, request.uri().path());
        return Err(ApiError::forbidden(format!(
            "User role '{}' is not authorized to access this route",
            auth_user.role
        )));
    }
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = extract_jwt_from_headers(headers).ok_or_else(|| {
        tracing::warn!("Request without bearer token");
        ApiError::unauthorized("No authentication token provided")
    })?;

    let claims = validate_jwt(token, &state.config.security).map_err(|e| {
        tracing::warn!("Token rejected: {}", e);
        ApiError::unauthorized("Invalid or expired token")
    })?;

    Ok(AuthUser::from(claims))
}

/// Extract the token from `Authorization: Bearer <token>`
fn extract_jwt_from_headers(headers: &HeaderMap) -> Option<&str> {
    let auth_str = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_tokens_only() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_jwt_from_headers(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers), Some("abc.def.ghi"));
    }
}
