// HTTP API Error Types
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::database::DatabaseError;
use crate::state::AppState;
use crate::uploads::UploadError;

/// Internal detail of a failed request. Travels in the response extensions,
/// never in the body, until [`attach_error_detail`] lets it through.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub message: String,
    pub detail: String,
}

/// Response mapper: re-renders 500 bodies with their detail when the
/// environment allows it. Production configs never do.
pub async fn attach_error_detail(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(ErrorDetail { message, detail }) = response.extensions_mut().remove::<ErrorDetail>()
    else {
        return response;
    };
    if !state.config.api.expose_error_details {
        return response;
    }

    let body = json!({
        "success": false,
        "message": message,
        "error": detail,
    });
    (response.status(), Json(body)).into_response()
}

pub type FieldErrors = BTreeMap<String, String>;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<FieldErrors>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 413 Payload Too Large
    PayloadTooLarge(String),

    // 500 Internal Server Error
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::PayloadTooLarge(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Uniform failure body: `{success: false, message, error?}`
    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "success": false,
            "message": self.message(),
        });

        match self {
            ApiError::ValidationError {
                field_errors: Some(field_errors),
                ..
            } => {
                body["error"] = json!(field_errors);
            }
            _ => {}
        }

        body
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<FieldErrors>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    /// Single-field validation failure.
    pub fn field(field: impl Into<String>, problem: impl Into<String>) -> Self {
        let mut field_errors = FieldErrors::new();
        field_errors.insert(field.into(), problem.into());
        ApiError::validation_error("Invalid field value", Some(field_errors))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: None,
        }
    }

    pub fn internal_with_detail(message: impl Into<String>, detail: impl Into<String>) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Connection(msg) => {
                tracing::error!("Database connection error: {}", msg);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_with_detail("Database error occurred", sqlx_err.to_string())
            }
            other => {
                tracing::error!("Storage error: {}", other);
                ApiError::internal_with_detail(
                    "An error occurred while processing your request",
                    other.to_string(),
                )
            }
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            UploadError::UnsupportedType { .. } => ApiError::bad_request(err.to_string()),
            UploadError::Io(io_err) => {
                tracing::error!("Upload write failed: {}", io_err);
                ApiError::internal_with_detail("Failed to store uploaded file", io_err.to_string())
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status_code(), Json(self.to_json())).into_response();
        if let ApiError::InternalServerError {
            message,
            detail: Some(detail),
        } = self
        {
            response
                .extensions_mut()
                .insert(ErrorDetail { message, detail });
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::sync::Arc;

    use crate::config::{AdminCredentials, AppConfig, Environment};
    use crate::database::MemoryStore;
    use crate::notify::LogNotifier;

    #[test]
    fn validation_errors_carry_field_map() {
        let err = ApiError::field("email", "Please provide a valid email");
        let body = err.to_json();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["error"]["email"], json!("Please provide a valid email"));
    }

    #[test]
    fn not_found_has_no_error_detail() {
        let body = ApiError::not_found("Blog not found").to_json();
        assert_eq!(body["message"], json!("Blog not found"));
        assert!(body.get("error").is_none());
    }

    fn state_for(environment: Environment) -> AppState {
        let config = AppConfig::preset(
            environment,
            "secret".to_string(),
            AdminCredentials {
                email: "admin@example.com".to_string(),
                password: "pw".to_string(),
            },
        );
        AppState::new(config, Arc::new(MemoryStore::new()), Arc::new(LogNotifier))
    }

    async fn rendered(state: AppState) -> Value {
        let err = ApiError::internal_with_detail("Database error occurred", "relation missing");
        let response = attach_error_detail(State(state), err.into_response()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_detail_follows_each_states_environment() {
        let development = rendered(state_for(Environment::Development)).await;
        let production = rendered(state_for(Environment::Production)).await;

        assert_eq!(development["message"], json!("Database error occurred"));
        assert_eq!(development["error"], json!("relation missing"));
        assert_eq!(production["message"], json!("Database error occurred"));
        assert!(production.get("error").is_none());
    }
}
