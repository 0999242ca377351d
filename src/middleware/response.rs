use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Success envelope: `{success: true, message?, count?, data?}`
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: Option<T>,
    pub message: Option<String>,
    pub count: Option<usize>,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with `data`
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            message: None,
            count: None,
            status_code: None,
        }
    }

    /// 201 with `message` and `data`
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::success(data)
            .with_message(message)
            .with_status(StatusCode::CREATED)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = Some(status_code);
        self
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    /// 200 with `count` and `data`
    pub fn list(data: Vec<T>) -> Self {
        let count = data.len();
        Self {
            count: Some(count),
            ..Self::success(data)
        }
    }
}

impl ApiResponse<()> {
    /// 200 with only a `message`
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            data: None,
            message: Some(message.into()),
            count: None,
            status_code: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut envelope = Map::new();
        envelope.insert("success".to_string(), Value::Bool(true));
        if let Some(message) = self.message {
            envelope.insert("message".to_string(), Value::String(message));
        }
        if let Some(count) = self.count {
            envelope.insert("count".to_string(), Value::from(count));
        }

        if let Some(data) = self.data {
            match serde_json::to_value(&data) {
                Ok(value) => {
                    envelope.insert("data".to_string(), value);
                }
                Err(e) => {
                    tracing::error!("Failed to serialize response data: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({
                            "success": false,
                            "message": "Failed to serialize response data"
                        })),
                    )
                        .into_response();
                }
            }
        }

        (status, Json(Value::Object(envelope))).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_envelope_carries_count() {
        let response = ApiResponse::list(vec![1, 2, 3]).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_of(response).await;
        assert_eq!(body, json!({"success": true, "count": 3, "data": [1, 2, 3]}));
    }

    #[tokio::test]
    async fn created_and_message_envelopes() {
        let response = ApiResponse::created("Blog created", json!({"id": 1})).into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_of(response).await["message"], json!("Blog created"));

        let body = body_of(ApiResponse::message("Deleted").into_response()).await;
        assert_eq!(body, json!({"success": true, "message": "Deleted"}));
    }
}
