use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{header::CONTENT_TYPE, StatusCode},
};
use serde_json::{Map, Value};

use crate::error::ApiError;
use crate::uploads::UploadedFile;

/// Request body for create/update endpoints: either a JSON object or a
/// multipart form whose text parts become fields and whose single file part
/// is kept aside for the upload store.
#[derive(Debug, Default)]
pub struct Payload {
    pub fields: Map<String, Value>,
    pub file: Option<UploadedFile>,
    /// Values came from form parts, so they are all strings.
    pub from_form: bool,
}

impl Payload {
    /// Take the file if it was sent under `field`; a file under any other
    /// name is an error.
    pub fn take_file(&mut self, field: Option<&str>) -> Result<Option<UploadedFile>, ApiError> {
        match (self.file.take(), field) {
            (None, _) => Ok(None),
            (Some(file), Some(expected)) if file.field == expected => Ok(Some(file)),
            (Some(file), _) => Err(ApiError::field(file.field, "does not accept file uploads")),
        }
    }
}

fn too_large(status: StatusCode, message: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::bad_request(message)
    }
}

#[async_trait]
impl<S> FromRequest<S> for Payload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| ApiError::bad_request(e.body_text()))?;
            return read_multipart(multipart).await;
        }

        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| too_large(e.status(), e.body_text()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload::default());
        }

        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(fields)) => Ok(Payload {
                fields,
                file: None,
                from_form: false,
            }),
            Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
            Err(e) => Err(ApiError::bad_request(format!("Invalid JSON body: {}", e))),
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<Payload, ApiError> {
    let mut payload = Payload {
        from_form: true,
        ..Payload::default()
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| too_large(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }

        if let Some(file_name) = field.file_name().map(str::to_string) {
            let content_type = field.content_type().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| too_large(e.status(), e.body_text()))?;

            // An untouched file input arrives as an empty, nameless part.
            if file_name.is_empty() && bytes.is_empty() {
                continue;
            }
            if payload.file.is_some() {
                return Err(ApiError::bad_request("Only one file may be uploaded per request"));
            }
            payload.file = Some(UploadedFile {
                field: name,
                file_name: Some(file_name),
                content_type,
                bytes,
            });
        } else {
            let text = field
                .text()
                .await
                .map_err(|e| too_large(e.status(), e.body_text()))?;
            payload.fields.insert(name, Value::String(text));
        }
    }

    Ok(payload)
}
