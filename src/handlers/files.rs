use serde_json::{Map, Value};

use crate::api::fields::{self, FieldSpec};
use crate::api::Payload;
use crate::content::UploadRule;
use crate::error::ApiError;
use crate::state::AppState;
use crate::uploads::Compensations;

/// A normalized write body plus the uploads written for it.
pub struct Staged {
    pub data: Map<String, Value>,
    pub compensations: Compensations,
}

/// Normalize the body against `specs` and store the attached file, if any,
/// putting its URL into the rule's field.
pub async fn stage(
    state: &AppState,
    mut payload: Payload,
    specs: &[FieldSpec],
    upload: Option<UploadRule>,
) -> Result<Staged, ApiError> {
    let file = payload.take_file(upload.map(|rule| rule.part))?;
    let mut data = fields::normalize(specs, payload.fields, payload.from_form)?;

    // Local upload URLs are only ever written here, from a stored file, so a
    // row can only point at (and later delete) a file it uploaded itself.
    if let Some(rule) = upload {
        let claimed = data
            .get(rule.field)
            .and_then(Value::as_str)
            .and_then(|url| state.uploads.path_for_url(url.trim()));
        if claimed.is_some() {
            return Err(ApiError::field(
                rule.field,
                "uploaded files can only be set by attaching a file",
            ));
        }
    }

    let mut compensations = Compensations::new();

    if let (Some(file), Some(rule)) = (file, upload) {
        let stored = state.uploads.save(&file, rule.policy).await?;
        compensations.register(stored.path);
        data.insert(rule.field.to_string(), Value::String(stored.url));
    }

    Ok(Staged {
        data,
        compensations,
    })
}

/// Keep the staged uploads when the write succeeded, delete them otherwise.
pub async fn settle<T>(
    state: &AppState,
    compensations: Compensations,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            compensations.commit();
            Ok(value)
        }
        Err(e) => {
            if !compensations.is_empty() {
                compensations.rollback(&state.uploads).await;
            }
            Err(e)
        }
    }
}

/// Delete a file that an update replaced, when it is one of ours.
pub async fn discard_replaced(state: &AppState, url: Option<String>) {
    let Some(path) = url.as_deref().and_then(|url| state.uploads.path_for_url(url)) else {
        return;
    };
    state.uploads.remove(&path).await;
}

/// Ids arrive as path text; anything non-numeric cannot match a row.
pub fn parse_id(raw: &str, label: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::not_found(format!("{} not found", label)))
}
