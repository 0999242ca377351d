//! `/api/<entity>` routes for every entry of the content registry.

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;

use crate::api::Payload;
use crate::content::{Access, EntityDef, ENTITIES};
use crate::database::models::ContentRecord;
use crate::middleware::{admin_auth_middleware, ApiResponse, ApiResult};
use crate::notify::{self, Notification};
use crate::state::AppState;

use super::files::{discard_replaced, parse_id, settle, stage};

pub fn routes(state: &AppState) -> Router<AppState> {
    ENTITIES.iter().fold(Router::new(), |router, def| {
        router.merge(entity_routes(state, def))
    })
}

fn guarded(route: MethodRouter<AppState>, access: Access, state: &AppState) -> MethodRouter<AppState> {
    match access {
        Access::Public => route,
        Access::Admin => route.route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        )),
    }
}

fn entity_routes(state: &AppState, def: &'static EntityDef) -> Router<AppState> {
    let collection = guarded(
        get(move |State(state): State<AppState>, Query(query): Query<HashMap<String, String>>| {
            list(state, def, query)
        }),
        def.read,
        state,
    )
    .merge(guarded(
        post(move |State(state): State<AppState>, payload: Payload| create(state, def, payload)),
        def.create,
        state,
    ));

    let item = guarded(
        get(move |State(state): State<AppState>, Path(key): Path<String>| show(state, def, key)),
        def.read,
        state,
    )
    .merge(guarded(
        put(move |State(state): State<AppState>, Path(key): Path<String>, payload: Payload| {
            update(state, def, key, payload)
        }),
        Access::Admin,
        state,
    ))
    .merge(guarded(
        delete(move |State(state): State<AppState>, Path(key): Path<String>| {
            remove(state, def, key)
        }),
        Access::Admin,
        state,
    ));

    Router::new()
        .route(&format!("/api/{}", def.path), collection)
        .route(&format!("/api/{}/:key", def.path), item)
}

async fn list(
    state: AppState,
    def: &'static EntityDef,
    query: HashMap<String, String>,
) -> ApiResult<Vec<Value>> {
    let records = state.content().list(def, &query).await?;
    Ok(ApiResponse::list(
        records.iter().map(ContentRecord::to_json).collect(),
    ))
}

async fn show(state: AppState, def: &'static EntityDef, key: String) -> ApiResult<Value> {
    let record = state.content().get(def, &key).await?;
    Ok(ApiResponse::success(record.to_json()))
}

async fn create(state: AppState, def: &'static EntityDef, payload: Payload) -> ApiResult<Value> {
    let staged = stage(&state, payload, def.fields, def.upload).await?;
    let result = state.content().create(def, staged.data).await;
    let record = settle(&state, staged.compensations, result).await?;

    if let Some(rule) = def.notify {
        notify::dispatch(
            state.notifier.clone(),
            Notification {
                event: rule.event,
                subject: (rule.subject)(&record),
                record: record.to_json(),
            },
        );
    }

    Ok(ApiResponse::created(
        format!("{} created successfully", def.label),
        record.to_json(),
    ))
}

async fn update(
    state: AppState,
    def: &'static EntityDef,
    key: String,
    payload: Payload,
) -> ApiResult<Value> {
    let id = parse_id(&key, def.label)?;
    let staged = stage(&state, payload, def.fields, def.upload).await?;
    let result = state.content().update(def, id, staged.data).await;
    let updated = settle(&state, staged.compensations, result).await?;
    discard_replaced(&state, updated.replaced_image).await;

    Ok(ApiResponse::success(updated.value.to_json())
        .with_message(format!("{} updated successfully", def.label)))
}

async fn remove(state: AppState, def: &'static EntityDef, key: String) -> ApiResult<()> {
    let id = parse_id(&key, def.label)?;
    let record = state.content().delete(def, id).await?;
    if let Some(rule) = def.upload {
        discard_replaced(&state, record.get_str(rule.field).map(str::to_string)).await;
    }
    Ok(ApiResponse::message(format!("{} deleted successfully", def.label)))
}
