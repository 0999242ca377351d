//! `/api/team-structure` routes: layer, role and member administration plus
//! the public aggregate. Only the aggregate is open; the admin listings show
//! inactive layers and private members.

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::api::Payload;
use crate::content::UploadRule;
use crate::database::models::{Layer, Member, Role};
use crate::error::ApiError;
use crate::middleware::{admin_auth_middleware, ApiResponse, ApiResult};
use crate::services::team_service::{
    LayerSummary, MemberView, RoleSummary, LAYER_FIELDS, MEMBER_FIELDS, ROLE_FIELDS,
};
use crate::services::PublicLayer;
use crate::state::AppState;
use crate::uploads::UploadPolicy;

use super::files::{discard_replaced, parse_id, settle, stage};

const IMAGE: Option<UploadRule> = Some(UploadRule {
    part: "image",
    field: "image",
    policy: UploadPolicy::Image,
});

pub fn routes(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .route(
            "/api/team-structure/categories",
            get(list_layers).post(create_layer),
        )
        .route(
            "/api/team-structure/categories/:id",
            get(show_layer).put(update_layer).delete(delete_layer),
        )
        .route("/api/team-structure/roles", get(list_roles).post(create_role))
        .route(
            "/api/team-structure/roles/:id",
            get(show_role).put(update_role).delete(delete_role),
        )
        .route(
            "/api/team-structure/members",
            get(list_members).post(create_member),
        )
        .route(
            "/api/team-structure/members/:id",
            get(show_member).put(update_member).delete(delete_member),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new()
        .route("/api/team-structure/structure/public", get(public_structure))
        .merge(admin)
}

// Layers

async fn list_layers(State(state): State<AppState>) -> ApiResult<Vec<LayerSummary>> {
    Ok(ApiResponse::list(state.team().list_layers().await?))
}

async fn show_layer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Layer> {
    let id = parse_id(&id, "Layer")?;
    Ok(ApiResponse::success(state.team().get_layer(id).await?))
}

async fn create_layer(State(state): State<AppState>, payload: Payload) -> ApiResult<Layer> {
    let staged = stage(&state, payload, LAYER_FIELDS, IMAGE).await?;
    let result = state.team().create_layer(staged.data).await;
    let layer = settle(&state, staged.compensations, result).await?;
    Ok(ApiResponse::created("Layer created successfully", layer))
}

async fn update_layer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> ApiResult<Layer> {
    let id = parse_id(&id, "Layer")?;
    let staged = stage(&state, payload, LAYER_FIELDS, IMAGE).await?;
    let result = state.team().update_layer(id, staged.data).await;
    let updated = settle(&state, staged.compensations, result).await?;
    discard_replaced(&state, updated.replaced_image).await;
    Ok(ApiResponse::success(updated.value).with_message("Layer updated successfully"))
}

async fn delete_layer(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&id, "Layer")?;
    let deleted = state.team().delete_layer(id).await?;
    for image in deleted.orphaned_images {
        discard_replaced(&state, Some(image)).await;
    }
    Ok(ApiResponse::message(deleted.message))
}

// Roles

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleQuery {
    layer_id: Option<String>,
}

async fn list_roles(
    State(state): State<AppState>,
    Query(query): Query<RoleQuery>,
) -> ApiResult<Vec<RoleSummary>> {
    let layer_id = match query.layer_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| ApiError::field("layerId", "must be an integer"))?,
        ),
    };
    Ok(ApiResponse::list(state.team().list_roles(layer_id).await?))
}

async fn show_role(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Role> {
    let id = parse_id(&id, "Role")?;
    Ok(ApiResponse::success(state.team().get_role(id).await?))
}

async fn create_role(State(state): State<AppState>, payload: Payload) -> ApiResult<Role> {
    let staged = stage(&state, payload, ROLE_FIELDS, None).await?;
    let role = state.team().create_role(staged.data).await?;
    Ok(ApiResponse::created("Role created successfully", role))
}

async fn update_role(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> ApiResult<Role> {
    let id = parse_id(&id, "Role")?;
    let staged = stage(&state, payload, ROLE_FIELDS, None).await?;
    let role = state.team().update_role(id, staged.data).await?;
    Ok(ApiResponse::success(role).with_message("Role updated successfully"))
}

async fn delete_role(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&id, "Role")?;
    let (_, message) = state.team().delete_role(id).await?;
    Ok(ApiResponse::message(message))
}

// Members

async fn list_members(State(state): State<AppState>) -> ApiResult<Vec<MemberView>> {
    Ok(ApiResponse::list(state.team().list_members().await?))
}

async fn show_member(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Member> {
    let id = parse_id(&id, "Member")?;
    Ok(ApiResponse::success(state.team().get_member(id).await?))
}

async fn create_member(State(state): State<AppState>, payload: Payload) -> ApiResult<Member> {
    let staged = stage(&state, payload, MEMBER_FIELDS, IMAGE).await?;
    let result = state.team().create_member(staged.data).await;
    let member = settle(&state, staged.compensations, result).await?;
    Ok(ApiResponse::created("Member created successfully", member))
}

async fn update_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Payload,
) -> ApiResult<Member> {
    let id = parse_id(&id, "Member")?;
    let staged = stage(&state, payload, MEMBER_FIELDS, IMAGE).await?;
    let result = state.team().update_member(id, staged.data).await;
    let updated = settle(&state, staged.compensations, result).await?;
    discard_replaced(&state, updated.replaced_image).await;
    Ok(ApiResponse::success(updated.value).with_message("Member updated successfully"))
}

async fn delete_member(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    let id = parse_id(&id, "Member")?;
    let member = state.team().delete_member(id).await?;
    discard_replaced(&state, member.image).await;
    Ok(ApiResponse::message("Member deleted successfully"))
}

// Public

#[derive(Debug, Deserialize)]
struct PageQuery {
    page: Option<String>,
}

async fn public_structure(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Vec<PublicLayer>> {
    let layers = state.team().public_structure(query.page.as_deref()).await?;
    Ok(ApiResponse::success(layers))
}
