use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::fields::{self, DefaultValue, FieldKind, FieldSpec};
use crate::database::models::{
    layer::DEFAULT_VISIBLE_ON, Layer, LayerPatch, Member, MemberPatch, NewLayer, NewMember,
    NewRole, Role, RolePatch, SocialLinks,
};
use crate::database::Store;
use crate::error::ApiError;

use super::team_structure::{build_public_structure, PublicLayer};

pub const LAYER_FIELDS: &[FieldSpec] = &[
    FieldSpec::text("key"),
    FieldSpec::text("title").required(),
    FieldSpec::text("description"),
    FieldSpec::int("order").default(DefaultValue::Int(0)),
    FieldSpec::new("visibleOn", FieldKind::StringList).default(DefaultValue::Strings(DEFAULT_VISIBLE_ON)),
    FieldSpec::text("image"),
    FieldSpec::boolean("isActive", true),
];

pub const ROLE_FIELDS: &[FieldSpec] = &[
    FieldSpec::int("layerId").required(),
    FieldSpec::text("key"),
    FieldSpec::text("title").required(),
    FieldSpec::text("abbreviation"),
    FieldSpec::text("seoSlug"),
    FieldSpec::boolean("isActive", true),
    FieldSpec::int("order").default(DefaultValue::Int(0)),
];

pub const MEMBER_FIELDS: &[FieldSpec] = &[
    FieldSpec::int("layerId"),
    FieldSpec::int("roleId"),
    FieldSpec::text("name").required(),
    FieldSpec::text("title"),
    FieldSpec::text("bio"),
    FieldSpec::text("image"),
    FieldSpec::new("socialLinks", FieldKind::StringMap).default(DefaultValue::EmptyMap),
    FieldSpec::boolean("isPublic", true),
    FieldSpec::int("order").default(DefaultValue::Int(0)),
];

/// Admin view of a layer with its dependent counts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    #[serde(flatten)]
    pub layer: Layer,
    pub member_count: usize,
    pub role_count: usize,
}

#[derive(Debug, Serialize)]
pub struct LayerRef {
    pub id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSummary {
    #[serde(flatten)]
    pub role: Role,
    pub member_count: usize,
    pub layer: Option<LayerRef>,
}

#[derive(Debug, Serialize)]
pub struct RoleRef {
    pub id: i64,
    pub title: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct MemberView {
    #[serde(flatten)]
    pub member: Member,
    pub layer: Option<LayerRef>,
    pub role: Option<RoleRef>,
}

/// Result of an update that may have replaced an uploaded image.
pub struct Updated<T> {
    pub value: T,
    pub replaced_image: Option<String>,
}

/// A deleted layer and the images nothing refers to any more.
pub struct LayerDeleted {
    pub message: String,
    pub orphaned_images: Vec<String>,
}

// Accessors over a normalized field map.

fn text(data: &Map<String, Value>, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Present-but-blank means "clear".
fn text_patch(data: &Map<String, Value>, key: &str) -> Option<Option<String>> {
    data.contains_key(key).then(|| text(data, key))
}

fn int(data: &Map<String, Value>, key: &str) -> Option<i64> {
    data.get(key).and_then(Value::as_i64)
}

fn order(data: &Map<String, Value>) -> Option<i32> {
    int(data, "order").map(|n| n.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

fn boolean(data: &Map<String, Value>, key: &str) -> Option<bool> {
    data.get(key).and_then(Value::as_bool)
}

fn string_list(data: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    data.get(key).and_then(Value::as_array).map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}

fn social_links(data: &Map<String, Value>) -> Option<SocialLinks> {
    data.get("socialLinks").and_then(Value::as_object).map(|links| {
        links
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect()
    })
}

fn key_from(data: &Map<String, Value>, field: &str, title: &str) -> Result<String, ApiError> {
    let key = fields::slugify(&text(data, field).unwrap_or_else(|| title.to_string()));
    if key.is_empty() {
        return Err(ApiError::field(field, "could not be derived from the title"));
    }
    Ok(key)
}

fn updated_image(before: &Option<String>, after: &Option<String>) -> Option<String> {
    match (before, after) {
        (Some(old), new) if new.as_ref() != Some(old) => Some(old.clone()),
        _ => None,
    }
}

/// Layer, role and member management on top of a [`Store`].
pub struct TeamService {
    store: Arc<dyn Store>,
}

impl TeamService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    // Layers

    pub async fn list_layers(&self) -> Result<Vec<LayerSummary>, ApiError> {
        let layers = self.store.list_layers().await?;
        let roles = self.store.list_roles(None).await?;
        let members = self.store.list_members().await?;

        let mut role_counts: HashMap<i64, usize> = HashMap::new();
        for role in &roles {
            *role_counts.entry(role.layer_id).or_default() += 1;
        }
        let mut member_counts: HashMap<i64, usize> = HashMap::new();
        for member in &members {
            *member_counts.entry(member.layer_id).or_default() += 1;
        }

        Ok(layers
            .into_iter()
            .map(|layer| LayerSummary {
                member_count: member_counts.get(&layer.id).copied().unwrap_or(0),
                role_count: role_counts.get(&layer.id).copied().unwrap_or(0),
                layer,
            })
            .collect())
    }

    pub async fn get_layer(&self, id: i64) -> Result<Layer, ApiError> {
        self.store
            .get_layer(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Layer not found"))
    }

    async fn ensure_layer_key_free(&self, key: &str) -> Result<(), ApiError> {
        if self.store.find_layer_by_key(key).await?.is_some() {
            return Err(ApiError::bad_request(format!(
                "Layer with key '{}' already exists",
                key
            )));
        }
        Ok(())
    }

    pub async fn create_layer(&self, mut data: Map<String, Value>) -> Result<Layer, ApiError> {
        fields::complete_for_create(LAYER_FIELDS, &mut data)?;

        let title = text(&data, "title").unwrap_or_default();
        let key = key_from(&data, "key", &title)?;
        self.ensure_layer_key_free(&key).await?;

        let layer = self
            .store
            .insert_layer(NewLayer {
                key,
                title,
                description: text(&data, "description"),
                order: order(&data).unwrap_or(0),
                visible_on: string_list(&data, "visibleOn")
                    .unwrap_or_else(crate::database::models::layer::default_visible_on),
                image: text(&data, "image"),
                is_active: boolean(&data, "isActive").unwrap_or(true),
            })
            .await?;

        tracing::info!("Created layer {} ({})", layer.id, layer.key);
        Ok(layer)
    }

    pub async fn update_layer(
        &self,
        id: i64,
        data: Map<String, Value>,
    ) -> Result<Updated<Layer>, ApiError> {
        let mut layer = self.get_layer(id).await?;
        fields::check_required_present(LAYER_FIELDS, &data)?;

        let key = match text(&data, "key") {
            Some(raw) => {
                let key = fields::slugify(&raw);
                if key.is_empty() {
                    return Err(ApiError::field("key", "must contain letters or digits"));
                }
                if key != layer.key {
                    self.ensure_layer_key_free(&key).await?;
                }
                Some(key)
            }
            None => None,
        };

        let before_image = layer.image.clone();
        LayerPatch {
            key,
            title: text(&data, "title"),
            description: text_patch(&data, "description"),
            order: order(&data),
            visible_on: string_list(&data, "visibleOn"),
            image: text_patch(&data, "image"),
            is_active: boolean(&data, "isActive"),
        }
        .apply(&mut layer);

        let saved = self.store.save_layer(&layer).await?;
        tracing::info!("Updated layer {}", saved.id);
        Ok(Updated {
            replaced_image: updated_image(&before_image, &saved.image),
            value: saved,
        })
    }

    pub async fn delete_layer(&self, id: i64) -> Result<LayerDeleted, ApiError> {
        let layer = self.get_layer(id).await?;
        let removal = self.store.delete_layer(id).await?;
        tracing::info!(
            "Deleted layer {} with {} role(s) and {} member(s)",
            id,
            removal.roles,
            removal.members
        );

        let mut orphaned_images = removal.member_images;
        orphaned_images.extend(layer.image);
        Ok(LayerDeleted {
            message: format!(
                "Layer deleted ({} role(s) and {} member(s) also removed)",
                removal.roles, removal.members
            ),
            orphaned_images,
        })
    }

    // Roles

    pub async fn list_roles(&self, layer_id: Option<i64>) -> Result<Vec<RoleSummary>, ApiError> {
        let roles = self.store.list_roles(layer_id).await?;
        let layers: HashMap<i64, Layer> = self
            .store
            .list_layers()
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        let mut member_counts: HashMap<i64, usize> = HashMap::new();
        for member in self.store.list_members().await? {
            if let Some(role_id) = member.role_id {
                *member_counts.entry(role_id).or_default() += 1;
            }
        }

        Ok(roles
            .into_iter()
            .map(|role| RoleSummary {
                member_count: member_counts.get(&role.id).copied().unwrap_or(0),
                layer: layers.get(&role.layer_id).map(|l| LayerRef {
                    id: l.id,
                    title: l.title.clone(),
                    key: None,
                }),
                role,
            })
            .collect())
    }

    pub async fn get_role(&self, id: i64) -> Result<Role, ApiError> {
        self.store
            .get_role(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Role not found"))
    }

    async fn parent_layer(&self, layer_id: i64) -> Result<Layer, ApiError> {
        self.store
            .get_layer(layer_id)
            .await?
            .ok_or_else(|| ApiError::bad_request(format!("Layer {} not found", layer_id)))
    }

    async fn ensure_role_key_free(&self, key: &str) -> Result<(), ApiError> {
        if self.store.find_role_by_key(key).await?.is_some() {
            return Err(ApiError::bad_request(format!(
                "Role with key '{}' already exists",
                key
            )));
        }
        Ok(())
    }

    async fn ensure_role_slug_free(&self, seo_slug: &str) -> Result<(), ApiError> {
        if self.store.find_role_by_slug(seo_slug).await?.is_some() {
            return Err(ApiError::bad_request(format!(
                "Role with SEO slug '{}' already exists",
                seo_slug
            )));
        }
        Ok(())
    }

    pub async fn create_role(&self, mut data: Map<String, Value>) -> Result<Role, ApiError> {
        fields::complete_for_create(ROLE_FIELDS, &mut data)?;

        let layer_id = int(&data, "layerId").unwrap_or_default();
        self.parent_layer(layer_id).await?;

        let title = text(&data, "title").unwrap_or_default();
        let key = key_from(&data, "key", &title)?;
        self.ensure_role_key_free(&key).await?;

        let seo_slug = match text(&data, "seoSlug") {
            Some(raw) => fields::slugify(&raw),
            None => key.clone(),
        };
        if seo_slug.is_empty() {
            return Err(ApiError::field("seoSlug", "must contain letters or digits"));
        }
        self.ensure_role_slug_free(&seo_slug).await?;

        let role = self
            .store
            .insert_role(NewRole {
                layer_id,
                key,
                title,
                abbreviation: text(&data, "abbreviation"),
                seo_slug,
                is_active: boolean(&data, "isActive").unwrap_or(true),
                order: order(&data).unwrap_or(0),
            })
            .await?;

        tracing::info!("Created role {} ({}) in layer {}", role.id, role.key, layer_id);
        Ok(role)
    }

    pub async fn update_role(&self, id: i64, data: Map<String, Value>) -> Result<Role, ApiError> {
        let mut role = self.get_role(id).await?;
        fields::check_required_present(ROLE_FIELDS, &data)?;

        let layer_id = int(&data, "layerId").filter(|layer_id| *layer_id != role.layer_id);
        if let Some(layer_id) = layer_id {
            self.parent_layer(layer_id).await?;
        }

        let key = match text(&data, "key") {
            Some(raw) => {
                let key = fields::slugify(&raw);
                if key.is_empty() {
                    return Err(ApiError::field("key", "must contain letters or digits"));
                }
                if key != role.key {
                    self.ensure_role_key_free(&key).await?;
                }
                Some(key)
            }
            None => None,
        };
        let seo_slug = match text(&data, "seoSlug") {
            Some(raw) => {
                let seo_slug = fields::slugify(&raw);
                if seo_slug.is_empty() {
                    return Err(ApiError::field("seoSlug", "must contain letters or digits"));
                }
                if seo_slug != role.seo_slug {
                    self.ensure_role_slug_free(&seo_slug).await?;
                }
                Some(seo_slug)
            }
            None => None,
        };

        RolePatch {
            layer_id,
            key,
            title: text(&data, "title"),
            abbreviation: text_patch(&data, "abbreviation"),
            seo_slug,
            is_active: boolean(&data, "isActive"),
            order: order(&data),
        }
        .apply(&mut role);

        let saved = self.store.save_role(&role).await?;
        if let Some(layer_id) = layer_id {
            tracing::info!("Role {} moved to layer {} with its members", saved.id, layer_id);
        }
        tracing::info!("Updated role {}", saved.id);
        Ok(saved)
    }

    pub async fn delete_role(&self, id: i64) -> Result<(Role, String), ApiError> {
        let role = self.get_role(id).await?;
        let removal = self.store.delete_role(id).await?;
        tracing::info!(
            "Deleted role {}; {} member(s) unassigned",
            id,
            removal.unassigned_members
        );
        Ok((
            role,
            format!(
                "Role deleted ({} member(s) now unassigned)",
                removal.unassigned_members
            ),
        ))
    }

    // Members

    pub async fn list_members(&self) -> Result<Vec<MemberView>, ApiError> {
        let members = self.store.list_members().await?;
        let layers: HashMap<i64, Layer> = self
            .store
            .list_layers()
            .await?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        let roles: HashMap<i64, Role> = self
            .store
            .list_roles(None)
            .await?
            .into_iter()
            .map(|r| (r.id, r))
            .collect();

        Ok(members
            .into_iter()
            .map(|member| MemberView {
                layer: layers.get(&member.layer_id).map(|l| LayerRef {
                    id: l.id,
                    title: l.title.clone(),
                    key: Some(l.key.clone()),
                }),
                role: member.role_id.and_then(|id| roles.get(&id)).map(|r| RoleRef {
                    id: r.id,
                    title: r.title.clone(),
                    key: r.key.clone(),
                }),
                member,
            })
            .collect())
    }

    pub async fn get_member(&self, id: i64) -> Result<Member, ApiError> {
        self.store
            .get_member(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Member not found"))
    }

    async fn parent_role(&self, role_id: i64) -> Result<Role, ApiError> {
        self.store
            .get_role(role_id)
            .await?
            .ok_or_else(|| ApiError::bad_request(format!("Role {} not found", role_id)))
    }

    /// Resolve the layer/role pair for a member. A role alone implies its
    /// layer; a role from another layer is refused.
    async fn placement(
        &self,
        layer_id: Option<i64>,
        role_id: Option<i64>,
    ) -> Result<(i64, Option<Role>), ApiError> {
        let role = match role_id {
            Some(role_id) => Some(self.parent_role(role_id).await?),
            None => None,
        };

        let layer_id = match (layer_id, &role) {
            (Some(layer_id), Some(role)) if role.layer_id != layer_id => {
                return Err(ApiError::bad_request(format!(
                    "Role {} does not belong to layer {}",
                    role.id, layer_id
                )));
            }
            (Some(layer_id), _) => layer_id,
            (None, Some(role)) => role.layer_id,
            (None, None) => return Err(ApiError::field("layerId", "is required")),
        };

        self.parent_layer(layer_id).await?;
        Ok((layer_id, role))
    }

    pub async fn create_member(&self, mut data: Map<String, Value>) -> Result<Member, ApiError> {
        fields::complete_for_create(MEMBER_FIELDS, &mut data)?;

        let (layer_id, role) = self
            .placement(int(&data, "layerId"), int(&data, "roleId"))
            .await?;

        let title = text(&data, "title");
        if role.is_none() && title.is_none() {
            return Err(ApiError::field("title", "is required when no role is given"));
        }

        let member = self
            .store
            .insert_member(NewMember {
                layer_id,
                role_id: role.map(|r| r.id),
                name: text(&data, "name").unwrap_or_default(),
                title,
                bio: text(&data, "bio"),
                image: text(&data, "image"),
                social_links: social_links(&data).unwrap_or_default(),
                is_public: boolean(&data, "isPublic").unwrap_or(true),
                order: order(&data).unwrap_or(0),
            })
            .await?;

        tracing::info!("Created member {} in layer {}", member.id, layer_id);
        Ok(member)
    }

    pub async fn update_member(
        &self,
        id: i64,
        data: Map<String, Value>,
    ) -> Result<Updated<Member>, ApiError> {
        let mut member = self.get_member(id).await?;
        fields::check_required_present(MEMBER_FIELDS, &data)?;

        let new_role = data.contains_key("roleId").then(|| int(&data, "roleId"));
        let new_layer = int(&data, "layerId");

        let placement = if new_layer.is_some() || new_role.is_some() {
            let role_id = match (new_role, new_layer, member.role_id) {
                (Some(role_id), _, _) => role_id,
                // Moving layers keeps the current role only if it lives there.
                (None, Some(target), Some(current)) => self
                    .store
                    .get_role(current)
                    .await?
                    .filter(|r| r.layer_id == target)
                    .map(|r| r.id),
                (None, _, current) => current,
            };
            let layer_id = match (new_layer, new_role) {
                (Some(layer_id), _) => Some(layer_id),
                (None, Some(Some(_))) => None,
                (None, _) => Some(member.layer_id),
            };
            let (layer_id, role) = self.placement(layer_id, role_id).await?;
            Some((layer_id, role.map(|r| r.id)))
        } else {
            None
        };

        let before_image = member.image.clone();
        MemberPatch {
            layer_id: placement.map(|(layer_id, _)| layer_id),
            role_id: placement.map(|(_, role_id)| role_id),
            name: text(&data, "name"),
            title: text_patch(&data, "title"),
            bio: text_patch(&data, "bio"),
            image: text_patch(&data, "image"),
            social_links: social_links(&data),
            is_public: boolean(&data, "isPublic"),
            order: order(&data),
        }
        .apply(&mut member);

        if member.role_id.is_none() && member.title.is_none() {
            return Err(ApiError::field("title", "is required when no role is given"));
        }

        let saved = self.store.save_member(&member).await?;
        tracing::info!("Updated member {}", saved.id);
        Ok(Updated {
            replaced_image: updated_image(&before_image, &saved.image),
            value: saved,
        })
    }

    pub async fn delete_member(&self, id: i64) -> Result<Member, ApiError> {
        let member = self.get_member(id).await?;
        if !self.store.delete_member(id).await? {
            return Err(ApiError::not_found("Member not found"));
        }
        tracing::info!("Deleted member {}", id);
        Ok(member)
    }

    // Public

    pub async fn public_structure(&self, page: Option<&str>) -> Result<Vec<PublicLayer>, ApiError> {
        let layers = self.store.list_layers().await?;
        let roles = self.store.list_roles(None).await?;
        let members = self.store.list_members().await?;
        Ok(build_public_structure(&layers, &roles, &members, page))
    }
}
