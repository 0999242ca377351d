use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Job-title bucket nested under a layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub layer_id: i64,
    pub key: String,
    pub title: String,
    pub abbreviation: Option<String>,
    pub seo_slug: String,
    pub is_active: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRole {
    pub layer_id: i64,
    pub key: String,
    pub title: String,
    pub abbreviation: Option<String>,
    pub seo_slug: String,
    pub is_active: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RolePatch {
    pub layer_id: Option<i64>,
    pub key: Option<String>,
    pub title: Option<String>,
    pub abbreviation: Option<Option<String>>,
    pub seo_slug: Option<String>,
    pub is_active: Option<bool>,
    pub order: Option<i32>,
}

impl RolePatch {
    pub fn apply(self, role: &mut Role) {
        if let Some(layer_id) = self.layer_id {
            role.layer_id = layer_id;
        }
        if let Some(key) = self.key {
            role.key = key;
        }
        if let Some(title) = self.title {
            role.title = title;
        }
        if let Some(abbreviation) = self.abbreviation {
            role.abbreviation = abbreviation;
        }
        if let Some(seo_slug) = self.seo_slug {
            role.seo_slug = seo_slug;
        }
        if let Some(is_active) = self.is_active {
            role.is_active = is_active;
        }
        if let Some(order) = self.order {
            role.order = order;
        }
    }
}
