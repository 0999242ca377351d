use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pages a layer shows on when the admin does not say otherwise.
pub const DEFAULT_VISIBLE_ON: &[&str] = &["about", "team"];

pub fn default_visible_on() -> Vec<String> {
    DEFAULT_VISIBLE_ON.iter().map(|s| s.to_string()).collect()
}

/// A named tier of the org chart ("Founders", "Engineering").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layer {
    pub id: i64,
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub visible_on: Vec<String>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Layer {
    pub fn is_visible_on(&self, page: &str) -> bool {
        self.visible_on.iter().any(|p| p == page)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLayer {
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub order: i32,
    pub visible_on: Vec<String>,
    pub image: Option<String>,
    pub is_active: bool,
}

/// Partial update; `None` leaves the stored value alone. The doubly optional
/// fields distinguish "clear" (`Some(None)`) from "absent".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerPatch {
    pub key: Option<String>,
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub order: Option<i32>,
    pub visible_on: Option<Vec<String>>,
    pub image: Option<Option<String>>,
    pub is_active: Option<bool>,
}

impl LayerPatch {
    pub fn apply(self, layer: &mut Layer) {
        if let Some(key) = self.key {
            layer.key = key;
        }
        if let Some(title) = self.title {
            layer.title = title;
        }
        if let Some(description) = self.description {
            layer.description = description;
        }
        if let Some(order) = self.order {
            layer.order = order;
        }
        if let Some(visible_on) = self.visible_on {
            layer.visible_on = visible_on;
        }
        if let Some(image) = self.image {
            layer.image = image;
        }
        if let Some(is_active) = self.is_active {
            layer.is_active = is_active;
        }
    }
}
