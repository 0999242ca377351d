use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Platform name to profile URL.
pub type SocialLinks = BTreeMap<String, String>;

/// A person on the team page. Always attached to a layer; the role is an
/// optional grouping inside that layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub layer_id: i64,
    pub role_id: Option<i64>,
    pub name: String,
    /// Display title; overrides the role title when set.
    pub title: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub social_links: SocialLinks,
    pub is_public: bool,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub layer_id: i64,
    pub role_id: Option<i64>,
    pub name: String,
    pub title: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub social_links: SocialLinks,
    pub is_public: bool,
    pub order: i32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberPatch {
    pub layer_id: Option<i64>,
    pub role_id: Option<Option<i64>>,
    pub name: Option<String>,
    pub title: Option<Option<String>>,
    pub bio: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub social_links: Option<SocialLinks>,
    pub is_public: Option<bool>,
    pub order: Option<i32>,
}

impl MemberPatch {
    pub fn apply(self, member: &mut Member) {
        if let Some(layer_id) = self.layer_id {
            member.layer_id = layer_id;
        }
        if let Some(role_id) = self.role_id {
            member.role_id = role_id;
        }
        if let Some(name) = self.name {
            member.name = name;
        }
        if let Some(title) = self.title {
            member.title = title;
        }
        if let Some(bio) = self.bio {
            member.bio = bio;
        }
        if let Some(image) = self.image {
            member.image = image;
        }
        if let Some(social_links) = self.social_links {
            member.social_links = social_links;
        }
        if let Some(is_public) = self.is_public {
            member.is_public = is_public;
        }
        if let Some(order) = self.order {
            member.order = order;
        }
    }
}
