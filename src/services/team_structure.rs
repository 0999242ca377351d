use serde::Serialize;
use std::collections::HashMap;

use crate::database::models::{Layer, Member, Role, SocialLinks};

/// Page filter value meaning "every page".
pub const ALL_PAGES: &str = "all";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicLayer {
    pub id: i64,
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub order: i32,
    pub members: Vec<PublicMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicMember {
    pub id: i64,
    pub name: String,
    /// Member title, falling back to the role title.
    pub title: Option<String>,
    pub role_key: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub social_links: SocialLinks,
    pub order: i32,
}

/// Position of a member's role inside its layer; role-less members sort
/// after every role.
type RoleRank = (i32, i64);
const NO_ROLE_RANK: RoleRank = (i32::MAX, i64::MAX);

/// Build the page-ready team tree.
///
/// Only active layers shown on `page` (any page when `None` or `"all"`)
/// are kept. Inside a layer, members must be public and either role-less or
/// under an active role of that same layer. Members are flattened into one
/// list ordered by their own `order`; ties fall back to role order and then
/// id. Layers left without members are dropped.
pub fn build_public_structure(
    layers: &[Layer],
    roles: &[Role],
    members: &[Member],
    page: Option<&str>,
) -> Vec<PublicLayer> {
    let page = page.map(str::trim).filter(|p| !p.is_empty() && *p != ALL_PAGES);
    let roles_by_id: HashMap<i64, &Role> = roles.iter().map(|r| (r.id, r)).collect();

    let mut visible_layers: Vec<&Layer> = layers
        .iter()
        .filter(|layer| layer.is_active)
        .filter(|layer| page.map_or(true, |p| layer.is_visible_on(p)))
        .collect();
    visible_layers.sort_by_key(|layer| (layer.order, layer.id));

    visible_layers
        .into_iter()
        .filter_map(|layer| {
            let mut ranked: Vec<(i32, RoleRank, i64, PublicMember)> = members
                .iter()
                .filter(|m| m.layer_id == layer.id && m.is_public)
                .filter_map(|m| {
                    let role = match m.role_id {
                        None => None,
                        Some(role_id) => match roles_by_id.get(&role_id) {
                            Some(role) if role.is_active && role.layer_id == layer.id => Some(*role),
                            _ => return None,
                        },
                    };
                    let rank = role.map_or(NO_ROLE_RANK, |r| (r.order, r.id));
                    Some((m.order, rank, m.id, public_member(m, role)))
                })
                .collect();

            if ranked.is_empty() {
                return None;
            }
            ranked.sort_by(|a, b| (a.0, a.1, a.2).cmp(&(b.0, b.1, b.2)));

            Some(PublicLayer {
                id: layer.id,
                key: layer.key.clone(),
                title: layer.title.clone(),
                description: layer.description.clone(),
                image: layer.image.clone(),
                order: layer.order,
                members: ranked.into_iter().map(|(_, _, _, m)| m).collect(),
            })
        })
        .collect()
}

fn public_member(member: &Member, role: Option<&Role>) -> PublicMember {
    let title = member
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| role.map(|r| r.title.clone()));

    PublicMember {
        id: member.id,
        name: member.name.clone(),
        title,
        role_key: role.map(|r| r.key.clone()),
        bio: member.bio.clone(),
        image: member.image.clone(),
        social_links: member.social_links.clone(),
        order: member.order,
    }
}
