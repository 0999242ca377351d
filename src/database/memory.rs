use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::{ContentRecord, Layer, Member, NewLayer, NewMember, NewRole, Role};
use super::store::{ContentStore, LayerRemoval, RoleRemoval, SortKey, Store, TeamStore};

#[derive(Default)]
struct Tables {
    layers: BTreeMap<i64, Layer>,
    roles: BTreeMap<i64, Role>,
    members: BTreeMap<i64, Member>,
    content: HashMap<&'static str, BTreeMap<i64, ContentRecord>>,
    sequences: HashMap<&'static str, i64>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }
}

/// Process-local store with the same cascade and ordering rules as
/// [`PgStore`](super::PgStore). Used by tests and `serve --memory`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_order_then_id(a: (i32, i64), b: (i32, i64)) -> Ordering {
    a.0.cmp(&b.0).then(a.1.cmp(&b.1))
}

#[async_trait]
impl TeamStore for MemoryStore {
    async fn list_layers(&self) -> Result<Vec<Layer>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut layers: Vec<Layer> = tables.layers.values().cloned().collect();
        layers.sort_by(|a, b| by_order_then_id((a.order, a.id), (b.order, b.id)));
        Ok(layers)
    }

    async fn get_layer(&self, id: i64) -> Result<Option<Layer>, DatabaseError> {
        Ok(self.tables.read().await.layers.get(&id).cloned())
    }

    async fn find_layer_by_key(&self, key: &str) -> Result<Option<Layer>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.layers.values().find(|l| l.key == key).cloned())
    }

    async fn insert_layer(&self, layer: NewLayer) -> Result<Layer, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let stored = Layer {
            id: tables.next_id("leadership_layers"),
            key: layer.key,
            title: layer.title,
            description: layer.description,
            order: layer.order,
            visible_on: layer.visible_on,
            image: layer.image,
            is_active: layer.is_active,
            created_at: now,
            updated_at: now,
        };
        tables.layers.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save_layer(&self, layer: &Layer) -> Result<Layer, DatabaseError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .layers
            .get_mut(&layer.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("layer {}", layer.id)))?;
        *slot = Layer {
            updated_at: Utc::now(),
            ..layer.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_layer(&self, id: i64) -> Result<LayerRemoval, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.layers.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(format!("layer {}", id)));
        }

        let roles_before = tables.roles.len();
        tables.roles.retain(|_, r| r.layer_id != id);

        let mut removal = LayerRemoval {
            roles: (roles_before - tables.roles.len()) as u64,
            ..LayerRemoval::default()
        };
        tables.members.retain(|_, m| {
            if m.layer_id != id {
                return true;
            }
            removal.members += 1;
            removal.member_images.extend(m.image.clone());
            false
        });
        Ok(removal)
    }

    async fn list_roles(&self, layer_id: Option<i64>) -> Result<Vec<Role>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut roles: Vec<Role> = tables
            .roles
            .values()
            .filter(|r| layer_id.map_or(true, |id| r.layer_id == id))
            .cloned()
            .collect();
        roles.sort_by(|a, b| by_order_then_id((a.order, a.id), (b.order, b.id)));
        Ok(roles)
    }

    async fn get_role(&self, id: i64) -> Result<Option<Role>, DatabaseError> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn find_role_by_key(&self, key: &str) -> Result<Option<Role>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.key == key).cloned())
    }

    async fn find_role_by_slug(&self, seo_slug: &str) -> Result<Option<Role>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.values().find(|r| r.seo_slug == seo_slug).cloned())
    }

    async fn insert_role(&self, role: NewRole) -> Result<Role, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.layers.contains_key(&role.layer_id) {
            return Err(DatabaseError::NotFound(format!("layer {}", role.layer_id)));
        }
        let now = Utc::now();
        let stored = Role {
            id: tables.next_id("roles"),
            layer_id: role.layer_id,
            key: role.key,
            title: role.title,
            abbreviation: role.abbreviation,
            seo_slug: role.seo_slug,
            is_active: role.is_active,
            order: role.order,
            created_at: now,
            updated_at: now,
        };
        tables.roles.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save_role(&self, role: &Role) -> Result<Role, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.layers.contains_key(&role.layer_id) {
            return Err(DatabaseError::NotFound(format!("layer {}", role.layer_id)));
        }
        let now = Utc::now();
        let slot = tables
            .roles
            .get_mut(&role.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("role {}", role.id)))?;
        *slot = Role {
            updated_at: now,
            ..role.clone()
        };
        let saved = slot.clone();

        for member in tables.members.values_mut() {
            if member.role_id == Some(saved.id) && member.layer_id != saved.layer_id {
                member.layer_id = saved.layer_id;
                member.updated_at = now;
            }
        }
        Ok(saved)
    }

    async fn delete_role(&self, id: i64) -> Result<RoleRemoval, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.roles.remove(&id).is_none() {
            return Err(DatabaseError::NotFound(format!("role {}", id)));
        }

        let mut unassigned = 0;
        for member in tables.members.values_mut() {
            if member.role_id == Some(id) {
                member.role_id = None;
                unassigned += 1;
            }
        }
        Ok(RoleRemoval {
            unassigned_members: unassigned,
        })
    }

    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut members: Vec<Member> = tables.members.values().cloned().collect();
        members.sort_by(|a, b| {
            a.layer_id
                .cmp(&b.layer_id)
                .then(a.order.cmp(&b.order))
                .then_with(|| a.name.cmp(&b.name))
                .then(a.id.cmp(&b.id))
        });
        Ok(members)
    }

    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError> {
        Ok(self.tables.read().await.members.get(&id).cloned())
    }

    async fn insert_member(&self, member: NewMember) -> Result<Member, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.layers.contains_key(&member.layer_id) {
            return Err(DatabaseError::NotFound(format!("layer {}", member.layer_id)));
        }
        let now = Utc::now();
        let stored = Member {
            id: tables.next_id("team_members"),
            layer_id: member.layer_id,
            role_id: member.role_id,
            name: member.name,
            title: member.title,
            bio: member.bio,
            image: member.image,
            social_links: member.social_links,
            is_public: member.is_public,
            order: member.order,
            created_at: now,
            updated_at: now,
        };
        tables.members.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn save_member(&self, member: &Member) -> Result<Member, DatabaseError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .members
            .get_mut(&member.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("member {}", member.id)))?;
        *slot = Member {
            updated_at: Utc::now(),
            ..member.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError> {
        Ok(self.tables.write().await.members.remove(&id).is_some())
    }
}

/// JSONB ordering across types: null < string < number < bool < array < object.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn sort_records(records: &mut [ContentRecord], sort: SortKey) {
    match sort {
        SortKey::NewestFirst => records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.id.cmp(&a.id))
        }),
        SortKey::Asc(field) | SortKey::Desc(field) => {
            let descending = matches!(sort, SortKey::Desc(_));
            records.sort_by(|a, b| {
                // Missing fields go last in both directions.
                let ordering = match (a.get(field), b.get(field)) {
                    (Some(x), Some(y)) if descending => compare_values(y, x),
                    (Some(x), Some(y)) => compare_values(x, y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                let ids = if descending { b.id.cmp(&a.id) } else { a.id.cmp(&b.id) };
                ordering.then(ids)
            });
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn list_records(
        &self,
        table: &'static str,
        sort: SortKey,
    ) -> Result<Vec<ContentRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut records: Vec<ContentRecord> = tables
            .content
            .get(table)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        sort_records(&mut records, sort);
        Ok(records)
    }

    async fn get_record(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<ContentRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.content.get(table).and_then(|rows| rows.get(&id)).cloned())
    }

    async fn find_record_by_field(
        &self,
        table: &'static str,
        field: &'static str,
        value: &Value,
    ) -> Result<Option<ContentRecord>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .content
            .get(table)
            .and_then(|rows| rows.values().find(|r| r.get(field) == Some(value)))
            .cloned())
    }

    async fn insert_record(
        &self,
        table: &'static str,
        data: Map<String, Value>,
    ) -> Result<ContentRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let record = ContentRecord {
            id: tables.next_id(table),
            data,
            created_at: now,
            updated_at: now,
        };
        tables
            .content
            .entry(table)
            .or_default()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn save_record(
        &self,
        table: &'static str,
        record: &ContentRecord,
    ) -> Result<ContentRecord, DatabaseError> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .content
            .get_mut(table)
            .and_then(|rows| rows.get_mut(&record.id))
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", table, record.id)))?;
        *slot = ContentRecord {
            updated_at: Utc::now(),
            ..record.clone()
        };
        Ok(slot.clone())
    }

    async fn delete_record(&self, table: &'static str, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .content
            .get_mut(table)
            .map_or(false, |rows| rows.remove(&id).is_some()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(key: &str, order: i32) -> NewLayer {
        NewLayer {
            key: key.to_string(),
            title: key.to_uppercase(),
            description: None,
            order,
            visible_on: vec!["about".into(), "team".into()],
            image: None,
            is_active: true,
        }
    }

    fn role(layer_id: i64, key: &str) -> NewRole {
        NewRole {
            layer_id,
            key: key.to_string(),
            title: key.to_string(),
            abbreviation: None,
            seo_slug: key.to_string(),
            is_active: true,
            order: 0,
        }
    }

    fn member(layer_id: i64, role_id: Option<i64>, name: &str) -> NewMember {
        NewMember {
            layer_id,
            role_id,
            name: name.to_string(),
            title: Some("Engineer".into()),
            bio: None,
            image: None,
            social_links: Default::default(),
            is_public: true,
            order: 0,
        }
    }

    #[tokio::test]
    async fn layers_list_by_order_then_id() {
        let store = MemoryStore::new();
        store.insert_layer(layer("b", 2)).await.unwrap();
        store.insert_layer(layer("a", 1)).await.unwrap();
        store.insert_layer(layer("c", 1)).await.unwrap();

        let keys: Vec<String> = store
            .list_layers()
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.key)
            .collect();
        assert_eq!(keys, vec!["a", "c", "b"]);
    }

    #[tokio::test]
    async fn deleting_layer_removes_roles_and_members() {
        let store = MemoryStore::new();
        let kept = store.insert_layer(layer("kept", 0)).await.unwrap();
        let doomed = store.insert_layer(layer("doomed", 1)).await.unwrap();
        let r = store.insert_role(role(doomed.id, "lead")).await.unwrap();
        store.insert_member(member(doomed.id, Some(r.id), "Ann")).await.unwrap();
        store
            .insert_member(NewMember {
                image: Some("/uploads/bob.png".into()),
                ..member(doomed.id, None, "Bob")
            })
            .await
            .unwrap();
        store.insert_member(member(kept.id, None, "Cid")).await.unwrap();

        let removal = store.delete_layer(doomed.id).await.unwrap();
        assert_eq!(
            removal,
            LayerRemoval {
                roles: 1,
                members: 2,
                member_images: vec!["/uploads/bob.png".to_string()],
            }
        );
        assert_eq!(store.list_members().await.unwrap().len(), 1);
        assert!(store.list_roles(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_role_unassigns_members() {
        let store = MemoryStore::new();
        let l = store.insert_layer(layer("eng", 0)).await.unwrap();
        let r = store.insert_role(role(l.id, "dev")).await.unwrap();
        let m = store.insert_member(member(l.id, Some(r.id), "Ann")).await.unwrap();

        let removal = store.delete_role(r.id).await.unwrap();
        assert_eq!(removal.unassigned_members, 1);

        let m = store.get_member(m.id).await.unwrap().unwrap();
        assert_eq!(m.role_id, None);
        assert_eq!(m.layer_id, l.id);
    }

    #[tokio::test]
    async fn moving_a_role_moves_its_members() {
        let store = MemoryStore::new();
        let from = store.insert_layer(layer("from", 0)).await.unwrap();
        let to = store.insert_layer(layer("to", 1)).await.unwrap();
        let r = store.insert_role(role(from.id, "dev")).await.unwrap();
        let assigned = store.insert_member(member(from.id, Some(r.id), "Ann")).await.unwrap();
        let loose = store.insert_member(member(from.id, None, "Bob")).await.unwrap();

        store
            .save_role(&Role {
                layer_id: to.id,
                ..r
            })
            .await
            .unwrap();

        let assigned = store.get_member(assigned.id).await.unwrap().unwrap();
        assert_eq!(assigned.layer_id, to.id);
        let loose = store.get_member(loose.id).await.unwrap().unwrap();
        assert_eq!(loose.layer_id, from.id);
    }

    #[tokio::test]
    async fn missing_rows_are_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete_layer(9).await,
            Err(DatabaseError::NotFound(_))
        ));
        assert!(!store.delete_member(9).await.unwrap());
        assert!(!store.delete_record("blogs", 9).await.unwrap());
    }

    #[tokio::test]
    async fn content_sorts_by_field_with_missing_last() {
        let store = MemoryStore::new();
        for order in [json!(3), json!(1), Value::Null] {
            let mut data = Map::new();
            if !order.is_null() {
                data.insert("order".into(), order);
            }
            store.insert_record("faqs", data).await.unwrap();
        }

        let asc: Vec<i64> = store
            .list_records("faqs", SortKey::Asc("order"))
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(asc, vec![2, 1, 3]);

        let newest: Vec<i64> = store
            .list_records("faqs", SortKey::NewestFirst)
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(newest[0], 3);
    }

    #[tokio::test]
    async fn finds_records_by_json_field() {
        let store = MemoryStore::new();
        let mut data = Map::new();
        data.insert("slug".into(), json!("rust-101"));
        store.insert_record("courses", data).await.unwrap();

        let found = store
            .find_record_by_field("courses", "slug", &json!("rust-101"))
            .await
            .unwrap();
        assert!(found.is_some());
        let missing = store
            .find_record_by_field("courses", "slug", &json!("go-101"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
