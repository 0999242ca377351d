use async_trait::async_trait;
use serde_json::{Map, Value};

use super::manager::DatabaseError;
use super::models::{
    ContentRecord, Layer, Member, NewLayer, NewMember, NewRole, Role,
};

/// Rows removed along with a layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerRemoval {
    pub roles: u64,
    pub members: u64,
    /// Image URLs held by the removed members.
    pub member_images: Vec<String>,
}

/// Members whose role reference was cleared when the role went away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleRemoval {
    pub unassigned_members: u64,
}

/// Fixed ordering for content listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Creation time descending.
    NewestFirst,
    Asc(&'static str),
    Desc(&'static str),
}

/// Team hierarchy persistence. Listings come back in admin order:
/// layers and roles by `order` then id, members by layer, `order`, name.
#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn list_layers(&self) -> Result<Vec<Layer>, DatabaseError>;
    async fn get_layer(&self, id: i64) -> Result<Option<Layer>, DatabaseError>;
    async fn find_layer_by_key(&self, key: &str) -> Result<Option<Layer>, DatabaseError>;
    async fn insert_layer(&self, layer: NewLayer) -> Result<Layer, DatabaseError>;
    async fn save_layer(&self, layer: &Layer) -> Result<Layer, DatabaseError>;
    /// Hard delete; roles and members of the layer go with it.
    async fn delete_layer(&self, id: i64) -> Result<LayerRemoval, DatabaseError>;

    async fn list_roles(&self, layer_id: Option<i64>) -> Result<Vec<Role>, DatabaseError>;
    async fn get_role(&self, id: i64) -> Result<Option<Role>, DatabaseError>;
    async fn find_role_by_key(&self, key: &str) -> Result<Option<Role>, DatabaseError>;
    async fn find_role_by_slug(&self, seo_slug: &str) -> Result<Option<Role>, DatabaseError>;
    async fn insert_role(&self, role: NewRole) -> Result<Role, DatabaseError>;
    /// Members assigned to the role move with it when its layer changes.
    async fn save_role(&self, role: &Role) -> Result<Role, DatabaseError>;
    /// Members of the role stay, with their role reference cleared.
    async fn delete_role(&self, id: i64) -> Result<RoleRemoval, DatabaseError>;

    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError>;
    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError>;
    async fn insert_member(&self, member: NewMember) -> Result<Member, DatabaseError>;
    async fn save_member(&self, member: &Member) -> Result<Member, DatabaseError>;
    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError>;
}

/// Document-style persistence for the generic content entities, one table
/// per entity.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn list_records(
        &self,
        table: &'static str,
        sort: SortKey,
    ) -> Result<Vec<ContentRecord>, DatabaseError>;
    async fn get_record(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<ContentRecord>, DatabaseError>;
    async fn find_record_by_field(
        &self,
        table: &'static str,
        field: &'static str,
        value: &Value,
    ) -> Result<Option<ContentRecord>, DatabaseError>;
    async fn insert_record(
        &self,
        table: &'static str,
        data: Map<String, Value>,
    ) -> Result<ContentRecord, DatabaseError>;
    async fn save_record(
        &self,
        table: &'static str,
        record: &ContentRecord,
    ) -> Result<ContentRecord, DatabaseError>;
    async fn delete_record(&self, table: &'static str, id: i64) -> Result<bool, DatabaseError>;
}

#[async_trait]
pub trait Store: TeamStore + ContentStore {
    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), DatabaseError>;
}
