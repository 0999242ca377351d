use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{types::Json, FromRow, PgPool};

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{
    ContentRecord, Layer, Member, NewLayer, NewMember, NewRole, Role, SocialLinks,
};
use super::store::{ContentStore, LayerRemoval, RoleRemoval, SortKey, Store, TeamStore};

const LAYER_COLUMNS: &str =
    r#"id, key, title, description, "order", visible_on, image, is_active, created_at, updated_at"#;
const ROLE_COLUMNS: &str = r#"id, layer_id, key, title, abbreviation, seo_slug, is_active, "order", created_at, updated_at"#;
const MEMBER_COLUMNS: &str = r#"id, layer_id, role_id, name, title, bio, image, social_links, is_public, "order", created_at, updated_at"#;
const CONTENT_COLUMNS: &str = "id, data, created_at, updated_at";

#[derive(FromRow)]
struct LayerRow {
    id: i64,
    key: String,
    title: String,
    description: Option<String>,
    order: i32,
    visible_on: Json<Vec<String>>,
    image: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<LayerRow> for Layer {
    fn from(row: LayerRow) -> Self {
        Layer {
            id: row.id,
            key: row.key,
            title: row.title,
            description: row.description,
            order: row.order,
            visible_on: row.visible_on.0,
            image: row.image,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct RoleRow {
    id: i64,
    layer_id: i64,
    key: String,
    title: String,
    abbreviation: Option<String>,
    seo_slug: String,
    is_active: bool,
    order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            layer_id: row.layer_id,
            key: row.key,
            title: row.title,
            abbreviation: row.abbreviation,
            seo_slug: row.seo_slug,
            is_active: row.is_active,
            order: row.order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MemberRow {
    id: i64,
    layer_id: i64,
    role_id: Option<i64>,
    name: String,
    title: Option<String>,
    bio: Option<String>,
    image: Option<String>,
    social_links: Json<SocialLinks>,
    is_public: bool,
    order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MemberRow> for Member {
    fn from(row: MemberRow) -> Self {
        Member {
            id: row.id,
            layer_id: row.layer_id,
            role_id: row.role_id,
            name: row.name,
            title: row.title,
            bio: row.bio,
            image: row.image,
            social_links: row.social_links.0,
            is_public: row.is_public,
            order: row.order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct ContentRow {
    id: i64,
    data: Json<Map<String, Value>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContentRow> for ContentRecord {
    fn from(row: ContentRow) -> Self {
        ContentRecord {
            id: row.id,
            data: row.data.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres-backed store. Cascades are declared on the foreign keys, so a
/// delete here is a single statement plus the counts reported back.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TeamStore for PgStore {
    async fn list_layers(&self) -> Result<Vec<Layer>, DatabaseError> {
        let sql = format!(
            r#"SELECT {} FROM leadership_layers ORDER BY "order" ASC, id ASC"#,
            LAYER_COLUMNS
        );
        let rows = sqlx::query_as::<_, LayerRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Layer::from).collect())
    }

    async fn get_layer(&self, id: i64) -> Result<Option<Layer>, DatabaseError> {
        let sql = format!("SELECT {} FROM leadership_layers WHERE id = $1", LAYER_COLUMNS);
        let row = sqlx::query_as::<_, LayerRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Layer::from))
    }

    async fn find_layer_by_key(&self, key: &str) -> Result<Option<Layer>, DatabaseError> {
        let sql = format!("SELECT {} FROM leadership_layers WHERE key = $1", LAYER_COLUMNS);
        let row = sqlx::query_as::<_, LayerRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Layer::from))
    }

    async fn insert_layer(&self, layer: NewLayer) -> Result<Layer, DatabaseError> {
        let sql = format!(
            r#"INSERT INTO leadership_layers (key, title, description, "order", visible_on, image, is_active)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            LAYER_COLUMNS
        );
        let row = sqlx::query_as::<_, LayerRow>(&sql)
            .bind(&layer.key)
            .bind(&layer.title)
            .bind(&layer.description)
            .bind(layer.order)
            .bind(Json(&layer.visible_on))
            .bind(&layer.image)
            .bind(layer.is_active)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn save_layer(&self, layer: &Layer) -> Result<Layer, DatabaseError> {
        let sql = format!(
            r#"UPDATE leadership_layers
               SET key = $1, title = $2, description = $3, "order" = $4,
                   visible_on = $5, image = $6, is_active = $7, updated_at = NOW()
               WHERE id = $8
               RETURNING {}"#,
            LAYER_COLUMNS
        );
        let row = sqlx::query_as::<_, LayerRow>(&sql)
            .bind(&layer.key)
            .bind(&layer.title)
            .bind(&layer.description)
            .bind(layer.order)
            .bind(Json(&layer.visible_on))
            .bind(&layer.image)
            .bind(layer.is_active)
            .bind(layer.id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Layer::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("layer {}", layer.id)))
    }

    async fn delete_layer(&self, id: i64) -> Result<LayerRemoval, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let (roles,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roles WHERE layer_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let images: Vec<(Option<String>,)> =
            sqlx::query_as("SELECT image FROM team_members WHERE layer_id = $1")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM leadership_layers WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("layer {}", id)));
        }

        tx.commit().await?;
        Ok(LayerRemoval {
            roles: roles as u64,
            members: images.len() as u64,
            member_images: images.into_iter().filter_map(|(image,)| image).collect(),
        })
    }

    async fn list_roles(&self, layer_id: Option<i64>) -> Result<Vec<Role>, DatabaseError> {
        let rows = match layer_id {
            Some(layer_id) => {
                let sql = format!(
                    r#"SELECT {} FROM roles WHERE layer_id = $1 ORDER BY "order" ASC, id ASC"#,
                    ROLE_COLUMNS
                );
                sqlx::query_as::<_, RoleRow>(&sql)
                    .bind(layer_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(r#"SELECT {} FROM roles ORDER BY "order" ASC, id ASC"#, ROLE_COLUMNS);
                sqlx::query_as::<_, RoleRow>(&sql).fetch_all(&self.pool).await?
            }
        };
        Ok(rows.into_iter().map(Role::from).collect())
    }

    async fn get_role(&self, id: i64) -> Result<Option<Role>, DatabaseError> {
        let sql = format!("SELECT {} FROM roles WHERE id = $1", ROLE_COLUMNS);
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Role::from))
    }

    async fn find_role_by_key(&self, key: &str) -> Result<Option<Role>, DatabaseError> {
        let sql = format!("SELECT {} FROM roles WHERE key = $1", ROLE_COLUMNS);
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Role::from))
    }

    async fn find_role_by_slug(&self, seo_slug: &str) -> Result<Option<Role>, DatabaseError> {
        let sql = format!("SELECT {} FROM roles WHERE seo_slug = $1", ROLE_COLUMNS);
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(seo_slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Role::from))
    }

    async fn insert_role(&self, role: NewRole) -> Result<Role, DatabaseError> {
        let sql = format!(
            r#"INSERT INTO roles (layer_id, key, title, abbreviation, seo_slug, is_active, "order")
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {}"#,
            ROLE_COLUMNS
        );
        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role.layer_id)
            .bind(&role.key)
            .bind(&role.title)
            .bind(&role.abbreviation)
            .bind(&role.seo_slug)
            .bind(role.is_active)
            .bind(role.order)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn save_role(&self, role: &Role) -> Result<Role, DatabaseError> {
        let sql = format!(
            r#"UPDATE roles
               SET layer_id = $1, key = $2, title = $3, abbreviation = $4, seo_slug = $5,
                   is_active = $6, "order" = $7, updated_at = NOW()
               WHERE id = $8
               RETURNING {}"#,
            ROLE_COLUMNS
        );
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RoleRow>(&sql)
            .bind(role.layer_id)
            .bind(&role.key)
            .bind(&role.title)
            .bind(&role.abbreviation)
            .bind(&role.seo_slug)
            .bind(role.is_active)
            .bind(role.order)
            .bind(role.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("role {}", role.id)))?;

        sqlx::query(
            "UPDATE team_members SET layer_id = $1, updated_at = NOW() \
             WHERE role_id = $2 AND layer_id <> $1",
        )
        .bind(role.layer_id)
        .bind(role.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Role::from(row))
    }

    async fn delete_role(&self, id: i64) -> Result<RoleRemoval, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let (members,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM team_members WHERE role_id = $1")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("role {}", id)));
        }

        tx.commit().await?;
        Ok(RoleRemoval {
            unassigned_members: members as u64,
        })
    }

    async fn list_members(&self) -> Result<Vec<Member>, DatabaseError> {
        let sql = format!(
            r#"SELECT {} FROM team_members ORDER BY layer_id ASC, "order" ASC, name ASC, id ASC"#,
            MEMBER_COLUMNS
        );
        let rows = sqlx::query_as::<_, MemberRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Member::from).collect())
    }

    async fn get_member(&self, id: i64) -> Result<Option<Member>, DatabaseError> {
        let sql = format!("SELECT {} FROM team_members WHERE id = $1", MEMBER_COLUMNS);
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Member::from))
    }

    async fn insert_member(&self, member: NewMember) -> Result<Member, DatabaseError> {
        let sql = format!(
            r#"INSERT INTO team_members (layer_id, role_id, name, title, bio, image, social_links, is_public, "order")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING {}"#,
            MEMBER_COLUMNS
        );
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(member.layer_id)
            .bind(member.role_id)
            .bind(&member.name)
            .bind(&member.title)
            .bind(&member.bio)
            .bind(&member.image)
            .bind(Json(&member.social_links))
            .bind(member.is_public)
            .bind(member.order)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn save_member(&self, member: &Member) -> Result<Member, DatabaseError> {
        let sql = format!(
            r#"UPDATE team_members
               SET layer_id = $1, role_id = $2, name = $3, title = $4, bio = $5, image = $6,
                   social_links = $7, is_public = $8, "order" = $9, updated_at = NOW()
               WHERE id = $10
               RETURNING {}"#,
            MEMBER_COLUMNS
        );
        let row = sqlx::query_as::<_, MemberRow>(&sql)
            .bind(member.layer_id)
            .bind(member.role_id)
            .bind(&member.name)
            .bind(&member.title)
            .bind(&member.bio)
            .bind(&member.image)
            .bind(Json(&member.social_links))
            .bind(member.is_public)
            .bind(member.order)
            .bind(member.id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Member::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("member {}", member.id)))
    }

    async fn delete_member(&self, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn order_clause(sort: SortKey) -> Result<String, DatabaseError> {
    let (field, direction) = match sort {
        SortKey::NewestFirst => return Ok("created_at DESC, id DESC".to_string()),
        SortKey::Asc(field) => (field, "ASC"),
        SortKey::Desc(field) => (field, "DESC"),
    };
    if !DatabaseManager::is_valid_identifier(field) {
        return Err(DatabaseError::InvalidIdentifier(field.to_string()));
    }
    Ok(format!("data->'{}' {} NULLS LAST, id {}", field, direction, direction))
}

#[async_trait]
impl ContentStore for PgStore {
    async fn list_records(
        &self,
        table: &'static str,
        sort: SortKey,
    ) -> Result<Vec<ContentRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            CONTENT_COLUMNS,
            DatabaseManager::quote_identifier(table)?,
            order_clause(sort)?
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ContentRecord::from).collect())
    }

    async fn get_record(
        &self,
        table: &'static str,
        id: i64,
    ) -> Result<Option<ContentRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            CONTENT_COLUMNS,
            DatabaseManager::quote_identifier(table)?
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ContentRecord::from))
    }

    async fn find_record_by_field(
        &self,
        table: &'static str,
        field: &'static str,
        value: &Value,
    ) -> Result<Option<ContentRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE data -> $1 = $2 ORDER BY id ASC LIMIT 1",
            CONTENT_COLUMNS,
            DatabaseManager::quote_identifier(table)?
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(field)
            .bind(Json(value))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ContentRecord::from))
    }

    async fn insert_record(
        &self,
        table: &'static str,
        data: Map<String, Value>,
    ) -> Result<ContentRecord, DatabaseError> {
        let sql = format!(
            "INSERT INTO {} (data) VALUES ($1) RETURNING {}",
            DatabaseManager::quote_identifier(table)?,
            CONTENT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(Json(&data))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn save_record(
        &self,
        table: &'static str,
        record: &ContentRecord,
    ) -> Result<ContentRecord, DatabaseError> {
        let sql = format!(
            "UPDATE {} SET data = $1, updated_at = NOW() WHERE id = $2 RETURNING {}",
            DatabaseManager::quote_identifier(table)?,
            CONTENT_COLUMNS
        );
        let row = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(Json(&record.data))
            .bind(record.id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(ContentRecord::from)
            .ok_or_else(|| DatabaseError::NotFound(format!("{} {}", table, record.id)))
    }

    async fn delete_record(&self, table: &'static str, id: i64) -> Result<bool, DatabaseError> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1",
            DatabaseManager::quote_identifier(table)?
        );
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
