//! Declarative definitions of the generic content entities.
//!
//! Every entity is a document table plus a field list; the routing, the
//! CRUD service and the schema bootstrap are all driven from [`ENTITIES`].

mod registry;

pub use registry::ENTITIES;

use crate::api::FieldSpec;
use crate::database::models::ContentRecord;
use crate::database::SortKey;
use crate::uploads::UploadPolicy;

/// Who may call an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Admin,
}

/// A multipart file part stored into a URL field.
#[derive(Debug, Clone, Copy)]
pub struct UploadRule {
    /// Name of the multipart part carrying the file.
    pub part: &'static str,
    /// Field that receives the stored file's URL.
    pub field: &'static str,
    pub policy: UploadPolicy,
}

/// `target` is derived from `source` with the slug rule unless supplied.
#[derive(Debug, Clone, Copy)]
pub struct SlugRule {
    pub source: &'static str,
    pub target: &'static str,
}

/// An id field that must point at an existing row of another entity.
#[derive(Debug, Clone, Copy)]
pub struct ParentRef {
    pub field: &'static str,
    pub table: &'static str,
    pub label: &'static str,
    /// Copy `(parent_field, own_field)` from the parent on write.
    pub copy: Option<(&'static str, &'static str)>,
    /// Listings accept `?<field>=<id>`.
    pub filterable: bool,
}

/// Admin notification sent after a create.
#[derive(Clone, Copy)]
pub struct NotifyRule {
    pub event: &'static str,
    pub subject: fn(&ContentRecord) -> String,
}

#[derive(Clone, Copy)]
pub struct EntityDef {
    /// Route segment under `/api`.
    pub path: &'static str,
    pub table: &'static str,
    /// Singular display name used in messages.
    pub label: &'static str,
    pub fields: &'static [FieldSpec],
    pub upload: Option<UploadRule>,
    pub sort: SortKey,
    pub unique: &'static [&'static str],
    pub slug: Option<SlugRule>,
    pub parents: &'static [ParentRef],
    /// `GET /:key` also resolves this field when the key is not an id.
    pub lookup: Option<&'static str>,
    pub read: Access,
    pub create: Access,
    pub notify: Option<NotifyRule>,
}

impl EntityDef {
    pub fn find(path: &str) -> Option<&'static EntityDef> {
        ENTITIES.iter().find(|def| def.path == path)
    }
}

/// Tables the schema bootstrap must create.
pub fn tables() -> Vec<&'static str> {
    ENTITIES.iter().map(|def| def.table).collect()
}
