use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::api::fields::{self, slugify};
use crate::content::EntityDef;
use crate::database::models::ContentRecord;
use crate::database::Store;
use crate::error::ApiError;

use super::team_service::Updated;

/// Create/read/update/delete for any entity in the content registry.
pub struct ContentService {
    store: Arc<dyn Store>,
}

impl ContentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// All rows in the entity's fixed order, optionally narrowed by
    /// filterable parent ids (`?courseId=3`).
    pub async fn list(
        &self,
        def: &EntityDef,
        query: &HashMap<String, String>,
    ) -> Result<Vec<ContentRecord>, ApiError> {
        let mut filters = Vec::new();
        for parent in def.parents.iter().filter(|p| p.filterable) {
            if let Some(raw) = query.get(parent.field) {
                let id: i64 = raw
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::field(parent.field, "must be an integer"))?;
                filters.push((parent.field, Value::from(id)));
            }
        }

        let records = self.store.list_records(def.table, def.sort).await?;
        Ok(records
            .into_iter()
            .filter(|record| {
                filters
                    .iter()
                    .all(|(field, value)| record.get(field) == Some(value))
            })
            .collect())
    }

    /// Fetch by numeric id, or by the entity's lookup field (course slug).
    pub async fn get(&self, def: &EntityDef, key: &str) -> Result<ContentRecord, ApiError> {
        let found = match key.parse::<i64>() {
            Ok(id) => self.store.get_record(def.table, id).await?,
            Err(_) => match def.lookup {
                Some(field) => {
                    self.store
                        .find_record_by_field(def.table, field, &Value::from(key))
                        .await?
                }
                None => None,
            },
        };
        found.ok_or_else(|| ApiError::not_found(format!("{} not found", def.label)))
    }

    async fn get_by_id(&self, def: &EntityDef, id: i64) -> Result<ContentRecord, ApiError> {
        self.store
            .get_record(def.table, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("{} not found", def.label)))
    }

    /// Refuse a value another row already holds for a unique field.
    async fn ensure_unique(
        &self,
        def: &EntityDef,
        data: &Map<String, Value>,
        current: Option<&ContentRecord>,
    ) -> Result<(), ApiError> {
        for &field in def.unique {
            let Some(value) = data.get(field).filter(|v| !v.is_null()) else {
                continue;
            };
            if current.map_or(false, |c| c.get(field) == Some(value)) {
                continue;
            }
            if self
                .store
                .find_record_by_field(def.table, field, value)
                .await?
                .is_some()
            {
                let shown = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                return Err(ApiError::bad_request(format!(
                    "{} with {} '{}' already exists",
                    def.label, field, shown
                )));
            }
        }
        Ok(())
    }

    /// Parent references must exist; copied parent fields are refreshed.
    async fn resolve_parents(
        &self,
        def: &EntityDef,
        data: &mut Map<String, Value>,
    ) -> Result<(), ApiError> {
        for parent in def.parents {
            let Some(id) = data.get(parent.field).and_then(Value::as_i64) else {
                continue;
            };
            let record = self
                .store
                .get_record(parent.table, id)
                .await?
                .ok_or_else(|| ApiError::bad_request(format!("{} {} not found", parent.label, id)))?;

            if let Some((from, into)) = parent.copy {
                let copied = record.get(from).cloned().unwrap_or(Value::Null);
                data.insert(into.to_string(), copied);
            }
        }
        Ok(())
    }

    fn derive_slug(def: &EntityDef, data: &mut Map<String, Value>, on_create: bool) -> Result<(), ApiError> {
        let Some(rule) = def.slug else {
            return Ok(());
        };

        let supplied = data
            .get(rule.target)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string);
        let source = data.get(rule.source).and_then(Value::as_str).map(str::to_string);

        let slug = match (supplied, source) {
            (Some(supplied), _) => slugify(&supplied),
            (None, Some(source)) => slugify(&source),
            (None, None) if on_create => String::new(),
            (None, None) => return Ok(()),
        };
        if slug.is_empty() {
            return Err(ApiError::field(rule.target, "could not be derived"));
        }
        data.insert(rule.target.to_string(), Value::String(slug));
        Ok(())
    }

    pub async fn create(
        &self,
        def: &EntityDef,
        mut data: Map<String, Value>,
    ) -> Result<ContentRecord, ApiError> {
        fields::complete_for_create(def.fields, &mut data)?;
        Self::derive_slug(def, &mut data, true)?;
        self.ensure_unique(def, &data, None).await?;
        self.resolve_parents(def, &mut data).await?;

        let record = self.store.insert_record(def.table, data).await?;
        tracing::info!("Created {} {}", def.path, record.id);
        Ok(record)
    }

    /// Merge the supplied keys into the stored row; everything else keeps
    /// its value.
    pub async fn update(
        &self,
        def: &EntityDef,
        id: i64,
        mut data: Map<String, Value>,
    ) -> Result<Updated<ContentRecord>, ApiError> {
        let mut record = self.get_by_id(def, id).await?;
        fields::check_required_present(def.fields, &data)?;
        Self::derive_slug(def, &mut data, false)?;
        self.ensure_unique(def, &data, Some(&record)).await?;
        self.resolve_parents(def, &mut data).await?;

        let replaced_file = def.upload.and_then(|upload| {
            let old = record.get_str(upload.field)?;
            let new = data.get(upload.field)?;
            (new.as_str() != Some(old)).then(|| old.to_string())
        });

        for (key, value) in data {
            if value.is_null() {
                record.data.remove(&key);
            } else {
                record.data.insert(key, value);
            }
        }

        let saved = self.store.save_record(def.table, &record).await?;
        tracing::info!("Updated {} {}", def.path, saved.id);
        Ok(Updated {
            value: saved,
            replaced_image: replaced_file,
        })
    }

    pub async fn delete(&self, def: &EntityDef, id: i64) -> Result<ContentRecord, ApiError> {
        let record = self.get_by_id(def, id).await?;
        if !self.store.delete_record(def.table, id).await? {
            return Err(ApiError::not_found(format!("{} not found", def.label)));
        }
        tracing::info!("Deleted {} {}", def.path, id);
        Ok(record)
    }
}
