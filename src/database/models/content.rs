use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A row of one of the generic content tables. Field values live in `data`
/// and have already been normalized by the entity definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: i64,
    pub data: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Flatten into the API shape: `{id, ...fields, createdAt, updatedAt}`.
    pub fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.data.len() + 3);
        object.insert("id".to_string(), Value::from(self.id));
        for (key, value) in &self.data {
            object.insert(key.clone(), value.clone());
        }
        object.insert("createdAt".to_string(), Value::String(self.created_at.to_rfc3339()));
        object.insert("updatedAt".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(object)
    }
}
