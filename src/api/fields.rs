use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Map, Value};

use crate::error::{ApiError, FieldErrors};

/// Server-managed keys no request body may set.
pub const SYSTEM_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Email,
    Enum(&'static [&'static str]),
    Int { min: Option<i64>, max: Option<i64> },
    Number,
    Bool,
    /// `YYYY-MM-DD` or RFC 3339, stored as given.
    Date,
    StringList,
    StringMap,
    Object,
    ObjectList,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Bool(bool),
    Int(i64),
    Str(&'static str),
    Strings(&'static [&'static str]),
    EmptyList,
    EmptyMap,
    /// Current time, RFC 3339.
    Now,
}

impl DefaultValue {
    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Bool(b) => Value::Bool(b),
            DefaultValue::Int(i) => Value::from(i),
            DefaultValue::Str(s) => Value::from(s),
            DefaultValue::Strings(items) => json!(items),
            DefaultValue::EmptyList => json!([]),
            DefaultValue::EmptyMap => json!({}),
            DefaultValue::Now => Value::String(Utc::now().to_rfc3339()),
        }
    }
}

/// One accepted input field: name as it appears on the wire, its type,
/// and whether a create must supply it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<DefaultValue>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn int(name: &'static str) -> Self {
        Self::new(name, FieldKind::Int { min: None, max: None })
    }

    pub const fn boolean(name: &'static str, default: bool) -> Self {
        Self::new(name, FieldKind::Bool).default(DefaultValue::Bool(default))
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }
}

fn parse_form_json(raw: &str) -> Result<Value, String> {
    let raw = raw.trim();
    serde_json::from_str(raw).map_err(|_| "must be valid JSON".to_string())
}

fn is_plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .map_or(false, |(host, tld)| !host.is_empty() && !tld.is_empty())
}

/// Normalize one value. `from_form` marks multipart text parts, where every
/// value arrives as a string and structured fields are JSON-encoded.
pub fn coerce(kind: FieldKind, value: Value, from_form: bool) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    // Forms send untouched optional inputs as empty strings.
    if from_form && kind != FieldKind::Text && value.as_str().map_or(false, |s| s.trim().is_empty()) {
        return Ok(Value::Null);
    }

    match kind {
        FieldKind::Text => match value {
            Value::String(s) => Ok(Value::String(s.trim().to_string())),
            _ => Err("must be a string".to_string()),
        },
        FieldKind::Email => match value {
            Value::String(s) => {
                let s = s.trim().to_lowercase();
                if s.is_empty() || is_plausible_email(&s) {
                    Ok(Value::String(s))
                } else {
                    Err("must be a valid email address".to_string())
                }
            }
            _ => Err("must be a string".to_string()),
        },
        FieldKind::Enum(allowed) => match value {
            Value::String(s) if allowed.iter().any(|a| *a == s.trim()) => {
                Ok(Value::String(s.trim().to_string()))
            }
            _ => Err(format!("must be one of: {}", allowed.join(", "))),
        },
        FieldKind::Int { min, max } => {
            let n = match &value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(|| "must be an integer".to_string())?;
            if let Some(min) = min {
                if n < min {
                    return Err(format!("must be at least {}", min));
                }
            }
            if let Some(max) = max {
                if n > max {
                    return Err(format!("must be at most {}", max));
                }
            }
            Ok(Value::from(n))
        }
        FieldKind::Number => {
            let n = match &value {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            }
            .filter(|n| n.is_finite())
            .ok_or_else(|| "must be a number".to_string())?;
            Ok(json!(n))
        }
        FieldKind::Bool => match value {
            Value::Bool(b) => Ok(Value::Bool(b)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err("must be true or false".to_string()),
        },
        FieldKind::Date => match value {
            Value::String(s) => {
                let s = s.trim();
                let valid = NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
                    || DateTime::parse_from_rfc3339(s).is_ok();
                if valid {
                    Ok(Value::String(s.to_string()))
                } else {
                    Err("must be a date (YYYY-MM-DD or RFC 3339)".to_string())
                }
            }
            _ => Err("must be a date string".to_string()),
        },
        FieldKind::StringList => {
            let value = match value {
                Value::String(s) if from_form => parse_form_json(&s)?,
                other => other,
            };
            match value {
                Value::Array(items) => items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Ok(Value::String(s.trim().to_string())),
                        _ => Err("must be a list of strings".to_string()),
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                _ => Err("must be a list of strings".to_string()),
            }
        }
        FieldKind::StringMap => {
            let value = match value {
                Value::String(s) if from_form => parse_form_json(&s)?,
                other => other,
            };
            match value {
                Value::Object(map) if map.values().all(Value::is_string) => Ok(Value::Object(map)),
                _ => Err("must be an object of string values".to_string()),
            }
        }
        FieldKind::Object => {
            let value = match value {
                Value::String(s) if from_form => parse_form_json(&s)?,
                other => other,
            };
            match value {
                Value::Object(map) => Ok(Value::Object(map)),
                _ => Err("must be an object".to_string()),
            }
        }
        FieldKind::ObjectList => {
            let value = match value {
                Value::String(s) if from_form => parse_form_json(&s)?,
                other => other,
            };
            match value {
                Value::Array(items) if items.iter().all(Value::is_object) => Ok(Value::Array(items)),
                _ => Err("must be a list of objects".to_string()),
            }
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

/// Normalize an input body against a field list. Unknown and system keys
/// are rejected; every problem is reported at once in the field error map.
pub fn normalize(
    specs: &[FieldSpec],
    input: Map<String, Value>,
    from_form: bool,
) -> Result<Map<String, Value>, ApiError> {
    let mut errors = FieldErrors::new();
    let mut output = Map::new();

    for (key, value) in input {
        if SYSTEM_FIELDS.contains(&key.as_str()) {
            errors.insert(key, "is managed by the server".to_string());
            continue;
        }
        let Some(spec) = specs.iter().find(|spec| spec.name == key) else {
            errors.insert(key, "is not a known field".to_string());
            continue;
        };
        match coerce(spec.kind, value, from_form) {
            Ok(value) => {
                output.insert(key, value);
            }
            Err(problem) => {
                errors.insert(key, problem);
            }
        }
    }

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(ApiError::validation_error("Validation failed", Some(errors)))
    }
}

/// Fill defaults for absent fields, then check that every required field is
/// present and non-empty.
pub fn complete_for_create(
    specs: &[FieldSpec],
    data: &mut Map<String, Value>,
) -> Result<(), ApiError> {
    for spec in specs {
        if let Some(default) = spec.default {
            if matches!(data.get(spec.name), None | Some(Value::Null)) {
                data.insert(spec.name.to_string(), default.to_value());
            }
        }
    }
    check_required(specs, data)
}

/// Required fields must not be blank; on update only the supplied keys are
/// checked.
pub fn check_required(specs: &[FieldSpec], data: &Map<String, Value>) -> Result<(), ApiError> {
    let missing: FieldErrors = specs
        .iter()
        .filter(|spec| spec.required && is_blank(data.get(spec.name)))
        .map(|spec| (spec.name.to_string(), "is required".to_string()))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        let names: Vec<&str> = missing.keys().map(String::as_str).collect();
        Err(ApiError::validation_error(
            format!("Missing required fields: {}", names.join(", ")),
            Some(missing),
        ))
    }
}

/// Required fields the update body touches may not be blanked.
pub fn check_required_present(
    specs: &[FieldSpec],
    data: &Map<String, Value>,
) -> Result<(), ApiError> {
    let touched: Vec<FieldSpec> = specs
        .iter()
        .filter(|spec| data.contains_key(spec.name))
        .copied()
        .collect();
    check_required(&touched, data)
}

/// Lowercase, whitespace to hyphens, drop anything outside `[A-Za-z0-9_-]`.
pub fn slugify(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
