use crate::file::error::FileError;
use model::{
    core::value::{Value, ValueKind},
    records::document::Document,
};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::{collections::HashMap, path::Path};
use tracing::debug;

/// Maps document field names onto a dynamic-field schema (`title_t`, `size_l`, `tags_ts`, ...).
///
/// The rules can be loaded from JSON; unspecified keys keep their defaults:
///
/// ```json
/// { "overrides": { "id": "id" }, "multi_val_suffix": "s",
///   "type_suffix": { "text": "_t", "int": "_i" }, "eval": true }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldMapper {
    pub overrides: HashMap<String, String>,
    pub multi_val_suffix: String,
    pub type_suffix: TypeSuffixes,
    /// Fields starting with this prefix are metadata and get `metadata_suffix` instead.
    pub metadata_prefix: String,
    pub metadata_suffix: String,
    /// Coerce numeric and boolean looking text before choosing a suffix.
    pub eval: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TypeSuffixes {
    pub text: String,
    pub int: String,
    pub long: String,
    pub bool: String,
    pub float: String,
    pub timestamp: String,
}

impl Default for TypeSuffixes {
    fn default() -> Self {
        TypeSuffixes {
            text: "_t".into(),
            int: "_i".into(),
            long: "_l".into(),
            bool: "_b".into(),
            float: "_d".into(),
            timestamp: "_dt".into(),
        }
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        let overrides = ["id", "url", "title", "content"]
            .into_iter()
            .map(|name| (name.to_string(), name.to_string()))
            .collect();

        FieldMapper {
            overrides,
            multi_val_suffix: "s".into(),
            type_suffix: TypeSuffixes::default(),
            metadata_prefix: "meta.".into(),
            metadata_suffix: "_md".into(),
            eval: false,
        }
    }
}

impl FieldMapper {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|err| FileError::from_io(path, err))?;
        serde_json::from_str(&content).map_err(|err| {
            FileError::InvalidFormat(format!("{}: {err}", path.display()))
        })
    }

    pub fn with_eval(mut self, eval: bool) -> Self {
        self.eval = eval;
        self
    }

    /// Mapped name for a field, or `None` when the value's type cannot be determined
    /// (nulls and empty lists).
    pub fn map_field(&self, name: &str, value: &Value) -> Option<String> {
        if let Some(mapped) = self.overrides.get(name) {
            return Some(mapped.clone());
        }

        if let Some(meta_name) = name.strip_prefix(self.metadata_prefix.as_str())
            && !self.metadata_prefix.is_empty()
        {
            return Some(normalize(meta_name) + &self.metadata_suffix);
        }

        let mut suffix = self.suffix_for(value.kind())?.to_string();
        if matches!(value, Value::List(_)) {
            suffix.push_str(&self.multi_val_suffix);
        }

        // already mapped
        if name.ends_with(&suffix) {
            return Some(name.to_string());
        }
        Some(normalize(name) + &suffix)
    }

    /// Flattens a document into a JSON object with mapped field names.
    pub fn map_document(&self, doc: &Document) -> Map<String, JsonValue> {
        let mut out = Map::with_capacity(doc.len() + 1);
        let id_field = self
            .overrides
            .get("id")
            .map(String::as_str)
            .unwrap_or("id");
        out.insert(id_field.to_string(), JsonValue::String(doc.id().to_string()));

        for (name, value) in doc.fields() {
            let value = if self.eval {
                evaluate(value)
            } else {
                value.clone()
            };
            match self.map_field(name, &value) {
                Some(mapped) => {
                    out.insert(mapped, value.to_json());
                }
                None => debug!(field = %name, id = %doc.id(), "Dropping unmappable field"),
            }
        }
        out
    }

    fn suffix_for(&self, kind: ValueKind) -> Option<&str> {
        let suffix = match kind {
            ValueKind::Null => return None,
            ValueKind::Text => &self.type_suffix.text,
            ValueKind::Int => &self.type_suffix.int,
            ValueKind::Long => &self.type_suffix.long,
            ValueKind::Bool => &self.type_suffix.bool,
            ValueKind::Float => &self.type_suffix.float,
            ValueKind::Timestamp => &self.type_suffix.timestamp,
        };
        Some(suffix)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parses text that looks like a number or boolean into the typed value.
fn evaluate(value: &Value) -> Value {
    match value {
        Value::Text(text) => {
            let trimmed = text.trim();
            if let Ok(v) = trimmed.parse::<i64>() {
                Value::Int(v)
            } else if let Ok(v) = trimmed.parse::<f64>()
                && v.is_finite()
            {
                Value::Float(v)
            } else if trimmed.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if trimmed.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                value.clone()
            }
        }
        Value::List(items) => Value::List(items.iter().map(evaluate).collect()),
        other => other.clone(),
    }
}
