use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured result of parsing a [`Record`](crate::records::record::Record).
///
/// Documents are built once through the consuming `with_*` methods and are not
/// mutated afterwards. The id is the key of the record the document came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: String,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Document {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a field. Null values are dropped so sinks never see empty fields.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        if !value.is_null() {
            self.fields.insert(name.into(), value);
        }
        self
    }

    pub fn with_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in fields {
            self = self.with_field(name, value);
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Flat JSON object with the id under `id_field` followed by every field.
    pub fn to_json_object(&self, id_field: &str) -> serde_json::Map<String, serde_json::Value> {
        let mut obj = serde_json::Map::with_capacity(self.fields.len() + 1);
        obj.insert(
            id_field.to_string(),
            serde_json::Value::String(self.id.clone()),
        );
        for (name, value) in &self.fields {
            obj.insert(name.clone(), value.to_json());
        }
        obj
    }
}
