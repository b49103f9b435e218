// JSON Schema document types
//
// The derived, standards-shaped artifact (Draft-7 style, object-only
// root). The document has no independent lifecycle: it is regenerated
// from the property collection on every accepted mutation and never
// hand-edited.

use crate::error::SchemaResult;
use crate::property::PropertyType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Serialized form of the canonical empty schema.
pub const EMPTY_SCHEMA_STRING: &str = "{}";

/// The root JSON Schema document:
/// `{ "type": "object", "properties": {...}, "required": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "type", default)]
    pub kind: PropertyType,

    #[serde(default)]
    pub properties: BTreeMap<String, SchemaProperty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
}

impl SchemaDocument {
    /// The canonical empty schema: `{"type": "object", "properties": {}}`.
    pub fn empty() -> Self {
        Self {
            kind: PropertyType::Object,
            properties: BTreeMap::new(),
            required: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Parse an external schema document from its JSON text.
    pub fn from_json_str(text: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// 2-space-indented JSON serialization. The empty schema serializes
    /// to the canonical `"{}"`.
    pub fn to_pretty_string(&self) -> SchemaResult<String> {
        if self.is_empty() {
            return Ok(EMPTY_SCHEMA_STRING.to_string());
        }
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for SchemaDocument {
    fn default() -> Self {
        Self::empty()
    }
}

/// One schema node. `key` redundantly repeats the map key so each node
/// is self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: PropertyType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaProperty>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaProperty>>,
}

impl SchemaProperty {
    /// The effective key: the explicit `key` field when present,
    /// otherwise the enclosing map key (backward-compatible fallback).
    pub fn effective_key<'a>(&'a self, map_key: &'a str) -> &'a str {
        match self.key.as_deref() {
            Some(k) if !k.trim().is_empty() => k,
            _ => map_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_schema_serializes_to_braces() {
        let doc = SchemaDocument::empty();
        assert_eq!(doc.to_pretty_string().unwrap(), "{}");
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({"type": "object", "properties": {}})
        );
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let node = SchemaProperty {
            key: Some("age".to_string()),
            kind: PropertyType::Number,
            description: None,
            default: Some(json!(42)),
            properties: None,
            required: None,
            items: None,
        };
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"key": "age", "type": "number", "default": 42})
        );
    }

    #[test]
    fn test_from_json_str_round_trip() {
        let text = r#"{
  "type": "object",
  "properties": {
    "name": { "key": "name", "type": "string" }
  },
  "required": ["name"]
}"#;
        let doc = SchemaDocument::from_json_str(text).unwrap();
        assert_eq!(doc.kind, PropertyType::Object);
        assert_eq!(doc.properties.len(), 1);
        assert_eq!(doc.required, Some(vec!["name".to_string()]));
    }

    #[test]
    fn test_effective_key_prefers_explicit_field() {
        let mut node = SchemaProperty {
            key: Some("explicit".to_string()),
            kind: PropertyType::String,
            description: None,
            default: None,
            properties: None,
            required: None,
            items: None,
        };
        assert_eq!(node.effective_key("map_key"), "explicit");
        node.key = None;
        assert_eq!(node.effective_key("map_key"), "map_key");
    }
}
