// Property tree data model
//
// A Property is one node of the schema under construction. All
// parent/child structure is carried by `parent_id` back-references over
// the flat collection owned by `PropertyStore`; the `children` field is
// kept for convenience only and must not be trusted as ground truth.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Maximum nesting depth of the property tree (root = depth 0).
pub const MAX_NESTING_DEPTH: usize = 10;

/// Opaque unique identifier for a property. Generated on creation,
/// immutable, never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PropertyId(Uuid);

impl PropertyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The declared type of a property, determining the legal shape of its
/// default value and how raw input is coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    #[default]
    String,
    Number,
    Boolean,
    Object,
    Array,
    Null,
}

impl PropertyType {
    /// All recognized property types.
    pub const ALL: [PropertyType; 6] = [
        PropertyType::String,
        PropertyType::Number,
        PropertyType::Boolean,
        PropertyType::Object,
        PropertyType::Array,
        PropertyType::Null,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Object => "object",
            PropertyType::Array => "array",
            PropertyType::Null => "null",
        }
    }

    /// Parse a type name. Returns `None` for anything outside the six
    /// recognized types.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "string" => Some(PropertyType::String),
            "number" => Some(PropertyType::Number),
            "boolean" => Some(PropertyType::Boolean),
            "object" => Some(PropertyType::Object),
            "array" => Some(PropertyType::Array),
            "null" => Some(PropertyType::Null),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node in the schema under construction.
///
/// Missing fields deserialize to the same defaults `PropertyStore::restore`
/// applies, so property records from older snapshots load cleanly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: PropertyId,

    /// Field name as it will appear in the schema `properties` map.
    /// May be transiently empty while the property is being edited; an
    /// empty-key property is excluded from schema generation.
    #[serde(default)]
    pub key: String,

    #[serde(rename = "type", default)]
    pub kind: PropertyType,

    #[serde(default)]
    pub description: String,

    /// Committed typed default value, or `None` if unset. Raw text being
    /// typed lives in the editing session, never here.
    #[serde(default)]
    pub value: Option<Value>,

    /// Surfaced in the generated schema as membership in the parent's
    /// `required` array, never as a field of the schema node.
    #[serde(default)]
    pub required: bool,

    /// `None` for root-level properties, otherwise the id of the
    /// enclosing object-typed property.
    #[serde(default)]
    pub parent_id: Option<PropertyId>,

    /// Informational list of this property's own children. The flat
    /// collection filtered by `parent_id` is authoritative.
    #[serde(rename = "properties", default)]
    pub children: Vec<PropertyId>,

    /// For array-typed properties, the single item-schema slot.
    #[serde(default)]
    pub items: Option<Box<Property>>,
}

impl Property {
    /// Create a fresh property attached to `parent_id` (or the root),
    /// with the defaults a newly added property carries: empty key,
    /// `string` type, no value, not required.
    pub fn new(parent_id: Option<PropertyId>) -> Self {
        Self {
            id: PropertyId::new(),
            key: String::new(),
            kind: PropertyType::default(),
            description: String::new(),
            value: None,
            required: false,
            parent_id,
            children: Vec::new(),
            items: None,
        }
    }

    pub fn trimmed_key(&self) -> &str {
        self.key.trim()
    }

    /// True once the key is non-empty after trimming; only such
    /// properties participate in schema generation.
    pub fn has_key(&self) -> bool {
        !self.trimmed_key().is_empty()
    }
}

/// Field-wise update applied by `PropertyStore::update`. Absent fields
/// are left untouched; `value` distinguishes "leave alone" from
/// "set to unset".
#[derive(Debug, Clone, Default)]
pub struct PropertyPatch {
    pub key: Option<String>,
    pub kind: Option<PropertyType>,
    pub description: Option<String>,
    pub value: Option<Option<Value>>,
    pub required: Option<bool>,
    pub items: Option<Option<Box<Property>>>,
}

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn kind(mut self, kind: PropertyType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn value(mut self, value: Option<Value>) -> Self {
        self.value = Some(value);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn items(mut self, items: Option<Property>) -> Self {
        self.items = Some(items.map(Box::new));
        self
    }

    /// Merge this patch into `property`.
    pub fn apply(self, property: &mut Property) {
        if let Some(key) = self.key {
            property.key = key;
        }
        if let Some(kind) = self.kind {
            property.kind = kind;
        }
        if let Some(description) = self.description {
            property.description = description;
        }
        if let Some(value) = self.value {
            property.value = value;
        }
        if let Some(required) = self.required {
            property.required = required;
        }
        if let Some(items) = self.items {
            property.items = items;
        }
    }
}
