// Tree model <-> JSON Schema transform
//
// Both directions are pure functions of a property list / schema
// document. Generation filters out empty-key properties; loading
// flattens the schema's own nesting back into the flat collection.

use crate::property::{Property, PropertyId, PropertyType};
use crate::schema::{SchemaDocument, SchemaProperty};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// Build the JSON Schema document for a property collection.
///
/// Only root-level properties with non-empty trimmed keys contribute;
/// if there are none, the canonical empty schema is returned.
pub fn properties_to_schema(all: &[Property]) -> SchemaDocument {
    let roots: Vec<&Property> = all
        .iter()
        .filter(|p| p.parent_id.is_none() && p.has_key())
        .collect();

    let mut properties = BTreeMap::new();
    for root in &roots {
        properties.insert(root.trimmed_key().to_string(), build_node(root, all));
    }

    SchemaDocument {
        kind: PropertyType::Object,
        properties,
        required: required_keys(&roots),
    }
}

/// Convert a schema document back into a fresh property collection.
///
/// Only object-rooted schemas with a properties map produce anything;
/// every produced property gets a freshly generated id. The walk
/// follows the schema's own `properties`/`items` nesting depth-first,
/// flattening parents and children into one list.
pub fn schema_to_properties(doc: &SchemaDocument) -> Vec<Property> {
    let mut out = Vec::new();
    if doc.kind != PropertyType::Object {
        return out;
    }
    let required = doc.required.clone().unwrap_or_default();
    for (map_key, node) in &doc.properties {
        flatten_node(map_key, node, None, &required, &mut out);
    }
    out
}

fn build_node(property: &Property, all: &[Property]) -> SchemaProperty {
    let mut node = SchemaProperty {
        key: non_empty(property.trimmed_key()),
        kind: property.kind,
        description: non_empty(&property.description),
        default: default_of(property),
        properties: None,
        required: None,
        items: None,
    };

    if property.kind == PropertyType::Object {
        let children: Vec<&Property> = all
            .iter()
            .filter(|c| c.parent_id == Some(property.id) && c.has_key())
            .collect();
        let mut map = BTreeMap::new();
        for child in &children {
            map.insert(child.trimmed_key().to_string(), build_node(child, all));
        }
        node.properties = Some(map);
        node.required = required_keys(&children);
    }

    if property.kind == PropertyType::Array {
        if let Some(items) = &property.items {
            node.items = Some(Box::new(build_node(items, all)));
        }
    }

    node
}

/// `required` array for a sibling group: keys of required, non-empty-key
/// members. A later sibling reusing an earlier sibling's key is a
/// duplicate and does not count. Omitted entirely when empty.
fn required_keys(siblings: &[&Property]) -> Option<Vec<String>> {
    let mut seen = HashSet::new();
    let mut required = Vec::new();
    for p in siblings {
        if !p.has_key() {
            continue;
        }
        let key = p.trimmed_key().to_string();
        if !seen.insert(key.clone()) {
            continue;
        }
        if p.required {
            required.push(key);
        }
    }
    if required.is_empty() { None } else { Some(required) }
}

/// `default` is included only when a value is present and not an empty
/// string.
fn default_of(property: &Property) -> Option<Value> {
    match &property.value {
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(v.clone()),
        None => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn flatten_node(
    map_key: &str,
    node: &SchemaProperty,
    parent: Option<PropertyId>,
    required: &[String],
    out: &mut Vec<Property>,
) {
    let key = node.effective_key(map_key).to_string();
    let mut property = Property::new(parent);
    property.required = required.iter().any(|r| r == &key);
    property.key = key;
    property.kind = node.kind;
    property.description = node.description.clone().unwrap_or_default();
    property.value = node.default.clone();

    let id = property.id;
    let index = out.len();
    out.push(property);

    if node.kind == PropertyType::Object {
        if let Some(children) = &node.properties {
            let child_required = node.required.clone().unwrap_or_default();
            for (child_key, child_node) in children {
                flatten_node(child_key, child_node, Some(id), &child_required, out);
            }
            let child_ids: Vec<PropertyId> = out
                .iter()
                .filter(|c| c.parent_id == Some(id))
                .map(|c| c.id)
                .collect();
            out[index].children = child_ids;
        }
    }

    if node.kind == PropertyType::Array {
        if let Some(items_node) = &node.items {
            let mut items = Property::new(Some(id));
            items.key = items_node.key.clone().unwrap_or_default();
            items.kind = items_node.kind;
            items.description = items_node.description.clone().unwrap_or_default();
            items.value = items_node.default.clone();
            out[index].items = Some(Box::new(items));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_root_number_property_with_default() {
        let mut p = Property::new(None);
        p.key = "age".to_string();
        p.kind = PropertyType::Number;
        p.value = Some(json!(42));

        let doc = properties_to_schema(&[p]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap(),
            json!({
                "type": "object",
                "properties": {
                    "age": { "key": "age", "type": "number", "default": 42 }
                }
            })
        );
    }

    #[test]
    fn test_object_with_required_nested_child() {
        let mut user = Property::new(None);
        user.key = "user".to_string();
        user.kind = PropertyType::Object;

        let mut name = Property::new(Some(user.id));
        name.key = "name".to_string();
        name.required = true;

        let doc = properties_to_schema(&[user, name]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["properties"]["user"],
            json!({
                "key": "user",
                "type": "object",
                "properties": {
                    "name": { "key": "name", "type": "string" }
                },
                "required": ["name"]
            })
        );
    }

    #[test]
    fn test_empty_key_properties_are_excluded() {
        let blank = Property::new(None);
        let doc = properties_to_schema(&[blank]);
        assert!(doc.is_empty());
        assert_eq!(doc.to_pretty_string().unwrap(), "{}");
    }

    #[test]
    fn test_empty_string_default_is_omitted() {
        let mut p = Property::new(None);
        p.key = "label".to_string();
        p.value = Some(json!(""));

        let doc = properties_to_schema(&[p]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["properties"]["label"],
            json!({ "key": "label", "type": "string" })
        );
    }

    #[test]
    fn test_description_included_only_when_present() {
        let mut p = Property::new(None);
        p.key = "city".to_string();
        p.description = "where they live".to_string();

        let doc = properties_to_schema(&[p]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["properties"]["city"]["description"],
            json!("where they live")
        );
    }

    #[test]
    fn test_array_items_slot() {
        let mut tags = Property::new(None);
        tags.key = "tags".to_string();
        tags.kind = PropertyType::Array;
        let mut item = Property::new(Some(tags.id));
        item.kind = PropertyType::String;
        tags.items = Some(Box::new(item));

        let doc = properties_to_schema(&[tags]);
        assert_eq!(
            serde_json::to_value(&doc).unwrap()["properties"]["tags"]["items"],
            json!({ "type": "string" })
        );
    }

    #[test]
    fn test_schema_to_properties_flattens_nesting() {
        let doc = SchemaDocument::from_json_str(
            r#"{
                "type": "object",
                "properties": {
                    "user": {
                        "key": "user",
                        "type": "object",
                        "properties": {
                            "name": { "key": "name", "type": "string" }
                        },
                        "required": ["name"]
                    }
                }
            }"#,
        )
        .unwrap();

        let props = schema_to_properties(&doc);
        assert_eq!(props.len(), 2);
        let user = props.iter().find(|p| p.key == "user").unwrap();
        let name = props.iter().find(|p| p.key == "name").unwrap();
        assert_eq!(user.parent_id, None);
        assert_eq!(name.parent_id, Some(user.id));
        assert!(name.required);
        assert_eq!(user.children, vec![name.id]);
    }

    #[test]
    fn test_schema_to_properties_map_key_fallback() {
        let doc = SchemaDocument::from_json_str(
            r#"{
                "type": "object",
                "properties": { "legacy": { "type": "boolean" } }
            }"#,
        )
        .unwrap();

        let props = schema_to_properties(&doc);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].key, "legacy");
        assert_eq!(props[0].kind, PropertyType::Boolean);
    }

    #[test]
    fn test_schema_to_properties_rejects_non_object_root() {
        let doc = SchemaDocument::from_json_str(r#"{ "type": "array" }"#).unwrap();
        assert!(schema_to_properties(&doc).is_empty());
    }
}
