// Property validation
//
// Pure checks over a property and the flat collection it lives in.
// Nothing here mutates state; the tree walks (depth, ancestor chain)
// are free functions over `(id, collection)` so cascade and guard logic
// stays a linear scan.

use crate::error::ValidationError;
use crate::property::{MAX_NESTING_DEPTH, Property, PropertyId, PropertyType};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Property fields a validation error can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyField {
    Key,
    Type,
    Value,
    Nesting,
}

impl fmt::Display for PropertyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyField::Key => "key",
            PropertyField::Type => "type",
            PropertyField::Value => "value",
            PropertyField::Nesting => "nesting",
        };
        f.write_str(name)
    }
}

/// Per-property error map: absence of a field means that field passed.
pub type FieldErrors = BTreeMap<PropertyField, ValidationError>;

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("key pattern compiles")
});

/// Validate a property key against the key grammar and its siblings.
///
/// Siblings are the other properties sharing the same `parent_id`;
/// empty-key siblings are exempt from the uniqueness check.
pub fn validate_key(
    key: &str,
    parent_id: Option<PropertyId>,
    id: PropertyId,
    all: &[Property],
) -> Option<ValidationError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Some(ValidationError::EmptyKey);
    }
    if !KEY_PATTERN.is_match(trimmed) {
        return Some(ValidationError::InvalidKeyFormat(trimmed.to_string()));
    }
    let duplicate = all.iter().any(|sibling| {
        sibling.id != id
            && sibling.parent_id == parent_id
            && sibling.trimmed_key() == trimmed
    });
    if duplicate {
        return Some(ValidationError::DuplicateKey(trimmed.to_string()));
    }
    None
}

/// Validate an externally supplied type name.
pub fn validate_type_name(name: &str) -> Option<ValidationError> {
    if PropertyType::parse(name).is_none() {
        return Some(ValidationError::InvalidType(name.to_string()));
    }
    None
}

/// Grammar-check raw input against a declared type while the user is
/// still typing (incomplete JSON is provisionally valid).
pub fn validate_raw_input(raw: &str, kind: PropertyType) -> Option<ValidationError> {
    if !kind.raw_input_valid(raw) {
        return Some(ValidationError::ValueMismatch { expected: kind });
    }
    None
}

/// Check a converted value's run-time shape against the declared type.
pub fn validate_value(value: &Value, kind: PropertyType) -> Option<ValidationError> {
    if !kind.matches_shape(value) {
        return Some(ValidationError::ValueMismatch { expected: kind });
    }
    None
}

/// Number of `parent_id` hops from `id` to the root.
///
/// The walk is bounded by the collection size so a corrupt parent chain
/// terminates instead of looping.
pub fn depth_of(id: PropertyId, all: &[Property]) -> usize {
    let mut depth = 0;
    let mut current = find(id, all).and_then(|p| p.parent_id);
    while let Some(parent) = current {
        depth += 1;
        if depth > all.len() {
            break;
        }
        current = find(parent, all).and_then(|p| p.parent_id);
    }
    depth
}

/// The chain of ancestor ids from `id`'s parent up to the root.
pub fn ancestor_chain(id: PropertyId, all: &[Property]) -> Vec<PropertyId> {
    let mut chain = Vec::new();
    let mut current = find(id, all).and_then(|p| p.parent_id);
    while let Some(parent) = current {
        if chain.len() > all.len() {
            break;
        }
        chain.push(parent);
        current = find(parent, all).and_then(|p| p.parent_id);
    }
    chain
}

/// Would attaching a child under `candidate_parent` make `child` its own
/// ancestor?
pub fn would_create_cycle(
    child: PropertyId,
    candidate_parent: PropertyId,
    all: &[Property],
) -> bool {
    if child == candidate_parent {
        return true;
    }
    ancestor_chain(candidate_parent, all).contains(&child)
}

/// Check the nesting-depth bound for a property already in the tree.
pub fn validate_nesting(property: &Property, all: &[Property]) -> Option<ValidationError> {
    if depth_of(property.id, all) > MAX_NESTING_DEPTH {
        return Some(ValidationError::MaxDepthExceeded {
            max: MAX_NESTING_DEPTH,
        });
    }
    None
}

/// Aggregate check: every failing field of one property, keyed by field.
pub fn validate_property(property: &Property, all: &[Property]) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if let Some(e) = validate_key(&property.key, property.parent_id, property.id, all) {
        errors.insert(PropertyField::Key, e);
    }
    if let Some(value) = &property.value {
        if let Some(e) = validate_value(value, property.kind) {
            errors.insert(PropertyField::Value, e);
        }
    }
    if let Some(e) = validate_nesting(property, all) {
        errors.insert(PropertyField::Nesting, e);
    }
    errors
}

/// Run [`validate_property`] over the whole collection, keeping only
/// properties with at least one failing field.
pub fn validate_all(all: &[Property]) -> BTreeMap<PropertyId, FieldErrors> {
    all.iter()
        .filter_map(|p| {
            let errors = validate_property(p, all);
            if errors.is_empty() {
                None
            } else {
                Some((p.id, errors))
            }
        })
        .collect()
}

fn find(id: PropertyId, all: &[Property]) -> Option<&Property> {
    all.iter().find(|p| p.id == id)
}
