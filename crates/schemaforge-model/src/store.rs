// Property store
//
// The authoritative in-memory representation: a flat ordered collection
// of properties with parent-id back-references, plus the currently
// selected id (a UI affordance, not a correctness concern). Guarded
// mutations refuse instead of corrupting the tree; refused mutations
// change nothing.

use crate::error::{TreeError, TreeResult};
use crate::property::{MAX_NESTING_DEPTH, Property, PropertyId, PropertyPatch, PropertyType};
use crate::validate::{depth_of, would_create_cycle};
use std::collections::HashSet;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    properties: Vec<Property>,
    selected: Option<PropertyId>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The flat ordered collection.
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// Direct children of `parent` (`None` for root-level properties),
    /// in collection order. Linear scan; the collection stays small.
    pub fn children(&self, parent: Option<PropertyId>) -> Vec<&Property> {
        self.properties
            .iter()
            .filter(|p| p.parent_id == parent)
            .collect()
    }

    pub fn selected(&self) -> Option<&Property> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn select(&mut self, id: Option<PropertyId>) {
        self.selected = id.filter(|id| self.get(*id).is_some());
    }

    /// Create a fresh property attached to `parent_id` (or the root) and
    /// return its id. The new property starts with an empty key and is
    /// inert from the schema's perspective until the key is set.
    pub fn add(&mut self, parent_id: Option<PropertyId>) -> PropertyId {
        let property = Property::new(parent_id);
        let id = property.id;
        self.properties.push(property);
        if let Some(parent) = parent_id {
            if let Some(p) = self.properties.iter_mut().find(|p| p.id == parent) {
                p.children.push(id);
            }
        }
        id
    }

    /// Guarded nested add: refuses when the parent is missing, the new
    /// depth would exceed the bound, or the parent's ancestor chain is
    /// cyclic. On refusal nothing is mutated.
    pub fn add_nested(&mut self, parent_id: PropertyId) -> TreeResult<PropertyId> {
        if let Err(e) = self.check_attach(None, parent_id) {
            warn!(parent = %parent_id, error = %e, "refusing nested property");
            return Err(e);
        }
        Ok(self.add(Some(parent_id)))
    }

    /// Guard used before attaching `child` (or a fresh property, when
    /// `None`) under `parent`: parent must exist, the resulting depth
    /// must stay within [`MAX_NESTING_DEPTH`], and the attachment must
    /// not make `child` its own ancestor.
    pub fn check_attach(
        &self,
        child: Option<PropertyId>,
        parent: PropertyId,
    ) -> TreeResult<()> {
        if self.get(parent).is_none() {
            return Err(TreeError::UnknownParent(parent));
        }
        if depth_of(parent, &self.properties) + 1 > MAX_NESTING_DEPTH {
            return Err(TreeError::DepthLimit(parent));
        }
        if let Some(child) = child {
            if would_create_cycle(child, parent, &self.properties) {
                return Err(TreeError::Cycle(parent));
            }
        }
        Ok(())
    }

    /// Merge `patch` into the property matching `id`. Only object-typed
    /// properties may own children, so changing the kind away from
    /// `object` cascades removal of any existing children. Returns
    /// whether the schema projection must be regenerated: true once the
    /// resulting key is non-empty or children were removed, false while
    /// the property is still mid-edit with a blank key.
    pub fn update(&mut self, id: PropertyId, patch: PropertyPatch) -> TreeResult<bool> {
        let property = self
            .properties
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(TreeError::UnknownProperty(id))?;
        let was_object = property.kind == PropertyType::Object;
        patch.apply(property);
        let keyed = property.has_key();
        let now_object = property.kind == PropertyType::Object;

        let mut removed = 0;
        if was_object && !now_object {
            let doomed: Vec<PropertyId> = self
                .properties
                .iter()
                .filter(|p| p.parent_id == Some(id))
                .map(|p| p.id)
                .collect();
            for child in doomed {
                removed += self.remove(child)?;
            }
            if removed > 0 {
                warn!(property = %id, removed, "kind left object; removed children");
            }
        }
        Ok(keyed || removed > 0)
    }

    /// Remove `id` and every transitive descendant atomically. Returns
    /// the number of removed properties. The schema projection must be
    /// regenerated afterward, even to the empty schema.
    pub fn remove(&mut self, id: PropertyId) -> TreeResult<usize> {
        if self.get(id).is_none() {
            return Err(TreeError::UnknownProperty(id));
        }
        let doomed = self.descendants(id);
        let before = self.properties.len();
        self.properties.retain(|p| !doomed.contains(&p.id));
        for p in &mut self.properties {
            p.children.retain(|c| !doomed.contains(c));
        }
        if self.selected.is_some_and(|s| doomed.contains(&s)) {
            self.selected = None;
        }
        Ok(before - self.properties.len())
    }

    /// `id` plus its full transitive descendant set, found by repeated
    /// `parent_id` lookup.
    fn descendants(&self, id: PropertyId) -> HashSet<PropertyId> {
        let mut set = HashSet::from([id]);
        loop {
            let next: Vec<PropertyId> = self
                .properties
                .iter()
                .filter(|p| {
                    !set.contains(&p.id)
                        && p.parent_id.is_some_and(|parent| set.contains(&parent))
                })
                .map(|p| p.id)
                .collect();
            if next.is_empty() {
                break;
            }
            set.extend(next);
        }
        set
    }

    /// Replace the entire collection with a normalized copy of
    /// externally supplied records: parent links to unknown ids are
    /// cleared and the informational child lists are rebuilt from the
    /// parent links.
    pub fn restore(&mut self, records: Vec<Property>) {
        let known: HashSet<PropertyId> = records.iter().map(|p| p.id).collect();
        let mut properties = records;
        for p in &mut properties {
            if p.parent_id.is_some_and(|parent| !known.contains(&parent)) {
                p.parent_id = None;
            }
        }
        let links: Vec<(PropertyId, PropertyId)> = properties
            .iter()
            .filter_map(|p| p.parent_id.map(|parent| (parent, p.id)))
            .collect();
        for p in &mut properties {
            p.children = links
                .iter()
                .filter(|(parent, _)| *parent == p.id)
                .map(|(_, child)| *child)
                .collect();
        }
        self.properties = properties;
        self.selected = None;
    }

    /// Empty the collection.
    pub fn clear(&mut self) {
        self.properties.clear();
        self.selected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyType;
    use serde_json::json;

    #[test]
    fn test_add_creates_inert_property() {
        let mut store = PropertyStore::new();
        let id = store.add(None);
        let p = store.get(id).unwrap();
        assert!(!p.has_key());
        assert_eq!(p.kind, PropertyType::String);
        assert_eq!(p.value, None);
        assert!(!p.required);
    }

    #[test]
    fn test_update_reports_regeneration_need() {
        let mut store = PropertyStore::new();
        let id = store.add(None);
        // Blank key: schema stays stale.
        assert!(!store.update(id, PropertyPatch::new().required(true)).unwrap());
        assert!(store.update(id, PropertyPatch::new().key("age")).unwrap());
    }

    #[test]
    fn test_update_unknown_property_refused() {
        let mut store = PropertyStore::new();
        let err = store
            .update(PropertyId::new(), PropertyPatch::new().key("x"))
            .unwrap_err();
        assert!(matches!(err, TreeError::UnknownProperty(_)));
    }

    #[test]
    fn test_nested_add_links_parent() {
        let mut store = PropertyStore::new();
        let parent = store.add(None);
        store
            .update(parent, PropertyPatch::new().key("user").kind(PropertyType::Object))
            .unwrap();
        let child = store.add_nested(parent).unwrap();

        assert_eq!(store.get(child).unwrap().parent_id, Some(parent));
        assert_eq!(store.get(parent).unwrap().children, vec![child]);
        assert_eq!(store.children(Some(parent)).len(), 1);
    }

    #[test]
    fn test_add_nested_missing_parent_refused() {
        let mut store = PropertyStore::new();
        let before = store.len();
        let err = store.add_nested(PropertyId::new()).unwrap_err();
        assert!(matches!(err, TreeError::UnknownParent(_)));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_depth_boundary() {
        let mut store = PropertyStore::new();
        // Build a chain down to depth 9.
        let mut parent = store.add(None);
        store
            .update(parent, PropertyPatch::new().key("l0").kind(PropertyType::Object))
            .unwrap();
        for depth in 1..=9 {
            let id = store.add_nested(parent).unwrap();
            store
                .update(
                    id,
                    PropertyPatch::new()
                        .key(format!("l{depth}"))
                        .kind(PropertyType::Object),
                )
                .unwrap();
            parent = id;
        }

        // Depth 9 parent can still accept a child (new depth 10)...
        let at_ten = store.add_nested(parent).unwrap();
        // ...but a depth-10 parent cannot, and nothing is mutated.
        let before = store.len();
        let err = store.add_nested(at_ten).unwrap_err();
        assert!(matches!(err, TreeError::DepthLimit(_)));
        assert_eq!(store.len(), before);
    }

    #[test]
    fn test_cycle_guard_on_attach_check() {
        let mut store = PropertyStore::new();
        let root = store.add(None);
        store
            .update(root, PropertyPatch::new().key("a").kind(PropertyType::Object))
            .unwrap();
        let child = store.add_nested(root).unwrap();

        // Treating a property as its own ancestor is refused.
        assert!(matches!(
            store.check_attach(Some(root), child),
            Err(TreeError::Cycle(_))
        ));
        assert!(matches!(
            store.check_attach(Some(root), root),
            Err(TreeError::Cycle(_))
        ));
        assert!(store.check_attach(Some(child), root).is_ok());
    }

    #[test]
    fn test_kind_change_away_from_object_removes_children() {
        let mut store = PropertyStore::new();
        let root = store.add(None);
        store
            .update(root, PropertyPatch::new().key("user").kind(PropertyType::Object))
            .unwrap();
        let kid = store.add_nested(root).unwrap();
        store
            .update(kid, PropertyPatch::new().key("inner").kind(PropertyType::Object))
            .unwrap();
        let grandkid = store.add_nested(kid).unwrap();

        let regen = store
            .update(root, PropertyPatch::new().kind(PropertyType::String))
            .unwrap();
        assert!(regen);
        assert_eq!(store.len(), 1);
        assert!(store.get(kid).is_none());
        assert!(store.get(grandkid).is_none());
        assert!(store.get(root).unwrap().children.is_empty());
        // No survivor is parented to a removed id.
        assert!(
            store
                .properties()
                .iter()
                .all(|p| p.parent_id.is_none_or(|id| store.get(id).is_some()))
        );
    }

    #[test]
    fn test_kind_change_between_non_object_kinds_keeps_collection() {
        let mut store = PropertyStore::new();
        let id = store.add(None);
        store
            .update(id, PropertyPatch::new().key("flag").kind(PropertyType::Boolean))
            .unwrap();
        store
            .update(id, PropertyPatch::new().kind(PropertyType::String))
            .unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_cascades_to_descendants() {
        let mut store = PropertyStore::new();
        let root = store.add(None);
        store
            .update(root, PropertyPatch::new().key("a").kind(PropertyType::Object))
            .unwrap();
        let kid = store.add_nested(root).unwrap();
        store
            .update(kid, PropertyPatch::new().key("b").kind(PropertyType::Object))
            .unwrap();
        let grandkid = store.add_nested(kid).unwrap();
        let other = store.add(None);

        let removed = store.remove(root).unwrap();
        assert_eq!(removed, 3);
        assert_eq!(store.len(), 1);
        assert!(store.get(other).is_some());
        assert!(store.get(grandkid).is_none());
        // No survivor references a deleted id.
        assert!(
            store
                .properties()
                .iter()
                .all(|p| p.parent_id.is_none_or(|id| store.get(id).is_some()))
        );
    }

    #[test]
    fn test_remove_clears_selection() {
        let mut store = PropertyStore::new();
        let id = store.add(None);
        store.select(Some(id));
        assert!(store.selected().is_some());
        store.remove(id).unwrap();
        assert!(store.selected().is_none());
    }

    #[test]
    fn test_restore_normalizes_links() {
        let mut orphan = Property::new(Some(PropertyId::new()));
        orphan.key = "orphan".to_string();
        let mut parent = Property::new(None);
        parent.key = "parent".to_string();
        parent.kind = PropertyType::Object;
        let mut child = Property::new(Some(parent.id));
        child.key = "child".to_string();
        child.value = Some(json!("v"));

        let mut store = PropertyStore::new();
        store.restore(vec![orphan.clone(), parent.clone(), child.clone()]);

        // Unknown parent link cleared; real link rebuilt into children.
        assert_eq!(store.get(orphan.id).unwrap().parent_id, None);
        assert_eq!(store.get(parent.id).unwrap().children, vec![child.id]);
        assert_eq!(store.get(child.id).unwrap().value, Some(json!("v")));
    }

    #[test]
    fn test_clear_empties_collection() {
        let mut store = PropertyStore::new();
        store.add(None);
        store.add(None);
        store.clear();
        assert!(store.is_empty());
        assert!(store.selected().is_none());
    }
}
