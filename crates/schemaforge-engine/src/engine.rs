// Schema engine
//
// The explicit state owner around the pure core: it holds the property
// store together with the derived schema document, its pretty-printed
// string, the validity flag, and the per-property error map, and
// publishes a snapshot of all of them over a watch channel after every
// mutation. Mutations execute synchronously to completion; there is no
// concurrent mutation of the shared collection.

use schemaforge_model::{
    EMPTY_SCHEMA_STRING, FieldErrors, Property, PropertyId, PropertyPatch, PropertyStore,
    SchemaDocument, TreeResult, properties_to_schema, schema_to_properties, validate_all,
};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Everything the UI observes, pushed after every mutation.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub properties: Vec<Property>,
    pub schema: SchemaDocument,
    pub schema_string: String,
    pub valid: bool,
    pub errors: BTreeMap<PropertyId, FieldErrors>,
}

impl EngineState {
    fn empty() -> Self {
        Self {
            properties: Vec::new(),
            schema: SchemaDocument::empty(),
            schema_string: EMPTY_SCHEMA_STRING.to_string(),
            valid: true,
            errors: BTreeMap::new(),
        }
    }
}

pub struct SchemaEngine {
    store: PropertyStore,
    schema: SchemaDocument,
    schema_string: String,
    /// False when serialization failed or validation found errors.
    serialize_ok: bool,
    errors: BTreeMap<PropertyId, FieldErrors>,
    state_tx: watch::Sender<EngineState>,
}

impl SchemaEngine {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(EngineState::empty());
        Self {
            store: PropertyStore::new(),
            schema: SchemaDocument::empty(),
            schema_string: EMPTY_SCHEMA_STRING.to_string(),
            serialize_ok: true,
            errors: BTreeMap::new(),
            state_tx,
        }
    }

    /// Subscribe to state snapshots. Receivers see the latest state
    /// after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.state_tx.subscribe()
    }

    pub fn properties(&self) -> &[Property] {
        self.store.properties()
    }

    pub fn get(&self, id: PropertyId) -> Option<&Property> {
        self.store.get(id)
    }

    pub fn children(&self, parent: Option<PropertyId>) -> Vec<&Property> {
        self.store.children(parent)
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn schema_string(&self) -> &str {
        &self.schema_string
    }

    pub fn errors(&self) -> &BTreeMap<PropertyId, FieldErrors> {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.serialize_ok && self.errors.is_empty()
    }

    pub fn selected(&self) -> Option<&Property> {
        self.store.selected()
    }

    pub fn select(&mut self, id: Option<PropertyId>) {
        self.store.select(id);
        self.publish();
    }

    /// Add a root-level or pre-checked nested property. The new
    /// property has an empty key, so the schema projection is left
    /// untouched until the key is set.
    pub fn add_property(&mut self, parent: Option<PropertyId>) -> TreeResult<PropertyId> {
        let id = match parent {
            Some(parent) => self.store.add_nested(parent)?,
            None => self.store.add(None),
        };
        self.publish();
        Ok(id)
    }

    /// Merge a patch into one property. Regenerates the schema once the
    /// resulting key is non-empty; while the key is still blank the
    /// previously generated schema is acceptable staleness.
    pub fn update_property(&mut self, id: PropertyId, patch: PropertyPatch) -> TreeResult<()> {
        let regenerate = self.store.update(id, patch)?;
        // A kind change away from object may have cascaded children out
        // of the collection; drop their error entries with them.
        let store = &self.store;
        self.errors.retain(|id, _| store.get(*id).is_some());
        if regenerate {
            self.regenerate();
        }
        self.publish();
        Ok(())
    }

    /// Remove a property and all its descendants; the schema is always
    /// regenerated afterward, even to the empty schema.
    pub fn remove_property(&mut self, id: PropertyId) -> TreeResult<usize> {
        let removed = self.store.remove(id)?;
        let store = &self.store;
        self.errors.retain(|id, _| store.get(*id).is_some());
        self.regenerate();
        self.publish();
        Ok(removed)
    }

    /// Replace the collection with externally supplied records and
    /// regenerate from the subset with non-empty keys.
    pub fn restore(&mut self, records: Vec<Property>) {
        self.store.restore(records);
        self.errors.clear();
        self.regenerate();
        self.publish();
    }

    /// Convert an external schema document into a fresh property
    /// collection, replacing the current one.
    pub fn load_schema(&mut self, doc: &SchemaDocument) {
        self.restore(schema_to_properties(doc));
    }

    /// Reset to the canonical empty state.
    pub fn clear(&mut self) {
        self.store.clear();
        self.schema = SchemaDocument::empty();
        self.schema_string = EMPTY_SCHEMA_STRING.to_string();
        self.serialize_ok = true;
        self.errors.clear();
        self.publish();
    }

    /// Recompute the full per-property error set (the debounced
    /// auto-validation path).
    pub fn revalidate(&mut self) {
        self.errors = validate_all(self.store.properties());
        self.publish();
    }

    /// Regenerate the schema document and its serialization from the
    /// current collection. A serialization failure leaves the
    /// last-known-good document in place, falls back to `"{}"` for the
    /// string, and flags the schema invalid.
    fn regenerate(&mut self) {
        let doc = properties_to_schema(self.store.properties());
        match doc.to_pretty_string() {
            Ok(text) => {
                debug!(properties = self.store.len(), "regenerated schema");
                self.schema = doc;
                self.schema_string = text;
                self.serialize_ok = true;
            }
            Err(e) => {
                warn!(error = %e, "schema serialization failed; keeping last-known-good");
                self.schema_string = EMPTY_SCHEMA_STRING.to_string();
                self.serialize_ok = false;
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(EngineState {
            properties: self.store.properties().to_vec(),
            schema: self.schema.clone(),
            schema_string: self.schema_string.clone(),
            valid: self.is_valid(),
            errors: self.errors.clone(),
        });
    }
}

impl Default for SchemaEngine {
    fn default() -> Self {
        Self::new()
    }
}
