// Snapshot persistence
//
// A single durable key-value blob holding the current schema, the
// non-empty-key properties, and a timestamp. Saves always overwrite
// the whole blob; there is no partial or merge update. Storage
// failures are caught at this boundary and logged; in-memory state is
// never rolled back because of them.

use crate::engine::SchemaEngine;
use crate::error::PersistResult;
use schemaforge_model::{Property, SchemaDocument};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

/// The persisted payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub schema: SchemaDocument,
    pub properties: Vec<Property>,
    /// Epoch milliseconds at capture time.
    pub timestamp: u64,
}

impl Snapshot {
    /// Capture the current engine state: the derived schema plus the
    /// properties that participate in it (non-empty keys only).
    pub fn capture(engine: &SchemaEngine) -> Self {
        let properties = engine
            .properties()
            .iter()
            .filter(|p| p.has_key())
            .cloned()
            .collect();
        Self {
            schema: engine.schema().clone(),
            properties,
            timestamp: now_millis(),
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Durable storage for the single snapshot blob.
pub trait SnapshotStore: Send + Sync {
    /// Read the snapshot, if any. Unparseable blobs and payloads
    /// missing either `schema` or `properties` are treated as absent.
    fn load(&self) -> PersistResult<Option<Snapshot>>;

    /// Overwrite the full blob.
    fn save(&self, snapshot: &Snapshot) -> PersistResult<()>;

    /// Remove the blob.
    fn clear(&self) -> PersistResult<()>;
}

/// Decode a stored blob, applying the load contract: corrupt JSON or a
/// payload missing `schema`/`properties` is rejected as absent.
fn decode(blob: &str) -> Option<Snapshot> {
    let value: serde_json::Value = match serde_json::from_str(blob) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "stored snapshot is not valid JSON; ignoring");
            return None;
        }
    };
    if value.get("schema").is_none() || value.get("properties").is_none() {
        warn!("stored snapshot is missing schema or properties; ignoring");
        return None;
    }
    match serde_json::from_value(value) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(error = %e, "stored snapshot does not decode; ignoring");
            None
        }
    }
}

/// Snapshot store backed by a single JSON file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> PersistResult<Option<Snapshot>> {
        let blob = match fs::read_to_string(&self.path) {
            Ok(blob) => blob,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(decode(&blob))
    }

    fn save(&self, snapshot: &Snapshot) -> PersistResult<()> {
        let blob = serde_json::to_string(snapshot)?;
        fs::write(&self.path, blob)?;
        Ok(())
    }

    fn clear(&self) -> PersistResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory snapshot store. Goes through the same serialized-blob
/// path as `FileStore` so tests exercise the load contract.
#[derive(Default)]
pub struct MemoryStore {
    blob: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the raw blob directly (for exercising the load contract).
    pub fn set_blob(&self, blob: impl Into<String>) {
        *self.lock() = Some(blob.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.blob
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> PersistResult<Option<Snapshot>> {
        Ok(self.lock().as_deref().and_then(decode))
    }

    fn save(&self, snapshot: &Snapshot) -> PersistResult<()> {
        let blob = serde_json::to_string(snapshot)?;
        *self.lock() = Some(blob);
        Ok(())
    }

    fn clear(&self) -> PersistResult<()> {
        *self.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemaforge_model::PropertyPatch;

    fn engine_with_one_property() -> SchemaEngine {
        let mut engine = SchemaEngine::new();
        let id = engine.add_property(None).unwrap();
        engine
            .update_property(id, PropertyPatch::new().key("name"))
            .unwrap();
        // A second, still-blank property should not be persisted.
        engine.add_property(None).unwrap();
        engine
    }

    #[test]
    fn test_capture_keeps_only_keyed_properties() {
        let engine = engine_with_one_property();
        let snapshot = Snapshot::capture(&engine);
        assert_eq!(snapshot.properties.len(), 1);
        assert_eq!(snapshot.properties[0].key, "name");
        assert!(snapshot.timestamp > 0);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());

        let snapshot = Snapshot::capture(&engine_with_one_property());
        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, snapshot);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_load_rejects_incomplete_payloads() {
        let store = MemoryStore::new();
        store.set_blob(r#"{"schema": {"type": "object", "properties": {}}}"#);
        assert!(store.load().unwrap().is_none());

        store.set_blob(r#"{"properties": []}"#);
        assert!(store.load().unwrap().is_none());

        store.set_blob("not json at all");
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("schema.json"));
        assert!(store.load().unwrap().is_none());

        let snapshot = Snapshot::capture(&engine_with_one_property());
        store.save(&snapshot).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), snapshot);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // Clearing twice is fine.
        store.clear().unwrap();
    }
}
