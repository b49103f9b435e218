// Builder session
//
// Ties the engine to a snapshot store and runs the two debounced
// background reactions to edits: validation and persistence. Every
// mutation goes through the session so both timers are rearmed as a
// unit. Shared ownership is deliberate: the debounced jobs hold weak
// handles onto the same engine and store the session mutates.

use crate::debounce::{Debouncer, Job};
use crate::engine::SchemaEngine;
use crate::persist::{Snapshot, SnapshotStore};
use schemaforge_model::{
    PropertyId, PropertyPatch, PropertyType, SchemaDocument, TreeResult, ValidationError,
    validate_raw_input,
};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tracing::warn;

/// Quiet period after the last edit before validation and persistence
/// run.
pub const AUTOSAVE_DELAY: Duration = Duration::from_millis(500);

struct Channels {
    validate: Mutex<Debouncer>,
    persist: Mutex<Debouncer>,
    /// Set while a restore is replaying stored state, to keep the
    /// replayed mutations from persisting right back.
    loading: AtomicBool,
}

/// One editing session over a schema engine and its snapshot store.
pub struct BuilderSession {
    engine: Arc<Mutex<SchemaEngine>>,
    store: Arc<dyn SnapshotStore>,
    channels: Arc<Channels>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BuilderSession {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_delay(store, AUTOSAVE_DELAY)
    }

    pub fn with_delay(store: Arc<dyn SnapshotStore>, delay: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(SchemaEngine::new())),
            store,
            channels: Arc::new(Channels {
                validate: Mutex::new(Debouncer::new(delay)),
                persist: Mutex::new(Debouncer::new(delay)),
                loading: AtomicBool::new(false),
            }),
        }
    }

    pub fn engine(&self) -> Arc<Mutex<SchemaEngine>> {
        Arc::clone(&self.engine)
    }

    /// Run `f` against the engine under the lock.
    pub fn with_engine<R>(&self, f: impl FnOnce(&SchemaEngine) -> R) -> R {
        f(&lock(&self.engine))
    }

    // Mutations: apply under the lock, then rearm both timers.

    pub fn add_property(&self, parent: Option<PropertyId>) -> TreeResult<PropertyId> {
        let id = lock(&self.engine).add_property(parent)?;
        self.touch();
        Ok(id)
    }

    pub fn update_property(&self, id: PropertyId, patch: PropertyPatch) -> TreeResult<()> {
        lock(&self.engine).update_property(id, patch)?;
        self.touch();
        Ok(())
    }

    pub fn remove_property(&self, id: PropertyId) -> TreeResult<usize> {
        let removed = lock(&self.engine).remove_property(id)?;
        self.touch();
        Ok(removed)
    }

    pub fn select(&self, id: Option<PropertyId>) {
        lock(&self.engine).select(id);
    }

    /// Import an external schema document, replacing the current tree.
    pub fn load_schema(&self, doc: &SchemaDocument) {
        lock(&self.engine).load_schema(doc);
        self.touch();
    }

    /// Restore the tree from the snapshot store, if a snapshot exists.
    /// The replay happens inside a loading phase so it does not
    /// immediately write back what was just read.
    pub fn load_from_store(&self) -> bool {
        let snapshot = match self.store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return false,
            Err(e) => {
                warn!(error = %e, "failed to load snapshot");
                return false;
            }
        };
        self.channels.loading.store(true, Ordering::SeqCst);
        lock(&self.engine).restore(snapshot.properties);
        lock(&self.engine).revalidate();
        self.channels.loading.store(false, Ordering::SeqCst);
        true
    }

    /// Reset the session and remove the stored snapshot. A storage
    /// failure is logged and the in-memory reset stands.
    pub fn clear(&self) {
        lock(&self.channels.validate).cancel();
        lock(&self.channels.persist).cancel();
        lock(&self.engine).clear();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear stored snapshot");
        }
    }

    /// Run any pending validation and persistence immediately (the
    /// focus-loss path).
    pub fn flush(&self) {
        lock(&self.channels.validate).flush();
        lock(&self.channels.persist).flush();
    }

    pub fn is_pending(&self) -> bool {
        lock(&self.channels.validate).is_pending() || lock(&self.channels.persist).is_pending()
    }

    /// Rearm both debounced reactions after a mutation.
    fn touch(&self) {
        lock(&self.channels.validate).schedule(self.validate_job());
        if self.channels.loading.load(Ordering::SeqCst) {
            return;
        }
        lock(&self.channels.persist).schedule(self.persist_job());
    }

    fn validate_job(&self) -> Job {
        let engine = Arc::downgrade(&self.engine);
        Arc::new(move || {
            if let Some(engine) = engine.upgrade() {
                lock(&engine).revalidate();
            }
        })
    }

    fn persist_job(&self) -> Job {
        let engine = Arc::downgrade(&self.engine);
        let store = Arc::downgrade(&self.store);
        let channels = Arc::downgrade(&self.channels);
        Arc::new(move || {
            let (Some(engine), Some(store), Some(channels)) =
                (engine.upgrade(), store.upgrade(), channels.upgrade())
            else {
                return;
            };
            // Re-check at fire time; a restore may have started since
            // this job was scheduled.
            if channels.loading.load(Ordering::SeqCst) {
                return;
            }
            let snapshot = Snapshot::capture(&lock(&engine));
            if let Err(e) = store.save(&snapshot) {
                warn!(error = %e, "failed to save snapshot");
            }
        })
    }
}

/// Default quiet period for a value field before its draft is
/// committed.
pub const VALUE_COMMIT_DELAY: Duration = Duration::from_millis(600);

/// Debounced editor for one property's value field. Keystrokes update
/// the draft and rearm the commit timer; on commit the draft is
/// converted for the property's type and applied through the session.
/// A draft that fails conversion leaves the previously committed value
/// in place.
pub struct ValueEditor {
    session: Weak<BuilderSession>,
    property: PropertyId,
    kind: PropertyType,
    draft: Arc<Mutex<String>>,
    commit: Debouncer,
}

impl ValueEditor {
    pub fn new(session: &Arc<BuilderSession>, property: PropertyId, kind: PropertyType) -> Self {
        Self::with_delay(session, property, kind, VALUE_COMMIT_DELAY)
    }

    pub fn with_delay(
        session: &Arc<BuilderSession>,
        property: PropertyId,
        kind: PropertyType,
        delay: Duration,
    ) -> Self {
        Self {
            session: Arc::downgrade(session),
            property,
            kind,
            draft: Arc::new(Mutex::new(String::new())),
            commit: Debouncer::new(delay),
        }
    }

    /// Seed the draft from an already-committed value without arming
    /// the timer.
    pub fn reset(&mut self, value: Option<&Value>) {
        *lock(&self.draft) = value.map(|v| self.kind.format(v)).unwrap_or_default();
        self.commit.cancel();
    }

    pub fn draft(&self) -> String {
        lock(&self.draft).clone()
    }

    /// Record a keystroke and rearm the commit timer.
    pub fn input(&mut self, text: impl Into<String>) {
        *lock(&self.draft) = text.into();
        let session = self.session.clone();
        let property = self.property;
        let kind = self.kind;
        let draft = Arc::clone(&self.draft);
        self.commit.schedule(Arc::new(move || {
            let Some(session) = session.upgrade() else {
                return;
            };
            let raw = lock(&draft).clone();
            let Some(value) = kind.convert(&raw) else {
                return;
            };
            if let Err(e) =
                session.update_property(property, PropertyPatch::new().value(Some(value)))
            {
                warn!(error = %e, "value commit hit a removed property");
            }
        }));
    }

    /// Commit the pending draft immediately (the blur path).
    pub fn blur(&mut self) {
        self.commit.flush();
    }

    /// The live validation message for the current draft, if any. A
    /// blank draft is an unset value, never an error.
    pub fn error(&self) -> Option<ValidationError> {
        let draft = lock(&self.draft);
        if draft.trim().is_empty() {
            return None;
        }
        validate_raw_input(&draft, self.kind)
    }
}
