// Stateful engine for schemaforge
//
// Owns a live property tree and the schema derived from it, and layers
// the interactive behavior on top of the pure core: change
// notification over a watch channel, debounced auto-validation and
// auto-persistence, snapshot storage, and the export gate.

pub mod debounce;
pub mod engine;
pub mod error;
pub mod export;
pub mod persist;
pub mod session;

pub use debounce::Debouncer;
pub use engine::{EngineState, SchemaEngine};
pub use error::{ExportError, PersistError, PersistResult};
pub use export::exportable_schema;
pub use persist::{FileStore, MemoryStore, Snapshot, SnapshotStore};
pub use session::{AUTOSAVE_DELAY, BuilderSession, VALUE_COMMIT_DELAY, ValueEditor};
