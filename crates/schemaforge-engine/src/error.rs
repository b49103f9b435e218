// Error types for the engine boundary

use thiserror::Error;

/// Failures at the persistence boundary. These are caught, logged, and
/// reported; in-memory state is never rolled back because of them.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Refusals from the export (clipboard-facing) surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    #[error("schema is empty; nothing to export")]
    EmptySchema,

    #[error("schema has validation errors and cannot be exported")]
    InvalidSchema,
}

pub type PersistResult<T> = Result<T, PersistError>;
