// Export gating
//
// The serialized schema leaves the engine only when the current tree
// validates cleanly and actually describes something.

use crate::engine::SchemaEngine;
use crate::error::ExportError;
use schemaforge_model::EMPTY_SCHEMA_STRING;

/// The schema string suitable for copying or downloading, or the
/// reason it cannot leave the engine yet.
pub fn exportable_schema(engine: &SchemaEngine) -> Result<String, ExportError> {
    if !engine.is_valid() {
        return Err(ExportError::InvalidSchema);
    }
    let schema = engine.schema_string();
    if schema.is_empty() || schema == EMPTY_SCHEMA_STRING {
        return Err(ExportError::EmptySchema);
    }
    Ok(schema.to_string())
}
