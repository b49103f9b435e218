// Property-tree / JSON Schema core for schemaforge
//
// This crate is the pure core of the schema builder: the in-memory
// model of nested properties, the validation rules that keep the tree
// well-formed (key grammar, sibling uniqueness, bounded depth, no
// cycles), value coercion between raw text and typed values, and the
// bidirectional transform between the property tree and a Draft-7
// style JSON Schema document. No I/O, no async; the stateful owner
// lives in schemaforge-engine.

pub mod coerce;
pub mod error;
pub mod property;
pub mod schema;
pub mod store;
pub mod transform;
pub mod validate;

pub use error::{SchemaError, SchemaResult, TreeError, TreeResult, ValidationError};
pub use property::{MAX_NESTING_DEPTH, Property, PropertyId, PropertyPatch, PropertyType};
pub use schema::{EMPTY_SCHEMA_STRING, SchemaDocument, SchemaProperty};
pub use store::PropertyStore;
pub use transform::{properties_to_schema, schema_to_properties};
pub use validate::{
    FieldErrors, PropertyField, validate_all, validate_key, validate_property,
    validate_raw_input, validate_type_name, validate_value,
};
