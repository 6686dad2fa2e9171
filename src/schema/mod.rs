// src/schema/mod.rs
//! Machine-readable schema files: serialization model, reader with
//! version validation, writer, and the overlay merge that folds
//! hand-authored entries into the analyzed model.

pub mod merge;
pub mod model;
pub mod read;
pub mod write;

pub use merge::merge_module;
pub use model::{
    ClassSchema, FieldSchema, FunctionSchema, LuaSchema, ParameterSchema, ReturnSchema,
    SchemaFile, TableSchema, SCHEMA_VERSION, TAG_DEFINITIONS, TAG_EXTRA, TAG_HIDDEN,
    TAG_NO_INITIALIZER,
};
pub use read::{parse_schema, read_schema_dir, read_schema_file};
pub use write::{schema_of, write_schema_file};
