// src/schema/write.rs
//
// Serialize a finalized module as a schema file.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;

use crate::errors::SchemaError;
use crate::schema::model::{
    join_types, ClassSchema, FieldSchema, FunctionSchema, LuaSchema, ParameterSchema,
    ReturnSchema, SchemaFile, TableSchema,
};
use crate::sema::{ClassOutput, FieldOutput, FunctionOutput, ModuleOutput, TableOutput};

/// Build the schema form of one finalized module.
pub fn schema_of(module: &ModuleOutput) -> SchemaFile {
    let mut lua = LuaSchema {
        tags: module.tags.clone(),
        prefix: module.prefix.clone(),
        aliases: module.aliases.clone(),
        ..LuaSchema::default()
    };

    for class in &module.classes {
        lua.classes
            .insert(class.name.clone(), class_schema(class));
    }
    for table in &module.tables {
        lua.tables.insert(table.name.clone(), table_schema(table));
    }
    for function in &module.functions {
        lua.functions.push(function_schema(function));
    }
    for field in &module.fields {
        lua.fields.insert(field.name.clone(), field_schema(field));
    }

    SchemaFile::new(lua)
}

/// Write one module's schema file under the output directory, mirroring
/// the module identifier as a path.
pub fn write_schema_file(dir: &Path, module: &ModuleOutput) -> Result<(), SchemaError> {
    let file = schema_of(module);
    let path = dir.join(format!("{}.json", module.identifier));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SchemaError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(&file).map_err(|err| SchemaError::Malformed {
        path: path.display().to_string(),
        message: err.to_string(),
    })?;
    fs::write(&path, json).map_err(|source| SchemaError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn class_schema(class: &ClassOutput) -> ClassSchema {
    ClassSchema {
        extends: class.extends.clone(),
        notes: class.notes.clone(),
        deprecated: class.deprecated,
        is_local: class.is_local,
        constructors: class.constructors.iter().map(function_schema).collect(),
        fields: field_map(&class.fields),
        static_fields: field_map(&class.static_fields),
        methods: class.methods.iter().map(function_schema).collect(),
        static_methods: class.static_methods.iter().map(function_schema).collect(),
        overloads: class.overloads.clone(),
        operators: class.operators.clone(),
        tags: class.tags.clone(),
        ..ClassSchema::default()
    }
}

fn table_schema(table: &TableOutput) -> TableSchema {
    TableSchema {
        notes: table.notes.clone(),
        deprecated: table.deprecated,
        is_local: table.is_local,
        fields: field_map(&table.fields),
        methods: table.methods.iter().map(function_schema).collect(),
        tags: table.tags.clone(),
        ..TableSchema::default()
    }
}

fn function_schema(function: &FunctionOutput) -> FunctionSchema {
    FunctionSchema {
        name: function.name.clone(),
        parameters: function
            .parameters
            .iter()
            .map(|p| ParameterSchema {
                name: p.name.clone(),
                type_name: join_types(&p.types),
                nullable: p.nullable,
                notes: None,
            })
            .collect(),
        returns: function
            .returns
            .iter()
            .map(|types| {
                let nullable = types.iter().any(|t| t == "nil");
                let kept: Vec<String> =
                    types.iter().filter(|t| *t != "nil" || types.len() == 1).cloned().collect();
                ReturnSchema {
                    type_name: join_types(&kept),
                    nullable,
                }
            })
            .collect(),
        notes: function.notes.clone(),
        deprecated: function.deprecated,
        tags: function.tags.clone(),
        overloads: function.overloads.clone(),
        ..FunctionSchema::default()
    }
}

fn field_schema(field: &FieldOutput) -> FieldSchema {
    FieldSchema {
        type_name: join_types(&field.types),
        notes: field.notes.clone(),
        nullable: field.nullable,
        tags: field.tags.clone(),
        ..FieldSchema::default()
    }
}

fn field_map(fields: &[FieldOutput]) -> IndexMap<String, FieldSchema> {
    fields
        .iter()
        .map(|f| (f.name.clone(), field_schema(f)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::ParameterOutput;

    #[test]
    fn module_output_serializes() {
        let module = ModuleOutput {
            identifier: "shared/Foo".to_string(),
            classes: vec![ClassOutput {
                name: "Foo".to_string(),
                extends: Some("Base".to_string()),
                constructors: vec![FunctionOutput {
                    name: "new".to_string(),
                    parameters: vec![ParameterOutput {
                        name: "x".to_string(),
                        types: vec!["number".to_string()],
                        nullable: false,
                    }],
                    returns: vec![vec!["Foo".to_string()]],
                    is_constructor: true,
                    ..FunctionOutput::default()
                }],
                ..ClassOutput::default()
            }],
            ..ModuleOutput::default()
        };
        let schema = schema_of(&module);
        assert_eq!(schema.version, "1.1");
        let class = &schema.languages.lua.classes["Foo"];
        assert_eq!(class.extends.as_deref(), Some("Base"));
        assert_eq!(class.constructors.len(), 1);
        assert_eq!(
            class.constructors[0].parameters[0].type_name.as_deref(),
            Some("number")
        );
    }

    #[test]
    fn nil_returns_become_nullable() {
        let function = FunctionOutput {
            name: "f".to_string(),
            returns: vec![vec!["number".to_string(), "nil".to_string()]],
            ..FunctionOutput::default()
        };
        let schema = function_schema(&function);
        assert!(schema.returns[0].nullable);
        assert_eq!(schema.returns[0].type_name.as_deref(), Some("number"));
    }

    #[test]
    fn write_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let module = ModuleOutput {
            identifier: "client/ui/Widget".to_string(),
            ..ModuleOutput::default()
        };
        write_schema_file(dir.path(), &module).unwrap();
        assert!(dir.path().join("client/ui/Widget.json").is_file());
    }
}
