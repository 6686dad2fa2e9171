// src/schema/merge.rs
//
// Overlay merge: hand-authored schema entries refine and extend the
// analyzed model. Schema types win when `keep-types` or `rosetta-only`
// is set or when the analysis came up with `unknown`; schema-only
// entries are injected when `inject` is set; mismatches warn and never
// interrupt.

use crate::config::Options;
use crate::errors::AnalysisWarning;
use crate::schema::model::{
    split_types, ClassSchema, FieldSchema, FunctionSchema, SchemaFile, TableSchema, TAG_EXTRA,
};
use crate::sema::{
    ClassOutput, FieldOutput, FunctionOutput, ModuleOutput, ParameterOutput, TableOutput,
};

/// Merge one module's schema overlay into its analyzed output.
pub fn merge_module(
    module: &mut ModuleOutput,
    schema: &SchemaFile,
    options: &Options,
) -> Vec<AnalysisWarning> {
    let mut warnings = Vec::new();
    let lua = &schema.languages.lua;

    for tag in &lua.tags {
        if !module.tags.contains(tag) {
            module.tags.push(tag.clone());
        }
    }
    if lua.prefix.is_some() {
        module.prefix = lua.prefix.clone();
    }
    module.aliases = lua.aliases.clone();

    // Classes
    let mut merged_classes = Vec::new();
    for class in &mut module.classes {
        if let Some(entry) = lua.classes.get(&class.name) {
            merged_classes.push(class.name.clone());
            merge_class(class, entry, options, &mut warnings);
        }
        apply_field_filters(&mut class.fields, options);
        apply_field_filters(&mut class.static_fields, options);
    }
    for (name, entry) in &lua.classes {
        if merged_classes.iter().any(|m| m == name) {
            continue;
        }
        if options.inject || entry.tags.iter().any(|t| t == TAG_EXTRA) {
            module.classes.push(class_from_schema(name, entry));
        } else {
            warnings.push(AnalysisWarning::UnknownSchemaEntry {
                name: name.clone(),
                module: module.identifier.clone(),
            });
        }
    }

    // Tables
    let mut merged_tables = Vec::new();
    for table in &mut module.tables {
        if let Some(entry) = lua.tables.get(&table.name) {
            merged_tables.push(table.name.clone());
            merge_table(table, entry, options, &mut warnings);
        }
        apply_field_filters(&mut table.fields, options);
    }
    for (name, entry) in &lua.tables {
        if merged_tables.iter().any(|m| m == name) {
            continue;
        }
        if options.inject || entry.tags.iter().any(|t| t == TAG_EXTRA) {
            module.tables.push(table_from_schema(name, entry));
        } else {
            warnings.push(AnalysisWarning::UnknownSchemaEntry {
                name: name.clone(),
                module: module.identifier.clone(),
            });
        }
    }

    // Module-level functions
    let mut merged_functions = Vec::new();
    for function in &mut module.functions {
        if let Some(entry) = lua.functions.iter().find(|f| f.name == function.name) {
            merged_functions.push(function.name.clone());
            merge_function(function, entry, options, &mut warnings);
        }
    }
    for entry in &lua.functions {
        if merged_functions.iter().any(|m| *m == entry.name) {
            continue;
        }
        if options.inject || entry.tags.iter().any(|t| t == TAG_EXTRA) {
            module.functions.push(function_from_schema(entry));
        } else {
            warnings.push(AnalysisWarning::UnknownSchemaEntry {
                name: entry.name.clone(),
                module: module.identifier.clone(),
            });
        }
    }

    // Module-level fields
    let mut merged_fields = Vec::new();
    for field in &mut module.fields {
        if let Some(entry) = lua.fields.get(&field.name) {
            merged_fields.push(field.name.clone());
            merge_field(field, entry, options);
        }
    }
    if options.delete_unknown {
        module
            .fields
            .retain(|f| !is_unknown(&f.types) || merged_fields.iter().any(|m| *m == f.name));
    }
    for (name, entry) in &lua.fields {
        if merged_fields.iter().any(|m| m == name) {
            continue;
        }
        if options.inject || entry.tags.iter().any(|t| t == TAG_EXTRA) {
            module.fields.push(field_from_schema(name, entry));
        }
    }

    warnings
}

fn merge_class(
    class: &mut ClassOutput,
    entry: &ClassSchema,
    options: &Options,
    warnings: &mut Vec<AnalysisWarning>,
) {
    if entry.extends.is_some() {
        class.extends = entry.extends.clone();
    }
    if entry.notes.is_some() {
        class.notes = entry.notes.clone();
    }
    class.deprecated |= entry.deprecated;
    for tag in &entry.tags {
        if !class.tags.contains(tag) {
            class.tags.push(tag.clone());
        }
    }
    class.no_initializer |= entry
        .tags
        .iter()
        .any(|t| t == crate::schema::model::TAG_NO_INITIALIZER);
    class.overloads = entry.overloads.clone();
    class.operators = entry.operators.clone();

    merge_field_list(&mut class.fields, &entry.fields, options);
    merge_field_list(&mut class.static_fields, &entry.static_fields, options);

    if options.delete_unknown {
        class
            .static_fields
            .retain(|f| !is_unknown(&f.types) || entry.static_fields.contains_key(&f.name));
    }
    if options.strict_fields
        && (!entry.fields.is_empty() || !entry.static_fields.is_empty())
    {
        class.static_fields.retain(|f| {
            entry.static_fields.contains_key(&f.name)
                || entry.fields.contains_key(&f.name)
                || !is_unknown(&f.types)
        });
    }

    merge_function_list(&mut class.constructors, &entry.constructors, options, warnings);
    merge_function_list(&mut class.methods, &entry.methods, options, warnings);
    merge_function_list(
        &mut class.static_methods,
        &entry.static_methods,
        options,
        warnings,
    );

    // A schema constructor with no analyzed counterpart stays as given
    for schema_constructor in &entry.constructors {
        let known = class
            .constructors
            .iter()
            .any(|c| c.name == schema_constructor.name);
        if !known {
            if options.rosetta_only {
                warnings.push(AnalysisWarning::MissingAnalyzedConstructor {
                    name: format!("{}:{}", class.name, schema_constructor.name),
                });
            }
            class
                .constructors
                .push(function_from_schema(schema_constructor));
        }
    }
}

fn merge_table(
    table: &mut TableOutput,
    entry: &TableSchema,
    options: &Options,
    warnings: &mut Vec<AnalysisWarning>,
) {
    if entry.notes.is_some() {
        table.notes = entry.notes.clone();
    }
    table.deprecated |= entry.deprecated;
    for tag in &entry.tags {
        if !table.tags.contains(tag) {
            table.tags.push(tag.clone());
        }
    }
    table.no_initializer |= entry
        .tags
        .iter()
        .any(|t| t == crate::schema::model::TAG_NO_INITIALIZER);

    merge_field_list(&mut table.fields, &entry.fields, options);
    if options.delete_unknown {
        table
            .fields
            .retain(|f| !is_unknown(&f.types) || entry.fields.contains_key(&f.name));
    }
    merge_function_list(&mut table.methods, &entry.methods, options, warnings);
}

fn merge_function(
    function: &mut FunctionOutput,
    entry: &FunctionSchema,
    options: &Options,
    warnings: &mut Vec<AnalysisWarning>,
) {
    if entry.notes.is_some() {
        function.notes = entry.notes.clone();
    }
    function.deprecated |= entry.deprecated;
    for tag in &entry.tags {
        if !function.tags.contains(tag) {
            function.tags.push(tag.clone());
        }
    }
    function.overloads = entry.overloads.clone();

    if !entry.parameters.is_empty() && entry.parameters.len() != function.parameters.len() {
        warnings.push(AnalysisWarning::ArityMismatch {
            name: function.name.clone(),
            schema: entry.parameters.len(),
            analyzed: function.parameters.len(),
        });
    }
    for (parameter, schema) in function.parameters.iter_mut().zip(&entry.parameters) {
        if let Some(type_name) = &schema.type_name {
            if type_wins(&parameter.types, options) {
                parameter.types = split_types(type_name);
            }
        }
        parameter.nullable |= schema.nullable;
    }

    for (position, schema) in entry.returns.iter().enumerate() {
        if position >= function.returns.len() {
            function
                .returns
                .push(schema.type_name.as_deref().map(split_types).unwrap_or_default());
            continue;
        }
        if let Some(type_name) = &schema.type_name {
            if type_wins(&function.returns[position], options) {
                function.returns[position] = split_types(type_name);
            }
        }
        if schema.nullable && !function.returns[position].iter().any(|t| t == "nil") {
            function.returns[position].push("nil".to_string());
        }
    }
}

fn merge_field(field: &mut FieldOutput, entry: &FieldSchema, options: &Options) {
    if let Some(type_name) = &entry.type_name {
        if type_wins(&field.types, options) {
            field.types = split_types(type_name);
        }
    }
    if entry.notes.is_some() {
        field.notes = entry.notes.clone();
    }
    field.nullable |= entry.nullable;
    for tag in &entry.tags {
        if !field.tags.contains(tag) {
            field.tags.push(tag.clone());
        }
    }
}

fn merge_field_list(
    fields: &mut [FieldOutput],
    entries: &indexmap::IndexMap<String, FieldSchema>,
    options: &Options,
) {
    for field in fields.iter_mut() {
        if let Some(entry) = entries.get(&field.name) {
            merge_field(field, entry, options);
        }
    }
}

fn merge_function_list(
    functions: &mut [FunctionOutput],
    entries: &[FunctionSchema],
    options: &Options,
    warnings: &mut Vec<AnalysisWarning>,
) {
    for function in functions.iter_mut() {
        if let Some(entry) = entries.iter().find(|e| e.name == function.name) {
            merge_function(function, entry, options, warnings);
        }
    }
}

/// Whether a schema type overrides the analyzed one.
fn type_wins(analyzed: &[String], options: &Options) -> bool {
    options.keep_types || options.rosetta_only || is_unknown(analyzed)
}

fn is_unknown(types: &[String]) -> bool {
    types.is_empty() || types.iter().all(|t| t == "unknown")
}

// ----- schema-only entries, injected into the model -----

fn class_from_schema(name: &str, entry: &ClassSchema) -> ClassOutput {
    ClassOutput {
        name: name.to_string(),
        extends: entry.extends.clone(),
        is_local: entry.is_local,
        notes: entry.notes.clone(),
        deprecated: entry.deprecated,
        no_initializer: entry
            .tags
            .iter()
            .any(|t| t == crate::schema::model::TAG_NO_INITIALIZER),
        tags: entry.tags.clone(),
        overloads: entry.overloads.clone(),
        operators: entry.operators.clone(),
        fields: fields_from_schema(&entry.fields),
        static_fields: fields_from_schema(&entry.static_fields),
        methods: entry.methods.iter().map(function_from_schema).collect(),
        static_methods: entry
            .static_methods
            .iter()
            .map(function_from_schema)
            .collect(),
        constructors: entry.constructors.iter().map(function_from_schema).collect(),
        ..ClassOutput::default()
    }
}

fn table_from_schema(name: &str, entry: &TableSchema) -> TableOutput {
    TableOutput {
        name: name.to_string(),
        is_local: entry.is_local,
        notes: entry.notes.clone(),
        deprecated: entry.deprecated,
        no_initializer: entry
            .tags
            .iter()
            .any(|t| t == crate::schema::model::TAG_NO_INITIALIZER),
        tags: entry.tags.clone(),
        fields: fields_from_schema(&entry.fields),
        methods: entry.methods.iter().map(function_from_schema).collect(),
    }
}

fn function_from_schema(entry: &FunctionSchema) -> FunctionOutput {
    FunctionOutput {
        name: entry.name.clone(),
        parameters: entry
            .parameters
            .iter()
            .map(|p| ParameterOutput {
                name: p.name.clone(),
                types: p.type_name.as_deref().map(split_types).unwrap_or_default(),
                nullable: p.nullable,
            })
            .collect(),
        returns: entry
            .returns
            .iter()
            .map(|r| {
                let mut types =
                    r.type_name.as_deref().map(split_types).unwrap_or_default();
                if r.nullable && !types.iter().any(|t| t == "nil") {
                    types.push("nil".to_string());
                }
                types
            })
            .collect(),
        notes: entry.notes.clone(),
        deprecated: entry.deprecated,
        tags: entry.tags.clone(),
        overloads: entry.overloads.clone(),
        ..FunctionOutput::default()
    }
}

fn field_from_schema(name: &str, entry: &FieldSchema) -> FieldOutput {
    FieldOutput {
        name: name.to_string(),
        types: entry.type_name.as_deref().map(split_types).unwrap_or_default(),
        nullable: entry.nullable,
        notes: entry.notes.clone(),
        tags: entry.tags.clone(),
    }
}

fn fields_from_schema(entries: &indexmap::IndexMap<String, FieldSchema>) -> Vec<FieldOutput> {
    entries
        .iter()
        .map(|(name, entry)| field_from_schema(name, entry))
        .collect()
}

fn apply_field_filters(fields: &mut Vec<FieldOutput>, options: &Options) {
    if options.exclude_fields.is_empty() {
        return;
    }
    fields.retain(|f| !options.exclude_fields.contains(&f.name));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::ReturnSchema;

    fn schema_with_class(class: ClassSchema) -> SchemaFile {
        let mut lua = crate::schema::model::LuaSchema::default();
        lua.classes.insert("Foo".to_string(), class);
        SchemaFile::new(lua)
    }

    fn analyzed_module() -> ModuleOutput {
        ModuleOutput {
            identifier: "shared/Foo".to_string(),
            classes: vec![ClassOutput {
                name: "Foo".to_string(),
                static_fields: vec![FieldOutput {
                    name: "count".to_string(),
                    types: vec!["unknown".to_string()],
                    ..FieldOutput::default()
                }],
                ..ClassOutput::default()
            }],
            ..ModuleOutput::default()
        }
    }

    #[test]
    fn schema_type_fills_unknown_field() {
        let mut module = analyzed_module();
        let mut class = ClassSchema::default();
        class.static_fields.insert(
            "count".to_string(),
            FieldSchema {
                type_name: Some("number".to_string()),
                ..FieldSchema::default()
            },
        );
        let schema = schema_with_class(class);
        let warnings = merge_module(&mut module, &schema, &Options::default());
        assert!(warnings.is_empty());
        assert_eq!(
            module.classes[0].static_fields[0].types,
            vec!["number".to_string()]
        );
    }

    #[test]
    fn keep_types_overrides_inferred() {
        let mut module = analyzed_module();
        module.classes[0].static_fields[0].types = vec!["string".to_string()];
        let mut class = ClassSchema::default();
        class.static_fields.insert(
            "count".to_string(),
            FieldSchema {
                type_name: Some("number".to_string()),
                ..FieldSchema::default()
            },
        );
        let schema = schema_with_class(class);

        // Without keep-types, the inferred string survives
        let mut kept = module.clone();
        merge_module(&mut kept, &schema, &Options::default());
        assert_eq!(kept.classes[0].static_fields[0].types, vec!["string"]);

        let with_keep = Options {
            keep_types: true,
            ..Options::default()
        };
        merge_module(&mut module, &schema, &with_keep);
        assert_eq!(module.classes[0].static_fields[0].types, vec!["number"]);
    }

    #[test]
    fn inject_appends_schema_only_class() {
        let mut module = ModuleOutput {
            identifier: "shared/m".to_string(),
            ..ModuleOutput::default()
        };
        let schema = schema_with_class(ClassSchema::default());
        merge_module(&mut module, &schema, &Options::default());
        assert_eq!(module.classes.len(), 1);
        assert_eq!(module.classes[0].name, "Foo");
    }

    #[test]
    fn no_inject_warns_instead() {
        let mut module = ModuleOutput {
            identifier: "shared/m".to_string(),
            ..ModuleOutput::default()
        };
        let schema = schema_with_class(ClassSchema::default());
        let options = Options {
            inject: false,
            ..Options::default()
        };
        let warnings = merge_module(&mut module, &schema, &options);
        assert!(module.classes.is_empty());
        assert!(matches!(
            warnings.as_slice(),
            [AnalysisWarning::UnknownSchemaEntry { .. }]
        ));
    }

    #[test]
    fn arity_mismatch_warns_and_keeps_analysis() {
        let mut module = ModuleOutput {
            identifier: "shared/m".to_string(),
            functions: vec![FunctionOutput {
                name: "f".to_string(),
                parameters: vec![ParameterOutput {
                    name: "a".to_string(),
                    types: vec!["number".to_string()],
                    nullable: false,
                }],
                ..FunctionOutput::default()
            }],
            ..ModuleOutput::default()
        };
        let mut lua = crate::schema::model::LuaSchema::default();
        lua.functions.push(FunctionSchema {
            name: "f".to_string(),
            parameters: vec![
                crate::schema::model::ParameterSchema {
                    name: "a".to_string(),
                    type_name: Some("string".to_string()),
                    ..Default::default()
                },
                crate::schema::model::ParameterSchema {
                    name: "b".to_string(),
                    ..Default::default()
                },
            ],
            returns: vec![ReturnSchema::default()],
            ..FunctionSchema::default()
        });
        let schema = SchemaFile::new(lua);
        let warnings = merge_module(&mut module, &schema, &Options::default());
        assert!(matches!(
            warnings.as_slice(),
            [AnalysisWarning::ArityMismatch { schema: 2, analyzed: 1, .. }]
        ));
        // The inferred number is kept (not unknown, keep-types off)
        assert_eq!(module.functions[0].parameters[0].types, vec!["number"]);
    }

    #[test]
    fn delete_unknown_drops_unlisted_fields() {
        let mut module = ModuleOutput {
            identifier: "shared/m".to_string(),
            fields: vec![
                FieldOutput {
                    name: "known".to_string(),
                    types: vec!["number".to_string()],
                    ..FieldOutput::default()
                },
                FieldOutput {
                    name: "mystery".to_string(),
                    types: vec!["unknown".to_string()],
                    ..FieldOutput::default()
                },
            ],
            ..ModuleOutput::default()
        };
        let schema = SchemaFile::new(crate::schema::model::LuaSchema::default());
        merge_module(&mut module, &schema, &Options::default());
        let names: Vec<&str> = module.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["known"]);
    }
}
