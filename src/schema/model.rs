// src/schema/model.rs
//
// The serialized schema format. Version 1.1; one file per module
// identifier. Hand-authored overrides use the same shape the writer
// produces, so the two merge cleanly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: &str = "1.1";

/// File-level tag: the module is a definition-only stub (`---@meta _`,
/// no initializers).
pub const TAG_DEFINITIONS: &str = "StubGen_Definitions";
/// File-level tag: suppress stub emission entirely.
pub const TAG_HIDDEN: &str = "StubGen_Hidden";
/// Class/table tag: suppress the initializer line.
pub const TAG_NO_INITIALIZER: &str = "StubGen_NoInitializer";
/// Entry tag: hand-authored, unmanaged by the analyzer.
pub const TAG_EXTRA: &str = "StubGen_Extra";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFile {
    pub version: String,
    pub languages: Languages,
}

impl SchemaFile {
    pub fn new(lua: LuaSchema) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            languages: Languages { lua },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Languages {
    pub lua: LuaSchema,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LuaSchema {
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub aliases: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub classes: IndexMap<String, ClassSchema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tables: IndexMap<String, TableSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<FunctionSchema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Raw text emitted near the top of the stub
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mutable: bool,
    #[serde(default, rename = "local", skip_serializing_if = "std::ops::Not::not")]
    pub is_local: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constructors: Vec<FunctionSchema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub static_fields: IndexMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<FunctionSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_methods: Vec<FunctionSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operators: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Like a class, but with no constructors or base class.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mutable: bool,
    #[serde(default, rename = "local", skip_serializing_if = "std::ops::Not::not")]
    pub is_local: bool,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub static_fields: IndexMap<String, FieldSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<FunctionSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub static_methods: Vec<FunctionSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operators: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSchema>,
    #[serde(default, rename = "return", skip_serializing_if = "Vec::is_empty")]
    pub returns: Vec<ReturnSchema>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overloads: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSchema {
    pub name: String,
    /// Union type, `|`-joined
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSchema {
    /// Union type, `|`-joined
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    /// Union type, `|`-joined
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Join a finalized type list into the schema's `|`-union form.
pub fn join_types(types: &[String]) -> Option<String> {
    if types.is_empty() {
        None
    } else {
        Some(types.join("|"))
    }
}

/// Split a schema union back into a type list.
pub fn split_types(joined: &str) -> Vec<String> {
    joined
        .split('|')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_minimal_file() {
        let mut lua = LuaSchema::default();
        lua.classes.insert(
            "Foo".to_string(),
            ClassSchema {
                extends: Some("Base".to_string()),
                ..ClassSchema::default()
            },
        );
        let file = SchemaFile::new(lua);
        let json = serde_json::to_string_pretty(&file).unwrap();
        let back: SchemaFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.version, SCHEMA_VERSION);
        assert_eq!(
            back.languages.lua.classes["Foo"].extends.as_deref(),
            Some("Base")
        );
    }

    #[test]
    fn return_field_uses_lua_keyword() {
        let function = FunctionSchema {
            name: "f".to_string(),
            returns: vec![ReturnSchema {
                type_name: Some("number".to_string()),
                nullable: false,
            }],
            ..FunctionSchema::default()
        };
        let json = serde_json::to_string(&function).unwrap();
        assert!(json.contains("\"return\""));
        assert!(!json.contains("\"returns\""));
    }

    #[test]
    fn camel_case_static_fields() {
        let mut class = ClassSchema::default();
        class.static_fields.insert(
            "MAX".to_string(),
            FieldSchema {
                type_name: Some("number".to_string()),
                ..FieldSchema::default()
            },
        );
        let json = serde_json::to_string(&class).unwrap();
        assert!(json.contains("staticFields"));
    }

    #[test]
    fn split_and_join_types() {
        assert_eq!(join_types(&[]), None);
        assert_eq!(
            join_types(&["number".to_string(), "nil".to_string()]),
            Some("number|nil".to_string())
        );
        assert_eq!(split_types("number | nil"), vec!["number", "nil"]);
    }
}
