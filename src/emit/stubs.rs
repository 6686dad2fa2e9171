// src/emit/stubs.rs
//
// Annotated stub emission. One stub file per finalized module, flat
// line-oriented text with EmmyLua-style annotations.

use crate::config::Options;
use crate::schema::model::{TAG_DEFINITIONS, TAG_HIDDEN};
use crate::sema::{
    ClassOutput, FieldOutput, FunctionOutput, ModuleOutput, TableOutput,
};

pub struct StubWriter<'a> {
    options: &'a Options,
}

impl<'a> StubWriter<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    /// Render one module's stub. Returns None for hidden modules.
    pub fn render(&self, module: &ModuleOutput) -> Option<String> {
        if module.tags.iter().any(|t| t == TAG_HIDDEN) {
            return None;
        }
        let definitions_only = module.tags.iter().any(|t| t == TAG_DEFINITIONS);

        let mut out = String::new();
        if definitions_only {
            out.push_str("---@meta _\n");
        } else {
            out.push_str("---@meta\n");
        }
        if let Some(prefix) = &module.prefix {
            out.push_str(prefix);
            if !prefix.ends_with('\n') {
                out.push('\n');
            }
        }

        let mut classes: Vec<&ClassOutput> = module.classes.iter().collect();
        let mut tables: Vec<&TableOutput> = module.tables.iter().collect();
        let mut functions: Vec<&FunctionOutput> = module.functions.iter().collect();
        if self.options.alphabetize {
            classes.sort_by_key(|c| c.name.to_lowercase());
            tables.sort_by_key(|t| t.name.to_lowercase());
            functions.sort_by_key(|f| f.name.to_lowercase());
        }

        for class in classes {
            out.push('\n');
            self.render_class(&mut out, class, definitions_only);
        }
        for table in tables {
            out.push('\n');
            self.render_table(&mut out, table, definitions_only);
        }
        for field in &module.fields {
            out.push('\n');
            self.render_module_field(&mut out, field, definitions_only);
        }
        for function in functions {
            out.push('\n');
            self.render_function(&mut out, function, None, false);
        }

        Some(out)
    }

    fn render_class(&self, out: &mut String, class: &ClassOutput, definitions_only: bool) {
        if let Some(notes) = &class.notes {
            for line in notes.lines() {
                out.push_str("--- ");
                out.push_str(line);
                out.push('\n');
            }
        }
        if class.deprecated {
            out.push_str("---@deprecated\n");
        }
        match &class.extends {
            Some(extends) => {
                out.push_str(&format!("---@class {} : {}\n", class.name, extends));
            }
            None => {
                out.push_str(&format!("---@class {}\n", class.name));
            }
        }

        let mut fields: Vec<&FieldOutput> = class
            .fields
            .iter()
            .chain(class.static_fields.iter())
            .collect();
        if self.options.alphabetize {
            fields.sort_by_key(|f| f.name.to_lowercase());
        }
        for field in fields {
            self.render_field(out, field);
        }

        if !definitions_only && !class.no_initializer {
            let initializer = match (&class.derive_name, &class.extends) {
                (Some(derive_name), Some(extends)) => {
                    format!("{} = {}:derive(\"{}\")\n", class.name, extends, derive_name)
                }
                _ => format!("{} = {{}}\n", class.name),
            };
            if class.is_local {
                out.push_str("local ");
            }
            out.push_str(&initializer);
        }

        let mut constructors: Vec<&FunctionOutput> = class.constructors.iter().collect();
        let mut methods: Vec<&FunctionOutput> = class.methods.iter().collect();
        let mut static_methods: Vec<&FunctionOutput> = class.static_methods.iter().collect();
        if self.options.alphabetize {
            constructors.sort_by_key(|f| f.name.to_lowercase());
            methods.sort_by_key(|f| f.name.to_lowercase());
            static_methods.sort_by_key(|f| f.name.to_lowercase());
        }
        for function in constructors {
            out.push('\n');
            self.render_function(out, function, Some(&class.name), true);
        }
        for function in methods {
            out.push('\n');
            self.render_function(out, function, Some(&class.name), true);
        }
        for function in static_methods {
            out.push('\n');
            self.render_function(out, function, Some(&class.name), false);
        }
    }

    fn render_table(&self, out: &mut String, table: &TableOutput, definitions_only: bool) {
        if let Some(notes) = &table.notes {
            for line in notes.lines() {
                out.push_str("--- ");
                out.push_str(line);
                out.push('\n');
            }
        }
        if table.deprecated {
            out.push_str("---@deprecated\n");
        }
        out.push_str(&format!("---@class {}\n", table.name));

        let mut fields: Vec<&FieldOutput> = table.fields.iter().collect();
        if self.options.alphabetize {
            fields.sort_by_key(|f| f.name.to_lowercase());
        }
        for field in fields {
            self.render_field(out, field);
        }

        if !definitions_only && !table.no_initializer {
            if table.is_local {
                out.push_str("local ");
            }
            out.push_str(&format!("{} = {{}}\n", table.name));
        }

        let mut methods: Vec<&FunctionOutput> = table.methods.iter().collect();
        if self.options.alphabetize {
            methods.sort_by_key(|f| f.name.to_lowercase());
        }
        for function in methods {
            out.push('\n');
            self.render_function(out, function, Some(&table.name), function.is_method);
        }
    }

    fn render_field(&self, out: &mut String, field: &FieldOutput) {
        if self.options.exclude_fields.contains(&field.name) {
            return;
        }
        let mut type_name = join_or_unknown(&field.types);
        if field.nullable && !type_name.contains("nil") {
            type_name.push_str("|nil");
        }
        out.push_str(&format!("---@field {} {}", field.name, type_name));
        if let Some(notes) = &field.notes {
            out.push(' ');
            out.push_str(notes);
        }
        out.push('\n');
    }

    fn render_module_field(&self, out: &mut String, field: &FieldOutput, definitions_only: bool) {
        if self.options.exclude_fields.contains(&field.name) {
            return;
        }
        let mut type_name = join_or_unknown(&field.types);
        if field.nullable && !type_name.contains("nil") {
            type_name.push_str("|nil");
        }
        if let Some(notes) = &field.notes {
            for line in notes.lines() {
                out.push_str("--- ");
                out.push_str(line);
                out.push('\n');
            }
        }
        out.push_str(&format!("---@type {}\n", type_name));
        if definitions_only {
            out.push_str(&format!("{}\n", field.name));
        } else {
            out.push_str(&format!("{} = nil\n", field.name));
        }
    }

    fn render_function(
        &self,
        out: &mut String,
        function: &FunctionOutput,
        owner: Option<&str>,
        as_method: bool,
    ) {
        if let Some(notes) = &function.notes {
            for line in notes.lines() {
                out.push_str("--- ");
                out.push_str(line);
                out.push('\n');
            }
        }
        if function.deprecated {
            out.push_str("---@deprecated\n");
        }
        for parameter in &function.parameters {
            let mut type_name = join_or_unknown(&parameter.types);
            if parameter.nullable && !type_name.contains("nil") {
                type_name.push_str("|nil");
            }
            out.push_str(&format!("---@param {} {}\n", parameter.name, type_name));
        }
        for position in &function.returns {
            out.push_str(&format!("---@return {}\n", join_or_unknown(position)));
        }

        let parameter_list: Vec<&str> = function
            .parameters
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        let signature = match owner {
            Some(owner) if as_method => {
                format!("function {}:{}({}) end\n", owner, function.name, parameter_list.join(", "))
            }
            Some(owner) => {
                format!("function {}.{}({}) end\n", owner, function.name, parameter_list.join(", "))
            }
            None => format!(
                "function {}({}) end\n",
                function.name,
                parameter_list.join(", ")
            ),
        };
        out.push_str(&signature);
    }
}

fn join_or_unknown(types: &[String]) -> String {
    if types.is_empty() {
        "unknown".to_string()
    } else {
        types.join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sema::ParameterOutput;

    fn module_with_class() -> ModuleOutput {
        ModuleOutput {
            identifier: "shared/Foo".to_string(),
            classes: vec![ClassOutput {
                name: "Foo".to_string(),
                extends: Some("Base".to_string()),
                derive_name: Some("Foo".to_string()),
                fields: vec![FieldOutput {
                    name: "x".to_string(),
                    types: vec!["number".to_string()],
                    ..FieldOutput::default()
                }],
                constructors: vec![FunctionOutput {
                    name: "new".to_string(),
                    parameters: vec![ParameterOutput {
                        name: "x".to_string(),
                        types: vec!["number".to_string()],
                        nullable: false,
                    }],
                    returns: vec![vec!["Foo".to_string()]],
                    is_constructor: true,
                    is_method: true,
                    ..FunctionOutput::default()
                }],
                ..ClassOutput::default()
            }],
            ..ModuleOutput::default()
        }
    }

    #[test]
    fn renders_derive_class_stub() {
        let options = Options::default();
        let writer = StubWriter::new(&options);
        let text = writer.render(&module_with_class()).unwrap();
        assert!(text.starts_with("---@meta\n"));
        assert!(text.contains("---@class Foo : Base\n"));
        assert!(text.contains("---@field x number\n"));
        assert!(text.contains("Foo = Base:derive(\"Foo\")\n"));
        assert!(text.contains("---@param x number\n"));
        assert!(text.contains("---@return Foo\n"));
        assert!(text.contains("function Foo:new(x) end\n"));
    }

    #[test]
    fn hidden_module_renders_nothing() {
        let options = Options::default();
        let writer = StubWriter::new(&options);
        let mut module = module_with_class();
        module.tags.push(TAG_HIDDEN.to_string());
        assert!(writer.render(&module).is_none());
    }

    #[test]
    fn definitions_only_suppresses_initializer() {
        let options = Options::default();
        let writer = StubWriter::new(&options);
        let mut module = module_with_class();
        module.tags.push(TAG_DEFINITIONS.to_string());
        let text = writer.render(&module).unwrap();
        assert!(text.starts_with("---@meta _\n"));
        assert!(!text.contains("Foo = Base:derive"));
    }

    #[test]
    fn alphabetize_orders_members() {
        let options = Options::default();
        let writer = StubWriter::new(&options);
        let module = ModuleOutput {
            identifier: "shared/m".to_string(),
            classes: vec![ClassOutput {
                name: "C".to_string(),
                static_fields: vec![
                    FieldOutput {
                        name: "zeta".to_string(),
                        types: vec!["number".to_string()],
                        ..FieldOutput::default()
                    },
                    FieldOutput {
                        name: "alpha".to_string(),
                        types: vec!["string".to_string()],
                        ..FieldOutput::default()
                    },
                ],
                ..ClassOutput::default()
            }],
            ..ModuleOutput::default()
        };
        let text = writer.render(&module).unwrap();
        let alpha = text.find("alpha").unwrap();
        let zeta = text.find("zeta").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn local_class_gets_local_binding() {
        let options = Options::default();
        let writer = StubWriter::new(&options);
        let module = ModuleOutput {
            identifier: "shared/m".to_string(),
            classes: vec![ClassOutput {
                name: "m_Helper".to_string(),
                is_local: true,
                ..ClassOutput::default()
            }],
            ..ModuleOutput::default()
        };
        let text = writer.render(&module).unwrap();
        assert!(text.contains("local m_Helper = {}\n"));
    }

    #[test]
    fn nullable_field_unions_nil() {
        let options = Options::default();
        let writer = StubWriter::new(&options);
        let module = ModuleOutput {
            identifier: "shared/m".to_string(),
            fields: vec![FieldOutput {
                name: "Count".to_string(),
                types: vec!["number".to_string()],
                nullable: true,
                ..FieldOutput::default()
            }],
            ..ModuleOutput::default()
        };
        let text = writer.render(&module).unwrap();
        assert!(text.contains("---@type number|nil\n"));
    }
}
