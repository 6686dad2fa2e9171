// src/sema/finalize.rs
//
// The finalizer: converts synthetic type markers in every resolved type
// set into user-facing names and assembles the per-module outputs the
// schema bridge and the stub emitter consume. Runs after every module has
// been analyzed; nothing in the context mutates afterwards.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::sema::context::AnalysisContext;
use crate::sema::heuristics;
use crate::sema::ids::{parse_id, IdKind};
use crate::sema::info::ExpressionInfo;
use crate::sema::model::{
    ClassOutput, FieldOutput, FunctionOutput, ModuleOutput, ParameterOutput, TableOutput,
};
use crate::sema::resolver::{resolve, Seen};
use crate::sema::types::TypeSet;

/// Field keys that are wiring, not API surface.
const HIDDEN_KEYS: &[&str] = &["__index", crate::sema::classes::ATOM_UI_MARKER];

/// Maps parameter ids back to their owning function and position.
struct ParameterIndex {
    by_id: FxHashMap<String, (String, usize)>,
}

impl ParameterIndex {
    fn build(ctx: &AnalysisContext) -> Self {
        let mut by_id = FxHashMap::default();
        for function_id in ctx.function_ids() {
            if let Some(info) = ctx.function_info(function_id) {
                for (position, parameter_id) in info.parameter_ids.iter().enumerate() {
                    by_id.insert(parameter_id.clone(), (function_id.clone(), position));
                }
            }
        }
        Self { by_id }
    }
}

pub struct Finalizer<'a> {
    ctx: &'a mut AnalysisContext,
    parameters: ParameterIndex,
}

impl<'a> Finalizer<'a> {
    pub fn new(ctx: &'a mut AnalysisContext) -> Self {
        let parameters = ParameterIndex::build(ctx);
        Self { ctx, parameters }
    }

    /// Assemble the finalized output for every analyzed module, in
    /// analysis order.
    pub fn finalize(mut self) -> Vec<ModuleOutput> {
        let identifiers: Vec<String> = self.ctx.modules.keys().cloned().collect();
        identifiers
            .into_iter()
            .filter_map(|identifier| self.finalize_module(&identifier))
            .collect()
    }

    fn finalize_module(&mut self, identifier: &str) -> Option<ModuleOutput> {
        let module = self.ctx.module(identifier, false)?;
        let resolved = module.resolved.clone()?;
        let tags = module.tags.clone();
        let prefix = module.prefix.clone();

        let mut output = ModuleOutput {
            identifier: identifier.to_string(),
            tags,
            prefix,
            ..ModuleOutput::default()
        };

        // Classes dedupe on table id; emission order is first-seen order
        let mut emitted: FxHashSet<String> = FxHashSet::default();
        for table_id in resolved.classes.iter() {
            if !emitted.insert(table_id.clone()) {
                continue;
            }
            let Some(info) = self.ctx.table_info(table_id).cloned() else {
                continue;
            };
            if info.is_empty_class || !info.is_class() {
                continue;
            }
            if info.emit_as_table {
                output.tables.push(self.table_output(table_id, &info));
            } else {
                output.classes.push(self.class_output(table_id, &info));
            }
        }

        for table_id in resolved.tables.iter() {
            if !emitted.insert(table_id.clone()) {
                continue;
            }
            let Some(info) = self.ctx.table_info(table_id).cloned() else {
                continue;
            };
            if info.is_empty_class {
                continue;
            }
            output.tables.push(self.table_output(table_id, &info));
        }

        for function in &resolved.functions {
            let name = function.name.clone();
            if let Some(mut finalized) = self.function_output(&function.function_id, &name) {
                finalized.is_method = false;
                output.functions.push(finalized);
            }
        }

        // A global assigned more than once folds into one field
        let mut field_types: indexmap::IndexMap<String, Vec<String>> =
            indexmap::IndexMap::new();
        for field in &resolved.fields {
            let types = self.finalize_types(&field.types);
            let entry = field_types.entry(field.name.clone()).or_default();
            for ty in types {
                if !entry.contains(&ty) {
                    entry.push(ty);
                }
            }
        }
        for (name, mut types) in field_types {
            if types.len() > 1 {
                types.retain(|t| t != "unknown");
            }
            output.fields.push(make_field(name, types));
        }

        for position in &resolved.returns {
            output.returns.push(self.finalize_types(position));
        }

        Some(output)
    }

    fn class_output(
        &mut self,
        table_id: &str,
        info: &crate::sema::info::TableInfo,
    ) -> ClassOutput {
        let mut output = ClassOutput {
            name: info.class_name.clone().unwrap_or_default(),
            extends: info.extends.clone(),
            derive_name: info.derive_name.clone(),
            is_local: info.is_local_class,
            emit_as_table: info.emit_as_table,
            ..ClassOutput::default()
        };

        let members = self.members_of(table_id, info);
        for member in members {
            match member {
                Member::Constructor(function) => output.constructors.push(function),
                Member::Method(function) => output.methods.push(function),
                Member::StaticMethod(function) => output.static_methods.push(function),
                Member::Field(field) => output.fields.push(field),
                Member::StaticField(field) => output.static_fields.push(field),
            }
        }
        output
    }

    fn table_output(
        &mut self,
        table_id: &str,
        info: &crate::sema::info::TableInfo,
    ) -> TableOutput {
        let mut output = TableOutput {
            name: info
                .class_name
                .clone()
                .or_else(|| info.original_name.clone())
                .unwrap_or_default(),
            is_local: info.is_local_class,
            ..TableOutput::default()
        };
        for member in self.members_of(table_id, info) {
            match member {
                Member::Constructor(function)
                | Member::Method(function)
                | Member::StaticMethod(function) => output.methods.push(function),
                Member::Field(field) | Member::StaticField(field) => output.fields.push(field),
            }
        }
        output
    }

    fn members_of(
        &mut self,
        _table_id: &str,
        info: &crate::sema::info::TableInfo,
    ) -> Vec<Member> {
        let mut members = Vec::new();
        for (key, definitions) in info.definitions.iter() {
            if HIDDEN_KEYS.contains(&key.as_str()) {
                continue;
            }
            let member = self.member_of(key, definitions);
            if let Some(member) = member {
                members.push(member);
            }
        }
        members
    }

    fn member_of(&mut self, key: &str, definitions: &[ExpressionInfo]) -> Option<Member> {
        // A function definition anywhere in the list makes this a method
        let function_id = definitions.iter().find_map(|def| {
            match self.ctx.exprs.get(def.expression) {
                crate::sema::expr::Expression::Literal(lit) => lit.function_id.clone(),
                _ => None,
            }
        });

        if let Some(function_id) = function_id {
            let output = self.function_output(&function_id, key)?;
            let info = self.ctx.function_info(&function_id)?;
            let is_instance = definitions.iter().any(|d| d.instance);
            return Some(if info.is_constructor {
                Member::Constructor(output)
            } else if info.is_method || is_instance {
                Member::Method(output)
            } else {
                Member::StaticMethod(output)
            });
        }

        // Value field: union every definition
        let mut types = TypeSet::default();
        for def in definitions {
            let mut seen = Seen::default();
            let resolved = resolve(self.ctx, def.expression, def.index.unwrap_or(1), &mut seen);
            types.extend(resolved);
        }
        let finalized = self.finalize_types(&types);
        let is_instance = definitions.iter().any(|d| d.instance);
        let field = make_field(key.to_string(), finalized);
        Some(if is_instance {
            Member::Field(field)
        } else {
            Member::StaticField(field)
        })
    }

    fn function_output(&mut self, function_id: &str, name: &str) -> Option<FunctionOutput> {
        let info = self.ctx.function_info(function_id)?.clone();

        let heuristic_types = if self.ctx.options.heuristics {
            heuristics::parameter_types(&info.parameter_names)
        } else {
            vec![None; info.parameter_names.len()]
        };

        let mut parameters = Vec::new();
        for (position, parameter_name) in info.parameter_names.iter().enumerate() {
            let accumulated = info
                .parameter_types
                .get(position)
                .cloned()
                .unwrap_or_default();
            let mut types = self.finalize_types(&accumulated);
            if types == vec!["unknown".to_string()] {
                if let Some(Some(heuristic)) = heuristic_types.get(position) {
                    types = vec![heuristic.to_string()];
                }
            }
            let nullable = strip_nil(&mut types);
            parameters.push(ParameterOutput {
                name: parameter_name.clone(),
                types,
                nullable,
            });
        }

        let returns: Vec<Vec<String>> = info
            .return_types
            .iter()
            .map(|set| self.finalize_types(set))
            .collect();

        Some(FunctionOutput {
            name: name.to_string(),
            parameters,
            returns,
            is_method: info.is_method,
            is_constructor: info.is_constructor,
            ..FunctionOutput::default()
        })
    }

    /// Convert a type set to user-facing names: table markers become class
    /// names (or drop), function markers the `function` label, parameter
    /// and instance markers resolve through their owners, leftovers become
    /// `unknown`.
    pub fn finalize_types(&mut self, types: &TypeSet) -> Vec<String> {
        let mut active = FxHashSet::default();
        let mut out = Vec::new();
        for ty in types {
            self.finalize_one(ty, &mut out, &mut active, 0);
        }
        out.dedup();
        if out.is_empty() {
            out.push("unknown".to_string());
        }
        out
    }

    fn finalize_one(
        &mut self,
        ty: &str,
        out: &mut Vec<String>,
        active: &mut FxHashSet<String>,
        depth: usize,
    ) {
        if depth > 8 || !active.insert(ty.to_string()) {
            return;
        }

        let push = |out: &mut Vec<String>, value: String| {
            if !out.contains(&value) {
                out.push(value);
            }
        };

        match parse_id(ty) {
            None => match ty {
                "true" | "false" => push(out, "boolean".to_string()),
                other => push(out, other.to_string()),
            },
            Some(parsed) => match parsed.kind {
                IdKind::Table => {
                    let name = self
                        .ctx
                        .table_info(ty)
                        .filter(|info| !info.is_empty_class)
                        .and_then(|info| info.class_name.clone());
                    if let Some(name) = name {
                        push(out, name);
                    }
                    // Un-promoted tables drop out of the set
                }
                IdKind::Function => push(out, "function".to_string()),
                IdKind::Parameter => {
                    let resolved = self
                        .parameters
                        .by_id
                        .get(ty)
                        .cloned()
                        .and_then(|(function_id, position)| {
                            self.ctx
                                .function_info(&function_id)
                                .and_then(|info| info.parameter_types.get(position).cloned())
                        });
                    match resolved {
                        Some(set) if !set.is_empty() => {
                            for inner in &set {
                                self.finalize_one(inner, out, active, depth + 1);
                            }
                        }
                        _ => push(out, "unknown".to_string()),
                    }
                }
                IdKind::SelfParam | IdKind::Instance | IdKind::Local => {
                    let definitions = self.ctx.definitions_of(ty).map(|d| d.to_vec());
                    match definitions {
                        Some(definitions) if !definitions.is_empty() => {
                            let before = out.len();
                            for def in definitions {
                                let mut seen = Seen::default();
                                let resolved = resolve(
                                    self.ctx,
                                    def.expression,
                                    def.index.unwrap_or(1),
                                    &mut seen,
                                );
                                for inner in &resolved {
                                    self.finalize_one(inner, out, active, depth + 1);
                                }
                            }
                            if out.len() == before {
                                push(out, "unknown".to_string());
                            }
                        }
                        _ => push(out, "unknown".to_string()),
                    }
                }
                IdKind::Module => {}
            },
        }

        active.remove(ty);
    }
}

enum Member {
    Constructor(FunctionOutput),
    Method(FunctionOutput),
    StaticMethod(FunctionOutput),
    Field(FieldOutput),
    StaticField(FieldOutput),
}

fn make_field(name: String, mut types: Vec<String>) -> FieldOutput {
    let nullable = strip_nil(&mut types);
    FieldOutput {
        name,
        types,
        nullable,
        ..FieldOutput::default()
    }
}

/// Remove nil from a finalized list, reporting whether it was present.
/// A list that was only nil keeps it.
fn strip_nil(types: &mut Vec<String>) -> bool {
    let had_nil = types.iter().any(|t| t == "nil");
    if had_nil && types.len() > 1 {
        types.retain(|t| t != "nil");
    }
    had_nil
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::frontend::Parser;
    use crate::sema::reader::read_module;

    fn finalize(files: &[(&str, &str)]) -> Vec<ModuleOutput> {
        let mut ctx = AnalysisContext::new(Options::default());
        for (identifier, source) in files {
            let chunk = Parser::new(source).parse_chunk().expect("parse failed");
            read_module(&mut ctx, identifier, &chunk);
        }
        Finalizer::new(&mut ctx).finalize()
    }

    #[test]
    fn derive_class_is_finalized() {
        let output = finalize(&[(
            "shared/Foo",
            "Foo = Base:derive(\"Foo\")\nfunction Foo:new(x)\n local o = Base.new(self)\n o.x = x\n return o\nend",
        )]);
        let module = &output[0];
        assert_eq!(module.classes.len(), 1);
        let class = &module.classes[0];
        assert_eq!(class.name, "Foo");
        assert_eq!(class.extends.as_deref(), Some("Base"));
        assert_eq!(class.derive_name.as_deref(), Some("Foo"));
        assert_eq!(class.constructors.len(), 1);
        let constructor = &class.constructors[0];
        assert!(constructor.is_constructor);
        assert_eq!(constructor.returns.len(), 1);
        assert_eq!(constructor.returns[0], vec!["Foo".to_string()]);
        // o.x = x lands as an instance field
        assert!(class.fields.iter().any(|f| f.name == "x"));
    }

    #[test]
    fn table_markers_without_class_drop_to_unknown() {
        let output = finalize(&[("shared/m", "G = {}")]);
        let module = &output[0];
        assert_eq!(module.tables.len(), 1);
        assert_eq!(module.tables[0].name, "G");
    }

    #[test]
    fn function_label_for_function_markers() {
        let output = finalize(&[(
            "shared/m",
            "function helper() return 1 end\nG = helper",
        )]);
        let module = &output[0];
        let field = module.fields.iter().find(|f| f.name == "G").unwrap();
        assert_eq!(field.types, vec!["function".to_string()]);
    }

    #[test]
    fn min_arity_nullability_reaches_output() {
        let output = finalize(&[(
            "shared/m",
            "function f(flag)\n if flag then return 1, 2 end\n return 1\nend",
        )]);
        let module = &output[0];
        let function = module.functions.iter().find(|f| f.name == "f").unwrap();
        assert_eq!(function.returns.len(), 2);
        assert!(function.returns[1].contains(&"nil".to_string()));
        assert!(!function.returns[0].contains(&"nil".to_string()));
    }

    #[test]
    fn heuristics_fill_unconstrained_parameters() {
        let output = finalize(&[("shared/m", "function draw(dx, dy, label) end")]);
        let module = &output[0];
        let function = module.functions.iter().find(|f| f.name == "draw").unwrap();
        assert_eq!(function.parameters[0].types, vec!["number".to_string()]);
        assert_eq!(function.parameters[1].types, vec!["number".to_string()]);
        assert_eq!(function.parameters[2].types, vec!["unknown".to_string()]);
    }

    #[test]
    fn boolean_literals_collapse_in_output() {
        let output = finalize(&[("shared/m", "function f(x)\n return x == nil\nend")]);
        let module = &output[0];
        let function = module.functions.iter().find(|f| f.name == "f").unwrap();
        assert_eq!(function.returns[0], vec!["boolean".to_string()]);
    }
}
