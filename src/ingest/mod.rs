//! Go source ingestion.
//!
//! Uses tree-sitter-go to parse source files and converts the concrete
//! syntax tree into the crate's own AST ([`goast`]). Two parse modes are
//! offered: an imports-only fast path for dependency resolution, and a
//! full mode that additionally lifts the type skeleton of every top-level
//! declaration for the API analyser.

pub mod goast;

use std::path::PathBuf;

use tree_sitter::Node;

use crate::error::{CarveError, Result};
use goast::{Decl, FuncDecl, ImportSpec, Loc, SourceFile, Span, TypeExpr, TypeSpec, ValueSpec};

/// How much of a file to lift into the AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Package clause and import table only.
    ImportsOnly,
    /// Imports plus the top-level declaration skeleton.
    Full,
}

/// Parse a Go source file.
///
/// Files that tree-sitter cannot parse without ERROR nodes are rejected:
/// the pipeline refuses to analyse or rewrite source it does not fully
/// understand.
pub fn parse_source(path: &str, source: &[u8], mode: ParseMode) -> Result<SourceFile> {
    let text = std::str::from_utf8(source)
        .map_err(|e| CarveError::Parse {
            file: PathBuf::from(path),
            message: format!("source is not valid UTF-8: {e}"),
        })?
        .to_string();

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_go::language())
        .map_err(|e| CarveError::Parse {
            file: PathBuf::from(path),
            message: format!("failed to set Go language: {e:?}"),
        })?;

    let tree = parser.parse(&text, None).ok_or_else(|| CarveError::Parse {
        file: PathBuf::from(path),
        message: "parse failed - no tree returned".to_string(),
    })?;

    let root = tree.root_node();
    if root.has_error() {
        return Err(CarveError::Parse {
            file: PathBuf::from(path),
            message: "syntax errors detected".to_string(),
        });
    }

    let conv = Converter { path, text: &text };
    let mut file = SourceFile {
        path: path.to_string(),
        package: String::new(),
        imports: Vec::new(),
        decls: Vec::new(),
        text: String::new(),
    };

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "package_clause" => {
                if let Some(name) = node.named_child(0) {
                    file.package = conv.text_of(name);
                }
            }
            "import_declaration" => conv.collect_imports(node, &mut file.imports),
            _ if mode == ParseMode::ImportsOnly => {}
            "function_declaration" | "method_declaration" => {
                file.decls.push(Decl::Func(conv.func_decl(node)));
            }
            "type_declaration" => file.decls.push(Decl::Type(conv.type_specs(node))),
            "const_declaration" | "var_declaration" => {
                file.decls.push(Decl::Value(conv.value_specs(node)));
            }
            _ => {}
        }
    }

    file.text = text;
    Ok(file)
}

/// CST-to-AST conversion context for a single file.
struct Converter<'a> {
    path: &'a str,
    text: &'a str,
}

impl Converter<'_> {
    fn text_of(&self, node: Node<'_>) -> String {
        self.text[node.byte_range()].to_string()
    }

    fn loc_of(&self, node: Node<'_>) -> Loc {
        let pos = node.start_position();
        Loc {
            file: self.path.to_string(),
            line: pos.row + 1,
            col: pos.column + 1,
        }
    }

    fn collect_imports(&self, decl: Node<'_>, out: &mut Vec<ImportSpec>) {
        let mut cursor = decl.walk();
        for child in decl.named_children(&mut cursor) {
            match child.kind() {
                "import_spec" => {
                    if let Some(spec) = self.import_spec(child) {
                        out.push(spec);
                    }
                }
                "import_spec_list" => {
                    let mut inner = child.walk();
                    for spec in child.named_children(&mut inner) {
                        if spec.kind() == "import_spec" {
                            if let Some(spec) = self.import_spec(spec) {
                                out.push(spec);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn import_spec(&self, spec: Node<'_>) -> Option<ImportSpec> {
        let path_node = spec.child_by_field_name("path")?;
        let literal = self.text_of(path_node);
        // The literal keeps its quotes in the span; the stored path does not.
        let path = literal
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();
        let name = spec
            .child_by_field_name("name")
            .map(|n| self.text_of(n));
        Some(ImportSpec {
            name,
            path,
            path_span: Span {
                start: path_node.start_byte(),
                end: path_node.end_byte(),
            },
            loc: self.loc_of(spec),
        })
    }

    fn func_decl(&self, node: Node<'_>) -> FuncDecl {
        let name = node
            .child_by_field_name("name")
            .map(|n| self.text_of(n))
            .unwrap_or_default();
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.parameter_types(p))
            .unwrap_or_default();
        let results = node
            .child_by_field_name("result")
            .map(|r| self.result_types(r))
            .unwrap_or_default();
        FuncDecl {
            name,
            params,
            results,
            loc: self.loc_of(node),
        }
    }

    /// One entry per parameter declaration; grouped names share one type,
    /// which only needs to be visited once.
    fn parameter_types(&self, list: Node<'_>) -> Vec<TypeExpr> {
        let mut out = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            match param.kind() {
                "parameter_declaration" | "variadic_parameter_declaration" => {
                    if let Some(ty) = param.child_by_field_name("type") {
                        out.push(self.type_expr(ty));
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// A result is either a parenthesised parameter list or a bare type.
    fn result_types(&self, node: Node<'_>) -> Vec<TypeExpr> {
        if node.kind() == "parameter_list" {
            self.parameter_types(node)
        } else {
            vec![self.type_expr(node)]
        }
    }

    fn type_specs(&self, decl: Node<'_>) -> Vec<TypeSpec> {
        let mut out = Vec::new();
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            match spec.kind() {
                "type_spec" | "type_alias" => {
                    let name = spec.child_by_field_name("name");
                    let ty = spec.child_by_field_name("type");
                    match (name, ty) {
                        (Some(name), Some(ty)) => out.push(TypeSpec::Named {
                            name: self.text_of(name),
                            ty: self.type_expr(ty),
                            loc: self.loc_of(spec),
                        }),
                        _ => out.push(TypeSpec::Malformed {
                            text: self.text_of(spec),
                            loc: self.loc_of(spec),
                        }),
                    }
                }
                _ => {}
            }
        }
        out
    }

    fn value_specs(&self, decl: Node<'_>) -> Vec<ValueSpec> {
        let mut out = Vec::new();
        let mut cursor = decl.walk();
        for spec in decl.named_children(&mut cursor) {
            match spec.kind() {
                "const_spec" | "var_spec" => {
                    let mut names = Vec::new();
                    let mut name_cursor = spec.walk();
                    for name in spec.children_by_field_name("name", &mut name_cursor) {
                        names.push(self.text_of(name));
                    }
                    if names.is_empty() {
                        out.push(ValueSpec::Malformed {
                            text: self.text_of(spec),
                            loc: self.loc_of(spec),
                        });
                        continue;
                    }
                    let ty = spec
                        .child_by_field_name("type")
                        .map(|t| self.type_expr(t));
                    out.push(ValueSpec::Named {
                        names,
                        ty,
                        loc: self.loc_of(spec),
                    });
                }
                _ => {}
            }
        }
        out
    }

    fn type_expr(&self, node: Node<'_>) -> TypeExpr {
        match node.kind() {
            "pointer_type" => self.wrap(node, TypeExpr::Pointer),
            "parenthesized_type" => self.wrap(node, TypeExpr::Paren),
            "array_type" | "slice_type" | "implicit_length_array_type" => {
                match node.child_by_field_name("element") {
                    Some(elem) => TypeExpr::Array(Box::new(self.type_expr(elem))),
                    None => self.bad(node),
                }
            }
            "channel_type" => match node.child_by_field_name("value") {
                Some(value) => TypeExpr::Chan(Box::new(self.type_expr(value))),
                None => self.bad(node),
            },
            "map_type" => {
                let key = node.child_by_field_name("key");
                let value = node.child_by_field_name("value");
                match (key, value) {
                    (Some(key), Some(value)) => TypeExpr::Map {
                        key: Box::new(self.type_expr(key)),
                        value: Box::new(self.type_expr(value)),
                    },
                    _ => self.bad(node),
                }
            }
            "qualified_type" => {
                let pkg = node.child_by_field_name("package");
                let name = node.child_by_field_name("name");
                match (pkg, name) {
                    (Some(pkg), Some(name)) => TypeExpr::Selector {
                        pkg: self.text_of(pkg),
                        symbol: self.text_of(name),
                        loc: self.loc_of(node),
                    },
                    _ => self.bad(node),
                }
            }
            "type_identifier" => TypeExpr::Ident(self.text_of(node)),
            "struct_type" => {
                let mut fields = Vec::new();
                self.collect_struct_fields(node, &mut fields);
                TypeExpr::Struct(fields)
            }
            "interface_type" => {
                let mut members = Vec::new();
                self.collect_interface_members(node, &mut members);
                TypeExpr::Interface(members)
            }
            "function_type" => {
                let params = node
                    .child_by_field_name("parameters")
                    .map(|p| self.parameter_types(p))
                    .unwrap_or_default();
                let results = node
                    .child_by_field_name("result")
                    .map(|r| self.result_types(r))
                    .unwrap_or_default();
                TypeExpr::Func { params, results }
            }
            // A generic instantiation validates through its base type.
            "generic_type" => match node.child_by_field_name("type") {
                Some(base) => self.type_expr(base),
                None => self.bad(node),
            },
            // Anything else is either a grammar-version wrapper around a
            // single type (unwrap it) or a shape with no type content.
            _ => {
                if let Some(inner) = node.child_by_field_name("type") {
                    return self.type_expr(inner);
                }
                if node.named_child_count() == 1 {
                    if let Some(only) = node.named_child(0) {
                        return self.type_expr(only);
                    }
                }
                TypeExpr::Other
            }
        }
    }

    fn wrap(&self, node: Node<'_>, ctor: fn(Box<TypeExpr>) -> TypeExpr) -> TypeExpr {
        match node.named_child(0) {
            Some(inner) => ctor(Box::new(self.type_expr(inner))),
            None => self.bad(node),
        }
    }

    fn bad(&self, node: Node<'_>) -> TypeExpr {
        TypeExpr::Bad {
            text: self.text_of(node),
            loc: self.loc_of(node),
        }
    }

    fn collect_struct_fields(&self, node: Node<'_>, out: &mut Vec<TypeExpr>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() != "field_declaration_list" {
                continue;
            }
            let mut fields = child.walk();
            for field in child.named_children(&mut fields) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                match field.child_by_field_name("type") {
                    // Embedded fields carry their type as the only content.
                    None => {
                        if let Some(only) = field.named_child(0) {
                            out.push(self.type_expr(only));
                        }
                    }
                    Some(ty) => out.push(self.type_expr(ty)),
                }
            }
        }
    }

    fn collect_interface_members(&self, node: Node<'_>, out: &mut Vec<TypeExpr>) {
        let mut cursor = node.walk();
        for member in node.named_children(&mut cursor) {
            match member.kind() {
                "comment" => {}
                "method_elem" | "method_spec" => {
                    let params = member
                        .child_by_field_name("parameters")
                        .map(|p| self.parameter_types(p))
                        .unwrap_or_default();
                    let results = member
                        .child_by_field_name("result")
                        .map(|r| self.result_types(r))
                        .unwrap_or_default();
                    out.push(TypeExpr::Func { params, results });
                }
                // Embedded interfaces and constraint elements reduce to the
                // type they name via the generic unwrap in `type_expr`.
                _ => out.push(self.type_expr(member)),
            }
        }
    }
}
