//! Go syntax provider using tree-sitter.
//!
//! Lowers each file into the crate's syntax model:
//! - Package clause and imports (tree-sitter queries)
//! - Type declarations, including type parameters
//! - Functions and methods, including generic receivers
//! - Doc comments directly above declarations and struct fields

use std::fs;
use std::path::Path;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, Tree};
use walkdir::WalkDir;

use super::{
    ChanDir, FieldDecl, FileFilter, FileSet, FuncDecl, ImportSpec, InterfaceElem, Param,
    Receiver, Signature, SourceFile, SyntaxProvider, TypeExpr, TypeParam, TypeSpec,
};
use crate::report;

/// Tree-sitter query for extracting imports.
const IMPORT_QUERY: &str = r#"
(import_declaration
  (import_spec
    name: (package_identifier)? @alias
    path: (interpreted_string_literal) @path
  )
) @import

(import_declaration
  (import_spec_list
    (import_spec
      name: (package_identifier)? @alias
      path: (interpreted_string_literal) @path
    ) @import_item
  )
) @import_group
"#;

/// Tree-sitter query for package declaration.
const PACKAGE_QUERY: &str = r#"
(package_clause
  (package_identifier) @package_name
)
"#;

/// Go syntax provider.
pub struct GoProvider {
    language: Language,
}

impl GoProvider {
    /// Create a new Go provider.
    pub fn new() -> Self {
        Self {
            language: tree_sitter_go::LANGUAGE.into(),
        }
    }

    /// Create a new parser for this thread.
    fn create_parser(&self) -> anyhow::Result<Parser> {
        let mut parser = Parser::new();
        parser.set_language(&self.language)?;
        Ok(parser)
    }

    /// Parse and lower one Go source file.
    pub fn parse_source(&self, path: &str, source: &[u8]) -> anyhow::Result<SourceFile> {
        let mut parser = self.create_parser()?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow::anyhow!("failed to parse Go source: {}", path))?;

        let mut file = SourceFile {
            path: path.to_string(),
            package: self.extract_package(&tree, source).unwrap_or_default(),
            imports: self.extract_imports(&tree, source)?,
            has_parse_errors: tree.root_node().has_error(),
            ..Default::default()
        };

        let lowering = Lowering { source };
        lowering.declarations(tree.root_node(), &mut file);
        Ok(file)
    }

    /// Extract the package name from a parsed file.
    fn extract_package(&self, tree: &Tree, source: &[u8]) -> Option<String> {
        let query = Query::new(&self.language, PACKAGE_QUERY).ok()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return capture.node.utf8_text(source).ok().map(str::to_string);
                }
            }
        }
        None
    }

    /// Extract imports from a parsed file, in source order.
    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> anyhow::Result<Vec<ImportSpec>> {
        let query = Query::new(&self.language, IMPORT_QUERY)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), source);

        let mut imports: Vec<(usize, ImportSpec)> = Vec::new();

        while let Some(m) = matches.next() {
            let mut path = String::new();
            let mut alias = None;
            let mut position = 0;

            for capture in m.captures {
                let name = query.capture_names()[capture.index as usize];
                match name {
                    "path" => {
                        // Remove quotes from path
                        let raw = capture.node.utf8_text(source).unwrap_or("");
                        path = raw.trim_matches('"').to_string();
                        position = capture.node.start_byte();
                    }
                    "alias" => {
                        alias = capture.node.utf8_text(source).ok().map(str::to_string);
                    }
                    _ => {}
                }
            }

            if path.is_empty() {
                continue;
            }
            let spec = ImportSpec { alias, path };
            if !imports.iter().any(|(_, seen)| *seen == spec) {
                imports.push((position, spec));
            }
        }

        imports.sort_by_key(|(position, _)| *position);
        Ok(imports.into_iter().map(|(_, spec)| spec).collect())
    }
}

impl Default for GoProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxProvider for GoProvider {
    fn parse_directory(&self, dir: &Path, filter: &FileFilter) -> anyhow::Result<FileSet> {
        let mut files = FileSet::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("go") {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if filter.skips(path) {
                report::debug(format!("{} ignored", path.display()));
                continue;
            }

            let source = fs::read(path)?;
            let file = self.parse_source(&name, &source)?;
            if file.package.ends_with("_test") {
                continue;
            }
            if file.has_parse_errors {
                report::caution(format!("{} contains syntax errors", path.display()));
            }
            files.insert(name, file);
        }

        Ok(files)
    }
}

/// Converts tree-sitter nodes into the syntax model.
struct Lowering<'a> {
    source: &'a [u8],
}

impl<'a> Lowering<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source).unwrap_or("")
    }

    fn declarations(&self, root: Node, file: &mut SourceFile) {
        let mut cursor = root.walk();
        let children: Vec<Node> = root.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "type_declaration" => self.type_declaration(child, file),
                "method_declaration" => {
                    if let Some(method) = self.method(child) {
                        file.functions.push(method);
                    }
                }
                "function_declaration" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        file.functions.push(FuncDecl {
                            name: self.text(name).to_string(),
                            receiver: None,
                            signature: self.signature(child),
                            doc: self.doc_comment(child),
                        });
                    }
                }
                _ => {}
            }
        }
    }

    fn type_declaration(&self, decl: Node, file: &mut SourceFile) {
        let mut cursor = decl.walk();
        let specs: Vec<Node> = decl
            .named_children(&mut cursor)
            .filter(|n| matches!(n.kind(), "type_spec" | "type_alias"))
            .collect();
        let grouped = specs.len() > 1 || self.text(decl).contains('(');

        for spec in specs {
            let (Some(name), Some(ty)) = (
                spec.child_by_field_name("name"),
                spec.child_by_field_name("type"),
            ) else {
                continue;
            };

            let type_params = spec
                .child_by_field_name("type_parameters")
                .map(|list| self.type_parameters(list))
                .unwrap_or_default();
            let doc = if grouped {
                self.doc_comment(spec)
            } else {
                self.doc_comment(decl)
            };

            file.types.push(TypeSpec {
                name: self.text(name).to_string(),
                type_params,
                ty: self.lower_type(ty),
                alias: spec.kind() == "type_alias" || has_token(spec, "="),
                doc,
            });
        }
    }

    fn type_parameters(&self, list: Node) -> Vec<TypeParam> {
        let mut params = Vec::new();
        let mut cursor = list.walk();
        let decls: Vec<Node> = list.named_children(&mut cursor).collect();

        for decl in decls {
            let constraint = decl
                .child_by_field_name("type")
                .map(|n| self.lower_type(n))
                .unwrap_or_else(|| TypeExpr::Named("any".to_string()));
            let mut name_cursor = decl.walk();
            for name in decl.children_by_field_name("name", &mut name_cursor) {
                params.push(TypeParam {
                    name: self.text(name).to_string(),
                    constraint: constraint.clone(),
                });
            }
        }
        params
    }

    fn method(&self, node: Node) -> Option<FuncDecl> {
        let name = node.child_by_field_name("name")?;
        let receiver = self.receiver(node.child_by_field_name("receiver")?)?;
        Some(FuncDecl {
            name: self.text(name).to_string(),
            receiver: Some(receiver),
            signature: self.signature(node),
            doc: self.doc_comment(node),
        })
    }

    fn receiver(&self, list: Node) -> Option<Receiver> {
        let mut cursor = list.walk();
        let decl = list
            .named_children(&mut cursor)
            .find(|n| n.kind() == "parameter_declaration")?;

        let mut ty = decl.child_by_field_name("type")?;
        while ty.kind() == "parenthesized_type" {
            ty = ty.named_child(0)?;
        }
        let mut pointer = false;
        if ty.kind() == "pointer_type" {
            pointer = true;
            ty = ty.named_child(0)?;
        }

        match ty.kind() {
            "type_identifier" => Some(Receiver {
                type_name: self.text(ty).to_string(),
                pointer,
                type_args: Vec::new(),
            }),
            "generic_type" => {
                let base = ty.child_by_field_name("type")?;
                let type_args = ty
                    .child_by_field_name("type_arguments")
                    .map(|args| {
                        let mut args_cursor = args.walk();
                        args.named_children(&mut args_cursor)
                            .map(|arg| self.text(arg).trim().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                Some(Receiver {
                    type_name: self.text(base).to_string(),
                    pointer,
                    type_args,
                })
            }
            _ => None,
        }
    }

    /// Parameters and result of a function-like node.
    fn signature(&self, node: Node) -> Signature {
        let params = node
            .child_by_field_name("parameters")
            .map(|list| self.parameter_list(list))
            .unwrap_or_default();
        let results = match node.child_by_field_name("result") {
            Some(result) if result.kind() == "parameter_list" => self.parameter_list(result),
            Some(result) => vec![Param::unnamed(self.lower_type(result))],
            None => Vec::new(),
        };
        Signature { params, results }
    }

    fn parameter_list(&self, list: Node) -> Vec<Param> {
        let mut params = Vec::new();
        let mut cursor = list.walk();
        let decls: Vec<Node> = list.named_children(&mut cursor).collect();

        for decl in decls {
            let variadic = match decl.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut name_cursor = decl.walk();
            let names = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(n).to_string())
                .collect();
            params.push(Param {
                names,
                ty: self.lower_type(ty),
                variadic,
            });
        }
        params
    }

    fn lower_type(&self, node: Node) -> TypeExpr {
        match node.kind() {
            "type_identifier" | "identifier" => TypeExpr::Named(self.text(node).to_string()),
            "qualified_type" => {
                match (
                    node.child_by_field_name("package"),
                    node.child_by_field_name("name"),
                ) {
                    (Some(package), Some(name)) => TypeExpr::Selector {
                        alias: self.text(package).to_string(),
                        name: self.text(name).to_string(),
                    },
                    _ => TypeExpr::Raw(self.text(node).to_string()),
                }
            }
            "pointer_type" => match node.named_child(0) {
                Some(inner) => TypeExpr::Pointer(Box::new(self.lower_type(inner))),
                None => TypeExpr::Raw(self.text(node).to_string()),
            },
            "slice_type" => match node.child_by_field_name("element") {
                Some(elem) => TypeExpr::Slice(Box::new(self.lower_type(elem))),
                None => TypeExpr::Raw(self.text(node).to_string()),
            },
            "array_type" | "implicit_length_array_type" => {
                let len = node
                    .child_by_field_name("length")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_else(|| "...".to_string());
                match node.child_by_field_name("element") {
                    Some(elem) => TypeExpr::Array {
                        len,
                        elem: Box::new(self.lower_type(elem)),
                    },
                    None => TypeExpr::Raw(self.text(node).to_string()),
                }
            }
            "map_type" => match (
                node.child_by_field_name("key"),
                node.child_by_field_name("value"),
            ) {
                (Some(key), Some(value)) => TypeExpr::Map {
                    key: Box::new(self.lower_type(key)),
                    value: Box::new(self.lower_type(value)),
                },
                _ => TypeExpr::Raw(self.text(node).to_string()),
            },
            "channel_type" => match node.child_by_field_name("value") {
                Some(value) => TypeExpr::Chan {
                    dir: chan_dir(self.text(node)),
                    elem: Box::new(self.lower_type(value)),
                },
                None => TypeExpr::Raw(self.text(node).to_string()),
            },
            "function_type" => TypeExpr::Func(self.signature(node)),
            "struct_type" => TypeExpr::Struct(self.fields(node)),
            "interface_type" => TypeExpr::Interface(self.interface_elems(node)),
            "generic_type" => {
                let Some(base) = node.child_by_field_name("type") else {
                    return TypeExpr::Raw(self.text(node).to_string());
                };
                let args = node
                    .child_by_field_name("type_arguments")
                    .map(|args| {
                        let mut cursor = args.walk();
                        let nodes: Vec<Node> = args.named_children(&mut cursor).collect();
                        nodes.into_iter().map(|arg| self.lower_type(arg)).collect()
                    })
                    .unwrap_or_default();
                TypeExpr::Generic {
                    base: Box::new(self.lower_type(base)),
                    args,
                }
            }
            "type_elem" | "type_constraint" | "constraint_elem" | "parenthesized_type" => {
                match single_named_child(node) {
                    Some(inner) if !has_token(node, "|") => self.lower_type(inner),
                    _ => TypeExpr::Raw(self.text(node).to_string()),
                }
            }
            _ => TypeExpr::Raw(self.text(node).to_string()),
        }
    }

    fn fields(&self, struct_node: Node) -> Vec<FieldDecl> {
        let mut cursor = struct_node.walk();
        let Some(list) = struct_node
            .named_children(&mut cursor)
            .find(|n| n.kind() == "field_declaration_list")
        else {
            return Vec::new();
        };

        let mut fields = Vec::new();
        let mut list_cursor = list.walk();
        let decls: Vec<Node> = list.named_children(&mut list_cursor).collect();

        for decl in decls {
            if decl.kind() != "field_declaration" {
                continue;
            }
            let Some(ty) = decl.child_by_field_name("type") else {
                continue;
            };
            let mut name_cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(n).to_string())
                .collect();

            let mut ty = self.lower_type(ty);
            if names.is_empty() && has_token(decl, "*") {
                ty = TypeExpr::Pointer(Box::new(ty));
            }

            fields.push(FieldDecl {
                names,
                ty,
                tag: decl
                    .child_by_field_name("tag")
                    .map(|n| self.text(n).to_string()),
                doc: self.doc_comment(decl),
            });
        }
        fields
    }

    fn interface_elems(&self, node: Node) -> Vec<InterfaceElem> {
        let mut elems = Vec::new();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();

        for child in children {
            match child.kind() {
                "method_elem" | "method_spec" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        elems.push(InterfaceElem::Method {
                            name: self.text(name).to_string(),
                            signature: self.signature(child),
                            doc: self.doc_comment(child),
                        });
                    }
                }
                "type_elem" | "constraint_elem" | "interface_type_name" => {
                    match single_named_child(child) {
                        Some(inner)
                            if !has_token(child, "|")
                                && matches!(
                                    inner.kind(),
                                    "type_identifier" | "qualified_type" | "generic_type"
                                ) =>
                        {
                            elems.push(InterfaceElem::Embedded(self.lower_type(inner)))
                        }
                        _ => elems.push(InterfaceElem::Constraint(self.text(child).to_string())),
                    }
                }
                "type_identifier" | "qualified_type" => {
                    elems.push(InterfaceElem::Embedded(self.lower_type(child)))
                }
                "comment" => {}
                _ => elems.push(InterfaceElem::Constraint(self.text(child).to_string())),
            }
        }
        elems
    }

    /// Line comments immediately above `node`, each on its own line.
    fn doc_comment(&self, node: Node) -> Option<String> {
        let mut lines = Vec::new();
        let mut expected_row = node.start_position().row;
        let mut current = node.prev_sibling();

        while let Some(prev) = current {
            if prev.kind() != "comment" || prev.end_position().row + 1 != expected_row {
                break;
            }
            if let Some(before) = prev.prev_sibling() {
                if before.end_position().row == prev.start_position().row {
                    break;
                }
            }
            lines.push(strip_comment(self.text(prev)));
            expected_row = prev.start_position().row;
            current = prev.prev_sibling();
        }

        if lines.is_empty() {
            return None;
        }
        lines.reverse();
        Some(lines.join("\n"))
    }
}

fn single_named_child(node: Node) -> Option<Node> {
    if node.named_child_count() == 1 {
        node.named_child(0)
    } else {
        None
    }
}

/// Whether `node` has a direct anonymous child token of the given kind.
fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

fn chan_dir(text: &str) -> ChanDir {
    let text = text.trim_start();
    if text.starts_with("<-") {
        return ChanDir::Recv;
    }
    let rest = text.trim_start_matches("chan").trim_start();
    if rest.starts_with("<-") {
        ChanDir::Send
    } else {
        ChanDir::Both
    }
}

fn strip_comment(text: &str) -> String {
    if let Some(line) = text.strip_prefix("//") {
        return line.strip_prefix(' ').unwrap_or(line).trim_end().to_string();
    }
    text.trim_start_matches("/*")
        .trim_end_matches("*/")
        .trim()
        .to_string()
}
