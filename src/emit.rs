//! Go source assembly.
//!
//! Everything the generator produces is structured data until this module
//! renders it. Rendering happens once, after generics resolution, so a
//! placeholder that is still pending here is an integrity error.

use std::collections::{BTreeMap, HashMap};

use crate::error::{FacadeError, Result};
use crate::instance::InstanceDecl;
use crate::syntax::{package_name, ChanDir, FieldDecl, InterfaceElem, Param, Signature, TypeExpr};

/// Import section of one output file.
#[derive(Debug)]
pub struct ImportRegistry {
    own_path: String,
    /// Package clause names of loaded packages, by import path.
    package_names: HashMap<String, String>,
    used: BTreeMap<String, String>,
    locals: HashMap<String, String>,
}

impl ImportRegistry {
    pub fn new(own_path: impl Into<String>, package_names: HashMap<String, String>) -> Self {
        Self {
            own_path: own_path.into(),
            package_names,
            used: BTreeMap::new(),
            locals: HashMap::new(),
        }
    }

    /// Local name to qualify `path` with, registering the import on first use.
    ///
    /// Returns `None` for the file's own package.
    pub fn qualifier(&mut self, path: &str) -> Option<String> {
        if path == self.own_path {
            return None;
        }
        if let Some(local) = self.used.get(path) {
            return Some(local.clone());
        }

        let base = self
            .package_names
            .get(path)
            .cloned()
            .unwrap_or_else(|| package_name(path));
        let mut local = base.clone();
        let mut suffix = 2;
        while self.locals.contains_key(&local) {
            local = format!("{}{}", base, suffix);
            suffix += 1;
        }

        self.locals.insert(local.clone(), path.to_string());
        self.used.insert(path.to_string(), local.clone());
        Some(local)
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    /// Render the import section, sorted by path.
    pub fn render(&self) -> String {
        let lines: Vec<String> = self
            .used
            .iter()
            .map(|(path, local)| {
                let last = path.rsplit('/').next().unwrap_or(path);
                if local == last {
                    format!("\"{}\"", path)
                } else {
                    format!("{} \"{}\"", local, path)
                }
            })
            .collect();

        match lines.len() {
            0 => String::new(),
            1 => format!("import {}\n", lines[0]),
            _ => {
                let mut out = String::from("import (\n");
                for line in lines {
                    out.push('\t');
                    out.push_str(&line);
                    out.push('\n');
                }
                out.push_str(")\n");
                out
            }
        }
    }
}

enum Mode<'r> {
    /// Go source, qualified names registered as imports.
    Source(&'r mut ImportRegistry),
    /// Canonical single-line form: names dropped, packages by full path.
    Identity,
}

/// Renders type expressions.
pub struct TypeWriter<'r> {
    mode: Mode<'r>,
}

impl<'r> TypeWriter<'r> {
    pub fn source(imports: &'r mut ImportRegistry) -> Self {
        Self {
            mode: Mode::Source(imports),
        }
    }

    pub fn identity() -> TypeWriter<'static> {
        TypeWriter {
            mode: Mode::Identity,
        }
    }

    fn is_identity(&self) -> bool {
        matches!(self.mode, Mode::Identity)
    }

    /// Render `expr`; `indent` is the nesting level of the line it starts on.
    pub fn write_type(&mut self, expr: &TypeExpr, indent: usize) -> Result<String> {
        Ok(match expr {
            TypeExpr::Named(name) => name.clone(),
            TypeExpr::Selector { alias, name } => format!("{}.{}", alias, name),
            TypeExpr::Qualified { path, name } => match &mut self.mode {
                Mode::Identity => format!("{:?}.{}", path, name),
                Mode::Source(imports) => match imports.qualifier(path) {
                    Some(local) => format!("{}.{}", local, name),
                    None => name.clone(),
                },
            },
            TypeExpr::Pending(placeholder) => match placeholder.resolved() {
                Some(resolved) => self.write_type(resolved, indent)?,
                None => {
                    return Err(FacadeError::UnresolvedPlaceholder {
                        ident: placeholder.ident().to_string(),
                        package: placeholder.package().to_string(),
                    })
                }
            },
            TypeExpr::Pointer(inner) => format!("*{}", self.write_type(inner, indent)?),
            TypeExpr::Slice(inner) => format!("[]{}", self.write_type(inner, indent)?),
            TypeExpr::Array { len, elem } => {
                format!("[{}]{}", len, self.write_type(elem, indent)?)
            }
            TypeExpr::Map { key, value } => format!(
                "map[{}]{}",
                self.write_type(key, indent)?,
                self.write_type(value, indent)?
            ),
            TypeExpr::Chan { dir, elem } => {
                let elem = self.write_type(elem, indent)?;
                match dir {
                    ChanDir::Both => format!("chan {}", elem),
                    ChanDir::Send => format!("chan<- {}", elem),
                    ChanDir::Recv => format!("<-chan {}", elem),
                }
            }
            TypeExpr::Func(signature) => format!(
                "func{}{}",
                self.write_params(&signature.params, indent)?,
                self.write_results(&signature.results, indent)?
            ),
            TypeExpr::Struct(fields) => self.write_struct(fields, indent)?,
            TypeExpr::Interface(elems) => self.write_interface(elems, indent)?,
            TypeExpr::Generic { base, args } => {
                let base = self.write_type(base, indent)?;
                let args = args
                    .iter()
                    .map(|arg| self.write_type(arg, indent))
                    .collect::<Result<Vec<_>>>()?;
                format!("{}[{}]", base, args.join(", "))
            }
            TypeExpr::Raw(text) => text.clone(),
        })
    }

    /// Parenthesized parameter list as declared.
    pub fn write_params(&mut self, params: &[Param], indent: usize) -> Result<String> {
        let mut parts = Vec::new();
        for param in params {
            let ty = self.write_type(&param.ty, indent)?;
            let ty = if param.variadic { format!("...{}", ty) } else { ty };

            if self.is_identity() {
                for _ in 0..param.arity() {
                    parts.push(ty.clone());
                }
            } else if param.is_named() {
                parts.push(format!("{} {}", param.names.join(", "), ty));
            } else {
                parts.push(ty);
            }
        }
        Ok(format!("({})", parts.join(", ")))
    }

    /// Result list with its leading space; empty when there are no results.
    pub fn write_results(&mut self, results: &[Param], indent: usize) -> Result<String> {
        if results.is_empty() {
            return Ok(String::new());
        }
        if !self.is_identity() && results.len() == 1 && !results[0].is_named() {
            return Ok(format!(" {}", self.write_type(&results[0].ty, indent)?));
        }
        Ok(format!(" {}", self.write_params(results, indent)?))
    }

    fn write_struct(&mut self, fields: &[FieldDecl], indent: usize) -> Result<String> {
        if fields.is_empty() {
            return Ok("struct{}".to_string());
        }

        let mut rows = Vec::with_capacity(fields.len());
        for field in fields {
            rows.push(FieldRow {
                names: (!field.is_embedded()).then(|| field.names.join(", ")),
                ty: self.write_type(&field.ty, indent + 1)?,
                tag: field.tag.clone(),
            });
        }

        if self.is_identity() {
            let parts: Vec<String> = rows.iter().map(FieldRow::plain).collect();
            return Ok(format!("struct{{{}}}", parts.join("; ")));
        }

        let mut out = String::from("struct {\n");
        for line in align_rows(&rows) {
            push_indent(&mut out, indent + 1);
            out.push_str(&line);
            out.push('\n');
        }
        push_indent(&mut out, indent);
        out.push('}');
        Ok(out)
    }

    fn write_interface(&mut self, elems: &[InterfaceElem], indent: usize) -> Result<String> {
        if elems.is_empty() {
            return Ok("interface{}".to_string());
        }

        let mut lines = Vec::with_capacity(elems.len());
        for elem in elems {
            lines.push(match elem {
                InterfaceElem::Method {
                    name, signature, ..
                } => format!(
                    "{}{}{}",
                    name,
                    self.write_params(&signature.params, indent + 1)?,
                    self.write_results(&signature.results, indent + 1)?
                ),
                InterfaceElem::Embedded(ty) => self.write_type(ty, indent + 1)?,
                InterfaceElem::Constraint(text) => text.clone(),
            });
        }

        if self.is_identity() {
            return Ok(format!("interface{{{}}}", lines.join("; ")));
        }

        let mut out = String::from("interface {\n");
        for line in lines {
            push_indent(&mut out, indent + 1);
            out.push_str(&line);
            out.push('\n');
        }
        push_indent(&mut out, indent);
        out.push('}');
        Ok(out)
    }
}

struct FieldRow {
    names: Option<String>,
    ty: String,
    tag: Option<String>,
}

impl FieldRow {
    fn plain(&self) -> String {
        let mut line = match &self.names {
            Some(names) => format!("{} {}", names, self.ty),
            None => self.ty.clone(),
        };
        if let Some(tag) = &self.tag {
            line.push(' ');
            line.push_str(tag);
        }
        line
    }

    fn plain_aligned(&self, name_cell: &str) -> String {
        let mut line = format!("{} {}", name_cell, self.ty);
        if let Some(tag) = &self.tag {
            line.push(' ');
            line.push_str(tag);
        }
        line
    }

    fn is_multiline(&self) -> bool {
        self.ty.contains('\n')
    }
}

/// Lay out struct fields in columns the way gofmt does.
///
/// Named fields in a run share a name column; a run ends at an embedded
/// field or after a multi-line type. Type columns are aligned only across
/// consecutive tagged fields.
fn align_rows(rows: &[FieldRow]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len());
    let mut start = 0;

    while start < rows.len() {
        if rows[start].names.is_none() {
            lines.push(rows[start].plain());
            start += 1;
            continue;
        }

        let mut end = start;
        while end < rows.len() && rows[end].names.is_some() {
            end += 1;
            if rows[end - 1].is_multiline() {
                break;
            }
        }

        let run = &rows[start..end];
        let name_width = run
            .iter()
            .filter_map(|row| row.names.as_ref())
            .map(|names| names.chars().count())
            .max()
            .unwrap_or(0);

        let mut index = 0;
        while index < run.len() {
            let row = &run[index];
            let names = row.names.as_deref().unwrap_or("");
            let name_cell = pad(names, name_width);

            if row.tag.is_none() || row.is_multiline() {
                lines.push(row.plain_aligned(&name_cell));
                index += 1;
                continue;
            }

            let mut tagged_end = index;
            while tagged_end < run.len() && run[tagged_end].tag.is_some() && !run[tagged_end].is_multiline() {
                tagged_end += 1;
            }
            let type_width = run[index..tagged_end]
                .iter()
                .map(|row| row.ty.chars().count())
                .max()
                .unwrap_or(0);
            for row in &run[index..tagged_end] {
                let names = row.names.as_deref().unwrap_or("");
                lines.push(format!(
                    "{} {} {}",
                    pad(names, name_width),
                    pad(&row.ty, type_width),
                    row.tag.as_deref().unwrap_or("")
                ));
            }
            index = tagged_end;
        }
        start = end;
    }
    lines
}

fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let mut out = text.to_string();
    out.extend(std::iter::repeat(' ').take(width.saturating_sub(len)));
    out
}

fn push_indent(out: &mut String, level: usize) {
    out.extend(std::iter::repeat('\t').take(level));
}

/// Canonical signature identity: parameter and result types only.
pub fn signature_identity(signature: &Signature) -> Result<String> {
    let mut writer = TypeWriter::identity();
    Ok(format!(
        "func{}{}",
        writer.write_params(&signature.params, 0)?,
        writer.write_results(&signature.results, 0)?
    ))
}

/// Where a delegate came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Import path of the declaring package.
    pub package: String,
    pub target: String,
    /// `<Target>` for the root package, `<alias.Target>` otherwise.
    pub label: String,
}

impl Origin {
    pub fn new(package: impl Into<String>, target: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            target: target.into(),
            label: label.into(),
        }
    }

    fn same_group(&self, other: &Origin) -> bool {
        self.package == other.package && self.target == other.target
    }
}

/// One facade function forwarding to the shared instance.
#[derive(Debug, Clone)]
pub struct WrappedFunction {
    pub name: String,
    pub origin: Origin,
    /// Declared by an interface rather than a concrete method or field.
    pub interface: bool,
    pub doc: Option<String>,
    /// Embedded field names between the instance and the member.
    pub call_path: Vec<String>,
    /// Signature with every parameter named.
    pub signature: Signature,
}

impl WrappedFunction {
    pub fn identity(&self) -> Result<String> {
        signature_identity(&self.signature)
    }

    /// Forwarded call arguments, spreading a variadic parameter.
    pub fn arguments(&self) -> Vec<String> {
        let mut args = Vec::new();
        for param in &self.signature.params {
            for name in &param.names {
                if param.variadic {
                    args.push(format!("{}...", name));
                } else {
                    args.push(name.clone());
                }
            }
        }
        args
    }

    fn render(&self, instance: &str, writer: &mut TypeWriter<'_>) -> Result<String> {
        let mut out = String::new();
        if let Some(doc) = &self.doc {
            for line in doc.lines() {
                push_comment(&mut out, line);
            }
        }

        out.push_str(&format!(
            "func {}{}{} {{\n\t",
            self.name,
            writer.write_params(&self.signature.params, 0)?,
            writer.write_results(&self.signature.results, 0)?
        ));
        if self.signature.result_count() > 0 {
            out.push_str("return ");
        }

        let mut target = vec![instance.to_string()];
        target.extend(self.call_path.iter().cloned());
        target.push(self.name.clone());
        out.push_str(&format!("{}({})\n}}", target.join("."), self.arguments().join(", ")));
        Ok(out)
    }
}

fn push_comment(out: &mut String, line: &str) {
    if line.is_empty() {
        out.push_str("//\n");
    } else {
        out.push_str("// ");
        out.push_str(line);
        out.push('\n');
    }
}

/// A complete generated Go source file.
#[derive(Debug)]
pub struct GoFile {
    pub header: Option<String>,
    pub package_name: String,
    /// Import path of the package the file belongs to.
    pub package_path: String,
    /// Package clause names of every loaded package, by import path.
    pub package_names: HashMap<String, String>,
    pub instance: InstanceDecl,
    pub delegates: Vec<WrappedFunction>,
}

impl GoFile {
    pub fn render(&self) -> Result<String> {
        let mut imports = ImportRegistry::new(&self.package_path, self.package_names.clone());
        let mut blocks = Vec::new();
        {
            let mut writer = TypeWriter::source(&mut imports);
            blocks.push(self.instance.render(&mut writer)?);

            let mut group: Option<&Origin> = None;
            for delegate in &self.delegates {
                if group.map_or(true, |current| !current.same_group(&delegate.origin)) {
                    blocks.push(format!(
                        "// {} from {}",
                        delegate.origin.label, delegate.origin.package
                    ));
                    group = Some(&delegate.origin);
                }
                blocks.push(delegate.render(&self.instance.name, &mut writer)?);
            }
        }

        let mut out = String::new();
        if let Some(header) = self.header.as_deref().filter(|h| !h.trim().is_empty()) {
            for line in header.lines() {
                push_comment(&mut out, line.trim_end());
            }
            out.push('\n');
        }
        out.push_str(&format!("package {}\n\n", self.package_name));
        if !imports.is_empty() {
            out.push_str(&imports.render());
            out.push('\n');
        }
        out.push_str(&blocks.join("\n\n"));
        out.push('\n');
        Ok(out)
    }
}
