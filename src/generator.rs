//! Facade generation for one target type.
//!
//! The generator walks a target's methods and composed members and turns
//! every exported operation into a [`WrappedFunction`]. Composition inside
//! the same package recurses in-process with an extended call path;
//! composition of a type from another package is returned as a
//! [`TaskRequest`] for the scheduler's next wave.

use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;

use crate::emit::{Origin, TypeWriter, WrappedFunction};
use crate::error::{FacadeError, Result};
use crate::finder::TargetMembers;
use crate::index::{LoadedPackage, SourceIndex};
use crate::namer::NameAllocator;
use crate::report;
use crate::resolver::{resolve_expr, Binding, GenericsLedger, Overlap, ResolverFrame};
use crate::syntax::{
    is_exported, is_scalar, FieldDecl, InterfaceElem, Param, Signature, SourceFile, TypeExpr,
    TypeKind,
};

lazy_static! {
    /// `facade:"..."` struct tag, or its older `singl:"..."` spelling.
    static ref IGNORE_TAG: Regex = Regex::new(r#"\b(?:facade|singl):"([^"]*)""#).unwrap();
}

/// Written type parameter name → formal name of the walked declaration.
type ParamScope = HashMap<String, String>;

/// A composed type living in another package, walked as its own task.
#[derive(Debug, Clone)]
pub struct TaskRequest {
    /// Import path of the package declaring the target.
    pub package: String,
    pub target: String,
    /// Grouping label (`<alias.Target>`).
    pub label: String,
    /// Call path from the instance to the composed member.
    pub prefix: Vec<String>,
    pub interface: bool,
    /// Resolver frame the walk registers its placeholders on.
    pub frame: Arc<ResolverFrame>,
    /// Concrete type arguments, rendered in identity form.
    pub arguments: Vec<String>,
    /// Wave level; the root task is level 1.
    pub level: usize,
}

impl TaskRequest {
    /// Request for the root target.
    pub fn root(package: &str, target: &str, frame: Arc<ResolverFrame>, arguments: Vec<String>) -> Self {
        Self {
            package: package.to_string(),
            target: target.to_string(),
            label: format!("<{}>", target),
            prefix: Vec::new(),
            interface: false,
            frame,
            arguments,
            level: 1,
        }
    }

    pub fn describe(&self) -> String {
        format!("{}.{}", self.package, self.target)
    }
}

/// Facts about the root target needed to declare the instance variable.
#[derive(Debug, Clone)]
pub struct RootFacts {
    pub kind: TypeKind,
    /// Pointer flag of the first exported method's receiver.
    pub first_receiver: Option<bool>,
    pub package_name: String,
    pub dir: std::path::PathBuf,
}

/// Everything one task produced.
#[derive(Debug, Default)]
pub struct TaskOutput {
    pub functions: Vec<WrappedFunction>,
    /// Cross-package composition, in discovery order.
    pub requests: Vec<TaskRequest>,
    pub root: Option<RootFacts>,
}

/// Explicit state of one level of the walk.
#[derive(Clone)]
struct WalkContext {
    package: Arc<LoadedPackage>,
    target: String,
    label: String,
    prefix: Vec<String>,
    /// Inside an interface: every further member is an interface member.
    interface: bool,
    /// Not the task's own target (in-process recursion).
    nested: bool,
    level: usize,
    frame: Arc<ResolverFrame>,
    /// Concrete type arguments of this instantiation, one per formal.
    arguments: Vec<String>,
    /// Formal type parameter names of `target`.
    formals: Vec<String>,
}

impl WalkContext {
    fn visitation_key(&self) -> String {
        visitation_key(&self.target, &self.arguments.join(", "))
    }

    /// Every formal in scope under its own name.
    fn formal_scope(&self) -> ParamScope {
        self.formals
            .iter()
            .map(|formal| (formal.clone(), formal.clone()))
            .collect()
    }

    fn scope(&self) -> String {
        format!("{}.{}", self.package.path, self.visitation_key())
    }

    fn origin(&self) -> Origin {
        Origin::new(&self.package.path, &self.target, &self.label)
    }
}

/// Visitation ledger key of a target instantiation.
pub fn visitation_key(target: &str, arguments: &str) -> String {
    if arguments.is_empty() {
        target.to_string()
    } else {
        format!("{}[{}]", target, arguments)
    }
}

/// Walks targets of one task.
pub struct FacadeGenerator<'s> {
    index: &'s SourceIndex,
    ledger: &'s GenericsLedger,
    /// Import path of the package the facade is generated into.
    root_package: &'s str,
    namer: NameAllocator,
    output: TaskOutput,
}

impl<'s> FacadeGenerator<'s> {
    pub fn new(index: &'s SourceIndex, ledger: &'s GenericsLedger, root_package: &'s str) -> Self {
        Self {
            index,
            ledger,
            root_package,
            namer: NameAllocator::new(),
            output: TaskOutput::default(),
        }
    }

    /// Walk the requested target.
    ///
    /// A repeat visit fails with the benign [`FacadeError::Processed`].
    pub fn run(mut self, request: &TaskRequest) -> Result<TaskOutput> {
        let package = self.index.load_package(&request.package)?;
        let ctx = WalkContext {
            package,
            target: request.target.clone(),
            label: request.label.clone(),
            prefix: request.prefix.clone(),
            interface: request.interface,
            nested: false,
            level: request.level,
            frame: Arc::clone(&request.frame),
            arguments: request.arguments.clone(),
            formals: Vec::new(),
        };
        self.walk(ctx)?;
        Ok(self.output)
    }

    fn walk(&mut self, mut ctx: WalkContext) -> Result<()> {
        let key = ctx.visitation_key();
        if !self.index.mark_visited(&ctx.package.path, &key) {
            return Err(FacadeError::Processed(format!("{}.{}", ctx.package.path, key)));
        }

        let package = Arc::clone(&ctx.package);
        let not_found = || FacadeError::NotFound {
            package: package.path.clone(),
            target: ctx.target.clone(),
        };
        let object = package.info.lookup(&ctx.target).ok_or_else(not_found)?;
        let kind = object.kind;
        if !kind.is_facade_target() {
            return Err(FacadeError::Structural {
                package: package.path.clone(),
                target: ctx.target.clone(),
                kind: kind.to_string(),
            });
        }

        let members = TargetMembers::collect(&package.files, &ctx.target);
        let (spec_file, spec) = members.declaration.ok_or_else(not_found)?;

        ctx.formals = object.type_params.clone();
        self.ledger
            .record(&package.path, &ctx.target, ctx.formals.clone());
        if kind == TypeKind::Interface {
            ctx.interface = true;
        }

        report::debug(format!(
            "walking {} ({}) level {}",
            ctx.scope(),
            kind,
            ctx.level
        ));

        let mut first_receiver = None;
        for (file, method) in &members.methods {
            let Some(receiver) = &method.receiver else {
                continue;
            };
            if !is_exported(&method.name) {
                continue;
            }
            first_receiver.get_or_insert(receiver.pointer);

            let scope: ParamScope = receiver
                .type_args
                .iter()
                .zip(&ctx.formals)
                .filter(|(written, _)| written.as_str() != "_")
                .map(|(written, formal)| (written.clone(), formal.clone()))
                .collect();
            let function = self.delegate(
                &ctx,
                file,
                &scope,
                &method.name,
                &method.signature,
                method.doc.clone(),
                ctx.interface,
            );
            self.output.functions.push(function);
        }

        if !ctx.nested && ctx.level == 1 {
            self.output.root = Some(RootFacts {
                kind,
                first_receiver,
                package_name: package.name.clone(),
                dir: package.dir.clone(),
            });
        }

        match &spec.ty {
            TypeExpr::Struct(fields) => self.walk_struct(&ctx, spec_file, fields),
            TypeExpr::Interface(elems) => self.walk_interface(&ctx, spec_file, elems),
            _ => {}
        }
        Ok(())
    }

    fn walk_struct(&mut self, ctx: &WalkContext, file: &SourceFile, fields: &[FieldDecl]) {
        let scope = ctx.formal_scope();
        for field in fields {
            if is_ignored(field) {
                report::debug(format!("{}: ignored field {:?}", ctx.scope(), field.names));
                continue;
            }

            if field.is_embedded() {
                self.compose(ctx, file, &field.ty);
                continue;
            }

            if let TypeExpr::Func(signature) = &field.ty {
                for name in field.names.iter().filter(|name| is_exported(name)) {
                    let function = self.delegate(
                        ctx,
                        file,
                        &scope,
                        name,
                        signature,
                        field.doc.clone(),
                        ctx.interface,
                    );
                    self.output.functions.push(function);
                }
            }
        }
    }

    fn walk_interface(&mut self, ctx: &WalkContext, file: &SourceFile, elems: &[InterfaceElem]) {
        let scope = ctx.formal_scope();
        for elem in elems {
            match elem {
                InterfaceElem::Method {
                    name,
                    signature,
                    doc,
                } => {
                    if is_exported(name) {
                        let function =
                            self.delegate(ctx, file, &scope, name, signature, doc.clone(), true);
                        self.output.functions.push(function);
                    }
                }
                InterfaceElem::Embedded(ty) => self.compose(ctx, file, ty),
                InterfaceElem::Constraint(_) => {}
            }
        }
    }

    /// Follow a composed (embedded) member.
    fn compose(&mut self, ctx: &WalkContext, file: &SourceFile, ty: &TypeExpr) {
        let (inner, _) = ty.deref();
        let (base, args) = inner.generic_parts();
        let scope = ctx.formal_scope();
        let arguments: Vec<TypeExpr> = args
            .iter()
            .map(|arg| self.localize(ctx, file, &scope, arg))
            .collect();
        let concrete = self.concrete_arguments(ctx, &arguments);

        match base {
            TypeExpr::Named(name) if name == "error" => {
                let signature = Signature {
                    params: Vec::new(),
                    results: vec![Param::unnamed(TypeExpr::Named("string".to_string()))],
                };
                let mut embedded = ctx.clone();
                embedded.prefix = self.extend_prefix(ctx, name);
                let function =
                    self.delegate(&embedded, file, &scope, "Error", &signature, None, true);
                self.output.functions.push(function);
            }
            TypeExpr::Named(name) if is_scalar(name) => {
                report::debug(format!("{}: skipping predeclared {}", ctx.scope(), name));
            }
            TypeExpr::Named(name) => {
                let frame = ctx
                    .frame
                    .push(Overlap::new(&ctx.package.path, name, arguments));
                let child = WalkContext {
                    package: Arc::clone(&ctx.package),
                    target: name.clone(),
                    label: format!("<{}>", name),
                    prefix: self.extend_prefix(ctx, name),
                    interface: ctx.interface,
                    nested: true,
                    level: ctx.level,
                    frame,
                    arguments: concrete,
                    formals: Vec::new(),
                };
                match self.walk(child) {
                    Ok(()) => {}
                    Err(err) if err.is_benign() => report::debug(err.to_string()),
                    Err(err) => report::caution(format!("{}: {}", ctx.scope(), err)),
                }
            }
            TypeExpr::Selector { alias, name } => {
                let Some(import) = file.import_for(alias) else {
                    report::caution(
                        FacadeError::parser_warning(format!(
                            "{}: unable to locate import {:?} of composed {}.{}",
                            ctx.scope(),
                            alias,
                            alias,
                            name
                        ))
                        .to_string(),
                    );
                    return;
                };
                let frame = ctx
                    .frame
                    .push(Overlap::new(&import.path, name, arguments));
                self.output.requests.push(TaskRequest {
                    package: import.path.clone(),
                    target: name.clone(),
                    label: format!("<{}.{}>", alias, name),
                    prefix: self.extend_prefix(ctx, name),
                    interface: ctx.interface,
                    frame,
                    arguments: concrete,
                    level: ctx.level + 1,
                });
            }
            other => {
                report::caution(
                    FacadeError::parser_warning(format!(
                        "{}: unsupported composed member {:?}, skipped",
                        ctx.scope(),
                        other
                    ))
                    .to_string(),
                );
            }
        }
    }

    /// Call path to a member embedded as `field`.
    ///
    /// Interfaces embed without a field. Unexported fields of foreign
    /// packages are unreachable by name, so their members are called through
    /// promotion instead.
    fn extend_prefix(&self, ctx: &WalkContext, field: &str) -> Vec<String> {
        let mut prefix = ctx.prefix.clone();
        if !ctx.interface && (is_exported(field) || ctx.package.path == self.root_package) {
            prefix.push(field.to_string());
        }
        prefix
    }

    /// Concrete arguments of a composed generic type, in identity form.
    ///
    /// The current type's own parameters are replaced by the arguments of the
    /// current instantiation, so `Node[T]` composed inside `Node[int]` is
    /// `Node[int]` again.
    fn concrete_arguments(&self, ctx: &WalkContext, arguments: &[TypeExpr]) -> Vec<String> {
        let binding: Binding = ctx
            .formals
            .iter()
            .enumerate()
            .map(|(i, formal)| {
                let argument = ctx.arguments.get(i).unwrap_or(formal);
                (formal.clone(), TypeExpr::Raw(argument.clone()))
            })
            .collect();

        let mut writer = TypeWriter::identity();
        arguments
            .iter()
            .map(|arg| {
                writer
                    .write_type(&resolve_expr(arg, &binding), 0)
                    .unwrap_or_else(|_| "?".to_string())
            })
            .collect()
    }

    /// Build a delegate for an exported member.
    #[allow(clippy::too_many_arguments)]
    fn delegate(
        &mut self,
        ctx: &WalkContext,
        file: &SourceFile,
        scope: &ParamScope,
        name: &str,
        signature: &Signature,
        doc: Option<String>,
        interface: bool,
    ) -> WrappedFunction {
        self.namer.reset();
        for param in signature.params.iter().chain(&signature.results) {
            for declared in &param.names {
                self.namer.reserve(declared);
            }
        }

        let mut params = Vec::with_capacity(signature.params.len());
        for param in &signature.params {
            let names = if param.is_named() {
                param
                    .names
                    .iter()
                    .map(|n| if n == "_" { self.namer.allocate() } else { n.clone() })
                    .collect()
            } else {
                vec![self.namer.allocate()]
            };
            params.push(Param {
                names,
                ty: self.localize(ctx, file, scope, &param.ty),
                variadic: param.variadic,
            });
        }
        let results = signature
            .results
            .iter()
            .map(|result| Param {
                names: result.names.clone(),
                ty: self.localize(ctx, file, scope, &result.ty),
                variadic: result.variadic,
            })
            .collect();

        WrappedFunction {
            name: name.to_string(),
            origin: ctx.origin(),
            interface,
            doc,
            call_path: ctx.prefix.clone(),
            signature: Signature { params, results },
        }
    }

    /// Convert a source type into output form.
    ///
    /// Type parameters in `scope` become placeholders on the current frame,
    /// other package-local names are qualified with the current package and
    /// selectors are qualified through the declaring file's imports.
    fn localize(
        &self,
        ctx: &WalkContext,
        file: &SourceFile,
        scope: &ParamScope,
        expr: &TypeExpr,
    ) -> TypeExpr {
        let recurse = |inner: &TypeExpr| Box::new(self.localize(ctx, file, scope, inner));

        match expr {
            TypeExpr::Named(name) if is_scalar(name) => expr.clone(),
            TypeExpr::Named(name) => match scope.get(name) {
                Some(formal) => TypeExpr::Pending(ctx.frame.placeholder(formal, &ctx.package.path)),
                None => TypeExpr::Qualified {
                    path: ctx.package.path.clone(),
                    name: name.clone(),
                },
            },
            TypeExpr::Selector { alias, name } => match file.import_for(alias) {
                Some(import) => TypeExpr::Qualified {
                    path: import.path.clone(),
                    name: name.clone(),
                },
                None => {
                    report::caution(
                        FacadeError::parser_warning(format!(
                            "{}: unable to locate import {:?} in {}",
                            ctx.scope(),
                            alias,
                            file.path
                        ))
                        .to_string(),
                    );
                    TypeExpr::Qualified {
                        path: alias.clone(),
                        name: name.clone(),
                    }
                }
            },
            TypeExpr::Qualified { .. } | TypeExpr::Pending(_) | TypeExpr::Raw(_) => expr.clone(),
            TypeExpr::Pointer(inner) => TypeExpr::Pointer(recurse(inner)),
            TypeExpr::Slice(inner) => TypeExpr::Slice(recurse(inner)),
            TypeExpr::Array { len, elem } => TypeExpr::Array {
                len: len.clone(),
                elem: recurse(elem),
            },
            TypeExpr::Map { key, value } => TypeExpr::Map {
                key: recurse(key),
                value: recurse(value),
            },
            TypeExpr::Chan { dir, elem } => TypeExpr::Chan {
                dir: *dir,
                elem: recurse(elem),
            },
            TypeExpr::Func(signature) => {
                TypeExpr::Func(self.localize_signature(ctx, file, scope, signature))
            }
            TypeExpr::Struct(fields) => TypeExpr::Struct(
                fields
                    .iter()
                    .map(|field| FieldDecl {
                        names: field.names.clone(),
                        ty: self.localize(ctx, file, scope, &field.ty),
                        tag: field.tag.clone(),
                        doc: None,
                    })
                    .collect(),
            ),
            TypeExpr::Interface(elems) => TypeExpr::Interface(
                elems
                    .iter()
                    .map(|elem| match elem {
                        InterfaceElem::Method {
                            name, signature, ..
                        } => InterfaceElem::Method {
                            name: name.clone(),
                            signature: self.localize_signature(ctx, file, scope, signature),
                            doc: None,
                        },
                        InterfaceElem::Embedded(ty) => {
                            InterfaceElem::Embedded(self.localize(ctx, file, scope, ty))
                        }
                        InterfaceElem::Constraint(text) => InterfaceElem::Constraint(text.clone()),
                    })
                    .collect(),
            ),
            TypeExpr::Generic { base, args } => TypeExpr::Generic {
                base: recurse(base),
                args: args
                    .iter()
                    .map(|arg| self.localize(ctx, file, scope, arg))
                    .collect(),
            },
        }
    }

    fn localize_signature(
        &self,
        ctx: &WalkContext,
        file: &SourceFile,
        scope: &ParamScope,
        signature: &Signature,
    ) -> Signature {
        let map = |params: &[Param]| {
            params
                .iter()
                .map(|param| Param {
                    names: param.names.clone(),
                    ty: self.localize(ctx, file, scope, &param.ty),
                    variadic: param.variadic,
                })
                .collect()
        };
        Signature {
            params: map(&signature.params),
            results: map(&signature.results),
        }
    }
}

fn is_ignored(field: &FieldDecl) -> bool {
    let Some(tag) = field.tag.as_deref() else {
        return false;
    };
    IGNORE_TAG
        .captures_iter(tag)
        .filter_map(|captures| captures.get(1))
        .any(|value| value.as_str().split(',').any(|v| v.trim() == "ignore"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PackageLocator;
    use crate::syntax::{FileFilter, GoProvider};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_package(root: &Path, import_path: &str, files: &[(&str, &str)]) {
        let dir = root.join(import_path);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    fn index(root: &Path) -> SourceIndex {
        SourceIndex::new(
            Arc::new(GoProvider::new()),
            PackageLocator::with_roots(vec![root.to_path_buf()]),
            FileFilter::new(vec!["_test.go".into(), "_singleton.go".into()]),
        )
    }

    fn run(index: &SourceIndex, ledger: &GenericsLedger, package: &str, target: &str) -> Result<TaskOutput> {
        let frame = ResolverFrame::root(Overlap::new(package, target, vec![]));
        let request = TaskRequest::root(package, target, frame, Vec::new());
        FacadeGenerator::new(index, ledger, package).run(&request)
    }

    /// Run a root instantiated with scalar arguments and resolve its frames.
    fn run_resolved(
        index: &SourceIndex,
        ledger: &GenericsLedger,
        package: &str,
        target: &str,
        arguments: &[&str],
    ) -> TaskOutput {
        let written = arguments.iter().map(|a| TypeExpr::Named(a.to_string())).collect();
        let frame = ResolverFrame::root(Overlap::new(package, target, written));
        let arguments = arguments.iter().map(|a| a.to_string()).collect();
        let request = TaskRequest::root(package, target, Arc::clone(&frame), arguments);
        let output = FacadeGenerator::new(index, ledger, package)
            .run(&request)
            .unwrap();
        frame.complete(&Binding::new(), ledger);
        output
    }

    fn identities(output: &TaskOutput) -> Vec<String> {
        output
            .functions
            .iter()
            .map(|f| format!("{} {}", f.name, f.identity().unwrap()))
            .collect()
    }

    fn names(output: &TaskOutput) -> Vec<String> {
        output.functions.iter().map(|f| f.name.clone()).collect()
    }

    #[test]
    fn test_methods_fields_and_composition() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/svc",
            &[(
                "svc.go",
                r#"
package svc

import "io"

type inner struct{}

func (i *inner) Flush() error { return nil }

type service struct {
    inner
    io.Writer
    Hook   func(name string) error
    hidden func()
    Base   inner `facade:"ignore"`
}

func (s *service) Start(_ int, label string) {}
func (s *service) stop() {}
"#,
            )],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();
        let output = run(&index, &ledger, "example.com/svc", "service").unwrap();

        assert_eq!(names(&output), vec!["Start", "Flush", "Hook"]);
        let start = &output.functions[0];
        assert_eq!(start.arguments(), vec!["p0", "label"]);
        let flush = &output.functions[1];
        assert_eq!(flush.call_path, vec!["inner"]);
        assert_eq!(flush.origin.label, "<inner>");

        assert_eq!(output.requests.len(), 1);
        let request = &output.requests[0];
        assert_eq!(request.package, "io");
        assert_eq!(request.target, "Writer");
        assert_eq!(request.label, "<io.Writer>");
        assert_eq!(request.prefix, vec!["Writer"]);
        assert_eq!(request.level, 2);

        let root = output.root.unwrap();
        assert_eq!(root.kind, TypeKind::Struct);
        assert_eq!(root.first_receiver, Some(true));
    }

    #[test]
    fn test_interface_context_is_sticky() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/deep",
            &[(
                "deep.go",
                r#"
package deep

type il2 interface {
    Ilvl2() error
}

type il1 interface {
    il2
    error
    Ilvl1() error
}

type deep struct {
    il1
}
"#,
            )],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();
        let output = run(&index, &ledger, "example.com/deep", "deep").unwrap();

        assert_eq!(names(&output), vec!["Ilvl2", "Error", "Ilvl1"]);
        assert!(output.functions.iter().all(|f| f.interface));
        assert!(output
            .functions
            .iter()
            .all(|f| f.call_path == vec!["il1".to_string()]));
    }

    #[test]
    fn test_cycle_terminates() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/cycle",
            &[(
                "cycle.go",
                r#"
package cycle

type a struct {
    *b
}

type b struct {
    *a
}

func (x *a) A() {}
func (x *b) B() {}
"#,
            )],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();
        let output = run(&index, &ledger, "example.com/cycle", "a").unwrap();
        assert_eq!(names(&output), vec!["A", "B"]);

        let again = run(&index, &ledger, "example.com/cycle", "a").unwrap_err();
        assert!(again.is_benign());
    }

    #[test]
    fn test_root_errors() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/bad",
            &[("bad.go", "package bad\n\ntype fn func()\n")],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();
        assert!(matches!(
            run(&index, &ledger, "example.com/bad", "fn"),
            Err(FacadeError::Structural { .. })
        ));
        assert!(matches!(
            run(&index, &ledger, "example.com/bad", "missing"),
            Err(FacadeError::NotFound { .. })
        ));
    }

    #[test]
    fn test_generic_composition_pushes_frames() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/gen",
            &[(
                "gen.go",
                r#"
package gen

type Container[T any] struct{}

func (c *Container[V]) Put(item V) {}

type holder struct {
    Container[int]
}
"#,
            )],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();
        let frame = ResolverFrame::root(Overlap::new("example.com/gen", "holder", vec![]));
        let request = TaskRequest::root("example.com/gen", "holder", Arc::clone(&frame), Vec::new());
        let output = FacadeGenerator::new(&index, &ledger, "example.com/gen")
            .run(&request)
            .unwrap();

        assert_eq!(ledger.formals("example.com/gen", "Container"), Some(vec!["T".to_string()]));
        assert!(!index.mark_visited("example.com/gen", "Container[int]"));

        frame.complete(&Binding::new(), &ledger);
        let put = &output.functions[0];
        let TypeExpr::Pending(placeholder) = &put.signature.params[0].ty else {
            panic!("expected placeholder");
        };
        assert_eq!(placeholder.ident(), "T");
        assert!(matches!(placeholder.resolved(), Some(TypeExpr::Named(n)) if n == "int"));
    }

    #[test]
    fn test_generic_self_embedding_terminates() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/list",
            &[(
                "list.go",
                r#"
package list

type Node[T any] struct {
    *Node[T]
}

func (n *Node[T]) Value() T { var v T; return v }

type Even[T any] struct {
    *Odd[T]
}

type Odd[U any] struct {
    *Even[U]
}

func (e *Even[T]) First() T { var v T; return v }
func (o *Odd[U]) Second() []U { return nil }
"#,
            )],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();

        let output = run_resolved(&index, &ledger, "example.com/list", "Node", &["int"]);
        assert_eq!(identities(&output), vec!["Value func() (int)"]);
        assert!(!index.mark_visited("example.com/list", "Node[int]"));

        let output = run_resolved(&index, &ledger, "example.com/list", "Even", &["string"]);
        assert_eq!(
            identities(&output),
            vec!["First func() (string)", "Second func() ([]string)"]
        );
        assert!(!index.mark_visited("example.com/list", "Odd[string]"));
    }

    #[test]
    fn test_receiver_parameters_keep_package_types() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/gen",
            &[(
                "gen.go",
                r#"
package gen

type T struct{}

type Box[T any] struct{}

func (b *Box[X]) Tag(t T) X { var x X; return x }
func (b *Box[T]) Same(t T) T { return t }

type holder struct {
    Box[int]
}
"#,
            )],
        );

        let index = index(temp.path());
        let ledger = GenericsLedger::default();
        let output = run_resolved(&index, &ledger, "example.com/gen", "holder", &[]);

        assert_eq!(
            identities(&output),
            vec![
                "Tag func(\"example.com/gen\".T) (int)",
                "Same func(int) (int)",
            ]
        );
    }

    #[test]
    fn test_ignore_tag() {
        let field = |tag: &str| FieldDecl {
            names: vec![],
            ty: TypeExpr::Named("x".into()),
            tag: Some(tag.to_string()),
            doc: None,
        };
        assert!(is_ignored(&field("`facade:\"ignore\"`")));
        assert!(is_ignored(&field("`facade:\"ignore,deprecated\"`")));
        assert!(is_ignored(&field("`json:\"x\" facade:\"ignore\"`")));
        assert!(!is_ignored(&field("`json:\"ignore\"`")));
        assert!(!is_ignored(&field("`facade:\"keep\"`")));

        assert!(is_ignored(&field("`singl:\"ignore\"`")));
        assert!(is_ignored(&field("`json:\"x\" singl:\"keep\" facade:\"ignore\"`")));
        assert!(!is_ignored(&field("`xsingl:\"ignore\"`")));
    }

    #[test]
    fn test_visitation_key() {
        assert_eq!(visitation_key("T", ""), "T");
        assert_eq!(visitation_key("T", "int, string"), "T[int, string]");
    }
}
