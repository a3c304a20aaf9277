//! Generics resolution.
//!
//! Resolution is two-phase. While walking, every package-local identifier that
//! could be a type parameter is emitted as a [`Placeholder`] registered on the
//! current [`ResolverFrame`]. Frames form a tree mirroring the composition
//! graph; a frame created for a composed generic type carries an [`Overlap`]
//! with the concrete arguments written at the composition site.
//!
//! Once the whole graph is known, [`ResolverFrame::complete`] runs top-down:
//! each frame maps its formal parameter names to its overlap arguments (the
//! arguments themselves resolved through the parent's binding), then resolves
//! its own placeholders while its children complete concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::lock;
use crate::report;
use crate::syntax::{FieldDecl, InterfaceElem, Param, Signature, TypeExpr};

/// Formal type parameter name → concrete type (output form).
pub type Binding = HashMap<String, TypeExpr>;

/// Identifier awaiting generics resolution.
#[derive(Debug)]
pub struct Placeholder {
    ident: String,
    /// Import path of the package the identifier was written in.
    package: String,
    resolved: OnceLock<TypeExpr>,
}

impl Placeholder {
    /// Placeholder not registered on any frame.
    pub fn detached(ident: impl Into<String>, package: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            ident: ident.into(),
            package: package.into(),
            resolved: OnceLock::new(),
        })
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    pub fn package(&self) -> &str {
        &self.package
    }

    pub fn resolved(&self) -> Option<&TypeExpr> {
        self.resolved.get()
    }

    /// Resolve against `binding`, falling back to the identifier itself.
    pub fn resolve_with(&self, binding: &Binding) {
        let value = self.lookup(binding);
        // a placeholder shared between frames keeps its first resolution
        let _ = self.resolved.set(value);
    }

    fn lookup(&self, binding: &Binding) -> TypeExpr {
        binding.get(&self.ident).cloned().unwrap_or_else(|| TypeExpr::Qualified {
            path: self.package.clone(),
            name: self.ident.clone(),
        })
    }
}

/// Concrete arguments supplied where a generic type is composed.
#[derive(Debug, Clone)]
pub struct Overlap {
    pub package: String,
    pub target: String,
    /// Arguments in the composing type's context (may contain placeholders).
    pub arguments: Vec<TypeExpr>,
}

impl Overlap {
    pub fn new(package: impl Into<String>, target: impl Into<String>, arguments: Vec<TypeExpr>) -> Self {
        Self {
            package: package.into(),
            target: target.into(),
            arguments,
        }
    }

    fn label(&self) -> String {
        format!("{}.{}", self.package, self.target)
    }
}

/// Formal type parameter names of every walked declaration.
#[derive(Debug, Default)]
pub struct GenericsLedger {
    formals: Mutex<HashMap<(String, String), Vec<String>>>,
}

impl GenericsLedger {
    pub fn record(&self, package: &str, target: &str, formals: Vec<String>) {
        lock(&self.formals).insert((package.to_string(), target.to_string()), formals);
    }

    pub fn formals(&self, package: &str, target: &str) -> Option<Vec<String>> {
        lock(&self.formals)
            .get(&(package.to_string(), target.to_string()))
            .cloned()
    }
}

/// One node of the resolver tree.
#[derive(Debug)]
pub struct ResolverFrame {
    overlap: Overlap,
    pending: Mutex<Vec<Arc<Placeholder>>>,
    children: Mutex<Vec<Arc<ResolverFrame>>>,
}

impl ResolverFrame {
    /// Root frame; `overlap` holds the caller-supplied arguments.
    pub fn root(overlap: Overlap) -> Arc<Self> {
        Arc::new(Self::new(overlap))
    }

    fn new(overlap: Overlap) -> Self {
        Self {
            overlap,
            pending: Mutex::new(Vec::new()),
            children: Mutex::new(Vec::new()),
        }
    }

    /// Push a child frame for a composed type.
    pub fn push(&self, overlap: Overlap) -> Arc<ResolverFrame> {
        let child = Arc::new(Self::new(overlap));
        lock(&self.children).push(Arc::clone(&child));
        child
    }

    /// Create a placeholder owned by this frame.
    pub fn placeholder(&self, ident: &str, package: &str) -> Arc<Placeholder> {
        let placeholder = Placeholder::detached(ident, package);
        lock(&self.pending).push(Arc::clone(&placeholder));
        placeholder
    }

    /// Build this frame's binding from the parent's.
    pub fn bind(&self, inherited: &Binding, ledger: &GenericsLedger) -> Binding {
        let mut binding = Binding::new();
        let Some(formals) = ledger.formals(&self.overlap.package, &self.overlap.target) else {
            return binding;
        };

        let arguments = &self.overlap.arguments;
        if formals.len() != arguments.len() {
            if formals.is_empty() {
                report::caution(format!(
                    "{} is not generic, type arguments ignored",
                    self.overlap.label()
                ));
            } else {
                report::caution(format!(
                    "{} expects {} type arguments, got {}",
                    self.overlap.label(),
                    formals.len(),
                    arguments.len()
                ));
            }
        }

        for (formal, argument) in formals.iter().zip(arguments) {
            binding.insert(formal.clone(), resolve_expr(argument, inherited));
        }
        binding
    }

    /// Resolve every placeholder in this subtree.
    ///
    /// Children complete concurrently with the local rewrite; the call returns
    /// once the whole subtree is resolved.
    pub fn complete(&self, inherited: &Binding, ledger: &GenericsLedger) {
        let binding = self.bind(inherited, ledger);
        let children = lock(&self.children).clone();
        let pending = lock(&self.pending).clone();

        rayon::scope(|scope| {
            let binding = &binding;
            for child in &children {
                scope.spawn(move |_| child.complete(binding, ledger));
            }
            scope.spawn(move |_| {
                for placeholder in &pending {
                    placeholder.resolve_with(binding);
                }
            });
        });
    }
}

/// Substitute placeholders in `expr` through `binding`.
///
/// Already resolved placeholders keep their resolution.
pub fn resolve_expr(expr: &TypeExpr, binding: &Binding) -> TypeExpr {
    match expr {
        TypeExpr::Pending(placeholder) => match placeholder.resolved() {
            Some(resolved) => resolved.clone(),
            None => placeholder.lookup(binding),
        },
        TypeExpr::Named(_)
        | TypeExpr::Selector { .. }
        | TypeExpr::Qualified { .. }
        | TypeExpr::Raw(_) => expr.clone(),
        TypeExpr::Pointer(inner) => TypeExpr::Pointer(Box::new(resolve_expr(inner, binding))),
        TypeExpr::Slice(inner) => TypeExpr::Slice(Box::new(resolve_expr(inner, binding))),
        TypeExpr::Array { len, elem } => TypeExpr::Array {
            len: len.clone(),
            elem: Box::new(resolve_expr(elem, binding)),
        },
        TypeExpr::Map { key, value } => TypeExpr::Map {
            key: Box::new(resolve_expr(key, binding)),
            value: Box::new(resolve_expr(value, binding)),
        },
        TypeExpr::Chan { dir, elem } => TypeExpr::Chan {
            dir: *dir,
            elem: Box::new(resolve_expr(elem, binding)),
        },
        TypeExpr::Func(signature) => TypeExpr::Func(resolve_signature(signature, binding)),
        TypeExpr::Struct(fields) => TypeExpr::Struct(
            fields
                .iter()
                .map(|field| FieldDecl {
                    ty: resolve_expr(&field.ty, binding),
                    ..field.clone()
                })
                .collect(),
        ),
        TypeExpr::Interface(elems) => TypeExpr::Interface(
            elems
                .iter()
                .map(|elem| match elem {
                    InterfaceElem::Method {
                        name,
                        signature,
                        doc,
                    } => InterfaceElem::Method {
                        name: name.clone(),
                        signature: resolve_signature(signature, binding),
                        doc: doc.clone(),
                    },
                    InterfaceElem::Embedded(ty) => InterfaceElem::Embedded(resolve_expr(ty, binding)),
                    InterfaceElem::Constraint(text) => InterfaceElem::Constraint(text.clone()),
                })
                .collect(),
        ),
        TypeExpr::Generic { base, args } => TypeExpr::Generic {
            base: Box::new(resolve_expr(base, binding)),
            args: args.iter().map(|arg| resolve_expr(arg, binding)).collect(),
        },
    }
}

fn resolve_signature(signature: &Signature, binding: &Binding) -> Signature {
    let map = |params: &[Param]| {
        params
            .iter()
            .map(|param| Param {
                ty: resolve_expr(&param.ty, binding),
                ..param.clone()
            })
            .collect()
    };
    Signature {
        params: map(&signature.params),
        results: map(&signature.results),
    }
}
