//! Syntax model lowered from Go source trees.
//!
//! The walker never touches tree-sitter nodes directly: every file is lowered
//! once into these plain values, which are cheap to share between tasks.

use std::fmt;
use std::sync::Arc;

use crate::resolver::Placeholder;

/// Channel direction of a `chan` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A Go type expression.
///
/// `Selector` is how a qualified name appears in source (`io.Reader`, keyed by
/// the import's local name); `Qualified` and `Pending` only appear in output
/// form, after the generator has localized an expression for emission.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// Plain identifier: a builtin (`int`, `error`) or a package-local name.
    Named(String),
    /// `alias.Name` as written in source.
    Selector { alias: String, name: String },
    /// `Name` from the package at import `path`.
    Qualified { path: String, name: String },
    /// Identifier whose final shape is decided by generics resolution.
    Pending(Arc<Placeholder>),
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    Array { len: String, elem: Box<TypeExpr> },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func(Signature),
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },
    /// Verbatim source text for shapes that are only ever echoed back.
    Raw(String),
}

impl TypeExpr {
    /// Strip a single leading pointer.
    pub fn deref(&self) -> (&TypeExpr, bool) {
        match self {
            TypeExpr::Pointer(inner) => (inner, true),
            other => (other, false),
        }
    }

    /// Split a generic instantiation into its base and type arguments.
    pub fn generic_parts(&self) -> (&TypeExpr, &[TypeExpr]) {
        match self {
            TypeExpr::Generic { base, args } => (base, args),
            other => (other, &[]),
        }
    }

    /// The bare type name, if this is a (possibly qualified) name.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Named(name)
            | TypeExpr::Selector { name, .. }
            | TypeExpr::Qualified { name, .. } => Some(name),
            TypeExpr::Pending(placeholder) => Some(placeholder.ident()),
            TypeExpr::Generic { base, .. } => base.type_name(),
            _ => None,
        }
    }
}

/// One entry of a parameter or result list.
///
/// Source grouping is preserved: `a, b, c int` is one `Param` with three names.
#[derive(Debug, Clone)]
pub struct Param {
    /// Declared names; empty for unnamed parameters.
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// `...T` spread marker (only valid on the last parameter).
    pub variadic: bool,
}

impl Param {
    pub fn unnamed(ty: TypeExpr) -> Self {
        Self {
            names: Vec::new(),
            ty,
            variadic: false,
        }
    }

    pub fn is_named(&self) -> bool {
        !self.names.is_empty()
    }

    /// Number of values this entry contributes.
    pub fn arity(&self) -> usize {
        self.names.len().max(1)
    }
}

/// Parameters and results of a function or method.
#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub params: Vec<Param>,
    pub results: Vec<Param>,
}

impl Signature {
    pub fn param_count(&self) -> usize {
        self.params.iter().map(Param::arity).sum()
    }

    pub fn result_count(&self) -> usize {
        self.results.iter().map(Param::arity).sum()
    }
}

/// A struct field, named or embedded.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    /// Field names; empty for an embedded (composed) field.
    pub names: Vec<String>,
    pub ty: TypeExpr,
    /// Raw tag literal including its quotes.
    pub tag: Option<String>,
    pub doc: Option<String>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

/// An element of an interface body.
#[derive(Debug, Clone)]
pub enum InterfaceElem {
    Method {
        name: String,
        signature: Signature,
        doc: Option<String>,
    },
    /// Embedded interface (`io.Reader`, `local`).
    Embedded(TypeExpr),
    /// Constraint terms (`~int | ~float64`), kept verbatim.
    Constraint(String),
}

/// Formal type parameter of a generic declaration.
#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: String,
    pub constraint: TypeExpr,
}

/// `type Name[...] T` declaration.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub ty: TypeExpr,
    /// `type A = B`
    pub alias: bool,
    pub doc: Option<String>,
}

impl TypeSpec {
    pub fn kind(&self) -> TypeKind {
        if self.alias {
            return TypeKind::Alias;
        }
        TypeKind::of(&self.ty)
    }

    pub fn formal_names(&self) -> Vec<String> {
        self.type_params.iter().map(|p| p.name.clone()).collect()
    }
}

/// Method receiver.
#[derive(Debug, Clone)]
pub struct Receiver {
    /// Base type name without pointer or type arguments.
    pub type_name: String,
    pub pointer: bool,
    /// Type parameter names as spelled on the receiver (`T[A, _]`).
    pub type_args: Vec<String>,
}

/// Top-level function or method declaration.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub name: String,
    pub receiver: Option<Receiver>,
    pub signature: Signature,
    pub doc: Option<String>,
}

/// One import line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit local name (`log "github.com/sirupsen/logrus"`).
    pub alias: Option<String>,
    pub path: String,
}

impl ImportSpec {
    /// The name this import is referenced by inside the file.
    pub fn local_name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => package_name(&self.path),
        }
    }
}

/// A lowered source file.
#[derive(Debug, Clone, Default)]
pub struct SourceFile {
    pub path: String,
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub types: Vec<TypeSpec>,
    pub functions: Vec<FuncDecl>,
    pub has_parse_errors: bool,
}

impl SourceFile {
    /// Find the import a selector alias refers to.
    pub fn import_for(&self, alias: &str) -> Option<&ImportSpec> {
        self.imports.iter().find(|i| i.local_name() == alias)
    }
}

/// Kind of a named type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Struct,
    Interface,
    Map,
    Array,
    Slice,
    Pointer,
    Chan,
    Func,
    Named,
    Alias,
}

impl TypeKind {
    pub fn of(expr: &TypeExpr) -> Self {
        match expr {
            TypeExpr::Struct(_) => TypeKind::Struct,
            TypeExpr::Interface(_) => TypeKind::Interface,
            TypeExpr::Map { .. } => TypeKind::Map,
            TypeExpr::Array { .. } => TypeKind::Array,
            TypeExpr::Slice(_) => TypeKind::Slice,
            TypeExpr::Pointer(_) => TypeKind::Pointer,
            TypeExpr::Chan { .. } => TypeKind::Chan,
            TypeExpr::Func(_) => TypeKind::Func,
            _ => TypeKind::Named,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Struct => "struct",
            TypeKind::Interface => "interface",
            TypeKind::Map => "map",
            TypeKind::Array => "array",
            TypeKind::Slice => "slice",
            TypeKind::Pointer => "pointer",
            TypeKind::Chan => "channel",
            TypeKind::Func => "function",
            TypeKind::Named => "named type",
            TypeKind::Alias => "alias",
        }
    }

    /// Kinds a facade can be generated for.
    pub fn is_facade_target(&self) -> bool {
        matches!(
            self,
            TypeKind::Struct | TypeKind::Interface | TypeKind::Map | TypeKind::Array | TypeKind::Slice
        )
    }

    /// Kinds whose instance variable is declared by value in auto mode.
    pub fn is_value_shaped(&self) -> bool {
        matches!(
            self,
            TypeKind::Interface | TypeKind::Map | TypeKind::Array | TypeKind::Slice
        )
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Guess the package name for an import path.
///
/// Major version segments (`/v2`) and `.vN` suffixes (`yaml.v3`) are skipped,
/// dashes become underscores.
pub fn package_name(path: &str) -> String {
    let mut segments = path.trim_matches('"').rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last) {
        if let Some(previous) = segments.next() {
            last = previous;
        }
    }
    let last = match last.rfind(".v") {
        Some(pos) if last[pos + 2..].chars().all(|c| c.is_ascii_digit()) && pos + 2 < last.len() => {
            &last[..pos]
        }
        _ => last,
    };
    let last = last.strip_prefix("go-").unwrap_or(last);
    last.replace(['-', '.'], "_")
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Go exported identifier check.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("fmt"), "fmt");
        assert_eq!(package_name("net/http"), "http");
        assert_eq!(package_name("\"io\""), "io");
        assert_eq!(package_name("gopkg.in/yaml.v3"), "yaml");
        assert_eq!(package_name("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(package_name("github.com/mattn/go-sqlite3"), "sqlite3");
        assert_eq!(package_name("example.com/some-lib"), "some_lib");
    }

    #[test]
    fn test_is_exported() {
        assert!(is_exported("Write"));
        assert!(!is_exported("write"));
        assert!(!is_exported("_"));
        assert!(!is_exported(""));
    }

    #[test]
    fn test_type_kind() {
        assert_eq!(TypeKind::of(&TypeExpr::Struct(vec![])), TypeKind::Struct);
        assert_eq!(
            TypeKind::of(&TypeExpr::Slice(Box::new(TypeExpr::Named("int".into())))),
            TypeKind::Slice
        );
        assert_eq!(TypeKind::of(&TypeExpr::Named("int".into())), TypeKind::Named);
        assert!(TypeKind::Map.is_facade_target());
        assert!(!TypeKind::Func.is_facade_target());
        assert!(TypeKind::Interface.is_value_shaped());
        assert!(!TypeKind::Struct.is_value_shaped());
    }

    #[test]
    fn test_import_local_name() {
        let aliased = ImportSpec {
            alias: Some("log".into()),
            path: "github.com/sirupsen/logrus".into(),
        };
        let plain = ImportSpec {
            alias: None,
            path: "net/http".into(),
        };
        assert_eq!(aliased.local_name(), "log");
        assert_eq!(plain.local_name(), "http");
    }
}
