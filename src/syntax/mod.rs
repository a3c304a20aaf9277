//! Syntax-tree and type-information provider.
//!
//! The walker consumes Go packages through the [`SyntaxProvider`] trait:
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Package dir     │────▶│ GoProvider   │────▶│ SourceFile    │
//! └─────────────────┘     │ (tree-sitter)│     │ (lowered AST) │
//!                         └──────────────┘     └───────────────┘
//!                                                      │
//!                                                      ▼
//!                                              ┌───────────────┐
//!                                              │ TypeInfo      │
//!                                              │ (name → decl) │
//!                                              └───────────────┘
//! ```

mod go;
mod model;
mod scalar;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub use go::GoProvider;
pub use model::{
    is_exported, package_name, ChanDir, FieldDecl, FuncDecl, ImportSpec, InterfaceElem, Param,
    Receiver, Signature, SourceFile, TypeExpr, TypeKind, TypeParam, TypeSpec,
};
pub use scalar::is_scalar;

/// Parsed files of one package, keyed by file name.
///
/// A `BTreeMap` keeps file iteration sorted, which the walk relies on for
/// deterministic output.
pub type FileSet = BTreeMap<String, SourceFile>;

/// Type object for one declared type name.
#[derive(Debug, Clone)]
pub struct TypeObject {
    pub kind: TypeKind,
    /// Formal type parameter names in declaration order.
    pub type_params: Vec<String>,
}

/// Identifier → type-object map of a package.
#[derive(Debug, Clone, Default)]
pub struct TypeInfo {
    pub package: Option<String>,
    pub types: BTreeMap<String, TypeObject>,
}

impl TypeInfo {
    pub fn lookup(&self, name: &str) -> Option<&TypeObject> {
        self.types.get(name)
    }
}

/// Source of syntax trees and type information.
///
/// Implementations must be shareable between discovery tasks.
pub trait SyntaxProvider: Send + Sync {
    /// Parse every source file directly inside `dir`, minus those `filter` skips.
    fn parse_directory(&self, dir: &Path, filter: &FileFilter) -> anyhow::Result<FileSet>;

    /// Build the identifier → type-object map for a parsed package.
    fn type_check(&self, files: &FileSet) -> TypeInfo {
        let mut info = TypeInfo::default();
        for file in files.values() {
            if info.package.is_none() && !file.package.is_empty() {
                info.package = Some(file.package.clone());
            }
            for spec in &file.types {
                info.types.entry(spec.name.clone()).or_insert_with(|| TypeObject {
                    kind: spec.kind(),
                    type_params: spec.formal_names(),
                });
            }
        }
        info
    }
}

/// Files left out of every package scan.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    /// File name substrings.
    blacklist: Vec<String>,
    /// Exact files, canonicalized when they exist.
    excluded: Vec<PathBuf>,
}

impl FileFilter {
    pub fn new(blacklist: Vec<String>) -> Self {
        Self {
            blacklist,
            excluded: Vec::new(),
        }
    }

    /// Also skip exactly the file at `path`.
    pub fn exclude(mut self, path: &Path) -> Self {
        self.excluded.push(canonical(path));
        self
    }

    pub fn skips(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        if is_blacklisted(&name, &self.blacklist) {
            return true;
        }
        !self.excluded.is_empty() && self.excluded.contains(&canonical(path))
    }
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Whether a file name is excluded by a substring blacklist.
pub fn is_blacklisted(file_name: &str, blacklist: &[String]) -> bool {
    blacklist
        .iter()
        .filter(|entry| !entry.is_empty())
        .any(|entry| file_name.contains(entry.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blacklist() {
        let blacklist = vec!["_test.go".to_string(), "_singleton.go".to_string()];
        assert!(is_blacklisted("service_test.go", &blacklist));
        assert!(is_blacklisted("service_singleton.go", &blacklist));
        assert!(!is_blacklisted("service.go", &blacklist));
        assert!(!is_blacklisted("service.go", &[String::new()]));
    }

    #[test]
    fn test_filter_excludes_exact_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let output = temp.path().join("api.go");
        std::fs::write(&output, "package svc\n").unwrap();
        std::fs::write(temp.path().join("restapi.go"), "package svc\n").unwrap();

        let filter = FileFilter::new(vec!["_test.go".to_string()]).exclude(&output);
        assert!(filter.skips(&output));
        assert!(filter.skips(&temp.path().join("api_test.go")));
        assert!(!filter.skips(&temp.path().join("restapi.go")));
        assert!(!filter.skips(&temp.path().join("myapi.go")));

        // the same file reached through a relative component
        let indirect = temp.path().join(".").join("api.go");
        assert!(filter.skips(&indirect));
    }

    #[test]
    fn test_default_type_check() {
        let provider = GoProvider::new();
        let mut files = FileSet::new();
        files.insert(
            "a.go".to_string(),
            SourceFile {
                path: "a.go".to_string(),
                package: "demo".to_string(),
                types: vec![TypeSpec {
                    name: "Box".to_string(),
                    type_params: vec![TypeParam {
                        name: "T".to_string(),
                        constraint: TypeExpr::Named("any".to_string()),
                    }],
                    ty: TypeExpr::Struct(vec![]),
                    alias: false,
                    doc: None,
                }],
                ..Default::default()
            },
        );

        let info = provider.type_check(&files);
        assert_eq!(info.package.as_deref(), Some("demo"));
        let object = info.lookup("Box").unwrap();
        assert_eq!(object.kind, TypeKind::Struct);
        assert_eq!(object.type_params, vec!["T".to_string()]);
    }
}
