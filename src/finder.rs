//! Locates a type declaration and its methods.

use crate::syntax::{FileSet, FuncDecl, SourceFile, TypeSpec};

/// Scans one file for a named type and the methods bound to it.
pub struct MemberFinder<'t> {
    target: &'t str,
}

/// What [`MemberFinder`] found in one file.
#[derive(Debug)]
pub struct FileMembers<'a> {
    pub declaration: Option<&'a TypeSpec>,
    pub methods: Vec<&'a FuncDecl>,
}

impl<'t> MemberFinder<'t> {
    pub fn new(target: &'t str) -> Self {
        Self { target }
    }

    pub fn scan<'a>(&self, file: &'a SourceFile) -> FileMembers<'a> {
        let declaration = file.types.iter().find(|spec| spec.name == self.target);
        let methods = file
            .functions
            .iter()
            .filter(|func| {
                func.receiver
                    .as_ref()
                    .map(|receiver| receiver.type_name == self.target)
                    .unwrap_or(false)
            })
            .collect();
        FileMembers {
            declaration,
            methods,
        }
    }
}

/// Members of one target across a whole package.
///
/// Each entry keeps the file it came from so selector types can be resolved
/// against that file's imports.
#[derive(Debug, Default)]
pub struct TargetMembers<'a> {
    pub declaration: Option<(&'a SourceFile, &'a TypeSpec)>,
    pub methods: Vec<(&'a SourceFile, &'a FuncDecl)>,
}

impl<'a> TargetMembers<'a> {
    /// Scan every file of a package in file-name order.
    pub fn collect(files: &'a FileSet, target: &str) -> Self {
        let finder = MemberFinder::new(target);
        let mut members = TargetMembers::default();

        for file in files.values() {
            let found = finder.scan(file);
            if members.declaration.is_none() {
                members.declaration = found.declaration.map(|spec| (file, spec));
            }
            members
                .methods
                .extend(found.methods.into_iter().map(|method| (file, method)));
        }
        members
    }

    pub fn is_found(&self) -> bool {
        self.declaration.is_some()
    }
}
