//! Package location and the per-run package cache.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{FacadeError, Result};
use crate::lock;
use crate::report;
use crate::syntax::{package_name, FileFilter, FileSet, SyntaxProvider, TypeInfo};

lazy_static! {
    static ref MODULE_PATTERN: Regex = Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#).unwrap();
}

/// Resolves Go import paths to directories.
#[derive(Debug, Clone, Default)]
pub struct PackageLocator {
    roots: Vec<PathBuf>,
    /// Module path and root directory of the enclosing Go module.
    module: Option<(String, PathBuf)>,
    goroot: Option<PathBuf>,
    gopath: Vec<PathBuf>,
}

impl PackageLocator {
    /// Locator searching only the given GOPATH-style roots.
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }

    /// Locator for the current environment.
    pub fn from_env(roots: Vec<PathBuf>, working_dir: &Path) -> Self {
        let goroot = match std::env::var_os("GOROOT").filter(|v| !v.is_empty()) {
            Some(value) => Some(PathBuf::from(value)),
            None => {
                report::caution("GOROOT is not set");
                ["/usr/local/go", "/usr/lib/go"]
                    .iter()
                    .map(PathBuf::from)
                    .find(|p| p.is_dir())
            }
        };

        let gopath = match std::env::var_os("GOPATH").filter(|v| !v.is_empty()) {
            Some(value) => std::env::split_paths(&value).collect(),
            None => {
                report::caution("GOPATH is not set");
                directories::BaseDirs::new()
                    .map(|dirs| vec![dirs.home_dir().join("go")])
                    .unwrap_or_default()
            }
        };

        Self {
            roots,
            module: find_module(working_dir),
            goroot,
            gopath,
        }
    }

    /// Directory of an import path.
    pub fn locate(&self, import_path: &str) -> Option<PathBuf> {
        for root in &self.roots {
            let candidate = root.join(import_path);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }

        if let Some((module, module_root)) = &self.module {
            let rest = if import_path == module {
                Some("")
            } else {
                import_path
                    .strip_prefix(module.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
            };
            if let Some(rest) = rest {
                let candidate = module_root.join(rest);
                if candidate.is_dir() {
                    return Some(candidate);
                }
            }
        }

        if let Some(goroot) = &self.goroot {
            let candidate = goroot.join("src").join(import_path);
            if candidate.is_dir() {
                return Some(candidate);
            }
        }

        self.gopath
            .iter()
            .map(|path| path.join("src").join(import_path))
            .find(|candidate| candidate.is_dir())
    }

    /// Import path and directory of the root package.
    ///
    /// The root may also be given as a directory, in which case its import
    /// path is derived from the search root or module containing it.
    pub fn resolve_root(&self, package: &str) -> Option<(String, PathBuf)> {
        let literal = Path::new(package);
        if literal.is_dir() {
            let dir = literal.canonicalize().unwrap_or_else(|_| literal.to_path_buf());
            return Some((self.import_path_of(&dir, package), dir));
        }
        self.locate(package)
            .map(|dir| (package.trim_end_matches('/').to_string(), dir))
    }

    fn import_path_of(&self, dir: &Path, fallback: &str) -> String {
        let mut bases: Vec<(String, PathBuf)> = Vec::new();
        for root in &self.roots {
            bases.push((String::new(), root.clone()));
        }
        if let Some((module, module_root)) = &self.module {
            bases.push((module.clone(), module_root.clone()));
        }
        if let Some(goroot) = &self.goroot {
            bases.push((String::new(), goroot.join("src")));
        }
        for path in &self.gopath {
            bases.push((String::new(), path.join("src")));
        }

        for (prefix, base) in bases {
            let base = base.canonicalize().unwrap_or(base);
            if let Ok(rest) = dir.strip_prefix(&base) {
                let rest: Vec<String> = rest
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().to_string())
                    .collect();
                let rest = rest.join("/");
                return match (prefix.is_empty(), rest.is_empty()) {
                    (true, _) => rest,
                    (false, true) => prefix,
                    (false, false) => format!("{}/{}", prefix, rest),
                };
            }
        }
        fallback.trim_end_matches('/').to_string()
    }
}

/// Nearest `go.mod` at or above `dir`.
fn find_module(dir: &Path) -> Option<(String, PathBuf)> {
    let mut current = Some(dir);
    while let Some(path) = current {
        let go_mod = path.join("go.mod");
        if go_mod.is_file() {
            let content = fs::read_to_string(&go_mod).ok()?;
            let module = MODULE_PATTERN.captures(&content)?.get(1)?.as_str().to_string();
            return Some((module, path.to_path_buf()));
        }
        current = path.parent();
    }
    None
}

/// A parsed and type-checked package.
#[derive(Debug)]
pub struct LoadedPackage {
    /// Import path
    pub path: String,
    pub dir: PathBuf,
    /// Package clause name
    pub name: String,
    pub files: FileSet,
    pub info: TypeInfo,
}

#[derive(Debug, Default)]
struct RecordState {
    loaded: Option<Result<Arc<LoadedPackage>>>,
    /// Visitation keys of targets already walked in this package.
    visited: HashSet<String>,
}

#[derive(Debug, Default)]
struct PackageRecord {
    state: Mutex<RecordState>,
}

/// Per-run package cache and visitation ledger.
///
/// A package is parsed at most once however many tasks request it: the
/// registry lock only hands out records, and each record's own lock is held
/// for the duration of its load.
pub struct SourceIndex {
    provider: Arc<dyn SyntaxProvider>,
    locator: PackageLocator,
    filter: FileFilter,
    registry: Mutex<HashMap<String, Arc<PackageRecord>>>,
}

impl SourceIndex {
    pub fn new(provider: Arc<dyn SyntaxProvider>, locator: PackageLocator, filter: FileFilter) -> Self {
        Self {
            provider,
            locator,
            filter,
            registry: Mutex::new(HashMap::new()),
        }
    }

    pub fn locator(&self) -> &PackageLocator {
        &self.locator
    }

    fn record(&self, package: &str) -> Arc<PackageRecord> {
        let mut registry = lock(&self.registry);
        Arc::clone(registry.entry(package.to_string()).or_default())
    }

    /// Load a package by import path.
    pub fn load_package(&self, package: &str) -> Result<Arc<LoadedPackage>> {
        let dir = self.locator.locate(package);
        self.load_with(package, dir)
    }

    /// Load a package whose directory is already known.
    pub fn load_package_at(&self, package: &str, dir: &Path) -> Result<Arc<LoadedPackage>> {
        self.load_with(package, Some(dir.to_path_buf()))
    }

    fn load_with(&self, package: &str, dir: Option<PathBuf>) -> Result<Arc<LoadedPackage>> {
        let record = self.record(package);
        let mut state = lock(&record.state);
        if let Some(loaded) = &state.loaded {
            report::debug(format!("{} already initialized", package));
            return loaded.clone();
        }

        let loaded = self.parse(package, dir);
        state.loaded = Some(loaded.clone());
        loaded
    }

    fn parse(&self, package: &str, dir: Option<PathBuf>) -> Result<Arc<LoadedPackage>> {
        let dir = dir.ok_or_else(|| FacadeError::Load {
            package: package.to_string(),
            reason: "package directory not found".to_string(),
        })?;

        report::debug(format!("parsing {} from {}", package, dir.display()));
        let files = self
            .provider
            .parse_directory(&dir, &self.filter)
            .map_err(|e| FacadeError::Load {
                package: package.to_string(),
                reason: e.to_string(),
            })?;
        if files.is_empty() {
            return Err(FacadeError::Load {
                package: package.to_string(),
                reason: format!("no Go source files in {}", dir.display()),
            });
        }

        let info = self.provider.type_check(&files);
        let name = info
            .package
            .clone()
            .unwrap_or_else(|| package_name(package));
        Ok(Arc::new(LoadedPackage {
            path: package.to_string(),
            dir,
            name,
            files,
            info,
        }))
    }

    /// Record a visit; returns `true` only for the first visitor.
    pub fn mark_visited(&self, package: &str, key: &str) -> bool {
        let record = self.record(package);
        let mut state = lock(&record.state);
        state.visited.insert(key.to_string())
    }

    /// Package clause names of every successfully loaded package.
    pub fn package_names(&self) -> HashMap<String, String> {
        let records: Vec<(String, Arc<PackageRecord>)> = lock(&self.registry)
            .iter()
            .map(|(path, record)| (path.clone(), Arc::clone(record)))
            .collect();

        records
            .into_iter()
            .filter_map(|(path, record)| {
                let state = lock(&record.state);
                match &state.loaded {
                    Some(Ok(package)) => Some((path, package.name.clone())),
                    _ => None,
                }
            })
            .collect()
    }

    pub fn loaded_count(&self) -> usize {
        self.package_names().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::GoProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Provider counting directory parses.
    struct CountingProvider {
        inner: GoProvider,
        parses: AtomicUsize,
    }

    impl SyntaxProvider for CountingProvider {
        fn parse_directory(&self, dir: &Path, filter: &FileFilter) -> anyhow::Result<FileSet> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            self.inner.parse_directory(dir, filter)
        }
    }

    fn write_package(root: &Path, import_path: &str, files: &[(&str, &str)]) {
        let dir = root.join(import_path);
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
    }

    #[test]
    fn test_locate_in_roots() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "example.com/a", &[("a.go", "package a\n")]);

        let locator = PackageLocator::with_roots(vec![temp.path().to_path_buf()]);
        assert_eq!(
            locator.locate("example.com/a"),
            Some(temp.path().join("example.com/a"))
        );
        assert_eq!(locator.locate("example.com/missing"), None);
    }

    #[test]
    fn test_resolve_root_from_directory() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "example.com/a/b", &[("b.go", "package b\n")]);

        let locator = PackageLocator::with_roots(vec![temp.path().to_path_buf()]);
        let dir = temp.path().join("example.com/a/b");
        let (import_path, _) = locator.resolve_root(dir.to_str().unwrap()).unwrap();
        assert_eq!(import_path, "example.com/a/b");
    }

    #[test]
    fn test_module_lookup() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("go.mod"), "module example.com/mod\n\ngo 1.21\n").unwrap();
        write_package(temp.path(), "inner", &[("x.go", "package inner\n")]);

        let (module, root) = find_module(&temp.path().join("inner")).unwrap();
        assert_eq!(module, "example.com/mod");
        assert_eq!(root, temp.path());
    }

    #[test]
    fn test_load_once_and_blacklist() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/a",
            &[
                ("a.go", "package a\n\ntype T struct{}\n"),
                ("a_test.go", "package a\n\ntype Fixture struct{}\n"),
                ("t_singleton.go", "package a\n\nvar Instance *T\n"),
            ],
        );

        let provider = Arc::new(CountingProvider {
            inner: GoProvider::new(),
            parses: AtomicUsize::new(0),
        });
        let index = SourceIndex::new(
            provider.clone(),
            PackageLocator::with_roots(vec![temp.path().to_path_buf()]),
            FileFilter::new(vec!["_test.go".into(), "_singleton.go".into()]),
        );

        let first = index.load_package("example.com/a").unwrap();
        let second = index.load_package("example.com/a").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(provider.parses.load(Ordering::SeqCst), 1);
        assert_eq!(first.files.len(), 1);
        assert_eq!(first.name, "a");
        assert!(first.info.lookup("T").is_some());
        assert_eq!(index.package_names().get("example.com/a").map(String::as_str), Some("a"));
    }

    #[test]
    fn test_concurrent_loads_parse_once() {
        let temp = TempDir::new().unwrap();
        write_package(temp.path(), "example.com/a", &[("a.go", "package a\n")]);

        let provider = Arc::new(CountingProvider {
            inner: GoProvider::new(),
            parses: AtomicUsize::new(0),
        });
        let index = Arc::new(SourceIndex::new(
            provider.clone(),
            PackageLocator::with_roots(vec![temp.path().to_path_buf()]),
            FileFilter::default(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                std::thread::spawn(move || index.load_package("example.com/a").is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(provider.parses.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_package_is_cached_error() {
        let index = SourceIndex::new(
            Arc::new(GoProvider::new()),
            PackageLocator::with_roots(vec![]),
            FileFilter::default(),
        );
        let err = index.load_package("example.com/nowhere").unwrap_err();
        assert!(matches!(err, FacadeError::Load { .. }));
        assert!(index.load_package("example.com/nowhere").is_err());
        assert_eq!(index.loaded_count(), 0);
    }

    #[test]
    fn test_mark_visited() {
        let index = SourceIndex::new(
            Arc::new(GoProvider::new()),
            PackageLocator::with_roots(vec![]),
            FileFilter::default(),
        );
        assert!(index.mark_visited("example.com/a", "T"));
        assert!(!index.mark_visited("example.com/a", "T"));
        assert!(index.mark_visited("example.com/a", "T[int]"));
        assert!(index.mark_visited("example.com/b", "T"));
    }
}
