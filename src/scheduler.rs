//! Run orchestration.
//!
//! A [`Session`] owns every piece of per-run shared state: the package index
//! with its visitation ledger and the generics ledger. The root target is
//! walked first; composition that crosses into another package is then
//! walked in waves, one wave per level of the composition graph. Each wave is
//! a structured task group: tasks are spawned onto a `JoinSet`, the wave
//! completes when every task has joined, and the requests the tasks discovered
//! form the next wave.
//!
//! In-process recursion never leaves a task's package, so tasks are grouped by
//! package and each group runs sequentially in discovery order. Groups of
//! different packages never contend for the same visitation keys, which keeps
//! the output independent of scheduling.

use anyhow::Context;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::checker::{CheckOutcome, DuplicateChecker};
use crate::config::Config;
use crate::emit::{GoFile, TypeWriter, WrappedFunction};
use crate::error::{FacadeError, Result};
use crate::generator::{FacadeGenerator, TaskOutput, TaskRequest};
use crate::index::{PackageLocator, SourceIndex};
use crate::instance::{InstanceDecl, InstanceSpec};
use crate::report;
use crate::resolver::{Binding, GenericsLedger, Overlap, ResolverFrame};
use crate::syntax::GoProvider;

/// Result of a successful generation.
#[derive(Debug)]
pub struct Generated {
    /// Import path of the root package.
    pub package: String,
    /// Directory of the root package.
    pub dir: PathBuf,
    pub source: String,
    pub outcome: CheckOutcome,
    pub packages_loaded: usize,
}

impl Generated {
    pub fn delegate_names(&self) -> Vec<String> {
        self.outcome.accepted.iter().map(|f| f.name.clone()).collect()
    }

    pub fn implemented(&self) -> &BTreeSet<String> {
        &self.outcome.implemented
    }
}

/// Shared state of one run.
pub struct Session {
    config: Config,
    index: Arc<SourceIndex>,
    ledger: Arc<GenericsLedger>,
}

impl Session {
    pub fn new(config: Config, locator: PackageLocator) -> Self {
        let filter = config.file_filter();
        let index = SourceIndex::new(Arc::new(GoProvider::new()), locator, filter);
        Self {
            config,
            index: Arc::new(index),
            ledger: Arc::new(GenericsLedger::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Walk, resolve, check and render the facade.
    pub fn generate(&self) -> anyhow::Result<Generated> {
        let (package, dir) = self
            .index
            .locator()
            .resolve_root(&self.config.package)
            .ok_or_else(|| FacadeError::Load {
                package: self.config.package.clone(),
                reason: "package directory not found".to_string(),
            })?;
        self.index.load_package_at(&package, &dir)?;

        let spec = InstanceSpec::parse(&self.config.variable, &package)?;
        let frame = ResolverFrame::root(Overlap::new(
            &package,
            &self.config.target,
            spec.arguments.clone(),
        ));
        let arguments = spec
            .arguments
            .iter()
            .map(|arg| TypeWriter::identity().write_type(arg, 0))
            .collect::<Result<Vec<_>>>()?;

        let request = TaskRequest::root(&package, &self.config.target, Arc::clone(&frame), arguments);
        report::debug(format!("root task {}", request.describe()));
        let root = FacadeGenerator::new(&self.index, &self.ledger, &package).run(&request)?;
        let facts = root.root.clone().ok_or_else(|| FacadeError::NotFound {
            package: package.clone(),
            target: self.config.target.clone(),
        })?;

        let mut functions = root.functions;
        functions.extend(self.run_waves(root.requests, &package)?);

        frame.complete(&Binding::new(), &self.ledger);

        let outcome = DuplicateChecker::new().check(functions)?;
        let reference = spec.shape.is_reference(facts.kind, facts.first_receiver);
        let file = GoFile {
            header: Some(self.config.comment.clone()).filter(|c| !c.is_empty()),
            package_name: facts.package_name,
            package_path: package.clone(),
            package_names: self.index.package_names(),
            instance: InstanceDecl::new(&spec, &package, &self.config.target, reference),
            delegates: outcome.accepted.clone(),
        };
        let source = file.render()?;

        Ok(Generated {
            package,
            dir: facts.dir,
            source,
            outcome,
            packages_loaded: self.index.loaded_count(),
        })
    }

    /// Whether a task at `level` is within the depth budget.
    fn within_depth(&self, level: usize) -> bool {
        self.config.deep == 0 || level <= self.config.deep
    }

    fn run_waves(
        &self,
        requests: Vec<TaskRequest>,
        root_package: &str,
    ) -> anyhow::Result<Vec<WrappedFunction>> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let runtime = tokio::runtime::Runtime::new()?;
        Ok(runtime.block_on(self.drain(requests, root_package)))
    }

    async fn drain(&self, mut wave: Vec<TaskRequest>, root_package: &str) -> Vec<WrappedFunction> {
        let mut functions = Vec::new();
        let mut level = 1;

        while !wave.is_empty() {
            level += 1;
            let (tasks, skipped): (Vec<TaskRequest>, Vec<TaskRequest>) =
                wave.into_iter().partition(|r| self.within_depth(r.level));
            for request in &skipped {
                report::debug(format!("depth limit reached, skipping {}", request.describe()));
            }
            report::debug(format!("wave {}: {} task(s)", level, tasks.len()));

            let outputs = self.run_wave(&tasks, root_package).await;
            wave = Vec::new();
            for output in outputs.into_iter().flatten() {
                functions.extend(output.functions);
                wave.extend(output.requests);
            }
        }
        functions
    }

    /// Run one wave; outputs are returned in request order.
    async fn run_wave(&self, tasks: &[TaskRequest], root_package: &str) -> Vec<Option<TaskOutput>> {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (slot, request) in tasks.iter().enumerate() {
            match groups.iter_mut().find(|(package, _)| *package == request.package) {
                Some((_, slots)) => slots.push(slot),
                None => groups.push((request.package.clone(), vec![slot])),
            }
        }

        let mut join_set: JoinSet<Vec<(usize, Result<TaskOutput>)>> = JoinSet::new();
        for (_, slots) in groups {
            let index = Arc::clone(&self.index);
            let ledger = Arc::clone(&self.ledger);
            let root_package = root_package.to_string();
            let batch: Vec<(usize, TaskRequest)> =
                slots.into_iter().map(|slot| (slot, tasks[slot].clone())).collect();

            join_set.spawn_blocking(move || {
                batch
                    .into_iter()
                    .map(|(slot, request)| {
                        let generator = FacadeGenerator::new(&index, &ledger, &root_package);
                        (slot, generator.run(&request))
                    })
                    .collect()
            });
        }

        let mut outputs: Vec<Option<TaskOutput>> = (0..tasks.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            let results = match joined {
                Ok(results) => results,
                Err(e) => {
                    report::caution(format!("discovery task failed: {}", e));
                    continue;
                }
            };
            for (slot, result) in results {
                match result {
                    Ok(output) => outputs[slot] = Some(output),
                    Err(err) if err.is_benign() => report::debug(err.to_string()),
                    Err(err) => report::caution(format!(
                        "skipping {} {}: {}",
                        tasks[slot].label,
                        tasks[slot].describe(),
                        err
                    )),
                }
            }
        }
        outputs
    }
}

/// Write generated source, replacing any existing file.
///
/// A partially written file is removed on failure.
pub fn write_output(path: &Path, source: &str) -> anyhow::Result<()> {
    if let Err(e) = fs::write(path, source) {
        let _ = fs::remove_file(path);
        return Err(e).with_context(|| format!("failed to write {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn session(root: &Path, package: &str, target: &str) -> Session {
        let mut config = Config::new(package, target);
        config.normalize().unwrap();
        Session::new(config, PackageLocator::with_roots(vec![root.to_path_buf()]))
    }

    fn write_package(root: &Path, import_path: &str, name: &str, content: &str) {
        let dir = root.join(import_path);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_cross_package_wave() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/base",
            "base.go",
            "package base\n\ntype Closer interface {\n\tClose() error\n}\n",
        );
        write_package(
            temp.path(),
            "example.com/app",
            "app.go",
            "package app\n\nimport \"example.com/base\"\n\ntype app struct {\n\tbase.Closer\n}\n\nfunc (a *app) Run() {}\n",
        );

        let generated = session(temp.path(), "example.com/app", "app").generate().unwrap();
        assert_eq!(generated.delegate_names(), vec!["Run", "Close"]);
        assert!(generated.source.contains("var Instance *app\n"));
        assert!(generated.source.contains("// <base.Closer> from example.com/base\n"));
        assert!(generated.source.contains("return Instance.Closer.Close()"));
        assert_eq!(generated.packages_loaded, 2);
    }

    #[test]
    fn test_deep_limits_waves() {
        let temp = TempDir::new().unwrap();
        write_package(
            temp.path(),
            "example.com/base",
            "base.go",
            "package base\n\ntype Closer interface {\n\tClose() error\n}\n",
        );
        write_package(
            temp.path(),
            "example.com/app",
            "app.go",
            "package app\n\nimport \"example.com/base\"\n\ntype app struct {\n\tbase.Closer\n}\n\nfunc (a *app) Run() {}\n",
        );

        let mut config = Config::new("example.com/app", "app");
        config.deep = 1;
        config.normalize().unwrap();
        let session = Session::new(config, PackageLocator::with_roots(vec![temp.path().to_path_buf()]));
        let generated = session.generate().unwrap();
        assert_eq!(generated.delegate_names(), vec!["Run"]);
    }

    #[test]
    fn test_missing_root_package_fails() {
        let temp = TempDir::new().unwrap();
        assert!(session(temp.path(), "example.com/none", "T").generate().is_err());
    }

    #[test]
    fn test_write_output_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out_singleton.go");
        fs::write(&path, "old").unwrap();
        write_output(&path, "package x\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "package x\n");

        let missing = temp.path().join("no-such-dir").join("out.go");
        assert!(write_output(&missing, "package x\n").is_err());
        assert!(!missing.exists());
    }
}
