//! gofacade - facade generator for Go types.
//!
//! Given a Go package and a type declared in it, gofacade generates one
//! package-level function per exported operation of the type. Each function
//! forwards to a shared instance variable, through the embedding path that
//! promotes the operation.
//!
//! # Architecture
//!
//! - `syntax`: tree-sitter Go parsing, lowered into a small syntax model
//! - `index`: package location, parse cache and visitation ledger
//! - `generator`: the composition-graph walk of one target
//! - `resolver`: two-phase generics resolution over a frame tree
//! - `scheduler`: the per-run session and cross-package waves
//! - `checker`: duplicate and conflict detection
//! - `emit` / `instance`: Go source assembly
//! - `config` / `report`: settings and console diagnostics

pub mod checker;
pub mod cli;
pub mod config;
pub mod emit;
pub mod error;
pub mod finder;
pub mod generator;
pub mod index;
pub mod instance;
pub mod namer;
pub mod report;
pub mod resolver;
pub mod scheduler;
pub mod syntax;

use std::sync::{Mutex, MutexGuard};

pub use checker::{CheckOutcome, DuplicateChecker, Rejection};
pub use config::Config;
pub use error::{FacadeError, RejectionKind};
pub use generator::{FacadeGenerator, TaskOutput, TaskRequest};
pub use index::{PackageLocator, SourceIndex};
pub use scheduler::{Generated, Session};
pub use syntax::{GoProvider, SyntaxProvider};

/// Lock a mutex, recovering the data of a poisoned one.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
