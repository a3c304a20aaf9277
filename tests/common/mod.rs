//! Shared helpers for the end-to-end tests.

#![allow(dead_code)]

use std::path::PathBuf;

use gofacade::{Config, Generated, PackageLocator, Session};

/// GOPATH-style fixture root.
pub fn fixture_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata").join("src")
}

pub fn config(package: &str, target: &str) -> Config {
    let mut config = Config::new(package, target);
    config.normalize().expect("config should be valid");
    config
}

pub fn generate_with(config: Config) -> Generated {
    let locator = PackageLocator::with_roots(vec![fixture_root()]);
    Session::new(config, locator)
        .generate()
        .expect("generation should succeed")
}

pub fn generate(package: &str, target: &str) -> Generated {
    generate_with(config(package, target))
}

/// Count of `func <name>(` declarations in the output.
pub fn declarations(source: &str, name: &str) -> usize {
    source.matches(&format!("\nfunc {}(", name)).count()
}
