//! Run configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults
//! 2. An optional YAML file (`gofacade.yaml`)
//! 3. Command-line flags

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::instance::DEFAULT_VARIABLE;
use crate::syntax::FileFilter;

/// Default output file suffix.
pub const DEFAULT_SUFFIX: &str = "_singleton.go";

/// Default header comment of generated files.
pub const DEFAULT_COMMENT: &str = "Code generated by gofacade. DO NOT EDIT.";

/// Marker of Go test files, always blacklisted.
pub const TEST_FILE_MARKER: &str = "_test.go";

/// Default config file names to search for.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["gofacade.yaml", ".gofacade.yaml"];

/// YAML configuration file.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub variable: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    /// Wave depth budget (0 = unlimited)
    #[serde(default)]
    pub deep: Option<usize>,
    /// Extra file name substrings to skip
    #[serde(default)]
    pub blacklist: Vec<String>,
    /// GOPATH-style trees searched before the Go environment
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

impl FileConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: FileConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Find a config file in `dir`, then in the user config directory.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let local = DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file());
        if local.is_some() {
            return local;
        }

        let dirs = directories::ProjectDirs::from("", "", "gofacade")?;
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dirs.config_dir().join(name))
            .find(|path| path.is_file())
    }
}

/// Effective settings of one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Import path (or directory) of the root package
    pub package: String,
    /// Root target type name
    pub target: String,
    /// Instance variable, with optional sigil and type arguments
    pub variable: String,
    /// Header comment; empty disables it
    pub comment: String,
    pub suffix: String,
    /// Output file override
    pub filepath: Option<PathBuf>,
    /// Wave depth budget (0 = unlimited)
    pub deep: usize,
    pub write: bool,
    /// Extra file name substrings to skip
    pub blacklist: Vec<String>,
    pub roots: Vec<PathBuf>,
}

impl Config {
    pub fn new(package: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            target: target.into(),
            variable: DEFAULT_VARIABLE.to_string(),
            comment: DEFAULT_COMMENT.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            filepath: None,
            deep: 0,
            write: false,
            blacklist: Vec::new(),
            roots: Vec::new(),
        }
    }

    /// Apply values from a config file.
    pub fn merge_file(&mut self, file: &FileConfig) {
        if let Some(variable) = &file.variable {
            self.variable = variable.clone();
        }
        if let Some(comment) = &file.comment {
            self.comment = comment.clone();
        }
        if let Some(suffix) = &file.suffix {
            self.suffix = suffix.clone();
        }
        if let Some(deep) = file.deep {
            self.deep = deep;
        }
        self.blacklist.extend(file.blacklist.iter().cloned());
        self.roots.extend(file.roots.iter().cloned());
    }

    /// Trim inputs, fill defaults and validate.
    pub fn normalize(&mut self) -> anyhow::Result<()> {
        self.package = self.package.trim().to_string();
        self.target = self.target.trim().to_string();
        self.variable = self.variable.trim().to_string();
        self.comment = self.comment.trim().to_string();
        self.suffix = self.suffix.trim().to_string();
        self.filepath = self
            .filepath
            .take()
            .filter(|path| !path.as_os_str().is_empty());

        if self.package.is_empty() {
            anyhow::bail!("no package submitted");
        }
        if self.target.is_empty() {
            anyhow::bail!("no target submitted");
        }
        if self.variable.is_empty() {
            self.variable = DEFAULT_VARIABLE.to_string();
        }
        if self.suffix.is_empty() {
            self.suffix = DEFAULT_SUFFIX.to_string();
        }
        if self.filepath.is_some() || self.suffix != DEFAULT_SUFFIX {
            self.write = true;
        }
        Ok(())
    }

    /// File name substrings excluded from every package scan.
    pub fn full_blacklist(&self) -> Vec<String> {
        let mut blacklist = vec![TEST_FILE_MARKER.to_string(), self.suffix.clone()];
        for entry in &self.blacklist {
            if !entry.is_empty() && !blacklist.contains(entry) {
                blacklist.push(entry.clone());
            }
        }
        blacklist
    }

    /// Scan filter: the blacklist plus the `filepath` output file itself.
    pub fn file_filter(&self) -> FileFilter {
        let filter = FileFilter::new(self.full_blacklist());
        match &self.filepath {
            Some(path) => filter.exclude(path),
            None => filter,
        }
    }

    /// Output file for a root package living in `package_dir`.
    pub fn output_path(&self, package_dir: &Path) -> PathBuf {
        if let Some(path) = &self.filepath {
            return path.clone();
        }
        let mut chars = self.target.chars();
        let file_stem = match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        package_dir.join(format!("{}{}", file_stem, self.suffix))
    }
}
