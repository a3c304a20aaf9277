//! Command-line interface for gofacade.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{Config, FileConfig};
use crate::index::PackageLocator;
use crate::report::{self, RunSummary};
use crate::scheduler::{write_output, Session};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Generate package-level facade functions for a Go type.
///
/// Every exported method of the target, of its embedded types and of the
/// interfaces it composes becomes a top-level function forwarding to a
/// shared instance variable.
#[derive(Parser, Debug)]
#[command(name = "gofacade")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Import path (or directory) of the package declaring the target
    pub package: String,

    /// Name of the target type
    pub target: String,

    /// Instance variable: `Name`, `*Name` (value), `&Name` (reference), `Name[int, string]`
    #[arg(short, long)]
    pub variable: Option<String>,

    /// Header comment of the generated file (empty to omit)
    #[arg(long)]
    pub comment: Option<String>,

    /// Output file suffix (implies --write when not the default)
    #[arg(short, long)]
    pub suffix: Option<String>,

    /// Output file path (implies --write)
    #[arg(short, long)]
    pub filepath: Option<PathBuf>,

    /// Maximum composition depth followed across packages (0 = unlimited)
    #[arg(short, long)]
    pub deep: Option<usize>,

    /// Write the output next to the target instead of printing it
    #[arg(short, long)]
    pub write: bool,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Extra GOPATH-style source root, searched first (repeatable)
    #[arg(short, long = "root")]
    pub roots: Vec<PathBuf>,

    /// Print a JSON run summary on stderr
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Merge the config file and flags into the effective configuration.
    pub fn to_config(&self, file: Option<&FileConfig>) -> anyhow::Result<Config> {
        let mut config = Config::new(&self.package, &self.target);
        if let Some(file) = file {
            config.merge_file(file);
        }

        if let Some(variable) = &self.variable {
            config.variable = variable.clone();
        }
        if let Some(comment) = &self.comment {
            config.comment = comment.clone();
        }
        if let Some(suffix) = &self.suffix {
            config.suffix = suffix.clone();
        }
        if let Some(deep) = self.deep {
            config.deep = deep;
        }
        config.filepath = self.filepath.clone();
        config.write |= self.write;
        let mut roots = self.roots.clone();
        roots.append(&mut config.roots);
        config.roots = roots;

        config.normalize()?;
        Ok(config)
    }
}

/// Run the generator.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    let working_dir = std::env::current_dir()?;

    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => FileConfig::discover(&working_dir),
    };
    let file = match config_path {
        Some(path) => match FileConfig::parse_file(&path) {
            Ok(file) => {
                report::debug(format!("using config {}", path.display()));
                Some(file)
            }
            Err(e) => {
                report::critical(format!("failed to parse config {}: {}", path.display(), e));
                return Ok(EXIT_ERROR);
            }
        },
        None => None,
    };

    let config = match cli.to_config(file.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            report::critical(e.to_string());
            return Ok(EXIT_ERROR);
        }
    };

    let locator = PackageLocator::from_env(config.roots.clone(), &working_dir);
    let session = Session::new(config, locator);
    let generated = match session.generate() {
        Ok(generated) => generated,
        Err(e) => {
            report::critical(format!("{:#}", e));
            return Ok(EXIT_ERROR);
        }
    };

    let output = if session.config().write {
        let path = session.config().output_path(&generated.dir);
        write_output(&path, &generated.source)?;
        report::info(format!("Wrote {}", path.display()));
        Some(path)
    } else {
        print!("{}", generated.source);
        None
    };

    report::write_rejections(&generated.outcome.rejected);

    if cli.json {
        report::write_json(&RunSummary {
            version: env!("CARGO_PKG_VERSION").to_string(),
            package: generated.package.clone(),
            target: session.config().target.clone(),
            output: output.map(|path| path.display().to_string()),
            packages_loaded: generated.packages_loaded,
            delegates: generated.delegate_names(),
            implemented: generated.implemented().iter().cloned().collect(),
            rejected: report::group_rejections(&generated.outcome.rejected),
        })?;
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "gofacade",
            "example.com/app",
            "Service",
            "--variable",
            "&Shared[int]",
            "--deep",
            "2",
            "--root",
            "a",
            "--root",
            "b",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.package, "example.com/app");
        assert_eq!(cli.target, "Service");
        assert_eq!(cli.deep, Some(2));
        assert_eq!(cli.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(cli.json);
        assert!(!cli.write);
    }

    #[test]
    fn test_flags_override_file() {
        let cli = Cli::try_parse_from(["gofacade", "example.com/app", "Service", "-s", "_facade.go", "-r", "cli-root"])
            .unwrap();
        let file = FileConfig {
            variable: Some("*Shared".into()),
            suffix: Some("_gen.go".into()),
            deep: Some(3),
            roots: vec![PathBuf::from("file-root")],
            ..Default::default()
        };

        let config = cli.to_config(Some(&file)).unwrap();
        assert_eq!(config.variable, "*Shared");
        assert_eq!(config.suffix, "_facade.go");
        assert_eq!(config.deep, 3);
        assert!(config.write);
        assert_eq!(
            config.roots,
            vec![PathBuf::from("cli-root"), PathBuf::from("file-root")]
        );
    }

    #[test]
    fn test_missing_target_rejected() {
        let cli = Cli::try_parse_from(["gofacade", "example.com/app", " "]).unwrap();
        assert!(cli.to_config(None).is_err());
    }
}
