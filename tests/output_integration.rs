//! End-to-end tests of output assembly and writing.

mod common;

use std::fs;
use std::path::Path;

use common::{config, generate, generate_with};
use gofacade::scheduler::write_output;
use gofacade::{Config, PackageLocator, Session};
use tempfile::TempDir;

const SERVICE: &str = r#"package service

import (
	"context"
	stdio "io"
)

type Service struct {
	stdio.Closer
}

// Start launches the workers.
func (s *Service) Start(ctx context.Context, workers ...int) error {
	return nil
}
"#;

fn write_service(root: &Path) -> std::path::PathBuf {
    let dir = root.join("example.com/service");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("service.go"), SERVICE).unwrap();
    dir
}

fn session(root: &Path, config: Config) -> Session {
    Session::new(config, PackageLocator::with_roots(vec![root.to_path_buf()]))
}

#[test]
fn test_rerun_is_byte_identical() {
    let first = generate("example.com/shop", "store").source;
    for _ in 0..5 {
        assert_eq!(generate("example.com/shop", "store").source, first);
    }
}

#[test]
fn test_custom_comment_and_variable() {
    let mut config = config("example.com/clash", "duo");
    config.comment = "Facade for duo.\nRegenerate with gofacade.".to_string();
    config.variable = "Default".to_string();
    let source = generate_with(config).source;

    assert!(source.starts_with("// Facade for duo.\n// Regenerate with gofacade.\n\npackage clash\n"));
    assert!(source.contains("var Default *duo\n"));
    assert!(source.contains("return Default.reader.Read()"));
}

#[test]
fn test_empty_comment_omits_header() {
    let mut config = config("example.com/clash", "empty");
    config.comment = String::new();
    let source = generate_with(config).source;
    assert_eq!(source, "package clash\n\nvar Instance *empty\n");
}

#[test]
fn test_imports_follow_rendered_references() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path());

    let generated = session(temp.path(), config("example.com/service", "Service"))
        .generate()
        .expect("generation should succeed");

    // io is not available under the temporary root, so Close is skipped
    assert_eq!(generated.delegate_names(), vec!["Start"]);
    assert!(generated
        .source
        .contains("package service\n\nimport \"context\"\n\nvar Instance *Service\n"));
    assert!(generated.source.contains(
        "// Start launches the workers.\nfunc Start(ctx context.Context, workers ...int) error {\n\treturn Instance.Start(ctx, workers...)\n}\n"
    ));
}

#[test]
fn test_write_mode_and_regeneration() {
    let temp = TempDir::new().unwrap();
    let dir = write_service(temp.path());

    let mut config = config("example.com/service", "Service");
    config.suffix = "_facade.go".to_string();
    config.normalize().unwrap();
    assert!(config.write);

    let session = session(temp.path(), config.clone());
    let generated = session.generate().unwrap();
    let path = config.output_path(&generated.dir);
    assert_eq!(path, dir.join("service_facade.go"));
    write_output(&path, &generated.source).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), generated.source);

    // the generated file is excluded from the next scan
    let again = self::session(temp.path(), config).generate().unwrap();
    assert_eq!(again.source, generated.source);
}

#[test]
fn test_filepath_override() {
    let temp = TempDir::new().unwrap();
    write_service(temp.path());
    let target = temp.path().join("out").join("facade.go");
    fs::create_dir_all(target.parent().unwrap()).unwrap();

    let mut config = config("example.com/service", "Service");
    config.filepath = Some(target.clone());
    config.normalize().unwrap();
    assert!(config.write);

    let generated = session(temp.path(), config.clone()).generate().unwrap();
    assert_eq!(config.output_path(&generated.dir), target);
}

#[test]
fn test_root_package_by_directory() {
    let temp = TempDir::new().unwrap();
    let dir = write_service(temp.path());

    let config = config(&dir.to_string_lossy(), "Service");
    let generated = session(temp.path(), config).generate().unwrap();
    assert_eq!(generated.delegate_names(), vec!["Start"]);
    assert_eq!(generated.dir.canonicalize().unwrap(), dir.canonicalize().unwrap());
}

#[test]
fn test_filepath_excludes_only_the_output_file() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("example.com/api");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("restapi.go"),
        "package api\n\ntype Server struct{}\n\nfunc (s *Server) Serve() {}\n",
    )
    .unwrap();
    fs::write(dir.join("myapi.go"), "package api\n\nfunc (s *Server) Stop() {}\n").unwrap();
    // stale output of an earlier run
    fs::write(dir.join("api.go"), "package api\n\nfunc (s *Server) Leftover() {}\n").unwrap();

    let mut config = config("example.com/api", "Server");
    config.filepath = Some(dir.join("api.go"));
    let generated = session(temp.path(), config).generate().unwrap();
    assert_eq!(generated.delegate_names(), vec!["Stop", "Serve"]);

    let mut config = self::config("example.com/api", "Server");
    config.filepath = Some(temp.path().join("out").join("api.go"));
    let generated = session(temp.path(), config).generate().unwrap();
    assert_eq!(generated.delegate_names(), vec!["Leftover", "Stop", "Serve"]);
}
