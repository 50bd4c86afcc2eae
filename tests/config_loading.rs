// tests/config_loading.rs

use std::io::Write;

use tempfile::{NamedTempFile, TempDir};

use migrun::config::{default_config_path, load_and_validate, resolve_config};
use migrun::errors::MigrunError;
use migrun::types::StderrMode;
use migrun_test_utils::builders::ConfigFileBuilder;

#[test]
fn full_config_file_is_loaded() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[discovery]
pattern = "*.Migrations.csproj"
exclude_dirs = ["bin"]

[command]
program = "dotnet"
args = ["run", "--project", "{{project}}", "--", "--quiet"]
no_build_arg = "--no-build"
stderr = "discard"

[status]
initial = "Starting..."
max_line_length = 120
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.discovery.pattern, "*.Migrations.csproj");
    assert_eq!(cfg.discovery.exclude_dirs, vec!["bin"]);
    assert_eq!(cfg.command.args[2], "{project}");
    assert_eq!(cfg.command.stderr, StderrMode::Discard);
    assert_eq!(cfg.status.initial, "Starting...");
    assert_eq!(cfg.status.max_line_length, 120);
}

#[test]
fn missing_sections_fall_back_to_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[command]
program = "custom-runner"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    let defaults = ConfigFileBuilder::new().build();

    assert_eq!(cfg.command.program, "custom-runner");
    assert_eq!(cfg.command.args, defaults.command.args);
    assert_eq!(cfg.discovery.pattern, "*DbMigrator.csproj");
    assert_eq!(cfg.status.initial, "Running...");
    assert_eq!(cfg.status.max_line_length, 90);
}

#[test]
fn empty_program_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[command]
program = "  "
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(MigrunError::ConfigError(msg)) => assert!(msg.contains("program")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn invalid_glob_returns_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[discovery]
pattern = "[unclosed"
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(MigrunError::ConfigError(msg)) => assert!(msg.contains("[unclosed")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn unknown_stderr_mode_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[command]
stderr = "shout"
"#
    )
    .unwrap();

    match load_and_validate(file.path()) {
        Err(MigrunError::TomlError(_)) => {}
        Err(e) => panic!("Expected TomlError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[status\nmax_line_length = ").unwrap();

    assert!(matches!(
        load_and_validate(file.path()),
        Err(MigrunError::TomlError(_))
    ));
}

#[test]
fn resolve_prefers_explicit_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join(default_config_path()),
        "[command]\nprogram = \"from-working-dir\"\n",
    )
    .unwrap();

    let mut explicit = NamedTempFile::new().unwrap();
    write!(explicit, "[command]\nprogram = \"from-flag\"\n").unwrap();

    let cfg = resolve_config(Some(explicit.path()), dir.path()).unwrap();
    assert_eq!(cfg.command.program, "from-flag");

    let cfg = resolve_config(None, dir.path()).unwrap();
    assert_eq!(cfg.command.program, "from-working-dir");
}

#[test]
fn resolve_without_any_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let cfg = resolve_config(None, dir.path()).unwrap();
    assert_eq!(cfg.command.program, "dotnet");
}

#[test]
fn explicit_missing_file_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    assert!(matches!(
        resolve_config(Some(&missing), dir.path()),
        Err(MigrunError::IoError(_))
    ));
}
