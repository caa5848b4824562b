//! Unit tests for `AppError` display format and exit code mapping.

use dev_full::errors::PRE_SPAWN_EXIT_CODE;
use dev_full::AppError;

#[test]
fn display_prefixes_each_category() {
    let cases = [
        (AppError::Config("bad".into()), "config: bad"),
        (AppError::Port("bad".into()), "port: bad"),
        (AppError::Secret("bad".into()), "secret: bad"),
        (AppError::MissingDirectory("bad".into()), "missing directory: bad"),
        (AppError::Io("bad".into()), "io: bad"),
    ];
    for (err, expected) in cases {
        assert_eq!(err.to_string(), expected);
    }
}

#[test]
fn bootstrap_display_includes_code() {
    let err = AppError::Bootstrap {
        message: "pub get failed".into(),
        code: 65,
    };
    assert_eq!(err.to_string(), "bootstrap: pub get failed (code 65)");
}

#[test]
fn pre_spawn_failures_exit_with_two() {
    assert_eq!(PRE_SPAWN_EXIT_CODE, 2);
    assert_eq!(AppError::Port("x".into()).exit_code(), 2);
    assert_eq!(AppError::MissingDirectory("x".into()).exit_code(), 2);
    assert_eq!(AppError::Config("x".into()).exit_code(), 2);
}

#[test]
fn bootstrap_failure_exits_with_tool_code() {
    let err = AppError::Bootstrap {
        message: "failed".into(),
        code: 69,
    };
    assert_eq!(err.exit_code(), 69);
}

#[test]
fn io_error_converts() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: AppError = io.into();
    assert!(err.to_string().starts_with("io:"));
}

#[test]
fn toml_error_converts_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(_)));
}
