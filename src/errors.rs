//! Error types shared across the orchestrator.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Exit code used for every failure detected before a child is spawned.
pub const PRE_SPAWN_EXIT_CODE: i32 = 2;

/// Application error enumeration covering all orchestrator failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Launch profile parsing or validation failure.
    Config(String),
    /// Port override was rejected or no loopback port could be bound.
    Port(String),
    /// The secure random source could not produce a session secret.
    Secret(String),
    /// A required project directory does not exist.
    MissingDirectory(String),
    /// The dependency bootstrap tool failed; carries its exit code.
    Bootstrap {
        /// Human-readable description of the failure.
        message: String,
        /// Exit code the orchestrator should terminate with.
        code: i32,
    },
    /// File-system or I/O operation failure.
    Io(String),
}

impl AppError {
    /// Process exit code the orchestrator should use for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Bootstrap { code, .. } => *code,
            _ => PRE_SPAWN_EXIT_CODE,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Port(msg) => write!(f, "port: {msg}"),
            Self::Secret(msg) => write!(f, "secret: {msg}"),
            Self::MissingDirectory(msg) => write!(f, "missing directory: {msg}"),
            Self::Bootstrap { message, code } => write!(f, "bootstrap: {message} (code {code})"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid launch profile: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
