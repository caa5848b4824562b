//! Launch profile parsing and validation.
//!
//! The profile describes *how* the two children are launched: where the
//! backend lives, which runtime and arguments to use, how readiness is
//! probed and how long shutdown may take. Every field has a default that
//! matches the stock project layout, so the file is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Profile file looked up in the project root when `--profile` is absent.
pub const PROFILE_FILE_NAME: &str = "dev-full.toml";

/// How the backend runtime executable is located.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RuntimeConfig {
    /// Configuration key whose value overrides the runtime path.
    #[serde(default = "default_runtime_env_override")]
    pub env_override: String,
    /// Project-relative path of a provisioned SDK binary.
    #[serde(default = "default_runtime_provisioned")]
    pub provisioned: PathBuf,
    /// Executable name resolved through `PATH` as a last resort.
    #[serde(default = "default_runtime_fallback")]
    pub fallback: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            env_override: default_runtime_env_override(),
            provisioned: default_runtime_provisioned(),
            fallback: default_runtime_fallback(),
        }
    }
}

fn default_runtime_env_override() -> String {
    crate::env::keys::RUNTIME.into()
}

fn default_runtime_provisioned() -> PathBuf {
    PathBuf::from(".dart-sdk").join("dart-sdk").join("bin").join("dart")
}

fn default_runtime_fallback() -> String {
    "dart".into()
}

/// Backend launch settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BackendConfig {
    /// Arguments passed to the runtime.
    #[serde(default = "default_backend_args")]
    pub args: Vec<String>,
    /// Default database file, relative to the backend directory.
    #[serde(default = "default_backend_db_path")]
    pub db_path: PathBuf,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            args: default_backend_args(),
            db_path: default_backend_db_path(),
        }
    }
}

fn default_backend_args() -> Vec<String> {
    vec!["run".into(), "bin/server.dart".into()]
}

fn default_backend_db_path() -> PathBuf {
    PathBuf::from(".cache").join("dev_full").join("solidus.sqlite")
}

/// Dependency bootstrap run before the backend is spawned.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BootstrapConfig {
    /// Whether the bootstrap step runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Directory-relative file whose presence means dependencies are resolved.
    #[serde(default = "default_bootstrap_marker")]
    pub marker: PathBuf,
    /// Arguments passed to the runtime to resolve dependencies.
    #[serde(default = "default_bootstrap_args")]
    pub args: Vec<String>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            marker: default_bootstrap_marker(),
            args: default_bootstrap_args(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_bootstrap_marker() -> PathBuf {
    PathBuf::from(".dart_tool").join("package_config.json")
}

fn default_bootstrap_args() -> Vec<String> {
    vec!["pub".into(), "get".into()]
}

/// Frontend dev server launch settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct FrontendConfig {
    /// Program to run in the project root.
    #[serde(default = "default_frontend_program")]
    pub program: String,
    /// Arguments for the program.
    #[serde(default = "default_frontend_args")]
    pub args: Vec<String>,
    /// URL the dev server is reachable at; printed in the startup banner.
    #[serde(default = "default_frontend_url")]
    pub url: String,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            program: default_frontend_program(),
            args: default_frontend_args(),
            url: default_frontend_url(),
        }
    }
}

fn default_frontend_program() -> String {
    if cfg!(windows) {
        "npm.cmd".into()
    } else {
        "npm".into()
    }
}

fn default_frontend_args() -> Vec<String> {
    vec!["run".into(), "dev".into()]
}

fn default_frontend_url() -> String {
    "http://localhost:5173".into()
}

/// Readiness probing of the backend.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ReadinessConfig {
    /// Path of the health endpoint on the backend.
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Delay between polls.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Give up after this long and continue startup anyway.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ReadinessConfig {
    /// Poll interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Overall deadline as a [`Duration`].
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            health_path: default_health_path(),
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_health_path() -> String {
    "/healthz".into()
}

fn default_interval_ms() -> u64 {
    200
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Shutdown behaviour.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ShutdownConfig {
    /// How long each child gets to exit after SIGTERM before it is killed.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl ShutdownConfig {
    /// Grace period as a [`Duration`].
    #[must_use]
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_ms: default_grace_ms(),
        }
    }
}

fn default_grace_ms() -> u64 {
    5_000
}

fn default_backend_dir() -> PathBuf {
    PathBuf::from("packages").join("solidus_backend")
}

fn default_preferred_port() -> u16 {
    8080
}

/// Launch profile parsed from `dev-full.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LaunchProfile {
    /// Backend package directory, relative to the project root.
    #[serde(default = "default_backend_dir")]
    pub backend_dir: PathBuf,
    /// Port tried first by the port negotiator.
    #[serde(default = "default_preferred_port")]
    pub preferred_port: u16,
    /// Runtime executable lookup.
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Backend launch settings.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Dependency bootstrap settings.
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
    /// Frontend launch settings.
    #[serde(default)]
    pub frontend: FrontendConfig,
    /// Readiness gate settings.
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// Shutdown settings.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Default for LaunchProfile {
    fn default() -> Self {
        Self {
            backend_dir: default_backend_dir(),
            preferred_port: default_preferred_port(),
            runtime: RuntimeConfig::default(),
            backend: BackendConfig::default(),
            bootstrap: BootstrapConfig::default(),
            frontend: FrontendConfig::default(),
            readiness: ReadinessConfig::default(),
            shutdown: ShutdownConfig::default(),
        }
    }
}

impl LaunchProfile {
    /// Load the profile for a project.
    ///
    /// An explicit `path` must exist. Without one, `root/dev-full.toml` is
    /// used when present and the defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read, contains
    /// invalid TOML, or fails validation.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self> {
        match path {
            Some(explicit) => Self::load_from_path(explicit),
            None => {
                let candidate = root.join(PROFILE_FILE_NAME);
                if candidate.is_file() {
                    Self::load_from_path(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and validate a profile from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read launch profile: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse a profile from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let profile: Self = toml::from_str(raw)?;
        profile.validate()?;
        Ok(profile)
    }

    fn validate(&self) -> Result<()> {
        if self.preferred_port == 0 {
            return Err(AppError::Config(
                "preferred_port must be greater than zero".into(),
            ));
        }
        if self.readiness.interval_ms == 0 {
            return Err(AppError::Config(
                "readiness.interval_ms must be greater than zero".into(),
            ));
        }
        if !self.readiness.health_path.starts_with('/') {
            return Err(AppError::Config(
                "readiness.health_path must start with '/'".into(),
            ));
        }
        if self.frontend.program.trim().is_empty() {
            return Err(AppError::Config("frontend.program must not be empty".into()));
        }
        if self.runtime.fallback.trim().is_empty() {
            return Err(AppError::Config("runtime.fallback must not be empty".into()));
        }
        Ok(())
    }
}
