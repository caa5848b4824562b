//! Child process launch.
//!
//! Composes the environment for each child from the session configuration
//! and the values derived for this run, then spawns it with inherited
//! standard streams. Both children start from a cleared environment so the
//! merged [`SessionConfig`] is exactly what they see.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::info_span;

use crate::config::LaunchProfile;
use crate::env::{keys, SessionConfig};
use crate::orchestrator::child::{ManagedChild, Role};
use crate::port::LOOPBACK;
use crate::secret::SessionSecret;

/// Environment handed to a child process.
pub type ChildEnv = BTreeMap<String, String>;

const DEFAULT_COOKIE_SECURE: &str = "0";
const DEFAULT_EXPOSE_TOKENS: &str = "1";
const DEFAULT_EMAIL_TRANSPORT: &str = "log";
const DEFAULT_EMAIL_FROM: &str = "Solidus <no-reply@localhost>";

/// Everything the backend launch needs beyond the profile.
#[derive(Debug, Clone)]
pub struct BackendLaunch<'a> {
    /// Runtime executable.
    pub runtime: &'a Path,
    /// Backend package directory (absolute or root-joined).
    pub backend_dir: &'a Path,
    /// Negotiated port.
    pub port: u16,
    /// Session secret.
    pub secret: &'a SessionSecret,
}

/// Pick the proxy target for the frontend.
///
/// The configured override wins, then the `--proxy` flag, then the
/// negotiated backend URL. Blank values are ignored.
#[must_use]
pub fn resolve_proxy_target(
    config: &SessionConfig,
    cli_proxy: Option<&str>,
    backend_url: &str,
) -> String {
    config
        .get_non_empty(keys::BACKEND_PROXY)
        .map(str::to_owned)
        .or_else(|| {
            cli_proxy
                .map(str::trim)
                .filter(|proxy| !proxy.is_empty())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| backend_url.to_owned())
}

/// Compose the backend environment.
#[must_use]
pub fn backend_env(
    config: &SessionConfig,
    profile: &LaunchProfile,
    launch: &BackendLaunch<'_>,
) -> ChildEnv {
    let mut env = base_env(config);
    let or_default = |key: &str, default: &str| config.get(key).unwrap_or(default).to_owned();

    env.insert(keys::AUTH_MASTER_KEY.into(), launch.secret.value().to_owned());
    env.insert(keys::BACKEND_HOST.into(), LOOPBACK.to_string());
    env.insert(keys::BACKEND_PORT.into(), launch.port.to_string());
    env.insert(
        keys::COOKIE_SECURE.into(),
        or_default(keys::COOKIE_SECURE, DEFAULT_COOKIE_SECURE),
    );
    env.insert(
        keys::EXPOSE_DEV_TOKENS.into(),
        or_default(keys::EXPOSE_DEV_TOKENS, DEFAULT_EXPOSE_TOKENS),
    );
    env.insert(
        keys::EXPOSE_INVITE_TOKENS.into(),
        or_default(keys::EXPOSE_INVITE_TOKENS, DEFAULT_EXPOSE_TOKENS),
    );
    env.insert(
        keys::EMAIL_TRANSPORT.into(),
        or_default(keys::EMAIL_TRANSPORT, DEFAULT_EMAIL_TRANSPORT),
    );
    env.insert(
        keys::EMAIL_FROM.into(),
        or_default(keys::EMAIL_FROM, DEFAULT_EMAIL_FROM),
    );
    env.insert(
        keys::PUBLIC_BASE_URL.into(),
        or_default(keys::PUBLIC_BASE_URL, &profile.frontend.url),
    );
    let db = config.get_non_empty(keys::BACKEND_DB).map_or_else(
        || {
            launch
                .backend_dir
                .join(&profile.backend.db_path)
                .to_string_lossy()
                .into_owned()
        },
        str::to_owned,
    );
    env.insert(keys::BACKEND_DB.into(), db);
    env
}

/// Compose the frontend environment.
#[must_use]
pub fn frontend_env(config: &SessionConfig, proxy_target: &str) -> ChildEnv {
    let mut env = base_env(config);
    env.insert(keys::BACKEND_PROXY.into(), proxy_target.to_owned());
    env
}

fn base_env(config: &SessionConfig) -> ChildEnv {
    config
        .iter()
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .collect()
}

/// Build a command with a cleared environment and inherited stdio.
fn inherited_command(
    program: impl AsRef<std::ffi::OsStr>,
    args: &[String],
    cwd: &Path,
    env: &ChildEnv,
) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .env_clear()
        .envs(env)
        .current_dir(cwd)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    cmd
}

/// Spawn the backend in its package directory.
pub fn spawn_backend(
    config: &SessionConfig,
    profile: &LaunchProfile,
    launch: &BackendLaunch<'_>,
) -> ManagedChild {
    let _span = info_span!("spawn_backend", port = launch.port).entered();
    let env = backend_env(config, profile, launch);
    let cmd = inherited_command(launch.runtime, &profile.backend.args, launch.backend_dir, &env);
    ManagedChild::spawn(Role::Backend, cmd)
}

/// Spawn the frontend dev server in the project root.
pub fn spawn_frontend(
    config: &SessionConfig,
    profile: &LaunchProfile,
    root: &Path,
    proxy_target: &str,
) -> ManagedChild {
    let _span = info_span!("spawn_frontend", proxy = proxy_target).entered();
    let env = frontend_env(config, proxy_target);
    let cmd = inherited_command(&profile.frontend.program, &profile.frontend.args, root, &env);
    ManagedChild::spawn(Role::Frontend, cmd)
}

/// Resolve the backend runtime executable.
///
/// Order: configured override, provisioned SDK under `root`, bare fallback
/// name looked up through `PATH`.
#[must_use]
pub fn resolve_runtime(root: &Path, profile: &LaunchProfile, config: &SessionConfig) -> PathBuf {
    if let Some(explicit) = config.get_non_empty(&profile.runtime.env_override) {
        return PathBuf::from(explicit);
    }
    let provisioned = root.join(&profile.runtime.provisioned);
    if provisioned.is_file() {
        return provisioned;
    }
    PathBuf::from(&profile.runtime.fallback)
}

/// Build the dependency bootstrap command for `dir`.
pub(crate) fn bootstrap_command(
    runtime: &Path,
    dir: &Path,
    profile: &LaunchProfile,
    config: &SessionConfig,
) -> Command {
    let env = base_env(config);
    let mut cmd = inherited_command(runtime, &profile.bootstrap.args, dir, &env);
    cmd.kill_on_drop(true);
    cmd
}
