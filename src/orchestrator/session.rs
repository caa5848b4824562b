//! One development session, from port negotiation to exit.
//!
//! Ordering: prerequisites, port, secret, backend spawn, readiness gate,
//! frontend spawn, then supervision until a signal or either child's exit
//! drives the [`ShutdownCoordinator`]. The backend is always spawned before
//! the frontend, and the frontend only after the gate has resolved.

use std::path::PathBuf;

use tracing::{error, info, info_span, warn, Instrument};

use crate::config::LaunchProfile;
use crate::env::SessionConfig;
use crate::orchestrator::bootstrap::{ensure_dependencies, require_backend_dir};
use crate::orchestrator::child::Role;
use crate::orchestrator::readiness::ReadinessGate;
use crate::orchestrator::shutdown::{ShutdownCoordinator, ShutdownToken, Trigger};
use crate::orchestrator::spawner::{
    resolve_proxy_target, resolve_runtime, spawn_backend, spawn_frontend, BackendLaunch,
};
use crate::port::{backend_url, negotiate_port};
use crate::secret::provision_secret;
use crate::Result;

/// Caller-supplied inputs for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Project root; the frontend runs here.
    pub root: PathBuf,
    /// Fixed backend port, skipping negotiation.
    pub backend_port: Option<u16>,
    /// Proxy target override for the frontend.
    pub proxy: Option<String>,
    /// Launch profile.
    pub profile: LaunchProfile,
}

/// Run a full session and return the orchestrator's exit code.
///
/// # Errors
///
/// Returns an error only for failures before the backend is spawned
/// (missing backend dir, bootstrap failure, no port, no secret). Once a
/// child exists every outcome is an exit code.
pub async fn run_session(
    config: SessionConfig,
    options: SessionOptions,
    shutdown: ShutdownToken,
) -> Result<i32> {
    let span = info_span!("session", root = %options.root.display());
    run(config, options, shutdown).instrument(span).await
}

async fn run(
    config: SessionConfig,
    options: SessionOptions,
    shutdown: ShutdownToken,
) -> Result<i32> {
    let SessionOptions {
        root,
        backend_port,
        proxy,
        profile,
    } = options;

    let backend_dir = require_backend_dir(&root, &profile)?;
    let runtime = resolve_runtime(&root, &profile, &config);
    ensure_dependencies(
        &runtime,
        &[root.as_path(), backend_dir.as_path()],
        &profile,
        &config,
        &shutdown,
    )
    .await?;

    let port = match backend_port {
        Some(port) => port,
        None => negotiate_port(profile.preferred_port).await?,
    };
    let backend_url = backend_url(port);
    let proxy_target = resolve_proxy_target(&config, proxy.as_deref(), &backend_url);
    let secret = provision_secret(&config)?;

    info!("backend: {backend_url}");
    info!("frontend /api proxy -> {proxy_target}");
    info!("open: {}/?backend=1", profile.frontend.url.trim_end_matches('/'));

    let mut coordinator = ShutdownCoordinator::new(profile.shutdown.grace());
    if let Some(signal) = shutdown.signal() {
        return Ok(coordinator.shutdown(Trigger::Signal(signal), &mut []).await);
    }

    let mut backend = spawn_backend(
        &config,
        &profile,
        &BackendLaunch {
            runtime: &runtime,
            backend_dir: &backend_dir,
            port,
            secret: &secret,
        },
    );

    let gate = ReadinessGate::new(
        format!("{backend_url}{}", profile.readiness.health_path),
        &profile.readiness,
    );
    let early_exit = tokio::select! {
        check = gate.wait(shutdown.cancellation()) => {
            if !check.ready && !shutdown.is_triggered() {
                warn!(
                    timeout_ms = profile.readiness.timeout_ms,
                    "starting frontend without a healthy backend"
                );
            }
            None
        }
        code = backend.wait() => Some(child_exit(Role::Backend, code)),
    };
    let early_trigger = early_exit.or_else(|| shutdown.signal().map(Trigger::Signal));
    if let Some(trigger) = early_trigger {
        return Ok(coordinator.shutdown(trigger, &mut [&mut backend]).await);
    }

    let mut frontend = spawn_frontend(&config, &profile, &root, &proxy_target);

    let trigger = tokio::select! {
        code = backend.wait() => child_exit(Role::Backend, code),
        code = frontend.wait() => child_exit(Role::Frontend, code),
        signal = shutdown.triggered() => Trigger::Signal(signal),
    };
    Ok(coordinator
        .shutdown(trigger, &mut [&mut frontend, &mut backend])
        .await)
}

fn child_exit(role: Role, code: i32) -> Trigger {
    if code == 0 {
        info!(%role, "process exited");
    } else {
        error!(%role, code, "process exited with code {code}");
    }
    Trigger::ChildExit { role, code }
}
