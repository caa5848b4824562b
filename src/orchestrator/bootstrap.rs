//! Pre-spawn prerequisites: required directories and dependency bootstrap.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::LaunchProfile;
use crate::env::SessionConfig;
use crate::orchestrator::shutdown::ShutdownToken;
use crate::orchestrator::spawner::bootstrap_command;
use crate::{AppError, Result};

/// Resolve and check the backend package directory.
///
/// # Errors
///
/// Returns `AppError::MissingDirectory` if it does not exist.
pub fn require_backend_dir(root: &Path, profile: &LaunchProfile) -> Result<PathBuf> {
    let dir = root.join(&profile.backend_dir);
    if dir.is_dir() {
        Ok(dir)
    } else {
        Err(AppError::MissingDirectory(format!(
            "backend dir {}",
            dir.display()
        )))
    }
}

/// Resolve dependencies in each of `dirs` whose bootstrap marker is missing.
///
/// Directories are handled in order with inherited stdio.
///
/// # Errors
///
/// Returns `AppError::Bootstrap` carrying the tool's exit code if it fails
/// or cannot be started, or the signal's exit code if `shutdown` fires
/// while it runs.
pub async fn ensure_dependencies(
    runtime: &Path,
    dirs: &[&Path],
    profile: &LaunchProfile,
    config: &SessionConfig,
    shutdown: &ShutdownToken,
) -> Result<()> {
    if !profile.bootstrap.enabled {
        return Ok(());
    }
    for dir in dirs {
        let marker = dir.join(&profile.bootstrap.marker);
        if marker.exists() {
            continue;
        }
        info!(
            marker = %marker.display(),
            runtime = %runtime.display(),
            "dependencies not resolved, running bootstrap"
        );
        let mut child = bootstrap_command(runtime, dir, profile, config)
            .spawn()
            .map_err(|err| AppError::Bootstrap {
                message: format!("failed to start {}: {err}", runtime.display()),
                code: 1,
            })?;
        let status = tokio::select! {
            status = child.wait() => status?,
            signal = shutdown.triggered() => {
                child.kill().await.ok();
                return Err(AppError::Bootstrap {
                    message: "interrupted".into(),
                    code: signal.exit_code(),
                });
            }
        };
        if !status.success() {
            return Err(AppError::Bootstrap {
                message: format!("dependency resolution failed in {}", dir.display()),
                code: status.code().unwrap_or(1),
            });
        }
    }
    Ok(())
}
