//! Shared helpers for orchestrator integration tests.
//!
//! Provides a throwaway health endpoint, scratch project roots, and
//! shell-driven launch profiles so tests can exercise real child
//! processes without a backend toolchain.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;

use dev_full::config::LaunchProfile;
use dev_full::env::SessionConfig;

/// A local `/healthz` endpoint that starts answering 200 from a given poll.
pub struct HealthServer {
    pub port: u16,
    pub hits: Arc<AtomicUsize>,
}

impl HealthServer {
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}/healthz", self.port)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn healthz(State((hits, ready_from)): State<(Arc<AtomicUsize>, usize)>) -> StatusCode {
    let poll = hits.fetch_add(1, Ordering::SeqCst) + 1;
    if poll >= ready_from {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Serve `/healthz` on an ephemeral loopback port; the `ready_from`-th
/// request and every later one succeed.
pub async fn spawn_health_server(ready_from: usize) -> HealthServer {
    let hits = Arc::new(AtomicUsize::new(0));
    let app = Router::new()
        .route("/healthz", get(healthz))
        .with_state((Arc::clone(&hits), ready_from));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind health server");
    let port = listener.local_addr().expect("local addr").port();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    HealthServer { port, hits }
}

/// A loopback port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

/// Scratch project root containing the default backend directory.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("backend")).expect("backend dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.file(name), contents).expect("write project file");
    }

    pub fn read(&self, name: &str) -> Option<String> {
        std::fs::read_to_string(self.file(name)).ok()
    }
}

fn toml_string(value: &str) -> String {
    format!("'{value}'")
}

/// Launch profile that runs both children as `sh -c <script>`.
pub fn shell_profile(
    backend_script: &str,
    frontend_script: &str,
    readiness_timeout_ms: u64,
) -> LaunchProfile {
    let raw = shell_profile_toml(backend_script, frontend_script, readiness_timeout_ms);
    LaunchProfile::from_toml_str(&raw).expect("test profile")
}

/// TOML text of [`shell_profile`], for writing a `dev-full.toml`.
pub fn shell_profile_toml(
    backend_script: &str,
    frontend_script: &str,
    readiness_timeout_ms: u64,
) -> String {
    format!(
        r"
backend_dir = 'backend'

[runtime]
env_override = 'DEV_FULL_TEST_RUNTIME_UNSET'
fallback = 'sh'

[backend]
args = ['-c', {backend}]

[bootstrap]
enabled = false

[frontend]
program = 'sh'
args = ['-c', {frontend}]

[readiness]
interval_ms = 200
timeout_ms = {readiness_timeout_ms}

[shutdown]
grace_ms = 3000
",
        backend = toml_string(backend_script),
        frontend = toml_string(frontend_script),
    )
}

/// Session configuration from the test process environment minus any
/// `SOLIDUS_*` keys, plus `extra`.
pub fn session_config(extra: &[(&str, String)]) -> SessionConfig {
    let ambient = std::env::vars()
        .filter(|(key, _)| !key.starts_with("SOLIDUS_"))
        .chain(extra.iter().map(|(k, v)| ((*k).to_owned(), v.clone())));
    SessionConfig::resolve(Path::new("/nonexistent/.env.local"), ambient)
}

/// Wait until `path` exists, up to `timeout`.
pub async fn wait_for_file(path: &Path, timeout: std::time::Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
    }
    path.exists()
}
