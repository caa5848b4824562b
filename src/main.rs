#![forbid(unsafe_code)]

//! `dev-full`: local development session orchestrator binary.
//!
//! Resolves configuration, then hands off to the session driver which
//! starts the backend, waits for it to become healthy, starts the frontend
//! dev server, and supervises both until a signal or an exit.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use dev_full::orchestrator::session::{run_session, SessionOptions};
use dev_full::orchestrator::shutdown::{listen_for_signals, ShutdownToken};
use dev_full::port::parse_port_override;
use dev_full::{AppError, LaunchProfile, Result, SessionConfig};

const AFTER_HELP: &str = "\
Starts:
  - the backend runtime (packages/solidus_backend)
  - the frontend dev server (with /api proxy to the backend)

Env overrides:
  - DART (backend runtime executable)
  - SOLIDUS_BACKEND_PROXY (overrides the frontend proxy target)
  - SOLIDUS_AUTH_MASTER_KEY (backend crypto key; auto-generated if missing)
  - SOLIDUS_EMAIL_FROM / SOLIDUS_EMAIL_TRANSPORT";

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "dev-full",
    about = "Run the backend and frontend dev server as one session",
    version,
    long_about = None,
    after_help = AFTER_HELP
)]
struct Cli {
    /// Use this backend port instead of negotiating one.
    #[arg(long, value_name = "PORT", value_parser = parse_port_override)]
    backend_port: Option<u16>,

    /// Proxy target for the frontend's /api requests.
    #[arg(long, value_name = "URL")]
    proxy: Option<String>,

    /// Project root.
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Launch profile (defaults to `<root>/dev-full.toml` when present).
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("[dev:full] {err}");
        return to_exit_code(err.exit_code());
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(args)) {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "session failed before start");
            err.exit_code()
        }
    };
    to_exit_code(code)
}

async fn run(args: Cli) -> Result<i32> {
    let root = args.root;
    let config = SessionConfig::from_process(&root);
    let profile = LaunchProfile::load(&root, args.profile.as_deref())?;
    info!(entries = config.len(), "configuration resolved");

    let shutdown = ShutdownToken::new();
    let stop_listener = CancellationToken::new();
    let listener = listen_for_signals(shutdown.clone(), stop_listener.clone());

    let result = run_session(
        config,
        SessionOptions {
            root,
            backend_port: args.backend_port,
            proxy: args.proxy,
            profile,
        },
        shutdown,
    )
    .await;

    stop_listener.cancel();
    if let Err(err) = listener.await {
        warn!(%err, "signal listener task failed");
    }
    result
}

fn to_exit_code(code: i32) -> ExitCode {
    u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
