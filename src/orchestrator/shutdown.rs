//! Shutdown coordination.
//!
//! [`ShutdownToken`] replaces process-global signal handlers: it is created
//! once at startup, handed to everything that can be interrupted, and
//! remembers which signal arrived first. [`ShutdownCoordinator`] is the
//! single-use `Running -> ShuttingDown -> Exited` state machine that turns
//! the first trigger into an exit code.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::orchestrator::child::{ManagedChild, Role};

/// Termination signal received by the orchestrator.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShutdownSignal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl ShutdownSignal {
    /// Conventional shell exit code for the signal.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Interrupt => 130,
            Self::Terminate => 143,
        }
    }
}

/// Cloneable cancellation handle that records the triggering signal.
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken {
    cancel: CancellationToken,
    signal: Arc<OnceLock<ShutdownSignal>>,
}

impl ShutdownToken {
    /// Create a fresh, untriggered token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signal` and cancel. Only the first signal is kept.
    pub fn trigger(&self, signal: ShutdownSignal) {
        if self.signal.set(signal).is_err() {
            info!(?signal, "shutdown already in progress");
        }
        self.cancel.cancel();
    }

    /// The first signal received, if any.
    #[must_use]
    pub fn signal(&self) -> Option<ShutdownSignal> {
        self.signal.get().copied()
    }

    /// Whether a signal has been received.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Underlying cancellation token, for components that only need to
    /// know *that* the session is being cancelled.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Resolve once a signal has been received.
    pub async fn triggered(&self) -> ShutdownSignal {
        self.cancel.cancelled().await;
        self.signal().unwrap_or(ShutdownSignal::Interrupt)
    }
}

/// Install SIGINT/SIGTERM listeners that feed `token`.
///
/// The task ends after the first signal, or when `stop` is cancelled so the
/// session's exit path can tear it down deterministically.
#[must_use]
pub fn listen_for_signals(token: ShutdownToken, stop: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = stop.cancelled() => {}
            signal = next_signal() => {
                info!(?signal, "shutdown signal received");
                token.trigger(signal);
            }
        }
    })
}

#[cfg(unix)]
async fn next_signal() -> ShutdownSignal {
    let ctrl_c = tokio::signal::ctrl_c();
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => ShutdownSignal::Interrupt,
                _ = sigterm.recv() => ShutdownSignal::Terminate,
            }
        }
        Err(err) => {
            warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
            let _ = ctrl_c.await;
            ShutdownSignal::Interrupt
        }
    }
}

#[cfg(not(unix))]
async fn next_signal() -> ShutdownSignal {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "ctrl-c signal handler failed");
        std::future::pending::<()>().await;
    }
    ShutdownSignal::Interrupt
}

/// What caused the session to begin shutting down.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Trigger {
    /// The orchestrator received a termination signal.
    Signal(ShutdownSignal),
    /// A child exited on its own.
    ChildExit {
        /// Which child exited.
        role: Role,
        /// Its derived exit code.
        code: i32,
    },
}

impl Trigger {
    /// Exit code the orchestrator finishes with for this trigger.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Signal(signal) => signal.exit_code(),
            Self::ChildExit { code, .. } => code,
        }
    }
}

/// Coordinator lifecycle state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    /// Children are (or may be) running.
    Running,
    /// Termination has been requested; children are being stopped.
    ShuttingDown(Trigger),
    /// Terminal state with the final exit code.
    Exited(i32),
}

/// Single-use shutdown state machine.
#[derive(Debug)]
pub struct ShutdownCoordinator {
    phase: Phase,
    grace: Duration,
}

impl ShutdownCoordinator {
    /// New coordinator in [`Phase::Running`].
    #[must_use]
    pub fn new(grace: Duration) -> Self {
        Self {
            phase: Phase::Running,
            grace,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `ShuttingDown`. Returns `false` if shutdown already began;
    /// the first trigger decides the exit code.
    pub fn begin(&mut self, trigger: Trigger) -> bool {
        if self.phase == Phase::Running {
            self.phase = Phase::ShuttingDown(trigger);
            true
        } else {
            false
        }
    }

    /// Move to `Exited`, returning the final exit code.
    ///
    /// Calling this while still `Running` is treated as a clean exit.
    pub fn finish(&mut self) -> i32 {
        let code = match self.phase {
            Phase::Running => 0,
            Phase::ShuttingDown(trigger) => trigger.exit_code(),
            Phase::Exited(code) => code,
        };
        self.phase = Phase::Exited(code);
        code
    }

    /// Run the whole shutdown: signal every child, give each the grace
    /// period, force-kill survivors, and return the exit code.
    ///
    /// Always makes progress to `Exited`, whatever the children do.
    pub async fn shutdown(&mut self, trigger: Trigger, children: &mut [&mut ManagedChild]) -> i32 {
        self.begin(trigger);
        info!(?trigger, "shutting down session");
        for child in children.iter_mut() {
            child.terminate();
        }
        for child in children.iter_mut() {
            child.reap(self.grace).await;
        }
        let code = self.finish();
        info!(code, "session exited");
        code
    }
}
