//! Owned handle for one supervised child process.
//!
//! A [`ManagedChild`] always yields an exit code eventually: a child that
//! could not be spawned behaves like one that exited immediately with
//! [`SPAWN_FAILURE_CODE`], so spawn failures flow through the same exit
//! path as real exits.

use std::fmt::{Display, Formatter};
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

/// Exit code reported for a child whose process could not be started.
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Which half of the session a child is.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Role {
    /// The application backend runtime.
    Backend,
    /// The frontend asset dev server.
    Frontend,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Backend => f.write_str("backend"),
            Self::Frontend => f.write_str("frontend"),
        }
    }
}

/// A spawned (or failed-to-spawn) child process.
#[derive(Debug)]
pub struct ManagedChild {
    role: Role,
    child: Option<Child>,
    pid: Option<u32>,
    exit_code: Option<i32>,
}

impl ManagedChild {
    /// Spawn `cmd`. Failure is recorded as an immediate exit.
    pub fn spawn(role: Role, mut cmd: Command) -> Self {
        match cmd.spawn() {
            Ok(child) => {
                let pid = child.id();
                info!(%role, pid = pid.unwrap_or(0), "process spawned");
                Self {
                    role,
                    child: Some(child),
                    pid,
                    exit_code: None,
                }
            }
            Err(err) => {
                error!(%role, %err, "failed to spawn process");
                Self {
                    role,
                    child: None,
                    pid: None,
                    exit_code: Some(SPAWN_FAILURE_CODE),
                }
            }
        }
    }

    /// Role of this child.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// OS process id, if the child was spawned.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit code once known.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Wait for the child to exit and return its derived exit code.
    ///
    /// Cancel-safe; repeated calls after exit return the cached code.
    pub async fn wait(&mut self) -> i32 {
        if let Some(code) = self.exit_code {
            return code;
        }
        let code = match self.child.as_mut() {
            Some(child) => match child.wait().await {
                Ok(status) => exit_code_of(status),
                Err(err) => {
                    warn!(role = %self.role, %err, "error waiting for child process");
                    1
                }
            },
            None => SPAWN_FAILURE_CODE,
        };
        self.exit_code = Some(code);
        code
    }

    /// Non-blocking check whether the child is still running.
    ///
    /// A child whose status cannot be read counts as running.
    pub fn is_running(&mut self) -> bool {
        if self.exit_code.is_some() {
            return false;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                self.exit_code = Some(exit_code_of(status));
                false
            }
            Ok(None) => true,
            // Status unknown: keep the child under supervision.
            Err(err) => {
                warn!(role = %self.role, %err, "failed to poll child process status");
                true
            }
        }
    }

    /// Ask the child to terminate gracefully (SIGTERM on Unix).
    ///
    /// Best effort: a child that already exited is left alone and
    /// signalling errors are logged and ignored.
    pub fn terminate(&mut self) {
        if !self.is_running() {
            debug!(role = %self.role, "terminate skipped, process not running");
            return;
        }
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            let Some(raw) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
                return;
            };
            match kill(Pid::from_raw(raw), Signal::SIGTERM) {
                Ok(()) => info!(role = %self.role, pid = raw, "sent SIGTERM"),
                Err(err) => debug!(role = %self.role, pid = raw, %err, "SIGTERM not delivered"),
            }
        }
        #[cfg(not(unix))]
        {
            if let Some(child) = self.child.as_mut() {
                if let Err(err) = child.start_kill() {
                    debug!(role = %self.role, %err, "kill not delivered");
                }
            }
        }
    }

    /// Wait up to `grace` for the child to exit, then kill it.
    ///
    /// Always returns; the exit code is `None` only if the child survived
    /// even the forced kill long enough to be unobservable.
    pub async fn reap(&mut self, grace: Duration) -> Option<i32> {
        if self.exit_code.is_some() || self.child.is_none() {
            return self.exit_code;
        }
        if let Ok(code) = tokio::time::timeout(grace, self.wait()).await {
            return Some(code);
        }
        warn!(role = %self.role, ?grace, "process ignored SIGTERM, killing");
        if let Some(child) = self.child.as_mut() {
            if let Err(err) = child.kill().await {
                debug!(role = %self.role, %err, "kill failed");
            }
        }
        self.is_running();
        self.exit_code
    }
}

/// Map an exit status to a shell-style exit code.
///
/// Signal deaths on Unix become `128 + signal`.
#[must_use]
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
