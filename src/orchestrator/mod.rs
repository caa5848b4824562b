//! Session orchestration modules.
//!
//! Covers child process launch and ownership, dependency bootstrap,
//! backend readiness polling, and signal-driven shutdown.

pub mod bootstrap;
pub mod child;
pub mod readiness;
pub mod session;
pub mod shutdown;
pub mod spawner;
