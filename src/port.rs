//! Loopback port negotiation.
//!
//! The listener used to discover a port is dropped before the backend
//! binds it, so another process may grab the port in between. That window
//! is accepted for a local development tool.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::{AppError, Result};

/// Host every negotiated port is bound on.
pub const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// Find a free loopback port, trying `preferred` first and falling back to
/// an OS-assigned ephemeral port.
///
/// # Errors
///
/// Returns `AppError::Port` if even the ephemeral bind fails.
pub async fn negotiate_port(preferred: u16) -> Result<u16> {
    match probe(preferred).await {
        Ok(port) => Ok(port),
        Err(err) => {
            debug!(preferred, %err, "preferred port unavailable, asking the OS");
            let port = probe(0)
                .await
                .map_err(|err| AppError::Port(format!("no loopback port available: {err}")))?;
            info!(preferred, port, "preferred port busy, using ephemeral port");
            Ok(port)
        }
    }
}

async fn probe(port: u16) -> std::io::Result<u16> {
    let listener = TcpListener::bind(SocketAddr::from((LOOPBACK, port))).await?;
    let bound = listener.local_addr()?.port();
    drop(listener);
    Ok(bound)
}

/// Parse a caller-supplied port override.
///
/// Used as the `--backend-port` value parser, so a rejection surfaces as a
/// usage error before anything is spawned.
///
/// # Errors
///
/// Returns `AppError::Port` if `raw` is not an integer in `1..=65535`.
pub fn parse_port_override(raw: &str) -> Result<u16> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| AppError::Port(format!("invalid backend port: {raw}")))?;
    u16::try_from(value)
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| AppError::Port(format!("invalid backend port: {raw}")))
}

/// Base URL of a backend listening on `port`.
#[must_use]
pub fn backend_url(port: u16) -> String {
    format!("http://{LOOPBACK}:{port}")
}
