//! Session secret provisioning for the backend.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::info;

use crate::env::{keys, SessionConfig};
use crate::{AppError, Result};

/// Raw length of a generated secret in bytes.
pub const SECRET_LEN: usize = 32;

/// The backend's session secret.
///
/// `Debug` is redacted so the value never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionSecret {
    value: String,
    generated: bool,
}

impl SessionSecret {
    /// Base64-encoded secret value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the secret was generated for this run rather than supplied.
    #[must_use]
    pub fn was_generated(&self) -> bool {
        self.generated
    }
}

impl std::fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSecret")
            .field("value", &"<redacted>")
            .field("generated", &self.generated)
            .finish()
    }
}

/// Reuse the configured secret verbatim, or generate a fresh one.
///
/// An empty configured value counts as absent.
///
/// # Errors
///
/// Returns `AppError::Secret` if the OS random source fails.
pub fn provision_secret(config: &SessionConfig) -> Result<SessionSecret> {
    if let Some(existing) = config.get_non_empty(keys::AUTH_MASTER_KEY) {
        info!("using supplied session secret");
        return Ok(SessionSecret {
            value: existing.to_owned(),
            generated: false,
        });
    }

    let value = generate_secret()?;
    info!("generated session secret for this run");
    Ok(SessionSecret {
        value,
        generated: true,
    })
}

/// Draw [`SECRET_LEN`] bytes from the OS CSPRNG and base64-encode them.
///
/// # Errors
///
/// Returns `AppError::Secret` if the OS random source fails.
pub fn generate_secret() -> Result<String> {
    let mut bytes = [0_u8; SECRET_LEN];
    getrandom::fill(&mut bytes)
        .map_err(|err| AppError::Secret(format!("random source unavailable: {err}")))?;
    Ok(STANDARD.encode(bytes))
}
