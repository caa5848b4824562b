//! Unit tests for session secret provisioning.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use dev_full::env::{keys, SessionConfig};
use dev_full::secret::{generate_secret, provision_secret, SECRET_LEN};

fn config_with(pairs: &[(&str, &str)]) -> SessionConfig {
    SessionConfig::resolve(
        Path::new("/nonexistent/.env.local"),
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned())),
    )
}

#[test]
fn supplied_secret_is_reused_verbatim() {
    let config = config_with(&[(keys::AUTH_MASTER_KEY, "not-base64 but verbatim")]);
    let secret = provision_secret(&config).expect("secret");
    assert_eq!(secret.value(), "not-base64 but verbatim");
    assert!(!secret.was_generated());
}

#[test]
fn missing_secret_is_generated() {
    let secret = provision_secret(&SessionConfig::default()).expect("secret");
    assert!(secret.was_generated());
    assert_eq!(secret.value().len(), 44);
}

#[test]
fn empty_secret_counts_as_missing() {
    let config = config_with(&[(keys::AUTH_MASTER_KEY, "")]);
    let secret = provision_secret(&config).expect("secret");
    assert!(secret.was_generated());
}

#[test]
fn generated_secret_decodes_to_32_bytes() {
    let encoded = generate_secret().expect("secret");
    let raw = STANDARD.decode(&encoded).expect("valid base64");
    assert_eq!(raw.len(), SECRET_LEN);
    assert_eq!(encoded.len(), 44);
}

#[test]
fn two_runs_produce_different_secrets() {
    let first = provision_secret(&SessionConfig::default()).expect("first");
    let second = provision_secret(&SessionConfig::default()).expect("second");
    assert_ne!(first.value(), second.value());
}

#[test]
fn debug_output_is_redacted() {
    let config = config_with(&[(keys::AUTH_MASTER_KEY, "super-secret-value")]);
    let secret = provision_secret(&config).expect("secret");
    let debug = format!("{secret:?}");
    assert!(!debug.contains("super-secret-value"));
    assert!(debug.contains("redacted"));
}
