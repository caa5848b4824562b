//! Session configuration resolution.
//!
//! Merges the optional `.env.local` settings file with the process
//! environment into one immutable [`SessionConfig`]. This is the only
//! module that reads the ambient environment; everything downstream
//! receives the merged mapping explicitly.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

/// Settings file looked up in the project root.
pub const ENV_FILE_NAME: &str = ".env.local";

/// Environment keys consumed and produced by the orchestrator.
pub mod keys {
    /// Backend runtime executable override.
    pub const RUNTIME: &str = "DART";
    /// Proxy target handed to the frontend dev server.
    pub const BACKEND_PROXY: &str = "SOLIDUS_BACKEND_PROXY";
    /// Backend session secret.
    pub const AUTH_MASTER_KEY: &str = "SOLIDUS_AUTH_MASTER_KEY";
    /// Backend bind host.
    pub const BACKEND_HOST: &str = "SOLIDUS_BACKEND_HOST";
    /// Backend bind port.
    pub const BACKEND_PORT: &str = "SOLIDUS_BACKEND_PORT";
    /// Whether the backend marks cookies `Secure`.
    pub const COOKIE_SECURE: &str = "SOLIDUS_BACKEND_COOKIE_SECURE";
    /// Expose development-only auth tokens in API responses.
    pub const EXPOSE_DEV_TOKENS: &str = "SOLIDUS_EXPOSE_DEV_TOKENS";
    /// Expose invite tokens in API responses.
    pub const EXPOSE_INVITE_TOKENS: &str = "SOLIDUS_EXPOSE_INVITE_TOKENS";
    /// Email transport mode.
    pub const EMAIL_TRANSPORT: &str = "SOLIDUS_EMAIL_TRANSPORT";
    /// Email sender address.
    pub const EMAIL_FROM: &str = "SOLIDUS_EMAIL_FROM";
    /// Public base URL used in links the backend generates.
    pub const PUBLIC_BASE_URL: &str = "SOLIDUS_PUBLIC_BASE_URL";
    /// Backend database file path.
    pub const BACKEND_DB: &str = "SOLIDUS_BACKEND_DB";
}

/// Merged key/value configuration for one session.
///
/// Built once at startup; read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    vars: HashMap<String, String>,
}

impl SessionConfig {
    /// Resolve the configuration from `root/.env.local` and the process
    /// environment.
    #[must_use]
    pub fn from_process(root: &Path) -> Self {
        let ambient = std::env::vars_os()
            .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)));
        Self::resolve(&root.join(ENV_FILE_NAME), ambient)
    }

    /// Merge the settings file at `path` with `ambient`; ambient entries win.
    ///
    /// A missing or unreadable file contributes nothing.
    pub fn resolve<I>(path: &Path, ambient: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars = load_env_file(path);
        vars.extend(ambient);
        Self { vars }
    }

    /// Value for `key`, if present (possibly empty).
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value for `key`, treating an empty string as absent.
    #[must_use]
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the configuration holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// Read and parse a settings file. Missing or unreadable files yield an
/// empty mapping.
#[must_use]
pub fn load_env_file(path: &Path) -> HashMap<String, String> {
    match fs::read_to_string(path) {
        Ok(contents) => parse_env_file(&contents),
        Err(err) => {
            debug!(path = %path.display(), %err, "settings file not loaded");
            HashMap::new()
        }
    }
}

/// Parse `KEY=value` lines.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Keys and
/// values are trimmed, and one layer of matching `"` or `'` quotes is
/// stripped from the value.
#[must_use]
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for raw_line in contents.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_owned(), unquote(value.trim()).to_owned());
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
