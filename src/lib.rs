#![forbid(unsafe_code)]

//! `dev-full` runs the backend runtime and the frontend dev server as
//! one local development session.

pub mod config;
pub mod env;
pub mod errors;
pub mod orchestrator;
pub mod port;
pub mod secret;

pub use config::LaunchProfile;
pub use env::SessionConfig;
pub use errors::{AppError, Result};
