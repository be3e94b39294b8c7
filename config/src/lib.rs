//! Configuration for the A2A server.
//!
//! Settings resolve in three layers, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. the optional TOML settings file (see [`ServerSettings::load`] for the
//!    lookup order),
//! 3. environment variables.
//!
//! A project `.env` is loaded into the process environment up front via the
//! `dotenv` crate, which never overrides variables that are already set, so
//! real environment always beats `.env`, which beats the file, which beats
//! the defaults.

mod file;
mod settings;

use std::path::PathBuf;
use thiserror::Error;

pub use settings::ServerSettings;

/// Directory name under the platform config root
/// (`~/.config/adk/config.toml` on Linux).
pub const APP_NAME: &str = "adk";

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse config file {path}: {source}")]
    FileParse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid setting {key}: {detail}")]
    Invalid { key: String, detail: String },
}

/// Serializes tests that mutate process environment variables. Env vars are
/// process-global, so concurrent test threads would race without this.
#[cfg(test)]
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();
    LOCK.get_or_init(|| std::sync::Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}
