//! The optional TOML settings file.
//!
//! Unlike env vars, the file is typed and sectioned:
//!
//! ```toml
//! [server]
//! bind_addr = "0.0.0.0:9000"
//! queue_capacity = 200
//! workers = 8
//!
//! [agent]
//! model = "gpt-4o"
//! max_iterations = 12
//!
//! [retention]
//! max_completed_tasks = 50
//! max_failed_tasks = 20
//! sweep_secs = 120
//! ```
//!
//! Lookup order: `$ADK_CONFIG_FILE` when set, otherwise
//! `<config root>/adk/config.toml` where the config root is
//! `$XDG_CONFIG_HOME` or the platform default. Every key is optional and a
//! missing file yields an empty overlay; only unreadable or malformed files
//! are errors.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{LoadError, APP_NAME};

#[derive(Debug, Default, Deserialize, PartialEq)]
pub(crate) struct FileSettings {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub agent: AgentSection,
    #[serde(default)]
    pub retention: RetentionSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub(crate) struct ServerSection {
    pub bind_addr: Option<String>,
    pub queue_capacity: Option<usize>,
    pub workers: Option<usize>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub(crate) struct AgentSection {
    pub model: Option<String>,
    pub max_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub(crate) struct RetentionSection {
    pub max_completed_tasks: Option<usize>,
    pub max_failed_tasks: Option<usize>,
    pub sweep_secs: Option<u64>,
}

fn candidate_path() -> Option<PathBuf> {
    if let Some(explicit) = std::env::var_os("ADK_CONFIG_FILE") {
        return Some(PathBuf::from(explicit));
    }
    let root = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(root.join(APP_NAME).join("config.toml"))
}

/// Reads the settings file overlay. No file means no overlay.
pub(crate) fn load() -> Result<FileSettings, LoadError> {
    let Some(path) = candidate_path().filter(|p| p.is_file()) else {
        return Ok(FileSettings::default());
    };
    let text = std::fs::read_to_string(&path).map_err(|source| LoadError::FileRead {
        path: path.clone(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| LoadError::FileParse { path, source })
}
