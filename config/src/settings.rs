//! Typed server settings and the layering that produces them.

use crate::file::{self, FileSettings};
use crate::LoadError;

/// Settings the A2A server reads at startup. Every field has a default;
/// unparseable values are errors rather than silent fallbacks.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerSettings {
    /// Listen address, `A2A_BIND_ADDR` / `[server] bind_addr`.
    pub bind_addr: String,
    /// Model name for the OpenAI-compatible backend, `ADK_MODEL` /
    /// `[agent] model`.
    pub model: String,
    /// Background work queue capacity, `ADK_QUEUE_CAPACITY` /
    /// `[server] queue_capacity`.
    pub queue_capacity: usize,
    /// Background worker count, `ADK_WORKERS` / `[server] workers`.
    pub workers: usize,
    /// Reason-act iteration bound per run, `ADK_MAX_ITERATIONS` /
    /// `[agent] max_iterations`.
    pub max_iterations: u32,
    /// Retention cap for completed tasks per context,
    /// `ADK_MAX_COMPLETED_TASKS` / `[retention] max_completed_tasks`.
    pub max_completed_tasks: usize,
    /// Retention cap for failed tasks per context, `ADK_MAX_FAILED_TASKS` /
    /// `[retention] max_failed_tasks`.
    pub max_failed_tasks: usize,
    /// Seconds between retention sweeps, `ADK_RETENTION_SWEEP_SECS` /
    /// `[retention] sweep_secs`.
    pub retention_sweep_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            model: "gpt-4o-mini".to_string(),
            queue_capacity: 100,
            workers: 4,
            max_iterations: 10,
            max_completed_tasks: 100,
            max_failed_tasks: 100,
            retention_sweep_secs: 300,
        }
    }
}

/// Env override for one field: unset leaves the current value, set must
/// parse.
fn env_override<T: std::str::FromStr>(key: &str, current: &mut T) -> Result<(), LoadError>
where
    T::Err: std::fmt::Display,
{
    if let Ok(raw) = std::env::var(key) {
        *current = raw.parse().map_err(|e: T::Err| LoadError::Invalid {
            key: key.to_string(),
            detail: e.to_string(),
        })?;
    }
    Ok(())
}

impl ServerSettings {
    /// Resolves settings through all layers: `.env` into the environment
    /// (never overriding what is already set), then defaults, the TOML
    /// settings file, and env overrides, in that precedence order.
    pub fn load() -> Result<Self, LoadError> {
        let _ = dotenv::dotenv();
        let mut settings = Self::default();
        settings.apply_file(file::load()?);
        settings.apply_env()?;
        Ok(settings)
    }

    /// Env-only resolution (defaults plus environment), for callers that
    /// manage config files themselves.
    pub fn from_env() -> Result<Self, LoadError> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    fn apply_file(&mut self, overlay: FileSettings) {
        let FileSettings {
            server,
            agent,
            retention,
        } = overlay;
        if let Some(v) = server.bind_addr {
            self.bind_addr = v;
        }
        if let Some(v) = server.queue_capacity {
            self.queue_capacity = v;
        }
        if let Some(v) = server.workers {
            self.workers = v;
        }
        if let Some(v) = agent.model {
            self.model = v;
        }
        if let Some(v) = agent.max_iterations {
            self.max_iterations = v;
        }
        if let Some(v) = retention.max_completed_tasks {
            self.max_completed_tasks = v;
        }
        if let Some(v) = retention.max_failed_tasks {
            self.max_failed_tasks = v;
        }
        if let Some(v) = retention.sweep_secs {
            self.retention_sweep_secs = v;
        }
    }

    fn apply_env(&mut self) -> Result<(), LoadError> {
        env_override("A2A_BIND_ADDR", &mut self.bind_addr)?;
        env_override("ADK_MODEL", &mut self.model)?;
        env_override("ADK_QUEUE_CAPACITY", &mut self.queue_capacity)?;
        env_override("ADK_WORKERS", &mut self.workers)?;
        env_override("ADK_MAX_ITERATIONS", &mut self.max_iterations)?;
        env_override("ADK_MAX_COMPLETED_TASKS", &mut self.max_completed_tasks)?;
        env_override("ADK_MAX_FAILED_TASKS", &mut self.max_failed_tasks)?;
        env_override("ADK_RETENTION_SWEEP_SECS", &mut self.retention_sweep_secs)?;
        Ok(())
    }
}
