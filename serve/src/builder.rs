//! Server builder and run loop.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use adk::{
    AdkError, Agent, BackgroundTaskHandler, NoopPushSender, PushSender, StreamingTaskHandler,
    TaskManager, TaskStore, WorkerPool, DEFAULT_QUEUE_CAPACITY,
};
use config::ServerSettings;

use crate::app::{router, AppState};
use crate::card::{AgentCapabilities, AgentCard};
use crate::push::WebhookPushSender;

/// Retention configuration for the periodic sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_completed: usize,
    pub max_failed: usize,
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_completed: 100,
            max_failed: 100,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Builder for [`A2AServer`].
pub struct ServerBuilder {
    agent: Option<Agent>,
    capabilities: AgentCapabilities,
    queue_capacity: usize,
    workers: usize,
    retention: RetentionPolicy,
    push_sender: Option<Arc<dyn PushSender>>,
    store: Option<Arc<dyn TaskStore>>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            agent: None,
            capabilities: AgentCapabilities::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            workers: 4,
            retention: RetentionPolicy::default(),
            push_sender: None,
            store: None,
        }
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-configured from server settings.
    pub fn from_settings(settings: &ServerSettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity,
            workers: settings.workers,
            retention: RetentionPolicy {
                max_completed: settings.max_completed_tasks,
                max_failed: settings.max_failed_tasks,
                sweep_interval: Duration::from_secs(settings.retention_sweep_secs),
            },
            ..Self::default()
        }
    }

    pub fn agent(mut self, agent: Agent) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn capabilities(mut self, capabilities: AgentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Custom push sender (e.g. a recording fake in tests).
    pub fn push_sender(mut self, sender: Arc<dyn PushSender>) -> Self {
        self.push_sender = Some(sender);
        self
    }

    /// Custom task store (default: in-memory).
    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Validates the wiring and builds the server.
    pub fn build(self) -> Result<A2AServer, AdkError> {
        let agent = Arc::new(
            self.agent
                .ok_or_else(|| AdkError::InvalidConfig("server requires an agent".into()))?,
        );
        let manager = match self.store {
            Some(store) => Arc::new(TaskManager::with_store(store, self.queue_capacity)),
            None => Arc::new(TaskManager::new(self.queue_capacity)),
        };
        let push: Arc<dyn PushSender> = match (self.capabilities.push_notifications, self.push_sender)
        {
            (true, Some(sender)) => sender,
            (true, None) => Arc::new(WebhookPushSender::new()),
            (false, _) => Arc::new(NoopPushSender),
        };
        let mut card = AgentCard::new(agent.name(), agent.description());
        card.capabilities = self.capabilities;
        let state = Arc::new(AppState {
            manager,
            streaming: Arc::new(StreamingTaskHandler::new(Arc::clone(&agent))),
            card,
        });
        Ok(A2AServer {
            state,
            agent,
            push,
            workers: self.workers,
            retention: self.retention,
        })
    }
}

/// The assembled server: router plus background workers and retention sweep.
pub struct A2AServer {
    state: Arc<AppState>,
    agent: Arc<Agent>,
    push: Arc<dyn PushSender>,
    workers: usize,
    retention: RetentionPolicy,
}

impl A2AServer {
    /// The axum router (for embedding or tests).
    pub fn router(&self) -> Router {
        router(Arc::clone(&self.state))
    }

    pub fn manager(&self) -> Arc<TaskManager> {
        Arc::clone(&self.state.manager)
    }

    /// Starts the worker pool and retention sweeper.
    fn start_background(&self) -> Result<(WorkerPool, tokio::task::JoinHandle<()>), AdkError> {
        let handler = Arc::new(BackgroundTaskHandler::new(Arc::clone(&self.agent)));
        let pool = WorkerPool::start(
            self.manager(),
            handler,
            Arc::clone(&self.push),
            self.workers,
        )?;
        let sweeper = self.manager().start_retention_sweeper(
            self.retention.sweep_interval,
            self.retention.max_completed,
            self.retention.max_failed,
        );
        Ok((pool, sweeper))
    }

    /// Serves on an existing listener (tests bind `127.0.0.1:0` and pass it).
    pub async fn run_on_listener(
        self,
        listener: TcpListener,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let (_pool, _sweeper) = self.start_background()?;
        let addr = listener.local_addr()?;
        info!("A2A server listening on http://{addr}");
        let app = self.router();
        axum::serve(listener, app).await?;
        Ok(())
    }

    /// Binds `addr` and serves until the process exits.
    pub async fn run(
        self,
        addr: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let listener = TcpListener::bind(addr).await?;
        self.run_on_listener(listener).await
    }
}
