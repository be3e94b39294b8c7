//! Task lifecycle manager: the authoritative mutation path for tasks.
//!
//! All operations are serialized through one operation lock so read-modify-
//! write sequences are atomic over any [`TaskStore`]. Reads hand out deep
//! copies. When a task reaches a terminal state its history is flushed into
//! the canonical conversation history of its context (deduplicated by
//! message ID, so seeded history is not re-appended).
//!
//! The manager also owns the bounded FIFO work queue for background
//! processing and the cancellation tokens of in-flight runs.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use a2a_types::{
    Message, PushNotificationConfig, Task, TaskList, TaskListParams, TaskPushNotificationConfig,
    TaskState, TaskStatus,
};

use crate::error::AdkError;
use crate::task::store::{InMemoryTaskStore, TaskStore};

/// One pending unit of background work: the task plus the request ID it was
/// submitted under, kept for response correlation.
#[derive(Clone, Debug, PartialEq)]
pub struct QueueEntry {
    pub task_id: String,
    pub request_id: Option<String>,
}

/// Default capacity of the background work queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Task manager over a pluggable store.
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
    /// Serializes read-modify-write sequences across the store.
    op_lock: Mutex<()>,
    queue_tx: mpsc::Sender<QueueEntry>,
    queue_rx: std::sync::Mutex<Option<mpsc::Receiver<QueueEntry>>>,
    cancellations: Mutex<HashMap<String, CancellationToken>>,
}

impl TaskManager {
    /// Manager over the in-memory store with the given queue capacity.
    pub fn new(queue_capacity: usize) -> Self {
        Self::with_store(Arc::new(InMemoryTaskStore::new()), queue_capacity)
    }

    /// Manager over a custom store.
    pub fn with_store(store: Arc<dyn TaskStore>, queue_capacity: usize) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(queue_capacity.max(1));
        Self {
            store,
            op_lock: Mutex::new(()),
            queue_tx,
            queue_rx: std::sync::Mutex::new(Some(queue_rx)),
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    // --- task CRUD ---------------------------------------------------------

    /// Creates a task in `context_id` with the initial message attached to
    /// history and status. The canonical context history is untouched until
    /// the task reaches a terminal state.
    pub async fn create_task(
        &self,
        context_id: &str,
        state: TaskState,
        message: Message,
    ) -> Result<Task, AdkError> {
        let _guard = self.op_lock.lock().await;
        let task = Task::new(context_id, state, message);
        self.store.save_task(task.clone()).await?;
        Ok(task)
    }

    /// As [`create_task`](Self::create_task), but pre-populates the task
    /// history with the canonical context history so the agent sees prior
    /// turns.
    pub async fn create_task_with_history(
        &self,
        context_id: &str,
        state: TaskState,
        message: Message,
        history: Vec<Message>,
    ) -> Result<Task, AdkError> {
        let _guard = self.op_lock.lock().await;
        let mut task = Task::new(context_id, state, message);
        let initial = task.history.pop();
        task.history = history;
        task.history.extend(initial);
        self.store.save_task(task.clone()).await?;
        Ok(task)
    }

    /// Snapshot of a task. Callers own the copy.
    pub async fn get_task(&self, id: &str) -> Result<Option<Task>, AdkError> {
        self.store.get_task(id).await
    }

    /// Persists a whole task. Rejected when the stored task is already
    /// terminal. A task entering a terminal state flushes its history into
    /// the canonical conversation history.
    pub async fn update_task(&self, task: Task) -> Result<(), AdkError> {
        let _guard = self.op_lock.lock().await;
        if let Some(existing) = self.store.get_task(&task.id).await? {
            if existing.is_terminal() {
                return Err(AdkError::InvalidTransition {
                    from: existing.status.state,
                    to: task.status.state,
                });
            }
        }
        let terminal = task.is_terminal();
        let context_id = task.context_id.clone();
        let history = task.history.clone();
        self.store.save_task(task).await?;
        if terminal {
            self.flush_history_locked(&context_id, history).await?;
        }
        Ok(())
    }

    /// Transitions a task to `new_state`, enforcing the transition DAG.
    /// `input-required → working` is rejected here: that move requires a
    /// resume message and goes through
    /// [`resume_task_with_input`](Self::resume_task_with_input).
    pub async fn update_state(&self, id: &str, new_state: TaskState) -> Result<Task, AdkError> {
        let _guard = self.op_lock.lock().await;
        let mut task = self.require_task(id).await?;
        let from = task.status.state;
        if !from.can_transition_to(new_state)
            || (from == TaskState::InputRequired && new_state == TaskState::Working)
        {
            return Err(AdkError::InvalidTransition {
                from,
                to: new_state,
            });
        }
        task.status = TaskStatus::new(new_state, task.status.message.take());
        self.persist_with_flush(task.clone()).await?;
        Ok(task)
    }

    /// Convenience: transition to `failed` with an error message as status.
    pub async fn update_error(&self, id: &str, error_message: &str) -> Result<Task, AdkError> {
        let _guard = self.op_lock.lock().await;
        let mut task = self.require_task(id).await?;
        if task.is_terminal() {
            return Err(AdkError::InvalidTransition {
                from: task.status.state,
                to: TaskState::Failed,
            });
        }
        let message = Message::assistant(error_message)
            .with_refs(Some(task.id.clone()), Some(task.context_id.clone()));
        task.set_status(TaskState::Failed, Some(message));
        self.persist_with_flush(task.clone()).await?;
        Ok(task)
    }

    /// Cancels a non-terminal task and fires its cancellation token. Terminal
    /// tasks (including already-canceled ones) are not cancelable.
    pub async fn cancel_task(&self, id: &str) -> Result<Task, AdkError> {
        let task = {
            let _guard = self.op_lock.lock().await;
            let mut task = self.require_task(id).await?;
            if task.is_terminal() {
                return Err(AdkError::TaskNotCancelable(id.to_string()));
            }
            task.status = TaskStatus::new(TaskState::Canceled, task.status.message.take());
            self.persist_with_flush(task.clone()).await?;
            task
        };
        if let Some(token) = self.cancellations.lock().await.get(id) {
            token.cancel();
        }
        info!(task_id = %id, "task canceled");
        Ok(task)
    }

    /// Pauses a working task for user input, appending the pause prompt to
    /// its history.
    pub async fn pause_task_for_input(
        &self,
        id: &str,
        pause_message: Message,
    ) -> Result<Task, AdkError> {
        let _guard = self.op_lock.lock().await;
        let mut task = self.require_task(id).await?;
        let from = task.status.state;
        if !from.can_transition_to(TaskState::InputRequired) {
            return Err(AdkError::InvalidTransition {
                from,
                to: TaskState::InputRequired,
            });
        }
        let message =
            pause_message.with_refs(Some(task.id.clone()), Some(task.context_id.clone()));
        task.history.push(message.clone());
        task.set_status(TaskState::InputRequired, Some(message));
        self.store.save_task(task.clone()).await?;
        Ok(task)
    }

    /// Resumes a paused task with the user's answer: appends the message and
    /// moves back to `working`.
    pub async fn resume_task_with_input(
        &self,
        id: &str,
        user_message: Message,
    ) -> Result<Task, AdkError> {
        let _guard = self.op_lock.lock().await;
        let mut task = self.require_task(id).await?;
        if task.status.state != TaskState::InputRequired {
            return Err(AdkError::TaskNotPaused(id.to_string()));
        }
        let message =
            user_message.with_refs(Some(task.id.clone()), Some(task.context_id.clone()));
        task.history.push(message.clone());
        task.set_status(TaskState::Working, Some(message));
        self.store.save_task(task.clone()).await?;
        Ok(task)
    }

    /// Whether the task is paused waiting for input.
    pub async fn is_task_paused(&self, id: &str) -> Result<bool, AdkError> {
        Ok(self.require_task(id).await?.status.state == TaskState::InputRequired)
    }

    /// Polls until the task is terminal or paused for input, or the timeout
    /// expires (then [`AdkError::PollTimeout`]).
    pub async fn poll_task_status(
        &self,
        id: &str,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Task, AdkError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let task = self.require_task(id).await?;
            if task.is_terminal() || task.status.state == TaskState::InputRequired {
                return Ok(task);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(AdkError::PollTimeout(id.to_string()));
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Explicitly removes a task and its push config. Returns whether the
    /// task existed.
    pub async fn delete_task(&self, id: &str) -> Result<bool, AdkError> {
        let _guard = self.op_lock.lock().await;
        let existed = self.store.delete_task(id).await?;
        if existed {
            let _ = self.store.delete_push_config(id).await?;
        }
        Ok(existed)
    }

    /// Lists tasks filtered by context and state, newest first (creation time
    /// descending, ties broken by ID), with offset/limit pagination. `total`
    /// counts all matches before pagination.
    pub async fn list_tasks(&self, params: &TaskListParams) -> Result<TaskList, AdkError> {
        let mut tasks: Vec<Task> = self
            .store
            .all_tasks()
            .await?
            .into_iter()
            .filter(|t| {
                params
                    .context_id
                    .as_ref()
                    .is_none_or(|c| &t.context_id == c)
                    && params.state.is_none_or(|s| t.status.state == s)
            })
            .collect();
        tasks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        let total = tasks.len();
        let offset = params.offset.unwrap_or(0).min(total);
        let end = params
            .limit
            .map_or(total, |l| offset.saturating_add(l).min(total));
        Ok(TaskList {
            tasks: tasks[offset..end].to_vec(),
            total,
        })
    }

    // --- conversation history ----------------------------------------------

    /// Defensive copy of the canonical conversation history for a context.
    pub async fn get_conversation_history(
        &self,
        context_id: &str,
    ) -> Result<Vec<Message>, AdkError> {
        self.store.get_history(context_id).await
    }

    /// Replaces the canonical conversation history for a context.
    pub async fn update_conversation_history(
        &self,
        context_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), AdkError> {
        let _guard = self.op_lock.lock().await;
        self.store.set_history(context_id, messages).await
    }

    // --- push notification configs ------------------------------------------

    /// Registers a webhook for a task. The task must exist.
    pub async fn set_task_push_config(
        &self,
        config: TaskPushNotificationConfig,
    ) -> Result<(), AdkError> {
        let _guard = self.op_lock.lock().await;
        if self.store.get_task(&config.task_id).await?.is_none() {
            return Err(AdkError::TaskNotFound(config.task_id));
        }
        self.store
            .set_push_config(&config.task_id, config.push_notification_config)
            .await
    }

    pub async fn get_task_push_config(
        &self,
        task_id: &str,
    ) -> Result<Option<PushNotificationConfig>, AdkError> {
        self.store.get_push_config(task_id).await
    }

    pub async fn list_task_push_configs(
        &self,
    ) -> Result<Vec<TaskPushNotificationConfig>, AdkError> {
        self.store.list_push_configs().await
    }

    pub async fn delete_task_push_config(&self, task_id: &str) -> Result<bool, AdkError> {
        let _guard = self.op_lock.lock().await;
        self.store.delete_push_config(task_id).await
    }

    // --- cleanup -------------------------------------------------------------

    /// Removes terminal tasks older than `max_age` (by status timestamp).
    /// Non-terminal tasks are kept regardless of age. Returns the count
    /// removed.
    pub async fn cleanup_completed_tasks(&self, max_age: Duration) -> Result<usize, AdkError> {
        let _guard = self.op_lock.lock().await;
        let cutoff = chrono::Utc::now()
            - chrono::Duration::from_std(max_age)
                .map_err(|e| AdkError::InvalidConfig(format!("max_age: {e}")))?;
        let mut removed = 0;
        for task in self.store.all_tasks().await? {
            if !task.is_terminal() {
                continue;
            }
            let Ok(stamp) = chrono::DateTime::parse_from_rfc3339(&task.status.timestamp) else {
                continue;
            };
            if stamp.with_timezone(&chrono::Utc) < cutoff {
                self.store.delete_task(&task.id).await?;
                let _ = self.store.delete_push_config(&task.id).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "cleanup removed aged terminal tasks");
        }
        Ok(removed)
    }

    /// Applies per-context retention caps to completed and failed tasks,
    /// removing the oldest beyond each cap. Returns the count removed.
    pub async fn cleanup_tasks_with_retention(
        &self,
        max_completed: usize,
        max_failed: usize,
    ) -> Result<usize, AdkError> {
        let _guard = self.op_lock.lock().await;
        let mut by_bucket: HashMap<(String, TaskState), Vec<Task>> = HashMap::new();
        for task in self.store.all_tasks().await? {
            if matches!(task.status.state, TaskState::Completed | TaskState::Failed) {
                by_bucket
                    .entry((task.context_id.clone(), task.status.state))
                    .or_default()
                    .push(task);
            }
        }
        let mut removed = 0;
        for ((_, state), mut tasks) in by_bucket {
            let cap = match state {
                TaskState::Completed => max_completed,
                _ => max_failed,
            };
            if tasks.len() <= cap {
                continue;
            }
            // Oldest first, so the newest `cap` survive.
            tasks.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
            for task in &tasks[..tasks.len() - cap] {
                self.store.delete_task(&task.id).await?;
                let _ = self.store.delete_push_config(&task.id).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "retention sweep removed tasks");
        }
        Ok(removed)
    }

    /// Spawns the periodic retention sweeper.
    pub fn start_retention_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        max_completed: usize,
        max_failed: usize,
    ) -> tokio::task::JoinHandle<()> {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = manager
                    .cleanup_tasks_with_retention(max_completed, max_failed)
                    .await
                {
                    tracing::warn!("retention sweep failed: {e}");
                }
            }
        })
    }

    // --- queue & cancellation ------------------------------------------------

    /// Enqueues a task for background processing. Fails with
    /// [`AdkError::QueueFull`] when the queue is at capacity.
    pub fn enqueue_task(&self, task_id: &str, request_id: Option<String>) -> Result<(), AdkError> {
        self.queue_tx
            .try_send(QueueEntry {
                task_id: task_id.to_string(),
                request_id,
            })
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => AdkError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => {
                    AdkError::InvalidConfig("task queue closed".into())
                }
            })
    }

    /// Hands the queue receiver to the worker pool. Only one pool can take it.
    pub fn take_queue_receiver(&self) -> Option<mpsc::Receiver<QueueEntry>> {
        self.queue_rx.lock().ok().and_then(|mut g| g.take())
    }

    /// Registers (or returns the existing) cancellation token for a task run.
    pub async fn register_cancellation(&self, task_id: &str) -> CancellationToken {
        self.cancellations
            .lock()
            .await
            .entry(task_id.to_string())
            .or_default()
            .clone()
    }

    /// Drops the cancellation token of a finished run.
    pub async fn remove_cancellation(&self, task_id: &str) {
        self.cancellations.lock().await.remove(task_id);
    }

    // --- internals -----------------------------------------------------------

    async fn require_task(&self, id: &str) -> Result<Task, AdkError> {
        self.store
            .get_task(id)
            .await?
            .ok_or_else(|| AdkError::TaskNotFound(id.to_string()))
    }

    async fn persist_with_flush(&self, task: Task) -> Result<(), AdkError> {
        let terminal = task.is_terminal();
        let context_id = task.context_id.clone();
        let history = task.history.clone();
        self.store.save_task(task).await?;
        if terminal {
            self.flush_history_locked(&context_id, history).await?;
        }
        Ok(())
    }

    /// Appends task history into the canonical context history, skipping
    /// messages already present (by message ID). Caller holds the op lock.
    async fn flush_history_locked(
        &self,
        context_id: &str,
        history: Vec<Message>,
    ) -> Result<(), AdkError> {
        let existing = self.store.get_history(context_id).await?;
        let seen: std::collections::HashSet<&str> =
            existing.iter().map(|m| m.message_id.as_str()).collect();
        let fresh: Vec<Message> = history
            .into_iter()
            .filter(|m| !seen.contains(m.message_id.as_str()))
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }
        self.store.append_history(context_id, fresh).await
    }
}
