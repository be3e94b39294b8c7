//! Background worker pool over the task queue.
//!
//! Workers share the queue receiver behind a mutex (locked only while
//! waiting for the next entry), run the background handler, persist the
//! result, and fire push notifications. Only one worker ever executes a
//! given task; a task canceled before pickup is skipped, and a concurrent
//! cancel during execution is observed through the cancellation token and at
//! the final persist.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use a2a_types::TaskState;

use crate::handler::BackgroundTaskHandler;
use crate::push::PushSender;
use crate::task::manager::{QueueEntry, TaskManager};

/// Pool of background workers draining the task queue.
#[derive(Debug)]
pub struct WorkerPool {
    handles: Vec<tokio::task::JoinHandle<()>>,
}

impl WorkerPool {
    /// Starts `workers` workers. Takes the manager's queue receiver; only
    /// one pool can be started per manager.
    pub fn start(
        manager: Arc<TaskManager>,
        handler: Arc<BackgroundTaskHandler>,
        push: Arc<dyn PushSender>,
        workers: usize,
    ) -> Result<Self, crate::error::AdkError> {
        let receiver = manager.take_queue_receiver().ok_or_else(|| {
            crate::error::AdkError::InvalidConfig("task queue receiver already taken".into())
        })?;
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let manager = Arc::clone(&manager);
                let handler = Arc::clone(&handler);
                let push = Arc::clone(&push);
                tokio::spawn(async move {
                    loop {
                        let entry = {
                            let mut guard = receiver.lock().await;
                            guard.recv().await
                        };
                        let Some(entry) = entry else { break };
                        process_entry(&manager, &handler, push.as_ref(), &entry).await;
                    }
                    debug!(worker_id, "background worker exiting");
                })
            })
            .collect();

        Ok(Self { handles })
    }

    /// Stops the workers immediately. In-flight tasks are abandoned; their
    /// state stays whatever was last persisted.
    pub fn abort(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

async fn process_entry(
    manager: &TaskManager,
    handler: &BackgroundTaskHandler,
    push: &dyn PushSender,
    entry: &QueueEntry,
) {
    let task = match manager.get_task(&entry.task_id).await {
        Ok(Some(task)) => task,
        Ok(None) => {
            warn!(task_id = %entry.task_id, "queued task no longer exists");
            return;
        }
        Err(e) => {
            warn!(task_id = %entry.task_id, "queued task load failed: {e}");
            return;
        }
    };
    if task.is_terminal() {
        debug!(task_id = %task.id, state = %task.status.state, "skipping terminal task");
        return;
    }

    let task = if task.status.state == TaskState::Working {
        task
    } else {
        match manager.update_state(&task.id, TaskState::Working).await {
            Ok(task) => task,
            Err(e) => {
                // Lost the race with a concurrent cancel.
                debug!(task_id = %entry.task_id, "not moving to working: {e}");
                return;
            }
        }
    };

    let cancel = manager.register_cancellation(&task.id).await;
    let task_id = task.id.clone();
    let done = handler.handle(task, cancel).await;
    manager.remove_cancellation(&task_id).await;

    match manager.update_task(done.clone()).await {
        Ok(()) => {
            match manager.get_task_push_config(&done.id).await {
                Ok(Some(config)) => {
                    if let Err(e) = push.send_task_update(&done, &config).await {
                        warn!(task_id = %done.id, "push notification failed: {e}");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(task_id = %done.id, "push config lookup failed: {e}"),
            }
        }
        Err(e) => {
            // A concurrent cancel made the stored task terminal first.
            debug!(task_id = %done.id, "result not persisted: {e}");
        }
    }
}
