//! Task handlers: bridge between the protocol layer and the agent.
//!
//! The background handler folds a run's event stream into a final task for
//! non-streaming clients; the streaming handler injects the task reference
//! and usage tracker into the execution context and hands the raw event
//! receiver to the protocol layer.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use a2a_types::{Message, Task, TaskState};

use crate::agent::{Agent, ExecutionContext};
use crate::error::AdkError;
use crate::event::ExecutionEvent;
use crate::usage::{UsageTracker, EXECUTION_STATS_KEY};

/// Applies one artifact update to the task: append parts to the existing
/// artifact under that ID, or attach it as new.
pub fn apply_artifact_update(task: &mut Task, artifact: a2a_types::Artifact, append: bool) {
    if append {
        if let Some(existing) = task
            .artifacts
            .iter_mut()
            .find(|a| a.artifact_id == artifact.artifact_id)
        {
            existing.parts.extend(artifact.parts);
            return;
        }
    }
    task.artifacts.push(artifact);
}

/// Runs the agent to completion for non-streaming clients and folds the
/// event stream into the final task state.
pub struct BackgroundTaskHandler {
    agent: Arc<Agent>,
}

impl BackgroundTaskHandler {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Drives one run for `task` and returns the task to persist. LLM and
    /// tool failures surface through task state, never as an `Err` here;
    /// only a synchronous start failure (no LLM) marks the task failed
    /// directly.
    pub async fn handle(&self, mut task: Task, cancel: CancellationToken) -> Task {
        let usage = Arc::new(UsageTracker::new());
        let ctx = ExecutionContext::new()
            .with_task(task.clone())
            .with_cancel(cancel)
            .with_usage(Arc::clone(&usage));

        let mut events = match self.agent.run_with_stream(ctx, task.history.clone()) {
            Ok(rx) => rx,
            Err(e) => {
                let message = Message::assistant(e.to_string())
                    .with_refs(Some(task.id.clone()), Some(task.context_id.clone()));
                task.set_status(TaskState::Failed, Some(message));
                finish(&mut task, &usage);
                return task;
            }
        };

        let mut candidate: Option<Message> = None;
        while let Some(event) = events.recv().await {
            match event {
                ExecutionEvent::IterationCompleted { message } => {
                    task.history.push(message.clone());
                    candidate = Some(message);
                }
                ExecutionEvent::ToolResult { message } => {
                    task.history.push(message);
                }
                ExecutionEvent::InputRequired { message } => {
                    task.history.push(message.clone());
                    task.set_status(TaskState::InputRequired, Some(message));
                    finish(&mut task, &usage);
                    return task;
                }
                ExecutionEvent::TaskStatusChanged { status } => {
                    if status.state.is_terminal() {
                        task.status = status;
                        finish(&mut task, &usage);
                        return task;
                    }
                    task.status = status;
                }
                ExecutionEvent::StreamFailed { message } => {
                    task.set_status(TaskState::Failed, Some(message));
                    finish(&mut task, &usage);
                    return task;
                }
                ExecutionEvent::ArtifactUpdate {
                    artifact, append, ..
                } => {
                    apply_artifact_update(&mut task, artifact, append);
                }
                ExecutionEvent::Delta { .. }
                | ExecutionEvent::ToolStarted { .. }
                | ExecutionEvent::ToolCompleted { .. }
                | ExecutionEvent::ToolFailed { .. }
                | ExecutionEvent::TaskInterrupted { .. } => {}
            }
        }

        // Channel closed without a terminal event.
        debug!(task_id = %task.id, "event stream closed without terminal event");
        match candidate {
            Some(message) => task.set_status(TaskState::Completed, Some(message)),
            None => {
                let message = Message::assistant("Task completed")
                    .with_refs(Some(task.id.clone()), Some(task.context_id.clone()));
                task.set_status(TaskState::Completed, Some(message));
            }
        }
        finish(&mut task, &usage);
        task
    }
}

fn finish(task: &mut Task, usage: &UsageTracker) {
    task.set_metadata(EXECUTION_STATS_KEY, usage.metadata_value());
}

/// Starts a run for a streaming client and forwards the raw event receiver.
pub struct StreamingTaskHandler {
    agent: Arc<Agent>,
}

impl StreamingTaskHandler {
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }

    /// Kicks off the run with the task wired into the execution context.
    /// Returns the event receiver and the run's usage tracker.
    pub fn handle_stream(
        &self,
        task: &Task,
        cancel: CancellationToken,
    ) -> Result<
        (
            tokio::sync::mpsc::Receiver<ExecutionEvent>,
            Arc<UsageTracker>,
        ),
        AdkError,
    > {
        let usage = Arc::new(UsageTracker::new());
        let ctx = ExecutionContext::new()
            .with_task(task.clone())
            .with_cancel(cancel)
            .with_usage(Arc::clone(&usage));
        let events = self.agent.run_with_stream(ctx, task.history.clone())?;
        Ok((events, usage))
    }
}
