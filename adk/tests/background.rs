//! Background path: the worker pool drains the queue, the handler folds the
//! event stream into a final task, push notifications fire.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use a2a_types::{Message, PushNotificationConfig, Task, TaskPushNotificationConfig, TaskState};
use adk::llm::{text_chunk, tool_call_chunk};
use adk::{
    AdkError, Agent, BackgroundTaskHandler, FnTool, MockLlm, PushSender, TaskManager, WorkerPool,
};
use tokio_util::sync::CancellationToken;

fn scripted_agent(turns: Vec<adk::MockTurn>) -> Arc<Agent> {
    Arc::new(
        Agent::builder("bg-test")
            .llm(Arc::new(MockLlm::new(turns)))
            .tool(Arc::new(FnTool::new(
                "get_weather",
                "weather lookup",
                serde_json::json!({"type": "object"}),
                |_| Ok(r#"{"temperature":72}"#.to_string()),
            )))
            .build()
            .unwrap(),
    )
}

/// Push sender recording every delivery.
#[derive(Default)]
struct RecordingPushSender {
    sent: Mutex<Vec<(String, TaskState)>>,
}

#[async_trait]
impl PushSender for RecordingPushSender {
    async fn send_task_update(
        &self,
        task: &Task,
        _config: &PushNotificationConfig,
    ) -> Result<(), AdkError> {
        self.sent
            .lock()
            .unwrap()
            .push((task.id.clone(), task.status.state));
        Ok(())
    }
}

/// **Scenario**: the handler folds a simple run into a completed task with
/// user + assistant history and execution stats.
#[tokio::test]
async fn handler_folds_simple_completion() {
    let agent = scripted_agent(vec![vec![text_chunk("Hi!"), MockLlm::finish("stop")]]);
    let handler = BackgroundTaskHandler::new(agent);
    let task = Task::new("ctx", TaskState::Submitted, Message::user("Hello"));

    let done = handler.handle(task, CancellationToken::new()).await;
    assert_eq!(done.status.state, TaskState::Completed);
    assert_eq!(done.history.len(), 2);
    assert_eq!(done.history[1].text(), "Hi!");
    let stats = done
        .metadata
        .as_ref()
        .and_then(|m| m.get("execution_stats"))
        .expect("execution stats attached");
    assert_eq!(stats["iterations"], 1);
    assert_eq!(stats["tool_calls"], 0);
}

/// **Scenario**: an input-required run folds into a paused task whose status
/// message is the pause prompt.
#[tokio::test]
async fn handler_folds_input_required() {
    let agent = scripted_agent(vec![vec![
        tool_call_chunk(0, "c1", "input_required", r#"{"message":"Which unit?"}"#),
        MockLlm::finish("tool_calls"),
    ]]);
    let handler = BackgroundTaskHandler::new(agent);
    let task = Task::new("ctx", TaskState::Submitted, Message::user("Weather"));

    let done = handler.handle(task, CancellationToken::new()).await;
    assert_eq!(done.status.state, TaskState::InputRequired);
    assert_eq!(done.status.message.as_ref().unwrap().text(), "Which unit?");
    // History: user, assistant(tool_calls), tool result, pause prompt.
    assert_eq!(done.history.len(), 4);
}

/// **Scenario**: a run whose LLM fails folds into a failed task.
#[tokio::test]
async fn handler_folds_stream_failure() {
    let agent = Arc::new(
        Agent::builder("bg-fail")
            .llm(Arc::new(MockLlm::failing("llm down")))
            .build()
            .unwrap(),
    );
    let handler = BackgroundTaskHandler::new(agent);
    let task = Task::new("ctx", TaskState::Submitted, Message::user("Hello"));
    let done = handler.handle(task, CancellationToken::new()).await;
    assert_eq!(done.status.state, TaskState::Failed);
    assert!(done.status.message.as_ref().unwrap().text().contains("llm down"));
}

/// **Scenario**: end-to-end background processing: enqueue, worker picks it
/// up, persists the completed task, flushes context history, and notifies
/// the webhook.
#[tokio::test]
async fn worker_pool_processes_queue() {
    let agent = scripted_agent(vec![vec![text_chunk("done"), MockLlm::finish("stop")]]);
    let manager = Arc::new(TaskManager::new(8));
    let push = Arc::new(RecordingPushSender::default());
    let _pool = WorkerPool::start(
        Arc::clone(&manager),
        Arc::new(BackgroundTaskHandler::new(agent)),
        Arc::clone(&push) as Arc<dyn PushSender>,
        2,
    )
    .unwrap();

    let task = manager
        .create_task("ctx-w", TaskState::Submitted, Message::user("Hello"))
        .await
        .unwrap();
    manager
        .set_task_push_config(TaskPushNotificationConfig {
            task_id: task.id.clone(),
            push_notification_config: PushNotificationConfig::new("https://hook"),
        })
        .await
        .unwrap();
    manager.enqueue_task(&task.id, Some("req-1".into())).unwrap();

    let done = manager
        .poll_task_status(&task.id, Duration::from_millis(10), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(done.status.state, TaskState::Completed);

    // Terminal flush landed in the context history.
    let history = manager.get_conversation_history("ctx-w").await.unwrap();
    assert_eq!(history.len(), 2);

    // The webhook saw the completed task.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let sent = push.sent.lock().unwrap().clone();
        if !sent.is_empty() {
            assert_eq!(sent[0], (task.id.clone(), TaskState::Completed));
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "push never fired");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// **Scenario**: a task canceled before pickup is skipped by the worker and
/// stays canceled.
#[tokio::test]
async fn worker_skips_canceled_task() {
    let agent = scripted_agent(vec![vec![text_chunk("nope"), MockLlm::finish("stop")]]);
    let manager = Arc::new(TaskManager::new(8));

    let task = manager
        .create_task("ctx-c", TaskState::Submitted, Message::user("Hello"))
        .await
        .unwrap();
    manager.enqueue_task(&task.id, None).unwrap();
    manager.cancel_task(&task.id).await.unwrap();

    let _pool = WorkerPool::start(
        Arc::clone(&manager),
        Arc::new(BackgroundTaskHandler::new(agent)),
        Arc::new(adk::NoopPushSender),
        1,
    )
    .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let stored = manager.get_task(&task.id).await.unwrap().unwrap();
    assert_eq!(stored.status.state, TaskState::Canceled);
}

/// **Scenario**: only one worker pool can take the queue receiver.
#[tokio::test]
async fn second_worker_pool_rejected() {
    let agent = scripted_agent(vec![]);
    let manager = Arc::new(TaskManager::new(8));
    let handler = Arc::new(BackgroundTaskHandler::new(agent));
    let _pool = WorkerPool::start(
        Arc::clone(&manager),
        Arc::clone(&handler),
        Arc::new(adk::NoopPushSender),
        1,
    )
    .unwrap();
    let err = WorkerPool::start(manager, handler, Arc::new(adk::NoopPushSender), 1).unwrap_err();
    assert!(matches!(err, AdkError::InvalidConfig(_)));
}
