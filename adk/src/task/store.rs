//! Task storage behind a pluggable trait, with the in-memory implementation
//! used by tests and single-process deployments.
//!
//! The store holds three keyed collections: tasks by ID, canonical
//! conversation histories by context ID, and push-notification configs by
//! task ID. Persistence across restarts is a property of the chosen store,
//! not of the manager.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use a2a_types::{Message, PushNotificationConfig, Task, TaskPushNotificationConfig};

use crate::error::AdkError;

/// Storage backend for tasks, histories, and push configs.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn save_task(&self, task: Task) -> Result<(), AdkError>;
    async fn get_task(&self, id: &str) -> Result<Option<Task>, AdkError>;
    /// Removes a task; returns whether it existed.
    async fn delete_task(&self, id: &str) -> Result<bool, AdkError>;
    /// Snapshot of all stored tasks, unordered.
    async fn all_tasks(&self) -> Result<Vec<Task>, AdkError>;

    async fn get_history(&self, context_id: &str) -> Result<Vec<Message>, AdkError>;
    async fn set_history(&self, context_id: &str, messages: Vec<Message>) -> Result<(), AdkError>;
    async fn append_history(
        &self,
        context_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), AdkError>;

    async fn set_push_config(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> Result<(), AdkError>;
    async fn get_push_config(
        &self,
        task_id: &str,
    ) -> Result<Option<PushNotificationConfig>, AdkError>;
    async fn list_push_configs(&self) -> Result<Vec<TaskPushNotificationConfig>, AdkError>;
    async fn delete_push_config(&self, task_id: &str) -> Result<bool, AdkError>;
}

#[derive(Default)]
struct StoreInner {
    tasks: HashMap<String, Task>,
    histories: HashMap<String, Vec<Message>>,
    push_configs: HashMap<String, PushNotificationConfig>,
}

/// In-memory store guarded by one RwLock. All reads return clones so callers
/// never alias the stored data.
#[derive(Default)]
pub struct InMemoryTaskStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn save_task(&self, task: Task) -> Result<(), AdkError> {
        self.inner.write().await.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AdkError> {
        Ok(self.inner.read().await.tasks.get(id).cloned())
    }

    async fn delete_task(&self, id: &str) -> Result<bool, AdkError> {
        Ok(self.inner.write().await.tasks.remove(id).is_some())
    }

    async fn all_tasks(&self) -> Result<Vec<Task>, AdkError> {
        Ok(self.inner.read().await.tasks.values().cloned().collect())
    }

    async fn get_history(&self, context_id: &str) -> Result<Vec<Message>, AdkError> {
        Ok(self
            .inner
            .read()
            .await
            .histories
            .get(context_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_history(&self, context_id: &str, messages: Vec<Message>) -> Result<(), AdkError> {
        self.inner
            .write()
            .await
            .histories
            .insert(context_id.to_string(), messages);
        Ok(())
    }

    async fn append_history(
        &self,
        context_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), AdkError> {
        self.inner
            .write()
            .await
            .histories
            .entry(context_id.to_string())
            .or_default()
            .extend(messages);
        Ok(())
    }

    async fn set_push_config(
        &self,
        task_id: &str,
        config: PushNotificationConfig,
    ) -> Result<(), AdkError> {
        self.inner
            .write()
            .await
            .push_configs
            .insert(task_id.to_string(), config);
        Ok(())
    }

    async fn get_push_config(
        &self,
        task_id: &str,
    ) -> Result<Option<PushNotificationConfig>, AdkError> {
        Ok(self.inner.read().await.push_configs.get(task_id).cloned())
    }

    async fn list_push_configs(&self) -> Result<Vec<TaskPushNotificationConfig>, AdkError> {
        let mut configs: Vec<TaskPushNotificationConfig> = self
            .inner
            .read()
            .await
            .push_configs
            .iter()
            .map(|(task_id, config)| TaskPushNotificationConfig {
                task_id: task_id.clone(),
                push_notification_config: config.clone(),
            })
            .collect();
        configs.sort_by(|a, b| a.task_id.cmp(&b.task_id));
        Ok(configs)
    }

    async fn delete_push_config(&self, task_id: &str) -> Result<bool, AdkError> {
        Ok(self.inner.write().await.push_configs.remove(task_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use a2a_types::TaskState;

    /// **Scenario**: save/get/delete round-trip; get returns a detached clone.
    #[tokio::test]
    async fn save_get_delete_round_trip() {
        let store = InMemoryTaskStore::new();
        let task = Task::new("c1", TaskState::Submitted, Message::user("hi"));
        store.save_task(task.clone()).await.unwrap();

        let mut fetched = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(fetched, task);
        fetched.history.push(Message::user("mutated"));
        let again = store.get_task(&task.id).await.unwrap().unwrap();
        assert_eq!(again.history.len(), 1, "stored task unaffected by caller");

        assert!(store.delete_task(&task.id).await.unwrap());
        assert!(!store.delete_task(&task.id).await.unwrap());
        assert!(store.get_task(&task.id).await.unwrap().is_none());
    }

    /// **Scenario**: histories are isolated per context and append in order.
    #[tokio::test]
    async fn histories_isolated_and_ordered() {
        let store = InMemoryTaskStore::new();
        store
            .append_history("c1", vec![Message::user("a"), Message::assistant("b")])
            .await
            .unwrap();
        store
            .append_history("c2", vec![Message::user("x")])
            .await
            .unwrap();
        store
            .append_history("c1", vec![Message::user("c")])
            .await
            .unwrap();

        let h1 = store.get_history("c1").await.unwrap();
        let texts: Vec<_> = h1.iter().map(Message::text).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(store.get_history("c2").await.unwrap().len(), 1);
        assert!(store.get_history("c3").await.unwrap().is_empty());
    }

    /// **Scenario**: push configs CRUD by task ID; list is sorted.
    #[tokio::test]
    async fn push_config_crud() {
        let store = InMemoryTaskStore::new();
        store
            .set_push_config("t2", PushNotificationConfig::new("https://two"))
            .await
            .unwrap();
        store
            .set_push_config("t1", PushNotificationConfig::new("https://one"))
            .await
            .unwrap();

        let got = store.get_push_config("t1").await.unwrap().unwrap();
        assert_eq!(got.url, "https://one");

        let all = store.list_push_configs().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].task_id, "t1");

        assert!(store.delete_push_config("t1").await.unwrap());
        assert!(store.get_push_config("t1").await.unwrap().is_none());
    }
}
