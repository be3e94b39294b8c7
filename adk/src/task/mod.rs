//! Task lifecycle: manager, pluggable storage, and the background worker
//! pool over the bounded work queue.

mod manager;
mod queue;
mod store;

pub use manager::{QueueEntry, TaskManager, DEFAULT_QUEUE_CAPACITY};
pub use queue::WorkerPool;
pub use store::{InMemoryTaskStore, TaskStore};
