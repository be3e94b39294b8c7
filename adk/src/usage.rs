//! Thread-safe execution counters for one run.
//!
//! Tracks iterations, tool calls, messages, and token usage; counters only
//! ever grow. The snapshot lands in the task metadata under
//! `execution_stats`.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::Value;

use crate::llm::LlmUsage;

/// Metadata key the snapshot is stored under.
pub const EXECUTION_STATS_KEY: &str = "execution_stats";

/// Monotonic counters for one agent run. Cheap to share via `Arc`.
#[derive(Debug, Default)]
pub struct UsageTracker {
    iterations: AtomicU64,
    tool_calls: AtomicU64,
    failed_tool_calls: AtomicU64,
    messages: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
    total_tokens: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UsageSnapshot {
    pub iterations: u64,
    pub tool_calls: u64,
    pub failed_tool_calls: u64,
    pub messages: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_call(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_tool_call(&self) {
        self.failed_tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds one completion's token usage.
    pub fn add_usage(&self, usage: &LlmUsage) {
        self.prompt_tokens
            .fetch_add(u64::from(usage.prompt_tokens), Ordering::Relaxed);
        self.completion_tokens
            .fetch_add(u64::from(usage.completion_tokens), Ordering::Relaxed);
        self.total_tokens
            .fetch_add(u64::from(usage.total_tokens), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> UsageSnapshot {
        UsageSnapshot {
            iterations: self.iterations.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            failed_tool_calls: self.failed_tool_calls.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            prompt_tokens: self.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.completion_tokens.load(Ordering::Relaxed),
            total_tokens: self.total_tokens.load(Ordering::Relaxed),
        }
    }

    /// Snapshot as the JSON value stored under [`EXECUTION_STATS_KEY`].
    pub fn metadata_value(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }
}
