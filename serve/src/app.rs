//! Axum app: shared state and router.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use adk::{StreamingTaskHandler, TaskManager};

use crate::card::{agent_card, AgentCard, AGENT_CARD_PATH};
use crate::rpc::handle_rpc;

/// Shared state behind every request handler.
pub struct AppState {
    pub manager: Arc<TaskManager>,
    pub streaming: Arc<StreamingTaskHandler>,
    pub card: AgentCard,
}

/// One POST route for JSON-RPC plus the agent card.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", post(handle_rpc))
        .route(AGENT_CARD_PATH, get(agent_card))
        .with_state(state)
}
