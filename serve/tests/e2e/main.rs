//! End-to-end tests: boot the server on an ephemeral port and speak real
//! JSON-RPC / SSE over HTTP.

mod common;

mod agent_card;
mod invalid_json;
mod message_send;
mod message_stream;
mod push_config;
mod tasks;
