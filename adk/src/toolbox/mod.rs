//! Tool registry and the `Tool` trait.
//!
//! A tool is a named callable the model can invoke via function calling:
//! unique name, human description, JSON-schema parameter spec, and an async
//! execute function returning a string result. Tools are registered in a
//! [`ToolBox`]; the engine looks them up by name when the model emits a
//! matching tool call.
//!
//! The reserved name [`INPUT_REQUIRED_TOOL`] is special: invoking it pauses
//! the run to solicit user input instead of continuing the loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::callback::ToolContext;

/// Reserved tool name that pauses the run for user input.
pub const INPUT_REQUIRED_TOOL: &str = "input_required";

/// Tool execution error.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    ExecutionFailed(String),
}

/// Tool description handed to the model: name, description, and the JSON
/// schema of the arguments object.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

/// A callable exposed to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name within a tool box.
    fn name(&self) -> &str;

    /// Spec sent to the model in the tools list.
    fn spec(&self) -> ToolSpec;

    /// Executes the tool. `args` is the parsed arguments object; `ctx` carries
    /// the invocation identifiers, the cancellation token, and the artifact
    /// helper. Implementations must honor cancellation for long operations.
    async fn call(&self, args: Map<String, Value>, ctx: &ToolContext) -> Result<String, ToolError>;
}

/// Adapter exposing a plain closure as a [`Tool`].
pub struct FnTool {
    name: String,
    description: Option<String>,
    parameters: Value,
    func: Arc<dyn Fn(Map<String, Value>) -> Result<String, ToolError> + Send + Sync>,
}

impl FnTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        func: impl Fn(Map<String, Value>) -> Result<String, ToolError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
            func: Arc::new(func),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }

    async fn call(
        &self,
        args: Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        (self.func)(args)
    }
}

/// The reserved pause tool. Its `message` argument is the question relayed to
/// the user; the result echoes it so the model sees the pause in history.
pub struct InputRequiredTool;

#[async_trait]
impl Tool for InputRequiredTool {
    fn name(&self) -> &str {
        INPUT_REQUIRED_TOOL
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: INPUT_REQUIRED_TOOL.to_string(),
            description: Some(
                "Pause the task and ask the user for more input. \
                 Use when required information is missing."
                    .to_string(),
            ),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "The question to ask the user"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    async fn call(
        &self,
        args: Map<String, Value>,
        _ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let message = args
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing \"message\"".into()))?;
        Ok(message.to_string())
    }
}

/// Registry of tools keyed by name. Immutable after setup; registration order
/// is preserved so the tools list the model sees is deterministic.
#[derive(Default)]
pub struct ToolBox {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool. A duplicate name replaces the previous registration
    /// with a warning.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            warn!("tool {name} registered twice, replacing");
        } else {
            self.order.push(name);
        }
    }

    /// Looks up a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Specs of all registered tools, in registration order. This is the
    /// tools list sent to the model.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|n| self.tools.get(n))
            .map(|t| t.spec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
