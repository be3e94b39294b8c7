//! Fluent construction of agents.
//!
//! The builder collects the LLM client, tools, callbacks, and loop settings;
//! `build` validates the configuration. A missing LLM is not a build error:
//! the engine reports `NoLlmConfigured` when the agent is actually run, so
//! agents can be assembled and wired before credentials exist.

use std::sync::Arc;

use crate::agent::{Agent, DEFAULT_MAX_ITERATIONS};
use crate::callback::{
    AfterAgentCallback, AfterModelCallback, AfterToolCallback, BeforeAgentCallback,
    BeforeModelCallback, BeforeToolCallback, Callbacks,
};
use crate::error::AdkError;
use crate::llm::{LlmClient, OpenAiChat};
use crate::toolbox::{InputRequiredTool, Tool, ToolBox, INPUT_REQUIRED_TOOL};

/// Builder for [`Agent`].
pub struct AgentBuilder {
    name: String,
    description: String,
    instruction: Option<String>,
    llm: Option<Arc<dyn LlmClient>>,
    tools: Vec<Arc<dyn Tool>>,
    callbacks: Callbacks,
    max_iterations: u32,
}

impl AgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: None,
            llm: None,
            tools: Vec::new(),
            callbacks: Callbacks::new(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// System prompt prepended to every model call.
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    /// Injects an LLM client.
    pub fn llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Shorthand: OpenAI-compatible client for `model`, configured from the
    /// environment.
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.llm = Some(Arc::new(OpenAiChat::new(model)));
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Bound on reason-act iterations per run.
    pub fn max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn before_agent(mut self, cb: BeforeAgentCallback) -> Self {
        self.callbacks.before_agent.push(cb);
        self
    }

    pub fn after_agent(mut self, cb: AfterAgentCallback) -> Self {
        self.callbacks.after_agent.push(cb);
        self
    }

    pub fn before_model(mut self, cb: BeforeModelCallback) -> Self {
        self.callbacks.before_model.push(cb);
        self
    }

    pub fn after_model(mut self, cb: AfterModelCallback) -> Self {
        self.callbacks.after_model.push(cb);
        self
    }

    pub fn before_tool(mut self, cb: BeforeToolCallback) -> Self {
        self.callbacks.before_tool.push(cb);
        self
    }

    pub fn after_tool(mut self, cb: AfterToolCallback) -> Self {
        self.callbacks.after_tool.push(cb);
        self
    }

    /// Validates and builds the agent. The reserved `input_required` tool is
    /// registered automatically unless the caller provided its own.
    pub fn build(self) -> Result<Agent, AdkError> {
        if self.name.trim().is_empty() {
            return Err(AdkError::InvalidConfig("agent name must not be empty".into()));
        }
        if self.max_iterations == 0 {
            return Err(AdkError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        let mut toolbox = ToolBox::new();
        for tool in self.tools {
            toolbox.register(tool);
        }
        if !toolbox.contains(INPUT_REQUIRED_TOOL) {
            toolbox.register(Arc::new(InputRequiredTool));
        }
        Ok(Agent {
            name: self.name,
            description: self.description,
            instruction: self.instruction,
            llm: self.llm,
            toolbox: Arc::new(toolbox),
            callbacks: Arc::new(self.callbacks),
            max_iterations: self.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlm;

    /// **Scenario**: a minimal build succeeds and registers the reserved tool.
    #[test]
    fn build_registers_reserved_tool() {
        let agent = Agent::builder("assistant")
            .llm(Arc::new(MockLlm::with_reply("hi")))
            .build()
            .unwrap();
        assert_eq!(agent.name(), "assistant");
        assert!(agent.toolbox.contains(INPUT_REQUIRED_TOOL));
    }

    /// **Scenario**: empty name and zero iterations are rejected.
    #[test]
    fn build_validates_configuration() {
        assert!(matches!(
            Agent::builder("  ").build(),
            Err(AdkError::InvalidConfig(_))
        ));
        assert!(matches!(
            Agent::builder("a").max_iterations(0).build(),
            Err(AdkError::InvalidConfig(_))
        ));
    }

    /// **Scenario**: building without an LLM succeeds; only running fails.
    #[test]
    fn build_without_llm_is_allowed() {
        let agent = Agent::builder("later").build().unwrap();
        assert!(agent.llm.is_none());
    }
}
