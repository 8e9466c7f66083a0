//! Stateless agent execution.
//!
//! An agent is one remote LLM invocation configured with a system prompt,
//! an optional tool surface, and an optional output schema. `run_once` drives
//! the agentic loop: completion, tool calls, tool results, completion again,
//! until the model produces a final text answer.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Error;
use crate::message::Message;
use crate::provider::{CompletionRequest, Provider, ResponseFormat, ToolChoice};
use crate::tool::ToolRegistry;

/// Configuration for a single agent run.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Agent name, used in logs and error messages.
    pub name: String,
    /// System prompt for the agent.
    pub system_prompt: Option<String>,
    /// Maximum agentic loop turns.
    pub max_turns: usize,
    /// Tool-choice policy for the first turn.
    pub tool_choice: ToolChoice,
    /// Tools this agent may see. Empty means the whole registry.
    pub allowed_tools: Vec<String>,
    /// JSON schema the final answer must conform to.
    pub response_format: Option<ResponseFormat>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: None,
            max_turns: 10,
            tool_choice: ToolChoice::Auto,
            allowed_tools: Vec::new(),
            response_format: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_turns(mut self, max: usize) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }

    pub fn with_allowed_tools(mut self, tools: Vec<String>) -> Self {
        self.allowed_tools = tools;
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }
}

/// A one-shot LLM-powered agent.
pub struct Agent;

impl Agent {
    /// Run a one-shot task and return the final text answer.
    ///
    /// The agent runs until it produces a response with no tool calls.
    /// `ToolChoice::Required` applies to the first turn only, otherwise the
    /// loop could never terminate.
    pub async fn run_once(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        input: impl Into<String>,
    ) -> Result<String, Error> {
        let mut messages = Vec::new();

        if let Some(system) = &config.system_prompt {
            messages.push(Message::system(system.as_str()));
        }
        messages.push(Message::user(input));

        let definitions = if config.allowed_tools.is_empty() {
            tools.definitions()
        } else {
            let names: Vec<&str> = config.allowed_tools.iter().map(|s| s.as_str()).collect();
            tools.subset_definitions(&names)
        };

        debug!(
            agent = %config.name,
            tools_available = definitions.len(),
            "Agent run starting"
        );

        for turn in 0..config.max_turns {
            let mut request = CompletionRequest::new(messages.clone())
                .with_tools(definitions.clone());

            if turn == 0 {
                request = request.with_tool_choice(config.tool_choice);
            }
            if let Some(format) = &config.response_format {
                request = request.with_response_format(format.clone());
            }

            let response = provider.complete(request).await?;
            let tool_calls = response.message.tool_calls;

            if !tool_calls.is_empty() {
                debug!(
                    agent = %config.name,
                    turn = turn,
                    tool_count = tool_calls.len(),
                    "Agent executing tools"
                );

                messages.push(Message::assistant_with_tool_calls("", tool_calls.clone()));

                for tool_call in &tool_calls {
                    let result = execute_tool(&tools, tool_call).await;
                    messages.push(Message::tool_result(&tool_call.id, result));
                }

                continue;
            }

            debug!(
                agent = %config.name,
                turns = turn + 1,
                response_len = response.message.content.len(),
                "Agent completed"
            );
            return Ok(response.message.content);
        }

        Err(Error::Unknown(format!(
            "Agent {} exceeded max turns ({})",
            config.name, config.max_turns
        )))
    }

    /// Run a one-shot task and parse the final answer into `T`.
    ///
    /// The config should carry a `response_format` matching `T`, so the model
    /// is constrained to emit conforming JSON.
    pub async fn run_structured<T: DeserializeOwned>(
        provider: Arc<dyn Provider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
        input: impl Into<String>,
    ) -> Result<T, Error> {
        let schema_name = config
            .response_format
            .as_ref()
            .map(|f| f.name.clone())
            .unwrap_or_else(|| config.name.clone());

        let output = Self::run_once(provider, tools, config, input).await?;

        serde_json::from_str(&output).map_err(|e| Error::schema(schema_name, e.to_string()))
    }
}

/// Execute a single tool call, flattening failures into an error string the
/// model can read.
async fn execute_tool(registry: &ToolRegistry, tool_call: &crate::message::ToolCall) -> String {
    let Some(tool) = registry.get(&tool_call.name) else {
        return format!("Error: Unknown tool '{}'", tool_call.name);
    };

    match tool.execute(tool_call.arguments.clone()).await {
        Ok(output) => {
            if output.is_error {
                format!("Error: {}", output.content)
            } else {
                output.content
            }
        }
        Err(e) => format!("Error executing tool: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use crate::provider::{CompletionResponse, FinishReason};
    use crate::testing::MockProvider;
    use crate::tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};
    use async_trait::async_trait;

    struct UppercaseTool;

    #[async_trait]
    impl Tool for UppercaseTool {
        fn name(&self) -> &str {
            "uppercase"
        }

        fn description(&self) -> &str {
            "Uppercase the given text"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new(self.name(), self.description()).with_parameters(
                ToolParameters::new()
                    .add_property("text", PropertySchema::string("Text to uppercase"), true),
            )
        }

        async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
            let text = arguments["text"].as_str().unwrap_or_default();
            Ok(ToolOutput::success(text.to_uppercase()))
        }
    }

    fn tool_call_response(calls: Vec<ToolCall>) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant_with_tool_calls("", calls),
            usage: Default::default(),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::ToolCalls,
        }
    }

    #[test]
    fn test_agent_config() {
        let config = AgentConfig::new("planner")
            .with_system_prompt("You plan searches")
            .with_max_turns(5)
            .with_tool_choice(ToolChoice::Required);

        assert_eq!(config.name, "planner");
        assert_eq!(config.system_prompt, Some("You plan searches".to_string()));
        assert_eq!(config.max_turns, 5);
        assert_eq!(config.tool_choice, ToolChoice::Required);
    }

    #[tokio::test]
    async fn test_run_once_plain_answer() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("final answer");

        let result = Agent::run_once(
            provider.clone(),
            Arc::new(ToolRegistry::new()),
            AgentConfig::new("writer").with_system_prompt("You write reports"),
            "write something",
        )
        .await
        .unwrap();

        assert_eq!(result, "final answer");

        // System prompt and user input both reach the provider.
        let request = provider.last_request().unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, "You write reports");
    }

    #[tokio::test]
    async fn test_run_once_executes_tools_then_answers() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_raw_response(tool_call_response(vec![ToolCall::new(
            "call-1",
            "uppercase",
            serde_json::json!({"text": "hello"}),
        )]));
        provider.queue_response("done");

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UppercaseTool));

        let result = Agent::run_once(
            provider.clone(),
            Arc::new(registry),
            AgentConfig::new("search").with_tool_choice(ToolChoice::Required),
            "Search term: hello",
        )
        .await
        .unwrap();

        assert_eq!(result, "done");
        assert_eq!(provider.request_count(), 2);

        // The second request includes the tool result message.
        let request = provider.last_request().unwrap();
        let tool_msg = request
            .messages
            .iter()
            .find(|m| m.tool_call_id.is_some())
            .unwrap();
        assert_eq!(tool_msg.content, "HELLO");

        // Required tool choice must not persist past the first turn.
        assert_eq!(request.tool_choice, ToolChoice::Auto);
    }

    #[tokio::test]
    async fn test_run_once_allowed_tools_filter() {
        struct NoopTool(&'static str);

        #[async_trait]
        impl Tool for NoopTool {
            fn name(&self) -> &str {
                self.0
            }

            fn description(&self) -> &str {
                "noop"
            }

            fn definition(&self) -> ToolDefinition {
                ToolDefinition::new(self.name(), self.description())
            }

            async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolOutput, Error> {
                Ok(ToolOutput::success(""))
            }
        }

        let provider = Arc::new(MockProvider::new());
        provider.queue_response("ok");

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(NoopTool("web_search")));
        registry.register(Box::new(NoopTool("send_email")));

        Agent::run_once(
            provider.clone(),
            Arc::new(registry),
            AgentConfig::new("search").with_allowed_tools(vec!["web_search".to_string()]),
            "go",
        )
        .await
        .unwrap();

        let request = provider.last_request().unwrap();
        assert_eq!(request.tools.len(), 1);
        assert_eq!(request.tools[0].name, "web_search");
    }

    #[tokio::test]
    async fn test_run_once_max_turns() {
        let provider = Arc::new(MockProvider::new());
        for _ in 0..3 {
            provider.queue_raw_response(tool_call_response(vec![ToolCall::new(
                "call-n",
                "uppercase",
                serde_json::json!({"text": "x"}),
            )]));
        }

        let mut registry = ToolRegistry::new();
        registry.register(Box::new(UppercaseTool));

        let err = Agent::run_once(
            provider,
            Arc::new(registry),
            AgentConfig::new("looper").with_max_turns(3),
            "loop forever",
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("exceeded max turns"));
    }

    #[tokio::test]
    async fn test_run_structured() {
        #[derive(serde::Deserialize)]
        struct Answer {
            value: u32,
        }

        let provider = Arc::new(MockProvider::new());
        provider.queue_response(r#"{"value": 42}"#);

        let answer: Answer = Agent::run_structured(
            provider,
            Arc::new(ToolRegistry::new()),
            AgentConfig::new("structured"),
            "give me a value",
        )
        .await
        .unwrap();

        assert_eq!(answer.value, 42);
    }

    #[tokio::test]
    async fn test_run_structured_schema_error() {
        let provider = Arc::new(MockProvider::new());
        provider.queue_response("not json at all");

        let result: Result<serde_json::Value, _> = Agent::run_structured(
            provider,
            Arc::new(ToolRegistry::new()),
            AgentConfig::new("structured").with_response_format(ResponseFormat::json_schema(
                "answer",
                serde_json::json!({"type": "object"}),
            )),
            "give me a value",
        )
        .await;

        match result {
            Err(Error::Schema { schema, .. }) => assert_eq!(schema, "answer"),
            other => panic!("Expected schema error, got {:?}", other.map(|_| ())),
        }
    }
}
