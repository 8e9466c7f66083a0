use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dr_core::{
    CompletionRequest, CompletionResponse, Error, FinishReason, Message, Provider, Role,
    ToolCall, ToolChoice, ToolDefinition, Usage,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: Option<String>,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            default_model: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    fn build_request(&self, request: &CompletionRequest) -> OpenAIChatRequest {
        // Model priority: request > provider default
        // If neither is set, don't send model field (let API use its default)
        let model = request.model.clone().or_else(|| self.default_model.clone());

        let messages: Vec<OpenAIMessage> = request
            .messages
            .iter()
            .map(|m| self.convert_message(m))
            .collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(request.tools.iter().map(|t| self.convert_tool(t)).collect())
        };

        // tool_choice is only meaningful when tools are attached; some
        // servers reject the field otherwise.
        let tool_choice = if request.tools.is_empty() {
            None
        } else {
            match request.tool_choice {
                ToolChoice::Auto => None,
                ToolChoice::Required => Some("required".to_string()),
            }
        };

        let response_format = request.response_format.as_ref().map(|f| OpenAIResponseFormat {
            r#type: "json_schema".to_string(),
            json_schema: OpenAIJsonSchema {
                name: f.name.clone(),
                strict: true,
                schema: f.schema.clone(),
            },
        });

        OpenAIChatRequest {
            model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools,
            tool_choice,
            response_format,
        }
    }

    fn convert_message(&self, message: &Message) -> OpenAIMessage {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let content = if message.content.is_empty() {
            None
        } else {
            Some(message.content.clone())
        };

        let tool_calls = if message.tool_calls.is_empty() {
            None
        } else {
            Some(
                message
                    .tool_calls
                    .iter()
                    .map(|tc| OpenAIToolCall {
                        id: tc.id.clone(),
                        r#type: "function".to_string(),
                        function: OpenAIFunctionCall {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect(),
            )
        };

        OpenAIMessage {
            role: role.to_string(),
            content,
            tool_calls,
            tool_call_id: message.tool_call_id.clone(),
        }
    }

    fn convert_tool(&self, tool: &ToolDefinition) -> OpenAITool {
        OpenAITool {
            r#type: "function".to_string(),
            function: OpenAIFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: serde_json::to_value(&tool.parameters).unwrap_or_default(),
            },
        }
    }

    fn parse_response(&self, response: OpenAIChatResponse) -> Result<CompletionResponse, Error> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::api(500, "No choices in response"))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                ToolCall::new(
                    tc.id,
                    tc.function.name,
                    serde_json::from_str(&tc.function.arguments).unwrap_or_default(),
                )
            })
            .collect();

        let content = choice.message.content.unwrap_or_default();

        let message = if tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            Message::assistant_with_tool_calls(content, tool_calls)
        };

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") => FinishReason::Stop,
            Some("length") => FinishReason::Length,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));

        Ok(CompletionResponse {
            message,
            usage: usage.unwrap_or_default(),
            model: response.model,
            finish_reason,
        })
    }

    fn parse_error(&self, status: u16, body: &str) -> Error {
        #[derive(Deserialize)]
        struct ErrorResponse {
            error: ErrorDetail,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            message: String,
        }

        if let Ok(err) = serde_json::from_str::<ErrorResponse>(body) {
            match status {
                401 => Error::auth(err.error.message),
                429 => Error::rate_limit(err.error.message),
                400 => Error::invalid_request(err.error.message),
                _ => Error::api(status, err.error.message),
            }
        } else {
            Error::api(status, body.to_string())
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        let api_request = self.build_request(&request);
        debug!("OpenAI request: {:?}", api_request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| Error::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &error_text));
        }

        let api_response: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| Error::serialization(e.to_string()))?;

        self.parse_response(api_response)
    }
}

// OpenAI API types

#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    /// Model to use. Optional for servers that have a default model.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Serialize)]
struct OpenAIResponseFormat {
    r#type: String,
    json_schema: OpenAIJsonSchema,
}

#[derive(Debug, Serialize)]
struct OpenAIJsonSchema {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIToolCall {
    id: String,
    r#type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunction,
}

#[derive(Debug, Serialize)]
struct OpenAIFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    model: String,
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use dr_core::{PropertySchema, ResponseFormat, ToolParameters};

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::new("test-key");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), None);
    }

    #[test]
    fn test_provider_with_custom_model() {
        let provider = OpenAIProvider::new("test-key").with_default_model("gpt-4o-mini");
        assert_eq!(provider.default_model(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_build_request() {
        let provider = OpenAIProvider::new("test-key").with_default_model("test-model");
        let request = CompletionRequest::new(vec![Message::user("Hello")]);
        let api_request = provider.build_request(&request);

        assert_eq!(api_request.model, Some("test-model".to_string()));
        assert_eq!(api_request.messages.len(), 1);
        assert_eq!(api_request.messages[0].role, "user");
        assert!(api_request.tool_choice.is_none());
    }

    #[test]
    fn test_build_request_no_model() {
        let provider = OpenAIProvider::new("test-key");
        let request = CompletionRequest::new(vec![Message::user("Hello")]);
        let api_request = provider.build_request(&request);

        // No model configured - field should be None (skipped in serialization)
        assert_eq!(api_request.model, None);
    }

    #[test]
    fn test_build_request_required_tool_choice() {
        let provider = OpenAIProvider::new("test-key");
        let tool = ToolDefinition::new("web_search", "Search the web").with_parameters(
            ToolParameters::new()
                .add_property("query", PropertySchema::string("The search query"), true),
        );

        let request = CompletionRequest::new(vec![Message::user("Search term: rust")])
            .with_tools(vec![tool])
            .with_tool_choice(ToolChoice::Required);
        let api_request = provider.build_request(&request);

        assert_eq!(api_request.tool_choice.as_deref(), Some("required"));
        assert_eq!(api_request.tools.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn test_build_request_tool_choice_without_tools() {
        let provider = OpenAIProvider::new("test-key");
        let request = CompletionRequest::new(vec![Message::user("Hello")])
            .with_tool_choice(ToolChoice::Required);
        let api_request = provider.build_request(&request);

        // No tools attached, so tool_choice must not be sent.
        assert!(api_request.tool_choice.is_none());
    }

    #[test]
    fn test_build_request_response_format() {
        let provider = OpenAIProvider::new("test-key");
        let request = CompletionRequest::new(vec![Message::user("plan")]).with_response_format(
            ResponseFormat::json_schema("web_search_plan", serde_json::json!({"type": "object"})),
        );
        let api_request = provider.build_request(&request);

        let format = api_request.response_format.unwrap();
        assert_eq!(format.r#type, "json_schema");
        assert_eq!(format.json_schema.name, "web_search_plan");
        assert!(format.json_schema.strict);
    }

    #[test]
    fn test_parse_response_with_tool_calls() {
        let provider = OpenAIProvider::new("test-key");
        let raw = serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call-1",
                        "type": "function",
                        "function": {"name": "send_email", "arguments": "{\"subject\":\"Report\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        });

        let response: OpenAIChatResponse = serde_json::from_value(raw).unwrap();
        let parsed = provider.parse_response(response).unwrap();

        assert_eq!(parsed.finish_reason, FinishReason::ToolCalls);
        assert_eq!(parsed.message.tool_calls.len(), 1);
        assert_eq!(parsed.message.tool_calls[0].name, "send_email");
        assert_eq!(parsed.usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_error_mapping() {
        let provider = OpenAIProvider::new("test-key");

        let body = r#"{"error": {"message": "Invalid API key"}}"#;
        assert!(matches!(provider.parse_error(401, body), Error::Auth(_)));
        assert!(matches!(provider.parse_error(429, body), Error::RateLimit(_)));
        assert!(matches!(provider.parse_error(400, body), Error::InvalidRequest(_)));
        assert!(matches!(provider.parse_error(500, body), Error::Api { .. }));

        // Unparseable body falls back to a raw API error.
        assert!(matches!(provider.parse_error(401, "oops"), Error::Api { .. }));
    }
}
