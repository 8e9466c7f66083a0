//! Web search tool backed by a search API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use dr_core::{Error, PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters};

/// Configuration for the web search API.
#[derive(Clone, Debug)]
pub struct WebSearchConfig {
    /// Base URL of the search API (e.g., "http://localhost:3000")
    pub host: String,
}

impl WebSearchConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }
}

pub struct WebSearchTool {
    client: Client,
    config: WebSearchConfig,
}

impl WebSearchTool {
    pub fn new(config: WebSearchConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent("dr-cli/0.1.0")
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            config,
        }
    }
}

#[derive(Serialize)]
struct SearchRequest {
    query: String,
    #[serde(rename = "optimizationMode")]
    optimization_mode: String,
    sources: Vec<String>,
    stream: bool,
}

#[derive(Deserialize)]
struct SearchResponse {
    message: String,
    #[serde(default)]
    sources: Vec<SearchSource>,
}

#[derive(Deserialize)]
struct SearchSource {
    metadata: SourceMetadata,
}

#[derive(Deserialize)]
struct SourceMetadata {
    title: String,
    url: String,
}

#[derive(Deserialize)]
struct WebSearchArgs {
    query: String,
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web using natural language queries. Returns a synthesized answer with sources."
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(
            ToolParameters::new().add_property(
                "query",
                PropertySchema::string("The search query (can be natural language)"),
                true,
            ),
        )
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolOutput, Error> {
        let args: WebSearchArgs = serde_json::from_value(arguments)
            .map_err(|e| Error::tool("web_search", format!("Invalid arguments: {}", e)))?;

        let request = SearchRequest {
            query: args.query.clone(),
            optimization_mode: "speed".to_string(),
            sources: vec!["web".to_string()],
            stream: false,
        };

        let url = format!("{}/api/search", self.config.host);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::tool("web_search", format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::tool(
                "web_search",
                format!("Search API error {}: {}", status, body),
            ));
        }

        let result: SearchResponse = response.json().await.map_err(|e| {
            Error::tool("web_search", format!("Failed to parse search response: {}", e))
        })?;

        // Format output
        let mut output = result.message;

        if !result.sources.is_empty() {
            output.push_str("\n\n## Sources\n");
            for source in result.sources {
                output.push_str(&format!(
                    "- [{}]({})\n",
                    source.metadata.title, source.metadata.url
                ));
            }
        }

        Ok(ToolOutput::success(output))
    }
}
