//! Agent definitions and data model for deep-research.
//!
//! This crate provides:
//! - `ResearchAgent` trait for defining agent behavior
//! - The four pipeline agents (planner, search, writer, email)
//! - The serde data model for plans and reports

mod email;
mod planner;
mod schema;
mod search;
mod writer;

pub use email::EmailAgent;
pub use planner::{PlannerAgent, DEFAULT_SEARCH_COUNT};
pub use schema::{ReportData, WebSearchItem, WebSearchPlan};
pub use search::SearchAgent;
pub use writer::WriterAgent;

use dr_core::{AgentConfig, ResponseFormat, ToolChoice};

/// Trait for the research pipeline agents.
///
/// Each agent is a single remote LLM invocation: a system prompt, a set of
/// tools it may call, and optionally a JSON schema its final answer must
/// conform to.
pub trait ResearchAgent: Send + Sync {
    /// Get the agent name (e.g., "planner", "search")
    fn name(&self) -> &str;

    /// Get the agent description for display
    fn description(&self) -> &str;

    /// Get the system prompt for this agent
    fn system_prompt(&self) -> &str;

    /// Get the tool names this agent needs
    fn tool_names(&self) -> &[&str] {
        &[]
    }

    /// Get the default max turns for the agentic loop
    fn max_turns(&self) -> usize {
        10
    }

    /// Tool-choice policy for the first turn.
    fn tool_choice(&self) -> ToolChoice {
        ToolChoice::Auto
    }

    /// JSON schema the final answer must conform to, if any.
    fn output_schema(&self) -> Option<ResponseFormat> {
        None
    }

    /// Build the runner configuration for this agent.
    fn agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig::new(self.name())
            .with_system_prompt(self.system_prompt())
            .with_max_turns(self.max_turns())
            .with_tool_choice(self.tool_choice())
            .with_allowed_tools(self.tool_names().iter().map(|s| s.to_string()).collect());
        if let Some(format) = self.output_schema() {
            config = config.with_response_format(format);
        }
        config
    }
}
