//! Search agent: runs one web search and summarizes the results.

use dr_core::ToolChoice;

use crate::ResearchAgent;

const SYSTEM_PROMPT: &str = r#"You are a research assistant. Given a search term, you search the web for that term and produce a concise summary of the results.

**Requirements:**
- Summary must be 2-3 paragraphs and less than 300 words
- Capture the main points and key insights
- Write succinctly, focus on essential information
- This will be consumed by someone synthesizing a report, so capture the essence and ignore fluff
- Do not include any additional commentary other than the summary itself
- Focus on factual information and avoid speculation

**Format:**
- Start with the most relevant findings
- Include key statistics, dates, or facts if available
- End with any important conclusions or implications"#;

pub struct SearchAgent;

impl SearchAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SearchAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearchAgent for SearchAgent {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Performs a single web search and summarizes the results"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn tool_names(&self) -> &[&str] {
        &["web_search"]
    }

    // The agent must actually search before summarizing.
    fn tool_choice(&self) -> ToolChoice {
        ToolChoice::Required
    }
}
