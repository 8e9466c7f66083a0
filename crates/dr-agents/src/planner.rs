//! Planner agent: turns a research query into a set of web searches.

use dr_core::ResponseFormat;

use crate::schema::WebSearchPlan;
use crate::ResearchAgent;

/// Number of searches the planner asks for when none is configured.
pub const DEFAULT_SEARCH_COUNT: usize = 5;

pub struct PlannerAgent {
    system_prompt: String,
}

impl PlannerAgent {
    /// Create a planner that asks for `search_count` searches.
    pub fn new(search_count: usize) -> Self {
        let system_prompt = format!(
            r#"You are a helpful research assistant. Given a query, come up with a set of web searches to perform to best answer the query. Output {search_count} terms to query for.

Your searches should be:
1. **Comprehensive** - Cover different aspects of the topic
2. **Specific** - Use precise search terms for better results
3. **Diverse** - Include different perspectives and sources
4. **Relevant** - Directly related to the research query

For each search, provide a clear reason explaining why this search is important to understanding the query."#
        );

        Self { system_prompt }
    }
}

impl Default for PlannerAgent {
    fn default() -> Self {
        Self::new(DEFAULT_SEARCH_COUNT)
    }
}

impl ResearchAgent for PlannerAgent {
    fn name(&self) -> &str {
        "planner"
    }

    fn description(&self) -> &str {
        "Plans the web searches needed to answer a research query"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn output_schema(&self) -> Option<ResponseFormat> {
        Some(ResponseFormat::json_schema(
            "web_search_plan",
            WebSearchPlan::json_schema(),
        ))
    }
}
