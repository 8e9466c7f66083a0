//! Data model for the research pipeline: search plans and reports.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A single web search to be performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchItem {
    /// Why this search matters for answering the query.
    pub reason: String,
    /// The search term to use for the web search.
    pub query: String,
}

/// An ordered plan of web searches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchPlan {
    pub searches: Vec<WebSearchItem>,
}

impl WebSearchPlan {
    /// JSON schema for structured planner output.
    pub fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "searches": {
                    "type": "array",
                    "description": "A list of web searches to perform to best answer the query.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "reason": {
                                "type": "string",
                                "description": "The reasoning for why this search is important to the query."
                            },
                            "query": {
                                "type": "string",
                                "description": "The search term to use for the web search."
                            }
                        },
                        "required": ["reason", "query"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["searches"],
            "additionalProperties": false
        })
    }
}

/// The final research report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    /// A short 2-3 sentence summary of the findings.
    pub short_summary: String,
    /// The full report in markdown.
    pub markdown_report: String,
    /// Suggested topics to research further.
    pub follow_up_questions: Vec<String>,
}

impl ReportData {
    /// JSON schema for structured writer output.
    pub fn json_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "short_summary": {
                    "type": "string",
                    "description": "A short 2-3 sentence summary of the findings."
                },
                "markdown_report": {
                    "type": "string",
                    "description": "The final report in markdown format. Lengthy and detailed, at least 1000 words."
                },
                "follow_up_questions": {
                    "type": "array",
                    "description": "Suggested topics to research further.",
                    "items": {"type": "string"}
                }
            },
            "required": ["short_summary", "markdown_report", "follow_up_questions"],
            "additionalProperties": false
        })
    }
}
