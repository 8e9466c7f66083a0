//! Writer agent: synthesizes search summaries into a full report.

use dr_core::ResponseFormat;

use crate::schema::ReportData;
use crate::ResearchAgent;

const SYSTEM_PROMPT: &str = r#"You are a senior researcher tasked with writing a cohesive report for a research query. You will be provided with the original query and initial research done by a research assistant.

**Process:**
1. First, analyze the research findings and create an outline for the report
2. Structure the report with clear sections and logical flow
3. Generate a comprehensive, detailed report based on the findings

**Report Requirements:**
- **Length**: 5-10 pages of content, at least 1000 words
- **Format**: Markdown format with proper headings, lists, and formatting
- **Structure**: Include introduction, main sections, conclusion, and recommendations
- **Quality**: Professional, well-researched, and thoroughly analyzed
- **Sources**: Reference the research findings appropriately
- **Follow-up**: Suggest 3-5 relevant topics for further research

**Content Guidelines:**
- Start with an executive summary
- Present findings in logical, well-organized sections
- Include relevant statistics, examples, and evidence
- Provide balanced analysis with multiple perspectives
- End with actionable conclusions and recommendations
- Include a list of follow-up research questions"#;

pub struct WriterAgent;

impl WriterAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WriterAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearchAgent for WriterAgent {
    fn name(&self) -> &str {
        "writer"
    }

    fn description(&self) -> &str {
        "Synthesizes search summaries into a detailed markdown report"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn output_schema(&self) -> Option<ResponseFormat> {
        Some(ResponseFormat::json_schema(
            "report_data",
            ReportData::json_schema(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_agent() {
        let agent = WriterAgent::new();
        assert_eq!(agent.name(), "writer");
        assert!(agent.system_prompt().contains("senior researcher"));
        assert!(agent.tool_names().is_empty());
        assert_eq!(agent.output_schema().unwrap().name, "report_data");
    }
}
