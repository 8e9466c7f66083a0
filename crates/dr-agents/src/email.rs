//! Email agent: formats the report as HTML and sends it.

use crate::ResearchAgent;

const SYSTEM_PROMPT: &str = r#"You are able to send a nicely formatted HTML email based on a detailed report.

**Process:**
1. Analyze the provided research report
2. Create an appropriate subject line that captures the main topic
3. Convert the markdown report into clean, well-presented HTML
4. Use your tool to send the email

**Email Guidelines:**
- **Subject**: Clear, concise, and descriptive (max 100 characters)
- **Format**: Professional HTML with proper structure
- **Content**: Include the full report with proper formatting
- **Style**: Clean, readable, and professional appearance
- **Length**: Include the complete report content

**HTML Formatting:**
- Use proper HTML tags (h1, h2, h3, p, ul, ol, etc.)
- Ensure good readability with appropriate spacing
- Use consistent formatting throughout
- Include a brief introduction before the main content"#;

pub struct EmailAgent;

impl EmailAgent {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EmailAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ResearchAgent for EmailAgent {
    fn name(&self) -> &str {
        "email"
    }

    fn description(&self) -> &str {
        "Converts the report to HTML and delivers it by email"
    }

    fn system_prompt(&self) -> &str {
        SYSTEM_PROMPT
    }

    fn tool_names(&self) -> &[&str] {
        &["send_email"]
    }
}
