//! Built-in tools for deep-research: web search and email delivery.

use std::sync::Arc;

use dr_core::{Tool, ToolRegistry};

mod email;
mod web;

pub use email::{EmailConfig, SendEmailTool};
pub use web::{WebSearchConfig, WebSearchTool};

/// Build a tool registry with the research tools.
///
/// Email delivery is optional; when no config is given the registry carries
/// only the search tool and the pipeline skips the delivery stage.
pub fn create_research_tools(
    search_config: WebSearchConfig,
    email_config: Option<EmailConfig>,
) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(WebSearchTool::new(search_config)));

    if let Some(config) = email_config {
        registry.register(Box::new(SendEmailTool::new(config)));
    }

    Arc::new(registry)
}
