//! dr-core: Core types and traits for deep-research
//!
//! This crate provides the foundational types and traits used throughout
//! the deep-research pipeline: chat messages, the LLM provider trait, the
//! tool registry, and the stateless agent runner.

pub mod agent;
pub mod error;
pub mod message;
pub mod provider;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tool;

pub use agent::{Agent, AgentConfig};
pub use error::Error;
pub use message::{Message, Role, ToolCall, Usage};
pub use provider::{
    CompletionRequest, CompletionResponse, FinishReason, Provider, ResponseFormat, ToolChoice,
};
pub use tool::{PropertySchema, Tool, ToolDefinition, ToolOutput, ToolParameters, ToolRegistry};

pub type Result<T> = std::result::Result<T, Error>;
