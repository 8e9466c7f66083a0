//! LLM provider implementations for deep-research.

mod openai;

pub use openai::OpenAIProvider;
