//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Error;
use crate::message::{Message, Usage};
use crate::provider::{CompletionRequest, CompletionResponse, FinishReason, Provider};

/// A mock provider that returns pre-configured responses.
pub struct MockProvider {
    outcomes: Mutex<Vec<Result<CompletionResponse, Error>>>,
    /// Captured requests (for assertion).
    pub captured_requests: Mutex<Vec<CompletionRequest>>,
    pub name: String,
    pub default_model: Option<String>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            captured_requests: Mutex::new(Vec::new()),
            name: "mock".to_string(),
            default_model: None,
        }
    }

    /// Queue a response to be returned by the next complete() call.
    /// Outcomes are returned in FIFO order (first queued = first returned).
    pub fn queue_response(&self, content: &str) {
        let response = CompletionResponse {
            message: Message::assistant(content),
            usage: Usage::new(0, 0),
            model: "mock-model".to_string(),
            finish_reason: FinishReason::Stop,
        };
        self.outcomes.lock().unwrap().insert(0, Ok(response));
    }

    /// Queue a raw CompletionResponse.
    pub fn queue_raw_response(&self, response: CompletionResponse) {
        self.outcomes.lock().unwrap().insert(0, Ok(response));
    }

    /// Queue an error. It shares the FIFO queue with responses, so errors
    /// can be interleaved at specific positions.
    pub fn queue_error(&self, error: Error) {
        self.outcomes.lock().unwrap().insert(0, Err(error));
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.captured_requests.lock().unwrap().len()
    }

    /// Get the last captured request.
    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.captured_requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        self.captured_requests.lock().unwrap().push(request);
        match self.outcomes.lock().unwrap().pop() {
            Some(outcome) => outcome,
            None => Err(Error::Unknown("No mock response queued".to_string())),
        }
    }
}
