//! LlmClient trait definition

use async_trait::async_trait;

use super::{CompletionRequest, CompletionResponse, LlmError};

/// Stateless LLM client - each call is independent
///
/// The pipeline treats the implementation as an untrusted function: it may
/// return malformed JSON, refuse, or return nothing at all. Conversation
/// state lives entirely in the request's message list.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single completion request and wait for the full response
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model used when a request carries no override
    fn default_model(&self) -> &str;
}
