//! LLM Client module for Ticketwright
//!
//! Provides the completion transport the pipeline drives, plus a cache that
//! hands out one shared client per credential.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

pub mod client;
mod error;
mod openai;
mod types;

pub use client::LlmClient;
pub use error::LlmError;
pub use openai::OpenAIClient;
pub use types::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, ContentWrapper, FunctionCall, Message,
    MessageContent, ResponseFormat, Role, TokenUsage, ToolCall, ToolDefinition,
};

use crate::config::LlmConfig;

/// Create an LLM client based on the provider specified in config
///
/// Supports "openai" (any OpenAI-compatible endpoint).
pub fn create_client(config: &LlmConfig, api_key: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "openai" => {
            debug!("create_client: creating OpenAI client");
            Ok(Arc::new(OpenAIClient::from_config(config, api_key)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::Config(format!(
                "Unknown LLM provider: '{}'. Supported: openai",
                other
            )))
        }
    }
}

/// Holds the most recently built client together with the credential it was
/// built for
///
/// Clients are stateless, so concurrent requests share one instance. A request
/// carrying a different credential replaces the cached client.
#[derive(Default)]
pub struct ClientCache {
    slot: Mutex<Option<(String, Arc<dyn LlmClient>)>>,
}

impl ClientCache {
    pub fn new() -> Self {
        debug!("ClientCache::new: called");
        Self::default()
    }

    /// Cache pre-seeded with a client for `api_key`
    pub fn with_client(api_key: impl Into<String>, client: Arc<dyn LlmClient>) -> Self {
        debug!("ClientCache::with_client: called");
        Self {
            slot: Mutex::new(Some((api_key.into(), client))),
        }
    }

    /// Return the client for `api_key`, building one when the credential changed
    pub fn client_for(&self, config: &LlmConfig, api_key: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
        debug!("ClientCache::client_for: called");
        // The slot holds no invariant a panicking holder could break
        let mut slot = self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some((cached_key, client)) = slot.as_ref()
            && cached_key == api_key
        {
            debug!("ClientCache::client_for: cache hit");
            return Ok(Arc::clone(client));
        }

        info!(model = %config.model, "Building LLM client for new credential");
        let client = create_client(config, api_key)?;
        *slot = Some((api_key.to_string(), Arc::clone(&client)));
        Ok(client)
    }
}
