//! Ticketwright - structured tickets from free-form issue reports
//!
//! Ticketwright drives an OpenAI-compatible completion API through a bounded
//! clarification dialogue until the model has enough information to draft a
//! ticket that passes schema validation.
//!
//! # Core Concepts
//!
//! - **Untrusted model**: every completion is sanitized, extracted, parsed and
//!   validated before anything reaches the caller
//! - **One correction**: a rejected answer earns exactly one corrective retry
//! - **Caller-owned dialogue**: clarification state travels in the request
//!
//! # Modules
//!
//! - [`pipeline`] - Sanitizer, extractor, validator, retry strategy, clarification loop
//! - [`domain`] - Issue-type and scope registries, ticket and wire types
//! - [`llm`] - LLM client trait and OpenAI implementation
//! - [`prompts`] - Prompt templates
//! - [`server`] - HTTP endpoint
//! - [`session`] - Interactive terminal session
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod session;
pub mod text;

// Re-export commonly used types
pub use config::{Config, LlmConfig};
pub use domain::{TicketRequest, TicketResponse};
pub use llm::{ClientCache, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use pipeline::{LoopOutcome, PipelineError, PipelineSettings, TicketPipeline};
pub use prompts::PromptLoader;
