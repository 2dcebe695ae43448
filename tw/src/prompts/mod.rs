//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for ticket drafting.
//!
//! Template loading chain:
//! 1. `pipeline.prompts-dir/{name}.pmt` (configured override)
//! 2. `.ticketwright/prompts/{name}.pmt` (project override)
//! 3. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{ClarifyPromptContext, PromptLoader, SystemPromptContext, UserPromptContext};
