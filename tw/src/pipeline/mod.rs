//! Prompt-completion orchestration pipeline
//!
//! Leaf-first: the sanitizer repairs raw model text, the extractor finds that
//! text in a completion choice, the validator turns parsed JSON into a
//! verdict, the retry strategy bounds each exchange to one correction, and the
//! clarification loop decides what the caller sees.

mod clarify;
mod error;
mod extract;
mod retry;
mod sanitize;
mod validate;

pub use clarify::{
    DEFAULT_QUESTION, LoopOutcome, PipelineSettings, SUBMIT_TOOL, TicketPipeline, submit_ticket_tool, working_prompt,
};
pub use error::{ExtractError, PipelineError, SchemaViolation};
pub use extract::{CompletionPayload, extract, extract_response, flatten};
pub use retry::{MAX_ATTEMPTS, PREVIEW_CHARS, RetryOptions, Validated, complete_with_retry};
pub use sanitize::{escape_control_chars, sanitize, strip_fences};
pub use validate::validate;
