//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Ticket drafting system prompt with the issue-type guide
pub const SYSTEM: &str = include_str!("../../prompts/system.pmt");

/// User message: working prompt, scopes and title prefix
pub const USER: &str = include_str!("../../prompts/user.pmt");

/// Minimal system prompt used when the model forgot to ask its question
pub const CLARIFY: &str = include_str!("../../prompts/clarify.pmt");

/// Correction instruction for the single retry
pub const CORRECTION: &str = include_str!("../../prompts/correction.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "system" => Some(SYSTEM),
        "user" => Some(USER),
        "clarify" => Some(CLARIFY),
        "correction" => Some(CORRECTION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
