//! Wire request and response types

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::scope::Scope;
use super::ticket::TicketDraft;

/// A request to draft a ticket
///
/// Every field defaults so that a structurally incomplete body reaches input
/// validation and is rejected with a proper error instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TicketRequest {
    /// Free-form problem description
    pub text: String,
    /// Model identifier; `None` uses the configured model
    pub agent: Option<String>,
    /// Scope keys (`ui`, `api`, ...)
    pub scope: Vec<String>,
    /// Answers to earlier clarification questions, oldest first
    pub previous_clarifications: Vec<String>,
}

impl TicketRequest {
    pub fn new(text: impl Into<String>, scope: &[&str]) -> Self {
        Self {
            text: text.into(),
            scope: scope.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Check the request and resolve its scope keys
    pub fn validate(&self) -> Result<Vec<&'static Scope>, String> {
        debug!(scope_count = self.scope.len(), "TicketRequest::validate: called");
        if self.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        self.resolve_scopes()
    }

    /// Resolve scope keys to registry entries, dropping duplicates
    pub fn resolve_scopes(&self) -> Result<Vec<&'static Scope>, String> {
        if self.scope.is_empty() {
            return Err("scope must contain at least one scope key".to_string());
        }

        let mut scopes: Vec<&'static Scope> = Vec::with_capacity(self.scope.len());
        for key in &self.scope {
            let scope = Scope::get(key).ok_or_else(|| {
                format!("unknown scope '{}'; expected one of: {}", key, Scope::keys().join(", "))
            })?;
            if !scopes.iter().any(|s| s.key == scope.key) {
                scopes.push(scope);
            }
        }
        Ok(scopes)
    }

    /// Number of clarification rounds already completed
    pub fn round_count(&self) -> usize {
        self.previous_clarifications.len()
    }
}

/// Stable machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidInput,
    MaxRoundsReached,
    Unauthorized,
    RateLimited,
    UpstreamTimeout,
    UpstreamError,
    EmptyResponse,
    Refused,
    InvalidJson,
    SchemaViolation,
    UnrecognizedIssueType,
    PromptError,
    ConfigError,
}

/// Pipeline response, tagged by `status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TicketResponse {
    Done(TicketDraft),
    NeedsInfo {
        reason: String,
        #[serde(rename = "missingInfoPrompt")]
        missing_info_prompt: String,
    },
    Error {
        reason: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<ErrorCode>,
    },
}

impl TicketResponse {
    pub fn error(reason: impl Into<String>, code: ErrorCode) -> Self {
        Self::Error {
            reason: reason.into(),
            code: Some(code),
        }
    }

    /// True once the dialogue cannot continue
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::NeedsInfo { .. })
    }
}
