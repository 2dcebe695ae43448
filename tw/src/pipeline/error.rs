//! Pipeline error types

use thiserror::Error;

use crate::domain::{ErrorCode, TicketResponse};
use crate::llm::LlmError;

/// Why no payload could be pulled out of a completion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Model refused: {0}")]
    Refused(String),
}

/// A parsed payload that does not satisfy the ticket schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Invalid status: {0:?}")]
    InvalidStatus(Option<String>),

    #[error("Missing or empty field: {0}")]
    MissingField(&'static str),

    /// `not_enough` verdict without a follow-up question; recoverable by the loop
    #[error("Clarification question missing (reason: {reason})")]
    MissingQuestion { reason: String },

    #[error("Unknown issue type: {0}")]
    UnknownIssueType(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Legacy ticket rejected: {0}")]
    LegacyGate(String),
}

/// Errors surfaced by a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream error: {0}")]
    Upstream(#[from] LlmError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Model output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    #[error("Unrecognized issue type: {0}")]
    UnrecognizedIssueType(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl PipelineError {
    /// Stable code reported to callers
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Upstream(e) if e.is_auth() => ErrorCode::Unauthorized,
            Self::Upstream(e) if e.is_rate_limit() => ErrorCode::RateLimited,
            Self::Upstream(LlmError::Timeout(_)) => ErrorCode::UpstreamTimeout,
            Self::Upstream(LlmError::Config(_)) => ErrorCode::ConfigError,
            Self::Upstream(_) => ErrorCode::UpstreamError,
            Self::Extraction(ExtractError::EmptyResponse) => ErrorCode::EmptyResponse,
            Self::Extraction(ExtractError::Refused(_)) => ErrorCode::Refused,
            Self::Parse(_) => ErrorCode::InvalidJson,
            Self::Schema(_) => ErrorCode::SchemaViolation,
            Self::UnrecognizedIssueType(_) => ErrorCode::UnrecognizedIssueType,
            Self::Prompt(_) => ErrorCode::PromptError,
        }
    }

    /// Error-shaped response carrying the failure's code
    pub fn to_response(&self) -> TicketResponse {
        TicketResponse::error(self.to_string(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_codes() {
        assert_eq!(
            PipelineError::InvalidInput("x".to_string()).code(),
            ErrorCode::InvalidInput
        );
        assert_eq!(
            PipelineError::Upstream(LlmError::Timeout(Duration::from_secs(30))).code(),
            ErrorCode::UpstreamTimeout
        );
        assert_eq!(
            PipelineError::Upstream(LlmError::RateLimited {
                retry_after: Duration::from_secs(1)
            })
            .code(),
            ErrorCode::RateLimited
        );
        assert_eq!(
            PipelineError::Upstream(LlmError::Unauthorized("bad key".to_string())).code(),
            ErrorCode::Unauthorized
        );
        assert_eq!(
            PipelineError::Upstream(LlmError::ApiError {
                status: 503,
                message: "down".to_string()
            })
            .code(),
            ErrorCode::UpstreamError
        );
        assert_eq!(
            PipelineError::Upstream(LlmError::Config("unknown provider".to_string())).code(),
            ErrorCode::ConfigError
        );
        assert_eq!(
            PipelineError::Extraction(ExtractError::Refused("no".to_string())).code(),
            ErrorCode::Refused
        );
        assert_eq!(
            PipelineError::Schema(SchemaViolation::NotAnObject).code(),
            ErrorCode::SchemaViolation
        );
    }

    #[test]
    fn test_to_response_carries_code() {
        let resp = PipelineError::Extraction(ExtractError::EmptyResponse).to_response();
        match resp {
            TicketResponse::Error { code, reason } => {
                assert_eq!(code, Some(ErrorCode::EmptyResponse));
                assert!(!reason.is_empty());
            }
            other => panic!("Expected Error, got {:?}", other),
        }
    }
}
