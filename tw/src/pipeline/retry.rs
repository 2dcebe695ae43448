//! Completion retry strategy
//!
//! One call, then at most one corrective call. The corrective call replays the
//! rejected output as an assistant turn and follows it with a fixed correction
//! instruction. Transport failures are surfaced immediately and never consume
//! the retry; only bad model output does.

use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{PipelineError, SchemaViolation};
use super::extract::{CompletionPayload, extract_response};
use crate::llm::{CompletionRequest, LlmClient, LlmError, Message};
use crate::text::truncate_chars;

/// Characters of model output kept in log previews
pub const PREVIEW_CHARS: usize = 200;

/// Attempts per run: the initial call plus one correction
pub const MAX_ATTEMPTS: u32 = 2;

/// Knobs for [`complete_with_retry`]
#[derive(Debug, Clone)]
pub struct RetryOptions {
    /// Upper bound on each completion call
    pub timeout: Duration,
    /// Log bounded previews of raw and cleaned output
    pub log_previews: bool,
    /// User turn appended before the corrective call
    pub correction: String,
}

/// A payload that passed validation
#[derive(Debug, Clone)]
pub struct Validated<T> {
    pub value: T,
    pub payload: CompletionPayload,
    /// 1 when the first call succeeded, 2 when the correction was needed
    pub attempts: u32,
}

/// Outcome of a single failed attempt
enum AttemptError {
    /// The transport failed; not retried
    Upstream(LlmError),
    /// The model answered but the answer was unusable
    Invalid { raw: Option<String>, error: PipelineError },
}

/// Run a completion with the one-retry budget
pub async fn complete_with_retry<T, F>(
    client: &dyn LlmClient,
    request: CompletionRequest,
    options: &RetryOptions,
    validate: F,
) -> Result<Validated<T>, PipelineError>
where
    F: Fn(&Value) -> Result<T, SchemaViolation>,
{
    debug!(messages = request.messages.len(), timeout = ?options.timeout, "complete_with_retry: called");

    let (raw, error) = match attempt(client, &request, options, &validate, 1).await {
        Ok(validated) => return Ok(validated),
        Err(AttemptError::Upstream(e)) => return Err(e.into()),
        Err(AttemptError::Invalid { raw, error }) => (raw, error),
    };

    warn!(error = %error, "Model output rejected, retrying once with a correction");
    let mut retry = request;
    if let Some(raw) = raw {
        retry.messages.push(Message::assistant(raw));
    }
    retry.messages.push(Message::user(options.correction.clone()));

    match attempt(client, &retry, options, &validate, MAX_ATTEMPTS).await {
        Ok(validated) => Ok(validated),
        Err(AttemptError::Upstream(e)) => Err(e.into()),
        Err(AttemptError::Invalid { error, .. }) => {
            warn!(error = %error, "Model output rejected after correction");
            Err(error)
        }
    }
}

async fn attempt<T, F>(
    client: &dyn LlmClient,
    request: &CompletionRequest,
    options: &RetryOptions,
    validate: &F,
    number: u32,
) -> Result<Validated<T>, AttemptError>
where
    F: Fn(&Value) -> Result<T, SchemaViolation>,
{
    debug!(%number, "attempt: called");
    let response = match tokio::time::timeout(options.timeout, client.complete(request.clone())).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            debug!(%number, error = %e, "attempt: upstream error");
            return Err(AttemptError::Upstream(e));
        }
        Err(_) => {
            debug!(%number, "attempt: completion timed out");
            return Err(AttemptError::Upstream(LlmError::Timeout(options.timeout)));
        }
    };

    if let Some(usage) = &response.usage {
        debug!(
            %number,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "attempt: token usage"
        );
    }

    let payload = extract_response(&response).map_err(|e| AttemptError::Invalid {
        raw: None,
        error: e.into(),
    })?;

    if options.log_previews {
        debug!(
            %number,
            raw = %truncate_chars(&payload.raw, PREVIEW_CHARS),
            cleaned = %truncate_chars(&payload.cleaned, PREVIEW_CHARS),
            "attempt: payload preview"
        );
    }

    let value: Value = match serde_json::from_str(&payload.cleaned) {
        Ok(v) => v,
        Err(e) => {
            debug!(%number, error = %e, "attempt: payload is not JSON");
            return Err(AttemptError::Invalid {
                raw: Some(payload.raw),
                error: e.into(),
            });
        }
    };

    match validate(&value) {
        Ok(value) => {
            debug!(%number, "attempt: payload valid");
            Ok(Validated {
                value,
                payload,
                attempts: number,
            })
        }
        Err(violation) => {
            debug!(%number, %violation, "attempt: schema violation");
            Err(AttemptError::Invalid {
                raw: Some(payload.raw),
                error: violation.into(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SufficiencyVerdict;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, Role};
    use crate::pipeline::validate::validate;
    use async_trait::async_trait;

    const ENOUGH: &str = r#"{"status":"enough","title":"[UI]: Save crashes","issueType":"bug","scope":"UI","description":"Saving crashes the editor."}"#;

    fn options() -> RetryOptions {
        RetryOptions {
            timeout: Duration::from_secs(5),
            log_previews: true,
            correction: "Return only valid JSON.".to_string(),
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("system", "app crashes on save", 500)
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let client = MockLlmClient::texts(&[ENOUGH]);
        let out = complete_with_retry(&client, request(), &options(), validate).await.unwrap();
        assert_eq!(out.attempts, 1);
        assert!(matches!(out.value, SufficiencyVerdict::Enough(_)));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_appends_rejected_output_and_correction() {
        let client = MockLlmClient::texts(&["not json at all", ENOUGH]);
        let out = complete_with_retry(&client, request(), &options(), validate).await.unwrap();
        assert_eq!(out.attempts, 2);

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        let retry = &requests[1].messages;
        assert_eq!(retry.len(), 3);
        assert_eq!(retry[1].role, Role::Assistant);
        assert_eq!(retry[1].content, "not json at all");
        assert_eq!(retry[2].role, Role::User);
        assert_eq!(retry[2].content, "Return only valid JSON.");
    }

    #[tokio::test]
    async fn test_invalid_twice_is_exactly_two_calls() {
        let client = MockLlmClient::texts(&["{oops", "{still oops", ENOUGH]);
        let err = complete_with_retry(&client, request(), &options(), validate).await.unwrap_err();
        assert!(matches!(err, PipelineError::Parse(_)));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_schema_violation_consumes_retry() {
        let client = MockLlmClient::texts(&[r#"{"status":"maybe"}"#, r#"{"status":"enough"}"#]);
        let err = complete_with_retry(&client, request(), &options(), validate).await.unwrap_err();
        assert!(matches!(err, PipelineError::Schema(SchemaViolation::MissingField("title"))));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_first_response_retries_without_assistant_turn() {
        let client = MockLlmClient::new(vec![CompletionResponse::text(""), CompletionResponse::text(ENOUGH)]);
        let out = complete_with_retry(&client, request(), &options(), validate).await.unwrap();
        assert_eq!(out.attempts, 2);
        let retry = &client.requests()[1].messages;
        assert_eq!(retry.len(), 2);
        assert_eq!(retry[1].role, Role::User);
    }

    #[tokio::test]
    async fn test_upstream_error_is_not_retried() {
        let client = MockLlmClient::with_replies(vec![
            Err(LlmError::Unauthorized("bad key".to_string())),
            Ok(CompletionResponse::text(ENOUGH)),
        ]);
        let err = complete_with_retry(&client, request(), &options(), validate).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(LlmError::Unauthorized(_))));
        assert_eq!(client.call_count(), 1);
    }

    struct SlowClient;

    #[async_trait]
    impl LlmClient for SlowClient {
        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CompletionResponse::text(ENOUGH))
        }

        fn default_model(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_upstream_timeout() {
        let opts = RetryOptions {
            timeout: Duration::from_millis(50),
            ..options()
        };
        let err = complete_with_retry(&SlowClient, request(), &opts, validate).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upstream(LlmError::Timeout(_))));
    }
}
