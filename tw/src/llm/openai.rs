//! OpenAI-compatible chat completions client
//!
//! Implements the LlmClient trait for any endpoint speaking the OpenAI Chat
//! Completions protocol (OpenAI, OpenRouter, local gateways).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, ResponseFormat};
use crate::config::LlmConfig;

/// Initial backoff delay for transport retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Default retry-after when a 429 carries no usable header
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Maximum length of an upstream error body kept in error messages
const MAX_ERROR_BODY_LEN: usize = 300;

/// Check if an HTTP status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 500 | 502 | 503 | 504)
}

/// Keep upstream error bodies short and free of anything that looks like a key
fn sanitize_error_body(body: &str) -> String {
    const SECRET_PATTERNS: &[&str] = &["api_key", "apikey", "secret", "bearer", "sk-"];

    let lower = body.to_lowercase();
    if SECRET_PATTERNS.iter().any(|p| lower.contains(p)) {
        return "(response details redacted)".to_string();
    }
    crate::text::truncate_chars(body.trim(), MAX_ERROR_BODY_LEN)
}

/// OpenAI API client
pub struct OpenAIClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
    timeout: Duration,
    max_retries: u32,
    backoff_ms: u64,
}

impl OpenAIClient {
    /// Create a new client from configuration and a resolved credential
    pub fn from_config(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self, LlmError> {
        debug!(model = %config.model, base_url = %config.base_url, "from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);

        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
            timeout,
            max_retries: config.max_transport_retries,
            backoff_ms: INITIAL_BACKOFF_MS,
        })
    }

    /// Build the request body for the OpenAI API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": request.system_prompt,
        })];

        messages.extend(request.messages.iter().map(|m| {
            serde_json::json!({
                "role": m.role.as_str(),
                "content": m.content,
            })
        }));

        let model = request.model.as_deref().unwrap_or(&self.model);
        let max_tokens = request.max_tokens.min(self.max_tokens);

        // GPT-5.x and o-series models use max_completion_tokens instead of max_tokens
        let uses_completion_tokens =
            model.starts_with("gpt-5") || model.starts_with("o1") || model.starts_with("o3") || model.starts_with("o4");

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });

        if uses_completion_tokens {
            body["max_completion_tokens"] = serde_json::json!(max_tokens);
        } else {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if request.response_format == ResponseFormat::JsonObject {
            debug!("build_request_body: json_object response format");
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        if !request.tools.is_empty() {
            debug!("build_request_body: tools not empty, adding tools");
            body["tools"] = serde_json::json!(request.tools.iter().map(|t| t.to_openai_schema()).collect::<Vec<_>>());
            body["tool_choice"] = match &request.forced_tool {
                Some(name) => serde_json::json!({ "type": "function", "function": { "name": name } }),
                None => serde_json::json!("auto"),
            };
        }

        body
    }

    /// Parse a 2xx body, which may still carry an upstream error object
    fn parse_body(&self, text: &str) -> Result<CompletionResponse, LlmError> {
        debug!(body_len = text.len(), "parse_body: called");
        if let Ok(err) = serde_json::from_str::<UpstreamErrorBody>(text) {
            debug!(message = %err.error.message, "parse_body: 200 with error object");
            let status = err.error.code.unwrap_or(502);
            return Err(match status {
                401 | 403 => LlmError::Unauthorized(err.error.message),
                _ => LlmError::ApiError {
                    status,
                    message: sanitize_error_body(&err.error.message),
                },
            });
        }
        Ok(serde_json::from_str(text)?)
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Network(err)
        }
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = self.backoff_ms * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "complete: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("content-type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "complete: network error");
                    last_error = Some(self.map_send_error(e));
                    continue;
                }
            };

            let status = response.status().as_u16();

            if status == 401 || status == 403 {
                debug!(%status, "complete: authentication failed");
                let text = response.text().await.unwrap_or_default();
                return Err(LlmError::Unauthorized(sanitize_error_body(&text)));
            }

            if status == 429 {
                debug!("complete: rate limited (429)");
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);

                return Err(LlmError::RateLimited {
                    retry_after: Duration::from_secs(retry_after),
                });
            }

            if is_retryable_status(status) && attempt < self.max_retries {
                let text = response.text().await.unwrap_or_default();
                debug!(attempt, status, "complete: retryable error");
                last_error = Some(LlmError::ApiError {
                    status,
                    message: sanitize_error_body(&text),
                });
                continue;
            }

            let text = response.text().await.map_err(|e| self.map_send_error(e))?;

            if !(200..300).contains(&status) {
                debug!(%status, "complete: API error");
                return Err(LlmError::ApiError {
                    status,
                    message: sanitize_error_body(&text),
                });
            }

            debug!("complete: success");
            return self.parse_body(&text);
        }

        Err(last_error.unwrap_or_else(|| LlmError::InvalidResponse("Max retries exceeded".to_string())))
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

/// Error object some gateways return with a 200 status
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamError,
}

#[derive(Debug, Deserialize)]
struct UpstreamError {
    message: String,
    #[serde(default)]
    code: Option<u16>,
}
