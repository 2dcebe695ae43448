//! Clarification loop controller
//!
//! One invocation is one round of the dialogue: compose the working prompt
//! from the original text and the caller's earlier answers, ask the model for
//! a verdict, and either finish the ticket, ask the next question, or give up
//! once the round budget is spent. All dialogue state travels in the request.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::error::{PipelineError, SchemaViolation};
use super::extract::extract_response;
use super::retry::{RetryOptions, complete_with_retry};
use super::validate::validate;
use crate::config::{Config, OutputMode};
use crate::domain::{
    DataSensitivity, ErrorCode, ISSUE_TYPES, IssueType, SufficiencyVerdict, TicketDraft, TicketRequest,
    TicketResponse, title_prefix,
};
use crate::llm::{CompletionRequest, LlmClient, ResponseFormat, ToolDefinition};
use crate::prompts::{ClarifyPromptContext, PromptLoader, SystemPromptContext, UserPromptContext};

/// Asked when the model wants more information but supplies no usable question
pub const DEFAULT_QUESTION: &str =
    "Could you share more details about the issue, such as what you expected to happen and what actually happened?";

/// Token budget for the clarification-only fallback call
const FALLBACK_MAX_TOKENS: u32 = 200;

/// Function the model is forced to call in tool output mode
pub const SUBMIT_TOOL: &str = "submit_ticket";

/// Terminal state of one loop invocation
#[derive(Debug, Clone, PartialEq)]
pub enum LoopOutcome {
    /// Ticket drafted; `issue_type` holds the normalized registry key
    Done(TicketDraft),
    /// More information needed and rounds remain
    AwaitingClarification { reason: String, question: String },
    /// More information needed but the round budget is spent
    Exhausted { reason: String, rounds: usize },
}

impl LoopOutcome {
    pub fn into_response(self) -> TicketResponse {
        match self {
            Self::Done(draft) => TicketResponse::Done(draft),
            Self::AwaitingClarification { reason, question } => TicketResponse::NeedsInfo {
                reason,
                missing_info_prompt: question,
            },
            Self::Exhausted { reason, rounds } => TicketResponse::error(
                format!(
                    "Still not enough information after {} clarification rounds: {}",
                    rounds, reason
                ),
                ErrorCode::MaxRoundsReached,
            ),
        }
    }
}

/// Settings the loop needs from configuration
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_rounds: usize,
    pub completion_timeout: Duration,
    pub output_mode: OutputMode,
    pub log_previews: bool,
    pub max_tokens: u32,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        debug!("PipelineSettings::from_config: called");
        Self {
            max_rounds: config.pipeline.max_clarification_rounds,
            completion_timeout: config.pipeline.completion_timeout(),
            output_mode: config.pipeline.output_mode,
            log_previews: config.previews_enabled(),
            max_tokens: config.llm.max_tokens,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Drives one clarification round against a completion client
pub struct TicketPipeline {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    settings: PipelineSettings,
}

impl TicketPipeline {
    pub fn new(client: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, settings: PipelineSettings) -> Self {
        debug!(max_rounds = settings.max_rounds, output_mode = ?settings.output_mode, "TicketPipeline::new: called");
        Self {
            client,
            prompts,
            settings,
        }
    }

    /// Run one round and shape the result for the caller
    pub async fn run(&self, request: &TicketRequest) -> Result<TicketResponse, PipelineError> {
        self.advance(request).await.map(LoopOutcome::into_response)
    }

    /// Run one round of the clarification loop
    pub async fn advance(&self, request: &TicketRequest) -> Result<LoopOutcome, PipelineError> {
        let run_id = Uuid::now_v7();
        let rounds = request.round_count();
        debug!(%run_id, %rounds, "advance: called");

        let scopes = request.validate().map_err(PipelineError::InvalidInput)?;
        let working = working_prompt(&request.text, &request.previous_clarifications);

        let system = self.render("system", &SystemPromptContext::new(self.use_tool()))?;
        let user = self.render(
            "user",
            &UserPromptContext {
                working_prompt: working.clone(),
                title_prefix: title_prefix(&scopes),
                scopes,
            },
        )?;
        let options = RetryOptions {
            timeout: self.settings.completion_timeout,
            log_previews: self.settings.log_previews,
            correction: self.render("correction", &serde_json::json!({}))?,
        };

        let completion = self.completion_request(system, user, request.agent.clone());
        info!(%run_id, %rounds, model = %self.model_name(request), "Drafting ticket");

        let verdict = match complete_with_retry(self.client.as_ref(), completion, &options, validate).await {
            Ok(validated) => {
                debug!(%run_id, attempts = validated.attempts, "advance: verdict received");
                validated.value
            }
            Err(PipelineError::Schema(SchemaViolation::MissingQuestion { reason })) => {
                if rounds >= self.settings.max_rounds {
                    info!(%run_id, %rounds, "Clarification rounds exhausted");
                    return Ok(LoopOutcome::Exhausted { reason, rounds });
                }
                warn!(%run_id, "Model asked for more information without a question, using fallback");
                let question = self.fallback_question(&working, &reason, request.agent.clone()).await;
                return Ok(LoopOutcome::AwaitingClarification { reason, question });
            }
            Err(e) => {
                warn!(%run_id, error = %e, "Ticket drafting failed");
                return Err(e);
            }
        };

        match verdict {
            SufficiencyVerdict::Enough(mut draft) => {
                let issue_type = IssueType::normalize(&draft.issue_type)
                    .ok_or_else(|| PipelineError::UnrecognizedIssueType(draft.issue_type.clone()))?;
                draft.issue_type = issue_type.key.to_string();
                info!(%run_id, issue_type = %draft.issue_type, "Ticket drafted");
                Ok(LoopOutcome::Done(draft))
            }
            SufficiencyVerdict::NotEnough(clarification) => {
                if rounds >= self.settings.max_rounds {
                    info!(%run_id, %rounds, "Clarification rounds exhausted");
                    return Ok(LoopOutcome::Exhausted {
                        reason: clarification.reason,
                        rounds,
                    });
                }
                info!(%run_id, %rounds, "Asking for clarification");
                Ok(LoopOutcome::AwaitingClarification {
                    reason: clarification.reason,
                    question: clarification.question,
                })
            }
        }
    }

    /// One extra call with a minimal prompt; never fails
    async fn fallback_question(&self, working: &str, reason: &str, model: Option<String>) -> String {
        debug!(%reason, "fallback_question: called");
        let system = match self.render(
            "clarify",
            &ClarifyPromptContext {
                reason: reason.to_string(),
            },
        ) {
            Ok(system) => system,
            Err(e) => {
                warn!(error = %e, "Clarify prompt unavailable, using default question");
                return DEFAULT_QUESTION.to_string();
            }
        };

        let request = CompletionRequest::new(system, working, FALLBACK_MAX_TOKENS).with_model(model);
        let response = match tokio::time::timeout(self.settings.completion_timeout, self.client.complete(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Fallback clarification call failed, using default question");
                return DEFAULT_QUESTION.to_string();
            }
            Err(_) => {
                warn!("Fallback clarification call timed out, using default question");
                return DEFAULT_QUESTION.to_string();
            }
        };

        match extract_response(&response) {
            Ok(payload) => {
                // Prose, not JSON: take the raw text so quotes and line breaks stay as written
                let question = unwrap_prose(&payload.raw).to_string();
                if question.is_empty() {
                    DEFAULT_QUESTION.to_string()
                } else {
                    question
                }
            }
            Err(e) => {
                debug!(error = %e, "fallback_question: nothing usable, using default");
                DEFAULT_QUESTION.to_string()
            }
        }
    }

    fn completion_request(&self, system: String, user: String, model: Option<String>) -> CompletionRequest {
        let mut request = CompletionRequest::new(system, user, self.settings.max_tokens).with_model(model);
        match self.settings.output_mode {
            OutputMode::Json => request.response_format = ResponseFormat::JsonObject,
            OutputMode::Tool => {
                request.tools = vec![submit_ticket_tool()];
                request.forced_tool = Some(SUBMIT_TOOL.to_string());
            }
            OutputMode::Plain => {}
        }
        request
    }

    fn render<C: serde::Serialize>(&self, name: &str, context: &C) -> Result<String, PipelineError> {
        self.prompts
            .render(name, context)
            .map_err(|e| PipelineError::Prompt(e.to_string()))
    }

    fn use_tool(&self) -> bool {
        self.settings.output_mode == OutputMode::Tool
    }

    fn model_name<'a>(&'a self, request: &'a TicketRequest) -> &'a str {
        request.agent.as_deref().unwrap_or_else(|| self.client.default_model())
    }
}

/// Strip one fence wrapped around a whole prose answer, plus surrounding quotes
fn unwrap_prose(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        // A language tag only counts when it fills the fence line
        text = match rest.split_once('\n') {
            Some((tag, body)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => body,
            _ => rest,
        };
    }
    text = text.trim_end();
    text = text.strip_suffix("```").unwrap_or(text);
    text.trim().trim_matches('"').trim()
}

/// Original text followed by the numbered clarifications, if any
pub fn working_prompt(text: &str, clarifications: &[String]) -> String {
    let text = text.trim();
    if clarifications.is_empty() {
        return text.to_string();
    }

    let numbered: Vec<String> = clarifications
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c.trim()))
        .collect();
    format!("{}\n\nAdditional clarifications:\n{}", text, numbered.join("\n"))
}

/// JSON schema of the `submit_ticket` function
pub fn submit_ticket_tool() -> ToolDefinition {
    let issue_types: Vec<&str> = ISSUE_TYPES.iter().map(|t| t.key).collect();
    let suggested: Vec<Option<&str>> = issue_types.iter().copied().map(Some).chain([None]).collect();
    let string_list = serde_json::json!({ "type": "array", "items": { "type": "string" } });
    let sensitivity = [
        DataSensitivity::None,
        DataSensitivity::ContainsPii,
        DataSensitivity::ContainsFinancial,
        DataSensitivity::Unknown,
    ];

    ToolDefinition::new(
        SUBMIT_TOOL,
        "Submit the drafted ticket, or a single clarification question when information is missing",
        serde_json::json!({
            "type": "object",
            "properties": {
                "status": { "type": "string", "enum": ["enough", "not_enough"] },
                "reason": { "type": "string" },
                "clarificationRequest": { "type": "string" },
                "suggestedIssueType": { "type": ["string", "null"], "enum": suggested },
                "missingSections": string_list,
                "title": { "type": "string" },
                "issueType": { "type": "string", "enum": issue_types },
                "scope": { "type": "string" },
                "description": { "type": "string" },
                "priority": { "type": "string", "enum": ["highest", "high", "medium", "low"] },
                "severity": { "type": "string", "enum": ["critical", "major", "minor", "trivial"] },
                "labels": string_list,
                "components": string_list,
                "dependencies": string_list,
                "riskAreas": string_list,
                "dataSensitivity": { "type": "string", "enum": sensitivity },
                "acceptanceCriteria": string_list,
                "multiItem": { "type": "boolean" },
                "epicLink": { "type": ["string", "null"] },
                "parent": { "type": ["string", "null"] },
                "estimate": { "type": ["string", "null"] }
            },
            "required": ["status"]
        }),
    )
}
