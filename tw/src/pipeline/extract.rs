//! Payload extractor
//!
//! Finds the text the model meant as its answer inside a completion choice.
//! Direct content wins; function-call arguments are the fallback; a refusal
//! is reported only when there is nothing else.

use tracing::debug;

use super::error::ExtractError;
use super::sanitize::sanitize;
use crate::llm::{Choice, CompletionResponse, MessageContent};

/// Model output before and after sanitizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPayload {
    pub raw: String,
    pub cleaned: String,
}

impl CompletionPayload {
    fn from_raw(raw: String) -> Self {
        let cleaned = sanitize(&raw);
        Self { raw, cleaned }
    }
}

/// Extract the payload from the first choice of a response
pub fn extract_response(response: &CompletionResponse) -> Result<CompletionPayload, ExtractError> {
    debug!(choices = response.choices.len(), "extract_response: called");
    match response.first_choice() {
        Some(choice) => extract(choice),
        None => {
            debug!("extract_response: no choices");
            Err(ExtractError::EmptyResponse)
        }
    }
}

/// Extract the payload from a single choice
pub fn extract(choice: &Choice) -> Result<CompletionPayload, ExtractError> {
    debug!(finish_reason = ?choice.finish_reason, "extract: called");
    let message = &choice.message;

    let content = message.content.as_ref().map(flatten).unwrap_or_default();
    if !content.trim().is_empty() {
        debug!(len = content.len(), "extract: using message content");
        return Ok(CompletionPayload::from_raw(content));
    }

    if let Some(arguments) = first_function_arguments(choice) {
        debug!(len = arguments.len(), "extract: using tool-call arguments");
        return Ok(CompletionPayload::from_raw(arguments));
    }

    if let Some(refusal) = message.refusal.as_deref()
        && !refusal.trim().is_empty()
    {
        debug!("extract: model refused");
        return Err(ExtractError::Refused(refusal.trim().to_string()));
    }

    debug!("extract: nothing usable in choice");
    Err(ExtractError::EmptyResponse)
}

/// Concatenate every textual fragment of a content value
pub fn flatten(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts.iter().map(flatten).collect(),
        MessageContent::Wrapper(wrapper) => wrapper
            .text
            .as_deref()
            .or(wrapper.content.as_deref())
            .or(wrapper.arguments.as_deref())
            .map(flatten)
            .unwrap_or_default(),
        MessageContent::Other(_) => String::new(),
    }
}

/// Arguments of the first function call that carries any
fn first_function_arguments(choice: &Choice) -> Option<String> {
    let calls = choice.message.tool_calls.as_ref()?;
    calls
        .iter()
        .filter(|call| call.is_function())
        .filter_map(|call| call.function.as_ref()?.arguments.as_ref())
        .find_map(|args| match args {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            // Some gateways decode the arguments for us
            serde_json::Value::Object(map) if !map.is_empty() => Some(args.to_string()),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChoiceMessage, ContentWrapper, FunctionCall, ToolCall};

    fn choice(message: ChoiceMessage) -> Choice {
        CompletionResponse::from_message(message).choices.remove(0)
    }

    #[test]
    fn test_plain_content_is_sanitized() {
        let c = choice(ChoiceMessage {
            content: Some(MessageContent::Text("```json\n{\"a\":1}\n```".to_string())),
            ..Default::default()
        });
        let payload = extract(&c).unwrap();
        assert_eq!(payload.raw, "```json\n{\"a\":1}\n```");
        assert_eq!(payload.cleaned, "{\"a\":1}");
    }

    #[test]
    fn test_parts_are_concatenated() {
        let c = choice(ChoiceMessage {
            content: Some(MessageContent::Parts(vec![
                MessageContent::Wrapper(ContentWrapper {
                    text: Some(Box::new(MessageContent::Text("{\"a\":".to_string()))),
                    ..Default::default()
                }),
                MessageContent::Other(serde_json::json!(42)),
                MessageContent::Wrapper(ContentWrapper {
                    content: Some(Box::new(MessageContent::Text("1}".to_string()))),
                    ..Default::default()
                }),
            ])),
            ..Default::default()
        });
        assert_eq!(extract(&c).unwrap().cleaned, "{\"a\":1}");
    }

    #[test]
    fn test_falls_back_to_tool_call_arguments() {
        let response = CompletionResponse::tool_call("submit_ticket", "{\"status\":\"enough\"}");
        let payload = extract_response(&response).unwrap();
        assert_eq!(payload.cleaned, "{\"status\":\"enough\"}");
    }

    #[test]
    fn test_whitespace_content_falls_through_to_tool_call() {
        let mut response = CompletionResponse::tool_call("submit_ticket", "{}");
        response.choices[0].message.content = Some(MessageContent::Text("  \n".to_string()));
        assert_eq!(extract_response(&response).unwrap().raw, "{}");
    }

    #[test]
    fn test_skips_non_function_and_empty_arguments() {
        let c = choice(ChoiceMessage {
            tool_calls: Some(vec![
                ToolCall {
                    kind: Some("web_search".to_string()),
                    function: Some(FunctionCall {
                        name: Some("x".to_string()),
                        arguments: Some(serde_json::json!("{\"ignored\":true}")),
                    }),
                    ..Default::default()
                },
                ToolCall {
                    function: Some(FunctionCall {
                        name: Some("submit_ticket".to_string()),
                        arguments: Some(serde_json::json!("   ")),
                    }),
                    ..Default::default()
                },
                ToolCall {
                    function: Some(FunctionCall {
                        name: Some("submit_ticket".to_string()),
                        arguments: Some(serde_json::json!({"status": "enough"})),
                    }),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        });
        assert_eq!(extract(&c).unwrap().cleaned, "{\"status\":\"enough\"}");
    }

    #[test]
    fn test_content_beats_refusal() {
        let mut response = CompletionResponse::text("{}");
        response.choices[0].message.refusal = Some("nope".to_string());
        assert!(extract_response(&response).is_ok());
    }

    #[test]
    fn test_refusal() {
        let err = extract_response(&CompletionResponse::refusal(" I can't help with that ")).unwrap_err();
        assert_eq!(err, ExtractError::Refused("I can't help with that".to_string()));
    }

    #[test]
    fn test_empty_response() {
        assert_eq!(
            extract_response(&CompletionResponse::default()).unwrap_err(),
            ExtractError::EmptyResponse
        );
        assert_eq!(
            extract_response(&CompletionResponse::text("   ")).unwrap_err(),
            ExtractError::EmptyResponse
        );
    }
}
