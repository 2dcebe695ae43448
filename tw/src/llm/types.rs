//! LLM request/response types
//!
//! Requests are provider-agnostic. Responses mirror the OpenAI chat-completion
//! shape, since that is what every supported endpoint speaks; the content of a
//! choice is modelled as a closed set of shapes rather than probed at runtime.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A completion request - everything needed for one LLM call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (rendered from a Handlebars template)
    pub system_prompt: String,

    /// Conversation turns after the system prompt
    pub messages: Vec<Message>,

    /// Max tokens for response
    pub max_tokens: u32,

    /// Model override; `None` uses the client's configured model
    pub model: Option<String>,

    /// How the model is asked to shape its answer
    pub response_format: ResponseFormat,

    /// Function tools offered to the model
    pub tools: Vec<ToolDefinition>,

    /// Name of a tool the model is forced to call
    pub forced_tool: Option<String>,
}

impl CompletionRequest {
    /// Create a plain-text request with a single user turn
    pub fn new(system_prompt: impl Into<String>, user: impl Into<String>, max_tokens: u32) -> Self {
        debug!(%max_tokens, "CompletionRequest::new: called");
        Self {
            system_prompt: system_prompt.into(),
            messages: vec![Message::user(user)],
            max_tokens,
            model: None,
            response_format: ResponseFormat::Text,
            tools: vec![],
            forced_tool: None,
        }
    }

    /// Set the model override
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Requested output shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    JsonObject,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        debug!("Message::user: called");
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        debug!("Message::assistant: called");
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Response from a completion request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,

    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

impl CompletionResponse {
    /// The first choice, which is the only one the pipeline looks at
    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// Build a response with a single plain-text choice
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_message(ChoiceMessage {
            content: Some(MessageContent::Text(content.into())),
            ..Default::default()
        })
    }

    /// Build a response whose answer arrives as function-call arguments
    pub fn tool_call(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self::from_message(ChoiceMessage {
            tool_calls: Some(vec![ToolCall {
                id: Some("call_0".to_string()),
                kind: Some("function".to_string()),
                function: Some(FunctionCall {
                    name: Some(name.into()),
                    arguments: Some(serde_json::Value::String(arguments.into())),
                }),
            }]),
            ..Default::default()
        })
    }

    /// Build a response where the model declined to answer
    pub fn refusal(reason: impl Into<String>) -> Self {
        Self::from_message(ChoiceMessage {
            refusal: Some(reason.into()),
            ..Default::default()
        })
    }

    pub fn from_message(message: ChoiceMessage) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some("stop".to_string()),
            }],
            usage: None,
        }
    }
}

/// One completion alternative
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,

    #[serde(default)]
    pub message: ChoiceMessage,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The assistant message inside a choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,

    /// `null` and absent are both common, hence the Option
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// Set when the provider's moderation blocked the answer
    #[serde(default)]
    pub refusal: Option<String>,
}

/// Shapes a choice's `content` arrives in
///
/// Variant order matters for untagged deserialization: strings first, then
/// arrays, then any object, and finally anything else (numbers, nulls inside
/// arrays) which contributes no text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<MessageContent>),
    Wrapper(ContentWrapper),
    Other(serde_json::Value),
}

/// An object carrying text under one of the keys providers use for it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentWrapper {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<Box<MessageContent>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Box<MessageContent>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Box<MessageContent>>,
}

/// A tool call requested by the model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub function: Option<FunctionCall>,
}

impl ToolCall {
    /// Providers that omit `type` only ever emit function calls
    pub fn is_function(&self) -> bool {
        self.kind.as_deref().unwrap_or("function") == "function"
    }
}

/// Function name and arguments of a tool call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: Option<String>,

    /// A JSON-encoded string per the API; other types are tolerated on input
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
}

/// Token usage reported by the provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,

    #[serde(default)]
    pub completion_tokens: u64,

    #[serde(default)]
    pub total_tokens: u64,
}

/// Tool definition for the LLM
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: serde_json::Value) -> Self {
        let name = name.into();
        let description = description.into();
        debug!(%name, "ToolDefinition::new: called");
        Self {
            name,
            description,
            input_schema,
        }
    }

    /// Convert to OpenAI function-tool format
    pub fn to_openai_schema(&self) -> serde_json::Value {
        debug!(%self.name, "ToolDefinition::to_openai_schema: called");
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema,
            }
        })
    }
}
