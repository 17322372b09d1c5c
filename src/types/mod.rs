//! Request and response data model of the Open Responses protocol.
//!
//! The request side lives here; output items and the response aggregate live in
//! [`output`] and [`response`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::ResponsesError;

pub mod output;
pub mod response;

pub use output::{FunctionCall, FunctionCallOutput, MessageItem, OutputItem, ReasoningItem};
pub use response::{Response, Usage};

/// System directive sent when a request carries no instructions of its own.
pub const DEFAULT_INSTRUCTIONS: &str =
    "You are a helpful assistant that completes tasks step by step.";

/// How hard the model should reason before answering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    #[default]
    Medium,
    High,
}

impl ReasoningEffort {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasoningEffort::Low => "low",
            ReasoningEffort::Medium => "medium",
            ReasoningEffort::High => "high",
        }
    }
}

impl std::str::FromStr for ReasoningEffort {
    type Err = ResponsesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(ResponsesError::InvalidConfig {
                field: "reasoning_effort".to_string(),
                reason: format!("expected low, medium or high, got `{other}`"),
            }),
        }
    }
}

/// Whether and how the model may call the declared tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
            ToolChoice::Required => "required",
        }
    }
}

/// A callable capability offered to the model.
///
/// Serializes flat, with `name`, `description` and `parameters` at the top level next to
/// `"type": "function"`. Nesting them under a `function` object is the Chat Completions
/// shape and is rejected by Open Responses endpoints.
///
/// # Examples
///
/// ```
/// use open_responses::types::ToolDeclaration;
/// use serde_json::json;
///
/// let tool = ToolDeclaration::new(
///     "search_documents",
///     "Search company documents",
///     json!({
///         "type": "object",
///         "properties": { "query": { "type": "string" } },
///         "required": ["query"]
///     }),
/// );
/// let wire = serde_json::to_value(&tool).unwrap();
/// assert_eq!(wire["type"], "function");
/// assert_eq!(wire["name"], "search_documents");
/// assert!(wire.get("function").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "function")]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments object.
    pub parameters: Value,
}

impl ToolDeclaration {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }

    /// Argument names listed under `parameters.required`.
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// One entry of a structured conversation sent as `input`.
#[derive(Debug, Clone, PartialEq)]
pub enum InputItem {
    /// A plain message authored by `role` (usually `user`).
    Message { role: String, content: String },
    /// An item echoed back from a previous response, or a locally produced result.
    Item(OutputItem),
}

impl InputItem {
    pub fn user(content: impl Into<String>) -> Self {
        Self::Message {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            InputItem::Message { role, content } => json!({
                "type": "message",
                "role": role,
                "content": content,
            }),
            InputItem::Item(item) => item.to_value(),
        }
    }
}

impl From<OutputItem> for InputItem {
    fn from(item: OutputItem) -> Self {
        Self::Item(item)
    }
}

/// Request input: either a bare prompt or a conversation history.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Text(String),
    Items(Vec<InputItem>),
}

impl Input {
    pub fn to_value(&self) -> Value {
        match self {
            Input::Text(text) => Value::String(text.clone()),
            Input::Items(items) => Value::Array(items.iter().map(InputItem::to_value).collect()),
        }
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Input {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<InputItem>> for Input {
    fn from(items: Vec<InputItem>) -> Self {
        Self::Items(items)
    }
}

/// A single Open Responses request.
///
/// `model` is opaque: a `:provider` suffix used for routing is passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub model: String,
    pub instructions: Option<String>,
    pub input: Input,
    pub tools: Vec<ToolDeclaration>,
    pub tool_choice: Option<ToolChoice>,
    /// Upper bound on tool calls the server may emit; only sent alongside tools.
    pub max_tool_calls: Option<u32>,
    pub reasoning_effort: ReasoningEffort,
}

impl Request {
    pub fn new(model: impl Into<String>, input: impl Into<Input>) -> Self {
        Self {
            model: model.into(),
            instructions: None,
            input: input.into(),
            tools: Vec::new(),
            tool_choice: None,
            max_tool_calls: None,
            reasoning_effort: ReasoningEffort::default(),
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_max_tool_calls(mut self, max: u32) -> Self {
        self.max_tool_calls = Some(max);
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    /// Instructions to send, falling back to [`DEFAULT_INSTRUCTIONS`].
    pub fn effective_instructions(&self) -> &str {
        self.instructions.as_deref().unwrap_or(DEFAULT_INSTRUCTIONS)
    }

    /// Tool choice to send: `auto` when tools are declared and no choice was made,
    /// nothing at all when there are no tools.
    pub fn effective_tool_choice(&self) -> Option<ToolChoice> {
        if self.tools.is_empty() {
            None
        } else {
            Some(self.tool_choice.unwrap_or(ToolChoice::Auto))
        }
    }

    /// Checks the request-level invariants before anything goes on the wire.
    ///
    /// # Errors
    ///
    /// Returns [`ResponsesError::Validation`] for an empty model, empty or duplicate
    /// tool names, or a `required` tool choice without any tools.
    pub fn validate(&self) -> Result<(), ResponsesError> {
        if self.model.trim().is_empty() {
            return Err(ResponsesError::validation("model must not be empty"));
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err(ResponsesError::validation("tool name must not be empty"));
            }
            if !seen.insert(tool.name.as_str()) {
                return Err(ResponsesError::validation(format!(
                    "duplicate tool name: {}",
                    tool.name
                )));
            }
        }

        if self.tools.is_empty() && self.tool_choice == Some(ToolChoice::Required) {
            return Err(ResponsesError::validation(
                "tool_choice `required` needs at least one declared tool",
            ));
        }

        Ok(())
    }
}
