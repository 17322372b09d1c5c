//! Output items carried in a response's `output` sequence.
//!
//! Parsing is total: every JSON record becomes some [`OutputItem`], and discriminants this
//! crate does not model land in [`OutputItem::Unknown`] with the raw record preserved.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value, json};

/// A reasoning trace entry.
///
/// Providers expose at most one of the three fields in practice; the others are absent
/// or empty. An empty string is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasoningItem {
    /// Raw reasoning text (open weight models).
    pub content: Option<String>,
    /// Sanitized summary of the reasoning.
    pub summary: Option<String>,
    /// Opaque encrypted reasoning blob.
    pub encrypted_content: Option<String>,
}

impl ReasoningItem {
    pub fn raw(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn summarized(summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..Self::default()
        }
    }

    pub fn encrypted(blob: impl Into<String>) -> Self {
        Self {
            encrypted_content: Some(blob.into()),
            ..Self::default()
        }
    }

    pub fn content(&self) -> Option<&str> {
        non_empty(&self.content)
    }

    pub fn summary(&self) -> Option<&str> {
        non_empty(&self.summary)
    }

    pub fn encrypted_content(&self) -> Option<&str> {
        non_empty(&self.encrypted_content)
    }

    /// The legible text of this item: raw content when present, otherwise the summary.
    pub fn legible_text(&self) -> Option<&str> {
        self.content().or_else(|| self.summary())
    }
}

/// A terminal assistant utterance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageItem {
    pub content: String,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionCall {
    /// Correlation id the matching [`FunctionCallOutput`] must echo.
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments, exactly as the model produced them.
    pub arguments: String,
}

impl FunctionCall {
    pub fn new(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// The result of executing a [`FunctionCall`], matched by `call_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionCallOutput {
    pub call_id: String,
    pub output: String,
}

impl FunctionCallOutput {
    pub fn new(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            output: output.into(),
        }
    }
}

/// One entry of a response's ordered output sequence.
///
/// Order is significant and mirrors execution order; nothing in this crate reorders it.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    Reasoning(ReasoningItem),
    Message(MessageItem),
    FunctionCall(FunctionCall),
    FunctionCallOutput(FunctionCallOutput),
    /// Item kinds this crate does not model, kept verbatim for forward compatibility.
    Unknown { kind: String, raw: Value },
}

impl OutputItem {
    /// Interprets a raw output record. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use open_responses::types::OutputItem;
    /// use serde_json::json;
    ///
    /// let item = OutputItem::from_value(json!({"type": "web_search_call", "id": "ws_1"}));
    /// assert_eq!(item.kind(), "web_search_call");
    /// assert!(matches!(item, OutputItem::Unknown { .. }));
    /// ```
    pub fn from_value(raw: Value) -> Self {
        let kind = raw
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match kind.as_str() {
            "reasoning" => Self::Reasoning(ReasoningItem {
                content: raw.get("content").and_then(joined_text),
                summary: raw.get("summary").and_then(joined_text),
                encrypted_content: string_field(&raw, "encrypted_content"),
            }),
            "message" => Self::Message(MessageItem {
                content: raw.get("content").map(message_text).unwrap_or_default(),
            }),
            "function_call" => Self::FunctionCall(FunctionCall {
                call_id: string_field(&raw, "call_id").unwrap_or_default(),
                name: string_field(&raw, "name").unwrap_or_default(),
                arguments: raw.get("arguments").map(encode_arguments).unwrap_or_default(),
            }),
            "function_call_output" => Self::FunctionCallOutput(FunctionCallOutput {
                call_id: string_field(&raw, "call_id").unwrap_or_default(),
                output: raw.get("output").map(encode_arguments).unwrap_or_default(),
            }),
            _ => Self::Unknown { kind, raw },
        }
    }

    /// Wire representation used when the item is resubmitted as input.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Reasoning(item) => {
                let mut obj = Map::new();
                obj.insert("type".to_string(), Value::String("reasoning".to_string()));
                if let Some(content) = item.content() {
                    obj.insert(
                        "content".to_string(),
                        json!([{ "type": "reasoning_text", "text": content }]),
                    );
                }
                let summary = item
                    .summary()
                    .map(|text| json!([{ "type": "summary_text", "text": text }]))
                    .unwrap_or_else(|| json!([]));
                obj.insert("summary".to_string(), summary);
                if let Some(blob) = item.encrypted_content() {
                    obj.insert(
                        "encrypted_content".to_string(),
                        Value::String(blob.to_string()),
                    );
                }
                Value::Object(obj)
            }
            Self::Message(message) => json!({
                "type": "message",
                "role": "assistant",
                "content": message.content,
            }),
            Self::FunctionCall(call) => json!({
                "type": "function_call",
                "call_id": call.call_id,
                "name": call.name,
                "arguments": call.arguments,
            }),
            Self::FunctionCallOutput(output) => json!({
                "type": "function_call_output",
                "call_id": output.call_id,
                "output": output.output,
            }),
            Self::Unknown { raw, .. } => raw.clone(),
        }
    }

    /// Protocol discriminant of this item.
    pub fn kind(&self) -> &str {
        match self {
            Self::Reasoning(_) => "reasoning",
            Self::Message(_) => "message",
            Self::FunctionCall(_) => "function_call",
            Self::FunctionCallOutput(_) => "function_call_output",
            Self::Unknown { kind, .. } => kind,
        }
    }
}

impl From<FunctionCallOutput> for OutputItem {
    fn from(output: FunctionCallOutput) -> Self {
        Self::FunctionCallOutput(output)
    }
}

impl From<FunctionCall> for OutputItem {
    fn from(call: FunctionCall) -> Self {
        Self::FunctionCall(call)
    }
}

impl<'de> Deserialize<'de> for OutputItem {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

impl Serialize for OutputItem {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value().serialize(serializer)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn string_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Accepts either a bare string or an array of `{ "text": ... }` parts.
fn joined_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let texts: Vec<&str> = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(text) => Some(text.as_str()),
                    other => other.get("text").and_then(Value::as_str),
                })
                .collect();
            if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            }
        }
        _ => None,
    }
}

fn message_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(parts) => {
            let mut buffer = String::new();
            for part in parts {
                let text = part
                    .get("text")
                    .or_else(|| part.get("refusal"))
                    .and_then(Value::as_str);
                if let Some(text) = text {
                    buffer.push_str(text);
                }
            }
            buffer
        }
        _ => String::new(),
    }
}

/// Keeps strings verbatim and re-encodes inline JSON values.
fn encode_arguments(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
