use std::collections::HashSet;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

use crate::reasoning::{ReasoningAnalysis, resolve_reasoning_visibility};

use super::output::{FunctionCall, FunctionCallOutput, MessageItem, OutputItem, ReasoningItem};

/// Token accounting for one response (or a sum of several).
///
/// Absent counts are zero, never `None`, so callers can add them freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl Usage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            input_tokens: self.input_tokens.saturating_add(rhs.input_tokens),
            output_tokens: self.output_tokens.saturating_add(rhs.output_tokens),
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        *self = *self + rhs;
    }
}

/// Immutable result of one request round-trip.
///
/// All views are derived on demand from the stored output sequence; the aggregate is
/// never mutated after construction.
///
/// # Examples
///
/// ```
/// use open_responses::types::{MessageItem, OutputItem, Response, Usage};
///
/// let response = Response::new(
///     "resp_1",
///     "openai/gpt-oss-120b:groq",
///     Usage::new(12, 34),
///     vec![
///         OutputItem::Message(MessageItem { content: "Hello, ".into() }),
///         OutputItem::Message(MessageItem { content: "world".into() }),
///     ],
/// );
/// assert_eq!(response.output_text(), "Hello, world");
/// assert_eq!(response.usage().total(), 46);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    id: String,
    model: String,
    usage: Usage,
    output: Vec<OutputItem>,
}

impl Response {
    pub fn new(
        id: impl Into<String>,
        model: impl Into<String>,
        usage: Usage,
        output: Vec<OutputItem>,
    ) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            usage,
            output,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    /// The output sequence in the order the remote side produced it.
    pub fn output(&self) -> &[OutputItem] {
        &self.output
    }

    /// Concatenation of every message's content, in order, with no separator.
    pub fn output_text(&self) -> String {
        self.messages().map(|message| message.content.as_str()).collect()
    }

    pub fn messages(&self) -> impl Iterator<Item = &MessageItem> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::Message(message) => Some(message),
            _ => None,
        })
    }

    pub fn reasoning_items(&self) -> impl Iterator<Item = &ReasoningItem> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::Reasoning(reasoning) => Some(reasoning),
            _ => None,
        })
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::FunctionCall(call) => Some(call),
            _ => None,
        })
    }

    pub fn function_call_outputs(&self) -> impl Iterator<Item = &FunctionCallOutput> {
        self.output.iter().filter_map(|item| match item {
            OutputItem::FunctionCallOutput(output) => Some(output),
            _ => None,
        })
    }

    /// Function calls that are not answered by an output inside this same response.
    ///
    /// Calls answered in earlier turns are the agent loop's concern, not the
    /// aggregate's.
    pub fn pending_function_calls(&self) -> Vec<&FunctionCall> {
        let answered: HashSet<&str> = self
            .function_call_outputs()
            .map(|output| output.call_id.as_str())
            .collect();
        self.function_calls()
            .filter(|call| !answered.contains(call.call_id.as_str()))
            .collect()
    }

    /// Classifies how much reasoning this response exposes.
    pub fn reasoning_visibility(&self) -> ReasoningAnalysis<'_> {
        resolve_reasoning_visibility(self.reasoning_items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::ReasoningVisibility;

    fn sample() -> Response {
        Response::new(
            "resp_1",
            "moonshotai/Kimi-K2-Instruct-0905:groq",
            Usage::new(12, 34),
            vec![
                OutputItem::Reasoning(ReasoningItem::raw("let me search")),
                OutputItem::FunctionCall(FunctionCall::new("c1", "search", "{}")),
                OutputItem::FunctionCall(FunctionCall::new("c2", "search", "{}")),
                OutputItem::FunctionCallOutput(FunctionCallOutput::new("c1", "hits")),
                OutputItem::Message(MessageItem {
                    content: "done".to_string(),
                }),
            ],
        )
    }

    #[test]
    fn empty_output_has_no_text_and_no_reasoning() {
        let response = Response::new("resp_0", "m", Usage::default(), Vec::new());
        assert_eq!(response.output_text(), "");
        assert_eq!(
            response.reasoning_visibility().level,
            ReasoningVisibility::None
        );
        assert!(response.pending_function_calls().is_empty());
    }

    #[test]
    fn usage_totals_and_defaults() {
        assert_eq!(Usage::new(12, 34).total(), 46);
        assert_eq!(Usage::default().total(), 0);

        let parsed: Usage = serde_json::from_str(r#"{"input_tokens": 5}"#).expect("usage");
        assert_eq!(parsed, Usage::new(5, 0));

        let mut sum = Usage::new(1, 2);
        sum += Usage::new(10, 20);
        assert_eq!(sum, Usage::new(11, 22));
    }

    #[test]
    fn filtered_views_preserve_order() {
        let response = sample();
        let ids: Vec<_> = response
            .function_calls()
            .map(|call| call.call_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(response.reasoning_items().count(), 1);
        assert_eq!(response.output_text(), "done");

        let pending: Vec<_> = response
            .pending_function_calls()
            .into_iter()
            .map(|call| call.call_id.clone())
            .collect();
        assert_eq!(pending, vec!["c2".to_string()]);
    }
}
