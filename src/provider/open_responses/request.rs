use serde_json::{Map, Value, json};

use crate::error::ResponsesError;
use crate::types::Request;

/// Builds the JSON body for `POST /v1/responses`.
///
/// Tools are emitted flat (`type`, `name`, `description`, `parameters`);
/// `max_tool_calls` and `tool_choice` are only sent alongside a non-empty tool list.
pub(crate) fn build_request_body(request: &Request) -> Result<Value, ResponsesError> {
    request.validate()?;

    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(request.model.clone()));
    body.insert(
        "instructions".to_string(),
        Value::String(request.effective_instructions().to_string()),
    );
    body.insert("input".to_string(), request.input.to_value());

    if !request.tools.is_empty() {
        let tools = serde_json::to_value(&request.tools).map_err(|err| {
            ResponsesError::validation(format!("failed to serialize tools: {err}"))
        })?;
        body.insert("tools".to_string(), tools);
        if let Some(max) = request.max_tool_calls {
            body.insert("max_tool_calls".to_string(), json!(max));
        }
    }
    if let Some(choice) = request.effective_tool_choice() {
        body.insert(
            "tool_choice".to_string(),
            Value::String(choice.as_str().to_string()),
        );
    }

    body.insert(
        "reasoning".to_string(),
        json!({ "effort": request.reasoning_effort.as_str() }),
    );

    Ok(Value::Object(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        FunctionCall, FunctionCallOutput, InputItem, OutputItem, ReasoningEffort, ToolChoice,
        ToolDeclaration,
    };

    #[test]
    fn build_body_with_text_input_and_defaults() {
        let request = Request::new("moonshotai/Kimi-K2-Instruct-0905:groq", "Say hello");
        let body = build_request_body(&request).expect("body should be built");

        assert_eq!(
            body,
            json!({
                "model": "moonshotai/Kimi-K2-Instruct-0905:groq",
                "instructions": "You are a helpful assistant that completes tasks step by step.",
                "input": "Say hello",
                "reasoning": { "effort": "medium" }
            })
        );
    }

    #[test]
    fn build_body_with_flat_tools_and_choice() {
        let request = Request::new("m", "task")
            .with_instructions("Show your step-by-step reasoning process.")
            .with_reasoning_effort(ReasoningEffort::High)
            .with_max_tool_calls(10)
            .with_tools(vec![ToolDeclaration::new(
                "search_documents",
                "Search company documents and knowledge base for information",
                json!({
                    "type": "object",
                    "properties": { "query": { "type": "string" } },
                    "required": ["query"]
                }),
            )]);

        let body = build_request_body(&request).expect("body should be built");
        assert_eq!(
            body["instructions"],
            json!("Show your step-by-step reasoning process.")
        );
        assert_eq!(body["reasoning"]["effort"], json!("high"));
        assert_eq!(body["tool_choice"], json!("auto"));
        assert_eq!(body["max_tool_calls"], json!(10));

        let tool = &body["tools"][0];
        assert_eq!(tool["type"], json!("function"));
        assert_eq!(tool["name"], json!("search_documents"));
        assert_eq!(tool["parameters"]["required"], json!(["query"]));
        assert!(tool.get("function").is_none());
    }

    #[test]
    fn build_body_omits_tool_choice_without_tools() {
        let request = Request::new("m", "task")
            .with_tool_choice(ToolChoice::None)
            .with_max_tool_calls(5);
        let body = build_request_body(&request).expect("body should be built");
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tool_calls").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn build_body_rejects_invalid_requests() {
        let tool = ToolDeclaration::new("dup", "d", json!({}));
        let request = Request::new("m", "task").with_tools(vec![tool.clone(), tool]);
        assert!(matches!(
            build_request_body(&request),
            Err(ResponsesError::Validation { .. })
        ));
    }

    #[test]
    fn build_body_with_conversation_input() {
        let request = Request::new(
            "m",
            vec![
                InputItem::user("find q3 sales"),
                InputItem::Item(OutputItem::FunctionCall(FunctionCall::new(
                    "call_1",
                    "search_documents",
                    r#"{"query":"q3"}"#,
                ))),
                InputItem::Item(OutputItem::FunctionCallOutput(FunctionCallOutput::new(
                    "call_1",
                    "Found 3 documents",
                ))),
            ],
        );
        let body = build_request_body(&request).expect("body should be built");
        assert_eq!(
            body["input"],
            json!([
                { "type": "message", "role": "user", "content": "find q3 sales" },
                {
                    "type": "function_call",
                    "call_id": "call_1",
                    "name": "search_documents",
                    "arguments": "{\"query\":\"q3\"}"
                },
                { "type": "function_call_output", "call_id": "call_1", "output": "Found 3 documents" }
            ])
        );
    }
}
