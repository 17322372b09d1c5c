use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use open_responses::http::{HttpRequest, HttpResponse, HttpTransport};
use open_responses::{
    Agent, AgentConfig, Credential, FnHandler, ProviderKind, ReasoningVisibility,
    ResponsesError, ToolDeclaration, ToolError, ToolRegistry, build_provider,
};
use serde_json::{Value, json};

/// Replays canned replies in order and records the JSON bodies it was sent.
struct ScriptedTransport {
    replies: Mutex<VecDeque<(u16, Value)>>,
    bodies: Mutex<Vec<Value>>,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<(u16, Value)>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            bodies: Mutex::new(Vec::new()),
            urls: Mutex::new(Vec::new()),
        })
    }

    fn bodies(&self) -> Vec<Value> {
        self.bodies.lock().expect("lock").clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ResponsesError> {
        let body: Value = serde_json::from_slice(&request.body).expect("request body is JSON");
        self.bodies.lock().expect("lock").push(body);
        self.urls.lock().expect("lock").push(request.url);

        let Some((status, reply)) = self.replies.lock().expect("lock").pop_front() else {
            return Err(ResponsesError::transport("script exhausted"));
        };
        Ok(HttpResponse {
            status,
            headers: HashMap::new(),
            body: reply.to_string().into_bytes(),
        })
    }
}

fn config() -> AgentConfig {
    AgentConfig::new(
        ProviderKind::HuggingFace,
        Credential::Bearer {
            token: "hf_test".to_string(),
        },
    )
}

fn business_tools() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDeclaration::new(
                "search_documents",
                "Search company documents and knowledge base for information",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "department": { "type": "string" }
                    },
                    "required": ["query"]
                }),
            ),
            FnHandler::new(|args| {
                Ok(format!(
                    "Found 3 documents matching '{}'",
                    args["query"].as_str().unwrap_or_default()
                ))
            }),
        )
        .expect("register search_documents");
    registry
        .register(
            ToolDeclaration::new(
                "send_email",
                "Send email notification to team members",
                json!({
                    "type": "object",
                    "properties": {
                        "recipients": { "type": "array", "items": { "type": "string" } },
                        "subject": { "type": "string" }
                    },
                    "required": ["recipients", "subject"]
                }),
            ),
            FnHandler::new(|_| Err(ToolError::execution("smtp relay unavailable"))),
        )
        .expect("register send_email");
    Arc::new(registry)
}

#[tokio::test]
async fn tool_round_trip_over_the_wire() {
    let transport = ScriptedTransport::new(vec![
        (
            200,
            json!({
                "id": "resp_1",
                "model": "moonshotai/Kimi-K2-Instruct-0905:groq",
                "status": "completed",
                "output": [
                    { "type": "reasoning", "content": [{ "type": "reasoning_text", "text": "I should search first." }] },
                    {
                        "type": "function_call",
                        "call_id": "call_a",
                        "name": "search_documents",
                        "arguments": "{\"query\":\"Q3 sales\"}"
                    },
                    {
                        "type": "function_call",
                        "call_id": "call_b",
                        "name": "send_email",
                        "arguments": { "recipients": ["ops@example.com"], "subject": "Q3" }
                    }
                ],
                "usage": { "input_tokens": 100, "output_tokens": 20 }
            }),
        ),
        (
            200,
            json!({
                "id": "resp_2",
                "model": "moonshotai/Kimi-K2-Instruct-0905:groq",
                "status": "completed",
                "output": [
                    { "type": "web_search_call", "id": "ws_1", "status": "completed" },
                    {
                        "type": "message",
                        "role": "assistant",
                        "content": [{ "type": "output_text", "text": "Q3 sales report is ready." }]
                    }
                ],
                "usage": { "input_tokens": 150, "output_tokens": 30 }
            }),
        ),
    ]);

    let config = config();
    let provider = build_provider(&config, transport.clone()).expect("provider");
    let agent = Agent::new(provider, config.agent_options()).with_tools(business_tools());

    let run = agent.run("Prepare the Q3 sales summary").await.expect("run");
    assert_eq!(run.output_text(), "Q3 sales report is ready.");
    assert_eq!(run.iterations, 2);
    assert_eq!(run.usage.total(), 300);
    assert_eq!(run.tool_call_count(), 2);
    assert!(!run.invocations[0].failed);
    assert!(run.invocations[1].failed);

    let visibility = run.response.reasoning_visibility();
    assert_eq!(visibility.level, ReasoningVisibility::None);

    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(
        transport.urls.lock().expect("lock")[0],
        "https://router.huggingface.co/v1/responses"
    );

    let first = &bodies[0];
    assert_eq!(first["input"], json!("Prepare the Q3 sales summary"));
    assert_eq!(first["tool_choice"], json!("auto"));
    assert_eq!(first["max_tool_calls"], json!(10));
    assert_eq!(first["tools"][1]["name"], json!("send_email"));

    let second = bodies[1]["input"].as_array().expect("conversation input");
    let kinds: Vec<&str> = second
        .iter()
        .map(|item| item["type"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "message",
            "function_call",
            "function_call",
            "function_call_output",
            "function_call_output"
        ]
    );
    assert_eq!(second[3]["call_id"], json!("call_a"));
    assert_eq!(second[3]["output"], json!("Found 3 documents matching 'Q3 sales'"));
    assert_eq!(second[4]["call_id"], json!("call_b"));
    assert_eq!(
        second[4]["output"],
        json!("error: send_email: smtp relay unavailable")
    );
}

#[tokio::test]
async fn upstream_error_status_aborts_the_run() {
    let transport = ScriptedTransport::new(vec![(
        401,
        json!({ "error": { "message": "Invalid credentials in Authorization header", "type": "invalid_request_error" } }),
    )]);
    let config = config();
    let provider = build_provider(&config, transport.clone()).expect("provider");
    let agent = Agent::new(provider, config.agent_options()).with_tools(business_tools());

    let err = agent.run("anything").await.expect_err("401 must fail");
    assert_eq!(err.status(), Some(401));
    assert!(err.to_string().contains("Invalid credentials"));
    assert_eq!(transport.bodies().len(), 1);
}

#[tokio::test]
async fn reasoning_only_reply_is_terminal_and_classified() {
    let transport = ScriptedTransport::new(vec![(
        200,
        json!({
            "id": "resp_r",
            "model": "m",
            "output": [
                { "type": "reasoning", "summary": [{ "type": "summary_text", "text": "Compared three quarters." }] }
            ]
        }),
    )]);
    let config = config();
    let provider = build_provider(&config, transport.clone()).expect("provider");
    let run = Agent::new(provider, config.agent_options())
        .run("summarize")
        .await
        .expect("run");

    assert_eq!(run.output_text(), "");
    assert!(transport.bodies()[0].get("max_tool_calls").is_none());
    let visibility = run.response.reasoning_visibility();
    assert_eq!(visibility.level, ReasoningVisibility::Summary);
    assert_eq!(visibility.estimated_tokens, "Compared three quarters.".len() as u64 / 4);
}

#[tokio::test]
async fn loop_cap_is_enforced_end_to_end() {
    let reply = |id: &str| {
        (
            200,
            json!({
                "id": "r",
                "model": "m",
                "output": [{
                    "type": "function_call",
                    "call_id": id,
                    "name": "search_documents",
                    "arguments": "{\"query\":\"more\"}"
                }]
            }),
        )
    };
    let transport = ScriptedTransport::new(vec![reply("c1"), reply("c2")]);
    let mut config = config();
    config.max_iterations = 2;
    let provider = build_provider(&config, transport.clone()).expect("provider");
    let agent = Agent::new(provider, config.agent_options()).with_tools(business_tools());

    let err = agent.run("keep searching").await.expect_err("cap");
    assert!(err.is_loop_limit());
    assert_eq!(transport.bodies().len(), 2);
}
