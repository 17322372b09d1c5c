use std::sync::Arc;

use dotenvy::dotenv;
use open_responses::http::reqwest::default_dyn_transport;
use open_responses::{
    Agent, AgentConfig, FnHandler, ResponsesError, ToolDeclaration, ToolRegistry, build_provider,
};
use serde_json::json;

/// Live round trip through the configured router, with one local tool.
///
/// Reads `API_KEY`/`HF_TOKEN`, `MODEL`, `PROVIDER` and `BASE_URL` from `.env` or the
/// process environment.
#[tokio::test]
#[ignore = "requires a reachable Open Responses endpoint and credentials"]
async fn open_responses_agent_live() {
    dotenv().ok();
    let config = match AgentConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("skip open_responses_agent_live: invalid environment: {err}");
            return;
        }
    };

    let transport = default_dyn_transport().expect("transport");
    let provider = match build_provider(&config, transport) {
        Ok(provider) => provider,
        Err(ResponsesError::Auth { message }) => {
            eprintln!("skip open_responses_agent_live: {message}");
            return;
        }
        Err(other) => panic!("provider should build: {other:?}"),
    };

    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDeclaration::new(
                "get_weather",
                "Get the current weather for a city",
                json!({
                    "type": "object",
                    "properties": { "city": { "type": "string" } },
                    "required": ["city"]
                }),
            ),
            FnHandler::new(|args| {
                Ok(format!(
                    "It is 21 degrees and sunny in {}.",
                    args["city"].as_str().unwrap_or("an unknown city")
                ))
            }),
        )
        .expect("register get_weather");

    let agent = Agent::new(provider, config.agent_options()).with_tools(Arc::new(registry));
    let run = match agent
        .run("What is the weather in Paris? Use the get_weather tool, then answer in one sentence.")
        .await
    {
        Ok(run) => run,
        Err(ResponsesError::Transport { status, message }) => {
            eprintln!("skip open_responses_agent_live: transport error {status:?}: {message}");
            return;
        }
        Err(other) => panic!("agent run should succeed: {other:?}"),
    };

    let visibility = run.response.reasoning_visibility();
    eprintln!(
        "iterations={} tool_calls={} reasoning={} ({} est. tokens)",
        run.iterations,
        run.tool_call_count(),
        visibility.level.as_str(),
        visibility.estimated_tokens
    );
    assert!(
        !run.output_text().trim().is_empty(),
        "final response should carry a message"
    );
}
