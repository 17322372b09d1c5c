//! Tool registry and dispatcher.
//!
//! The registry maps declared tool names to handlers and turns `function_call` items
//! into `function_call_output` items. Nothing a handler does can fail the caller:
//! unknown tools, malformed arguments and handler errors all come back as error-tagged
//! outputs carrying the original `call_id`. The only hard error is a call without a
//! `call_id`, since no output could ever be correlated with it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ResponsesError;
use crate::types::{FunctionCall, FunctionCallOutput, ToolDeclaration};

/// Failure raised inside a tool handler.
///
/// Never escapes the dispatcher; it is rendered into the output string instead.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The arguments were well-formed JSON but unusable by the handler.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The handler ran and failed.
    #[error("{0}")]
    Execution(String),
}

impl ToolError {
    pub fn execution<T: Into<String>>(message: T) -> Self {
        Self::Execution(message.into())
    }
}

/// Executable side of a declared tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with arguments already decoded from the call's JSON string.
    async fn call(&self, arguments: Value) -> Result<String, ToolError>;
}

/// Adapts a synchronous closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(Value) -> Result<String, ToolError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Result<String, ToolError> + Send + Sync,
{
    async fn call(&self, arguments: Value) -> Result<String, ToolError> {
        (self.f)(arguments)
    }
}

/// One dispatched call and what came of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub call: FunctionCall,
    pub output: FunctionCallOutput,
    /// Whether the output is error-tagged (unknown tool, bad arguments, handler error).
    pub failed: bool,
    pub elapsed: Duration,
}

impl ToolInvocation {
    /// Builds a failed invocation for a handler that never returned.
    pub(crate) fn aborted(call: FunctionCall, message: &str) -> Self {
        let output = FunctionCallOutput::new(
            call.call_id.clone(),
            format!("error: {}: {message}", call.name),
        );
        Self {
            call,
            output,
            failed: true,
            elapsed: Duration::ZERO,
        }
    }
}

struct RegisteredTool {
    declaration: ToolDeclaration,
    handler: Arc<dyn ToolHandler>,
}

/// Read-only during a run; share it across runs behind an `Arc`.
///
/// # Examples
///
/// ```
/// use open_responses::tools::{FnHandler, ToolRegistry};
/// use open_responses::types::{FunctionCall, ToolDeclaration};
/// use serde_json::json;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut registry = ToolRegistry::new();
/// registry
///     .register(
///         ToolDeclaration::new("echo", "Echo input", json!({"type": "object", "required": ["input"]})),
///         FnHandler::new(|args| Ok(format!("echo: {}", args["input"].as_str().unwrap_or_default()))),
///     )
///     .unwrap();
///
/// let output = registry
///     .dispatch(&FunctionCall::new("c1", "echo", r#"{"input":"x"}"#))
///     .await
///     .unwrap();
/// assert_eq!(output.call_id, "c1");
/// assert_eq!(output.output, "echo: x");
/// # });
/// ```
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its declared name.
    ///
    /// # Errors
    ///
    /// Returns [`ResponsesError::Validation`] when the name is empty or already taken.
    pub fn register<H>(
        &mut self,
        declaration: ToolDeclaration,
        handler: H,
    ) -> Result<(), ResponsesError>
    where
        H: ToolHandler + 'static,
    {
        self.register_arc(declaration, Arc::new(handler))
    }

    /// Registers an already shared handler.
    pub fn register_arc(
        &mut self,
        declaration: ToolDeclaration,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ResponsesError> {
        let name = declaration.name.trim();
        if name.is_empty() {
            return Err(ResponsesError::validation("tool name must not be empty"));
        }
        if self.index.contains_key(&declaration.name) {
            return Err(ResponsesError::validation(format!(
                "duplicate tool name: {}",
                declaration.name
            )));
        }
        self.index
            .insert(declaration.name.clone(), self.tools.len());
        self.tools.push(RegisteredTool {
            declaration,
            handler,
        });
        Ok(())
    }

    /// Declarations in registration order, ready to go into a request.
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .iter()
            .map(|tool| tool.declaration.clone())
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools
            .iter()
            .map(|tool| tool.declaration.name.as_str())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Executes a function call and answers it with the same `call_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ResponsesError::ProtocolViolation`] only when the call has no
    /// `call_id`. Every other failure is encoded in the returned output.
    pub async fn dispatch(&self, call: &FunctionCall) -> Result<FunctionCallOutput, ResponsesError> {
        self.invoke(call).await.map(|invocation| invocation.output)
    }

    /// Like [`ToolRegistry::dispatch`] but keeps the bookkeeping the agent loop records.
    pub async fn invoke(&self, call: &FunctionCall) -> Result<ToolInvocation, ResponsesError> {
        if call.call_id.is_empty() {
            return Err(ResponsesError::protocol(format!(
                "function_call `{}` has no call_id",
                call.name
            )));
        }

        let started = Instant::now();
        let (output, failed) = match self.run(call).await {
            Ok(output) => (output, false),
            Err(message) => {
                warn!(tool = %call.name, call_id = %call.call_id, %message, "tool dispatch failed");
                (message, true)
            }
        };
        let elapsed = started.elapsed();
        debug!(
            tool = %call.name,
            call_id = %call.call_id,
            failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "dispatched function call"
        );

        Ok(ToolInvocation {
            call: call.clone(),
            output: FunctionCallOutput::new(call.call_id.clone(), output),
            failed,
            elapsed,
        })
    }

    /// Returns the handler output, or the error-tagged text to send back instead.
    async fn run(&self, call: &FunctionCall) -> Result<String, String> {
        let Some(tool) = self.index.get(&call.name).map(|&idx| &self.tools[idx]) else {
            return Err(format!("unknown tool: {}", call.name));
        };

        let arguments = decode_arguments(&call.arguments)
            .map_err(|reason| format!("error: invalid arguments for {}: {reason}", call.name))?;

        let missing: Vec<&str> = tool
            .declaration
            .required()
            .into_iter()
            .filter(|name| !arguments.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "error: missing required argument(s) for {}: {}",
                call.name,
                missing.join(", ")
            ));
        }

        tool.handler
            .call(Value::Object(arguments))
            .await
            .map_err(|err| format!("error: {}: {err}", call.name))
    }
}

/// Decodes the `arguments` string into a JSON object; an empty string means `{}`.
fn decode_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {other}")),
        Err(err) => Err(err.to_string()),
    }
}
