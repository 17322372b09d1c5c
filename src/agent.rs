//! The client-driven tool loop.
//!
//! One [`Agent`] run walks `Start → Requesting → Inspecting → (Dispatching →
//! Requesting)* → Terminal`. Every turn submits the conversation so far, dispatches the
//! function calls nobody has answered yet, and resubmits with their outputs appended,
//! until a response arrives with nothing left to answer or the iteration cap is hit.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ResponsesError;
use crate::provider::DynProvider;
use crate::tools::{ToolInvocation, ToolRegistry};
use crate::types::{
    FunctionCall, Input, InputItem, OutputItem, ReasoningEffort, Request, Response,
    ToolChoice, ToolDeclaration, Usage,
};

pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Per-run settings of the loop driver.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    pub model: String,
    pub instructions: Option<String>,
    pub reasoning_effort: ReasoningEffort,
    pub tool_choice: Option<ToolChoice>,
    /// Maximum number of requests one run may submit. Must be at least 1.
    pub max_iterations: u32,
    /// Server-side cap on tool calls per response, sent as `max_tool_calls`.
    pub max_tool_calls: Option<u32>,
    /// Dispatch the calls of one turn concurrently instead of one after another.
    /// Outputs are resubmitted in call order either way.
    pub parallel_tool_calls: bool,
    /// Upper bound for the whole run; expiry ends it as [`ResponsesError::Cancelled`].
    pub timeout: Option<Duration>,
}

impl AgentOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instructions: None,
            reasoning_effort: ReasoningEffort::default(),
            tool_choice: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tool_calls: None,
            parallel_tool_calls: false,
            timeout: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_reasoning_effort(mut self, effort: ReasoningEffort) -> Self {
        self.reasoning_effort = effort;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tool_calls(mut self, max: u32) -> Self {
        self.max_tool_calls = Some(max);
        self
    }

    pub fn with_parallel_tool_calls(mut self, parallel: bool) -> Self {
        self.parallel_tool_calls = parallel;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Phase of a run, reported in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Start,
    Requesting,
    Inspecting,
    Dispatching,
    Terminal,
}

/// Outcome of a run that reached `Terminal`.
#[derive(Debug, Clone)]
pub struct AgentRun {
    /// The last response, returned as received.
    pub response: Response,
    /// Number of requests submitted.
    pub iterations: u32,
    /// Every locally dispatched call, in dispatch order.
    pub invocations: Vec<ToolInvocation>,
    /// Usage summed over all turns.
    pub usage: Usage,
    /// The whole conversation: the task, then the items of each turn in order.
    pub transcript: Vec<InputItem>,
}

impl AgentRun {
    pub fn output_text(&self) -> String {
        self.response.output_text()
    }

    pub fn tool_call_count(&self) -> usize {
        self.invocations.len()
    }
}

/// Drives the request/dispatch cycle against one provider with one tool registry.
///
/// The registry is shared read-only; concurrent runs on the same `Agent` each own
/// their conversation state.
pub struct Agent {
    provider: DynProvider,
    tools: Arc<ToolRegistry>,
    options: AgentOptions,
}

impl Agent {
    pub fn new(provider: DynProvider, options: AgentOptions) -> Self {
        Self {
            provider,
            tools: Arc::new(ToolRegistry::new()),
            options,
        }
    }

    pub fn with_tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Runs the loop for `task` until a terminal response.
    ///
    /// # Errors
    ///
    /// - [`ResponsesError::Transport`] when a submission fails (the run is abandoned).
    /// - [`ResponsesError::ProtocolViolation`] for uncorrelated calls or results.
    /// - [`ResponsesError::LoopLimitExceeded`] when calls are still pending after
    ///   `max_iterations` requests.
    /// - [`ResponsesError::Cancelled`] when the timeout expires.
    pub async fn run(&self, task: impl Into<String>) -> Result<AgentRun, ResponsesError> {
        self.run_with_cancel(task, CancellationToken::new()).await
    }

    /// Like [`Agent::run`], but stops with [`ResponsesError::Cancelled`] as soon as
    /// `cancel` fires. Nothing is dispatched after cancellation.
    pub async fn run_with_cancel(
        &self,
        task: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<AgentRun, ResponsesError> {
        let task = task.into();
        let result = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive(task, &cancel)).await {
                Ok(result) => result,
                Err(_) => Err(ResponsesError::Cancelled {
                    message: format!("run timed out after {}ms", limit.as_millis()),
                }),
            },
            None => self.drive(task, &cancel).await,
        };

        if let Err(err) = &result {
            warn!(provider = self.provider.name(), error = %err, "agent run ended without a terminal response");
        }
        result
    }

    async fn drive(
        &self,
        task: String,
        cancel: &CancellationToken,
    ) -> Result<AgentRun, ResponsesError> {
        let limit = self.options.max_iterations;
        if limit == 0 {
            return Err(ResponsesError::InvalidConfig {
                field: "max_iterations".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let declarations = self.tools.declarations();
        let mut state = AgentState::Start;
        let mut conversation = vec![InputItem::user(task.clone())];
        let mut known_calls: HashSet<String> = HashSet::new();
        let mut answered: HashSet<String> = HashSet::new();
        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let mut usage = Usage::default();

        info!(
            provider = self.provider.name(),
            model = %self.options.model,
            tools = declarations.len(),
            max_iterations = limit,
            "starting agent run"
        );

        for iteration in 1..=limit {
            advance(&mut state, AgentState::Requesting, iteration);
            let input = if iteration == 1 {
                Input::Text(task.clone())
            } else {
                Input::Items(conversation.clone())
            };
            let request = self.build_request(input, &declarations);
            request.validate()?;

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(cancelled("cancelled while awaiting a response"));
                }
                result = self.provider.submit(&request) => result?,
            };
            usage += response.usage();

            advance(&mut state, AgentState::Inspecting, iteration);
            let pending = unanswered_calls(&response, &mut known_calls, &mut answered)?;
            conversation.extend(reinjectable(&response));

            if pending.is_empty() {
                advance(&mut state, AgentState::Terminal, iteration);
                info!(
                    response_id = response.id(),
                    iterations = iteration,
                    tool_calls = invocations.len(),
                    total_tokens = usage.total(),
                    "agent run completed"
                );
                return Ok(AgentRun {
                    response,
                    iterations: iteration,
                    invocations,
                    usage,
                    transcript: conversation,
                });
            }

            if iteration == limit {
                warn!(
                    limit,
                    pending = pending.len(),
                    "iteration cap reached with tool calls still pending"
                );
                break;
            }

            advance(&mut state, AgentState::Dispatching, iteration);
            debug!(count = pending.len(), parallel = self.options.parallel_tool_calls, "dispatching function calls");
            let dispatched = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(cancelled("cancelled while dispatching tool calls"));
                }
                result = self.dispatch_all(&pending) => result?,
            };

            for invocation in dispatched {
                answered.insert(invocation.call.call_id.clone());
                conversation.push(InputItem::Item(OutputItem::FunctionCallOutput(
                    invocation.output.clone(),
                )));
                invocations.push(invocation);
            }
        }

        Err(ResponsesError::LoopLimitExceeded { limit })
    }

    fn build_request(&self, input: Input, declarations: &[ToolDeclaration]) -> Request {
        let mut request = Request::new(self.options.model.clone(), input)
            .with_tools(declarations.to_vec())
            .with_reasoning_effort(self.options.reasoning_effort);
        if let Some(instructions) = &self.options.instructions {
            request = request.with_instructions(instructions.clone());
        }
        if let Some(choice) = self.options.tool_choice {
            request = request.with_tool_choice(choice);
        }
        if let Some(max) = self.options.max_tool_calls {
            request = request.with_max_tool_calls(max);
        }
        request
    }

    /// Dispatches in call order; the returned invocations keep that order even when
    /// they run concurrently.
    async fn dispatch_all(
        &self,
        pending: &[FunctionCall],
    ) -> Result<Vec<ToolInvocation>, ResponsesError> {
        if self.options.parallel_tool_calls {
            join_all(pending.iter().map(|call| invoke_isolated(&self.tools, call)))
                .await
                .into_iter()
                .collect()
        } else {
            let mut dispatched = Vec::with_capacity(pending.len());
            for call in pending {
                dispatched.push(invoke_isolated(&self.tools, call).await?);
            }
            Ok(dispatched)
        }
    }
}

/// Runs `task` once with a throwaway [`Agent`].
pub async fn run_agent(
    provider: DynProvider,
    options: AgentOptions,
    task: impl Into<String>,
    tools: Option<Arc<ToolRegistry>>,
) -> Result<AgentRun, ResponsesError> {
    let mut agent = Agent::new(provider, options);
    if let Some(tools) = tools {
        agent = agent.with_tools(tools);
    }
    agent.run(task).await
}

fn advance(state: &mut AgentState, next: AgentState, iteration: u32) {
    debug!(from = ?*state, to = ?next, iteration, "agent state transition");
    *state = next;
}

fn cancelled(message: &str) -> ResponsesError {
    ResponsesError::Cancelled {
        message: message.to_string(),
    }
}

/// A panicking handler is answered like a failing one; its siblings still run.
async fn invoke_isolated(
    tools: &ToolRegistry,
    call: &FunctionCall,
) -> Result<ToolInvocation, ResponsesError> {
    match AssertUnwindSafe(tools.invoke(call)).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            warn!(tool = %call.name, call_id = %call.call_id, "tool handler panicked");
            Ok(ToolInvocation::aborted(call.clone(), "handler panicked"))
        }
    }
}

/// Checks call/result correlation for one response and returns the calls that still
/// need a local answer, in output order.
fn unanswered_calls(
    response: &Response,
    known_calls: &mut HashSet<String>,
    answered: &mut HashSet<String>,
) -> Result<Vec<FunctionCall>, ResponsesError> {
    for call in response.function_calls() {
        if call.call_id.is_empty() {
            return Err(ResponsesError::protocol(format!(
                "function_call `{}` has no call_id",
                call.name
            )));
        }
        if !known_calls.insert(call.call_id.clone()) {
            return Err(ResponsesError::protocol(format!(
                "call_id `{}` was issued more than once",
                call.call_id
            )));
        }
    }

    for output in response.function_call_outputs() {
        if !known_calls.contains(&output.call_id) {
            return Err(ResponsesError::protocol(format!(
                "function_call_output answers unknown call_id `{}`",
                output.call_id
            )));
        }
        answered.insert(output.call_id.clone());
    }

    Ok(response
        .function_calls()
        .filter(|call| !answered.contains(&call.call_id))
        .cloned()
        .collect())
}

/// Items of a response that go back into the next request's input.
///
/// Reasoning and unrecognized items stay out; only calls, their results and messages
/// carry conversation state the remote side needs to continue.
fn reinjectable(response: &Response) -> impl Iterator<Item = InputItem> + '_ {
    response
        .output()
        .iter()
        .filter(|item| {
            matches!(
                item,
                OutputItem::Message(_)
                    | OutputItem::FunctionCall(_)
                    | OutputItem::FunctionCallOutput(_)
            )
        })
        .cloned()
        .map(InputItem::Item)
}
