//! Client-side agent loop for the Open Responses protocol.
//!
//! Typed output items, reasoning visibility classification and local tool dispatch on
//! top of a pluggable [`provider::ResponsesProvider`].

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod reasoning;
pub mod tools;
pub mod types;

pub use agent::{Agent, AgentOptions, AgentRun, AgentState, run_agent};
pub use config::{AgentConfig, Credential, ProviderKind, build_provider};
pub use error::ResponsesError;
pub use provider::{DynProvider, OpenResponsesProvider, ResponsesProvider};
pub use reasoning::{ReasoningAnalysis, ReasoningVisibility, resolve_reasoning_visibility};
pub use tools::{FnHandler, ToolError, ToolHandler, ToolInvocation, ToolRegistry};
pub use types::*;
