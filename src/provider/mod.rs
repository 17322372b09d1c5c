use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ResponsesError;
use crate::types::{Request, Response};

pub mod open_responses;

pub use open_responses::{DEFAULT_BASE_URL, OpenResponsesProvider};

/// Remote side of the protocol: submits one request and returns the parsed reply.
///
/// Implementations own transport, authentication and any retry policy. The agent loop
/// calls [`ResponsesProvider::submit`] exactly once per iteration and never retries.
#[async_trait]
pub trait ResponsesProvider: Send + Sync {
    /// Submits a request and waits for the complete response.
    ///
    /// # Errors
    ///
    /// [`ResponsesError::Transport`] for network or upstream failures,
    /// [`ResponsesError::ProtocolViolation`] for replies that cannot be interpreted.
    async fn submit(&self, request: &Request) -> Result<Response, ResponsesError>;

    /// Provider name used in logs.
    fn name(&self) -> &'static str;
}

/// Thread-safe provider handle.
pub type DynProvider = Arc<dyn ResponsesProvider>;
