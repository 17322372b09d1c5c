use thiserror::Error;

/// Aggregates every failure mode a caller of the agent loop can observe.
///
/// Tool failures are deliberately absent: they are recovered inside the dispatcher and
/// travel back to the model as error-tagged `function_call_output` items (see
/// [`crate::tools::ToolError`]).
#[derive(Debug, Error)]
pub enum ResponsesError {
    /// Network or upstream failure reported by the transport collaborator.
    ///
    /// `status` is the HTTP status when the upstream answered, `None` when the request
    /// never produced a response (DNS, TLS, connection reset, ...).
    #[error("{}", transport_display(*status, message))]
    Transport {
        status: Option<u16>,
        message: String,
    },
    /// Reports a missing or unusable credential.
    #[error("auth failure: {message}")]
    Auth { message: String },
    /// Signals validation failures in a locally built request or registry.
    #[error("invalid request: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig {
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// The remote side produced something the protocol does not allow, such as a
    /// function call without a `call_id` or a result answering an unknown call.
    #[error("protocol violation: {message}")]
    ProtocolViolation { message: String },
    /// The agent loop hit its iteration cap while tool calls were still pending.
    #[error("agent loop exceeded {limit} iterations")]
    LoopLimitExceeded { limit: u32 },
    /// The run was cancelled by the caller or by its timeout.
    #[error("run cancelled: {message}")]
    Cancelled { message: String },
}

fn transport_display(status: Option<u16>, message: &str) -> String {
    match status {
        Some(status) => format!("transport error (status {status}): {message}"),
        None => format!("transport error: {message}"),
    }
}

impl ResponsesError {
    /// Creates a [`ResponsesError::Transport`] without an HTTP status.
    ///
    /// # Examples
    ///
    /// ```
    /// use open_responses::error::ResponsesError;
    ///
    /// let err = ResponsesError::transport("dns lookup failed");
    /// assert!(matches!(err, ResponsesError::Transport { status: None, .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a [`ResponsesError::Transport`] carrying the upstream status code.
    pub fn upstream<T: Into<String>>(status: u16, message: T) -> Self {
        Self::Transport {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Creates a [`ResponsesError::ProtocolViolation`].
    ///
    /// # Examples
    ///
    /// ```
    /// use open_responses::error::ResponsesError;
    ///
    /// let err = ResponsesError::protocol("function_call without call_id");
    /// assert!(err.to_string().contains("call_id"));
    /// ```
    pub fn protocol<T: Into<String>>(message: T) -> Self {
        Self::ProtocolViolation {
            message: message.into(),
        }
    }

    /// Creates a [`ResponsesError::Validation`].
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// HTTP-like status attached to transport failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }

    /// Whether the run ended at a policy boundary rather than a failure.
    pub fn is_loop_limit(&self) -> bool {
        matches!(self, Self::LoopLimitExceeded { .. })
    }
}
