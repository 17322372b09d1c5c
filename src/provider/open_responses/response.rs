use crate::error::ResponsesError;
use crate::types::{Response, Usage};

use super::error::describe_embedded_error;
use super::types::{WireResponse, WireUsage};

/// Converts a decoded 2xx body into the response aggregate.
///
/// A body that reports `status: "failed"` or a non-null `error` is an upstream failure
/// even though the HTTP exchange succeeded.
pub(crate) fn map_wire_response(
    wire: WireResponse,
    http_status: u16,
) -> Result<Response, ResponsesError> {
    if let Some(error) = wire.error.as_ref().filter(|error| !error.is_null()) {
        return Err(ResponsesError::upstream(
            http_status,
            describe_embedded_error(error),
        ));
    }
    if wire.status.as_deref() == Some("failed") {
        return Err(ResponsesError::upstream(
            http_status,
            format!("response {} failed without error details", wire.id),
        ));
    }

    let usage = convert_usage(wire.usage.unwrap_or_default());
    Ok(Response::new(wire.id, wire.model, usage, wire.output))
}

pub(crate) fn convert_usage(usage: WireUsage) -> Usage {
    Usage::new(
        usage.input_tokens.unwrap_or_default(),
        usage.output_tokens.unwrap_or_default(),
    )
}
