use serde::Deserialize;
use serde_json::Value;

use crate::error::ResponsesError;

/// Turns a non-2xx reply into a [`ResponsesError::Transport`] carrying the status.
///
/// The `{"error": {"message", "type", "code"}}` envelope is unpacked when present and
/// the code is appended as `message (code)`.
pub(crate) fn parse_error_response(status: u16, body: &str) -> ResponsesError {
    match error_message(body) {
        Some(message) => ResponsesError::upstream(status, message),
        None => ResponsesError::upstream(status, format!("status {status}: {body}")),
    }
}

/// Extracts a readable message from an `error` value embedded in a 2xx body.
pub(crate) fn describe_embedded_error(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(_) => {
            serde_json::from_value::<InnerError>(error.clone())
                .ok()
                .and_then(InnerError::into_message)
                .unwrap_or_else(|| error.to_string())
        }
        other => other.to_string(),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<InnerError>,
}

#[derive(Deserialize)]
struct InnerError {
    message: Option<String>,
    code: Option<Value>,
}

impl InnerError {
    fn into_message(self) -> Option<String> {
        let code = self.code.and_then(|value| match value {
            Value::Null => None,
            Value::String(code) => Some(code),
            other => Some(other.to_string()),
        });
        match (self.message, code) {
            (Some(message), Some(code)) => Some(format!("{message} ({code})")),
            (Some(message), None) => Some(message),
            (None, Some(code)) => Some(format!("unknown error ({code})")),
            (None, None) => None,
        }
    }
}

fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()?
        .error?
        .into_message()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_error_envelope_with_code() {
        let body = r#"{"error":{"message":"invalid api key","type":"invalid_request_error","code":"invalid_api_key"}}"#;
        match parse_error_response(401, body) {
            ResponsesError::Transport { status, message } => {
                assert_eq!(status, Some(401));
                assert_eq!(message, "invalid api key (invalid_api_key)");
            }
            other => panic!("expected Transport error, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_envelope_with_null_code() {
        let body = r#"{"error":{"message":"model not found","type":"invalid_request_error","code":null}}"#;
        let err = parse_error_response(404, body);
        assert_eq!(err.status(), Some(404));
        assert!(err.to_string().ends_with("model not found"));
    }

    #[test]
    fn non_json_body_falls_back_to_raw_text() {
        match parse_error_response(502, "Bad Gateway") {
            ResponsesError::Transport { status, message } => {
                assert_eq!(status, Some(502));
                assert_eq!(message, "status 502: Bad Gateway");
            }
            other => panic!("expected Transport error, got {other:?}"),
        }
    }

    #[test]
    fn embedded_errors_are_described() {
        assert_eq!(
            describe_embedded_error(&json!({"message": "server_error", "code": "internal"})),
            "server_error (internal)"
        );
        assert_eq!(describe_embedded_error(&json!("boom")), "boom");
    }
}
