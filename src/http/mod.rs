use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ResponsesError;

pub mod reqwest;

/// Outgoing request as handed to a transport; the body is already encoded.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// POST with `Content-Type: application/json` preset.
    ///
    /// # Examples
    ///
    /// ```
    /// use open_responses::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec());
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body,
            timeout: None,
        }
    }

    /// Merges extra headers over the defaults.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Fully buffered reply.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decodes the body as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`ResponsesError::Transport`] when the body is not valid UTF-8.
    pub fn into_string(self) -> Result<String, ResponsesError> {
        let status = self.status;
        String::from_utf8(self.body).map_err(|err| ResponsesError::Transport {
            status: Some(status),
            message: format!("response body is not UTF-8: {err}"),
        })
    }
}

/// Sends buffered HTTP requests on behalf of a provider.
///
/// Implementations must not retry on their own behalf unless that is their documented
/// purpose; the agent loop never retries.
///
/// # Examples
///
/// ```
/// # use async_trait::async_trait;
/// # use open_responses::http::{HttpTransport, HttpRequest, HttpResponse};
/// # use open_responses::error::ResponsesError;
/// struct MemoryTransport;
///
/// #[async_trait]
/// impl HttpTransport for MemoryTransport {
///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ResponsesError> {
///         Ok(HttpResponse { status: 200, headers: request.headers, body: b"ok".to_vec() })
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let response = MemoryTransport
///     .send(HttpRequest::post_json("https://example.com", br"{}".to_vec()))
///     .await
///     .unwrap();
/// assert_eq!(response.status, 200);
/// # });
/// ```
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Resolves once the whole body has been read.
    ///
    /// # Errors
    ///
    /// Implementations map network failures to [`ResponsesError::Transport`] with no
    /// status. Non-2xx answers are returned as responses, not errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ResponsesError>;
}

/// Shared transport handle.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

/// Encodes `body` as JSON and POSTs it with `headers` merged over the defaults.
///
/// # Errors
///
/// Returns [`ResponsesError::Validation`] if serialization fails or forwards the error
/// raised by [`HttpTransport::send`].
pub async fn post_json_with_headers<T: Serialize>(
    transport: &dyn HttpTransport,
    url: impl Into<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    body: &T,
) -> Result<HttpResponse, ResponsesError> {
    let payload = serde_json::to_vec(body).map_err(|err| ResponsesError::Validation {
        message: format!("failed to serialize request: {err}"),
    })?;
    let request = HttpRequest::post_json(url, payload)
        .with_headers(headers)
        .with_timeout(timeout);
    transport.send(request).await
}
