use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::ResponsesError;
use crate::http::{DynHttpTransport, HttpResponse, post_json_with_headers};
use crate::provider::ResponsesProvider;
use crate::types::{Request, Response};

use super::error::parse_error_response;
use super::request::build_request_body;
use super::response::map_wire_response;
use super::types::WireResponse;

/// Unified Hugging Face router; the provider is picked by the model's `:suffix`.
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Protocol version advertised on every request.
const PROTOCOL_VERSION: &str = "latest";

/// Open Responses provider over an [`crate::http::HttpTransport`].
///
/// # Examples
///
/// ```
/// # use open_responses::provider::{OpenResponsesProvider, ResponsesProvider};
/// # use open_responses::http::reqwest::default_dyn_transport;
/// let transport = default_dyn_transport().expect("transport");
/// let provider = OpenResponsesProvider::new(transport, "hf_token")
///     .with_base_url("https://api.together.xyz");
/// assert_eq!(provider.endpoint(), "https://api.together.xyz/v1/responses");
/// assert_eq!(provider.name(), "open_responses");
/// ```
pub struct OpenResponsesProvider {
    transport: DynHttpTransport,
    base_url: String,
    api_key: String,
    timeout: Option<Duration>,
    extra_headers: HashMap<String, String>,
}

impl OpenResponsesProvider {
    /// Creates a provider targeting [`DEFAULT_BASE_URL`].
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: None,
            extra_headers: HashMap::new(),
        }
    }

    /// Overrides the base URL, with or without a trailing `/v1`.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Per-request timeout handed to the transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds a header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    pub fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{base}/responses")
        } else {
            format!("{base}/v1/responses")
        }
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert(
            "OpenResponses-Version".to_string(),
            PROTOCOL_VERSION.to_string(),
        );
        for (name, value) in &self.extra_headers {
            headers.insert(name.clone(), value.clone());
        }
        headers
    }

    fn ensure_success(&self, response: HttpResponse) -> Result<(u16, String), ResponsesError> {
        let status = response.status;
        let success = response.is_success();
        let text = response.into_string()?;
        if success {
            Ok((status, text))
        } else {
            Err(parse_error_response(status, &text))
        }
    }

    fn try_parse(&self, text: &str) -> Result<WireResponse, ResponsesError> {
        serde_json::from_str(text).map_err(|err| {
            ResponsesError::protocol(format!("failed to parse Open Responses reply: {err}"))
        })
    }
}

#[async_trait]
impl ResponsesProvider for OpenResponsesProvider {
    async fn submit(&self, request: &Request) -> Result<Response, ResponsesError> {
        let body = build_request_body(request)?;
        let endpoint = self.endpoint();
        debug!(
            provider = self.name(),
            %endpoint,
            model = %request.model,
            tools = request.tools.len(),
            "submitting request"
        );

        let response = post_json_with_headers(
            self.transport.as_ref(),
            endpoint,
            self.build_headers(),
            self.timeout,
            &body,
        )
        .await?;
        let (status, text) = self.ensure_success(response)?;
        let wire = self.try_parse(&text)?;
        map_wire_response(wire, status)
    }

    fn name(&self) -> &'static str {
        "open_responses"
    }
}
