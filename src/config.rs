use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::{AgentOptions, DEFAULT_MAX_ITERATIONS};
use crate::error::ResponsesError;
use crate::http::DynHttpTransport;
use crate::provider::{DEFAULT_BASE_URL, DynProvider, OpenResponsesProvider};
use crate::types::ReasoningEffort;

/// Model used when `MODEL` is not set; the `:groq` suffix routes it through the HF router.
pub const DEFAULT_MODEL: &str = "moonshotai/Kimi-K2-Instruct-0905:groq";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_TOOL_CALLS: u32 = 10;

/// Everything needed to build a provider and an agent for one backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub provider: ProviderKind,
    pub credential: Credential,
    #[serde(default = "default_model")]
    pub model: String,
    /// Overrides the provider's endpoint; required for [`ProviderKind::Custom`].
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub reasoning_effort: ReasoningEffort,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Sent as `max_tool_calls` with every request that declares tools.
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: Option<u32>,
    /// Bound for a whole run; `None` disables it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub parallel_tool_calls: bool,
}

/// Open Responses backends with a known endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Hugging Face inference router; picks the upstream from the model's `:suffix`.
    #[default]
    HuggingFace,
    OpenAi,
    Anthropic,
    Together,
    Nebius,
    /// Any other compatible endpoint, given through `base_url`.
    Custom,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::HuggingFace => "huggingface",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Together => "together",
            ProviderKind::Nebius => "nebius",
            ProviderKind::Custom => "custom",
        }
    }

    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderKind::HuggingFace => Some(DEFAULT_BASE_URL),
            ProviderKind::OpenAi => Some("https://api.openai.com/v1"),
            ProviderKind::Anthropic => Some("https://api.anthropic.com/v1"),
            ProviderKind::Together => Some("https://api.together.xyz/v1"),
            ProviderKind::Nebius => Some("https://api.nebius.ai/v1"),
            ProviderKind::Custom => None,
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = ResponsesError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "huggingface" | "hugging_face" | "hf" => Ok(Self::HuggingFace),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "together" => Ok(Self::Together),
            "nebius" => Ok(Self::Nebius),
            "custom" => Ok(Self::Custom),
            other => Err(ResponsesError::InvalidConfig {
                field: "provider".to_string(),
                reason: format!("unknown provider `{other}`"),
            }),
        }
    }
}

/// Authentication material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credential {
    Bearer { token: String },
    /// No credential; building a provider from it fails with [`ResponsesError::Auth`].
    None,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_max_tool_calls() -> Option<u32> {
    Some(DEFAULT_MAX_TOOL_CALLS)
}

fn default_timeout_secs() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_SECS)
}

impl AgentConfig {
    pub fn new(provider: ProviderKind, credential: Credential) -> Self {
        Self {
            provider,
            credential,
            model: default_model(),
            base_url: None,
            reasoning_effort: ReasoningEffort::default(),
            instructions: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_tool_calls: default_max_tool_calls(),
            timeout_secs: default_timeout_secs(),
            parallel_tool_calls: false,
        }
    }

    /// Loads the configuration from process environment variables.
    ///
    /// Reads `PROVIDER`, `API_KEY` (falling back to `HF_TOKEN`), `MODEL`, `BASE_URL`,
    /// `REASONING_EFFORT`, `MAX_ITERATIONS`, `MAX_TOOL_CALLS` and `TIMEOUT_SECS`. Blank values
    /// count as unset.
    pub fn from_env() -> Result<Self, ResponsesError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AgentConfig::from_env`] with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ResponsesError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let provider = match get("PROVIDER") {
            Some(value) => value.parse()?,
            None => ProviderKind::default(),
        };
        let credential = match get("API_KEY").or_else(|| get("HF_TOKEN")) {
            Some(token) => Credential::Bearer { token },
            None => Credential::None,
        };

        let mut config = Self::new(provider, credential);
        if let Some(model) = get("MODEL") {
            config.model = model;
        }
        config.base_url = get("BASE_URL");
        if let Some(effort) = get("REASONING_EFFORT") {
            config.reasoning_effort = effort.parse()?;
        }
        if let Some(raw) = get("MAX_ITERATIONS") {
            config.max_iterations = parse_number("max_iterations", &raw)?;
        }
        if let Some(raw) = get("MAX_TOOL_CALLS") {
            config.max_tool_calls = Some(parse_number("max_tool_calls", &raw)?);
        }
        if let Some(raw) = get("TIMEOUT_SECS") {
            config.timeout_secs = Some(parse_number("timeout_secs", &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ResponsesError> {
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model", "must not be empty"));
        }
        if self.provider == ProviderKind::Custom && self.base_url.is_none() {
            return Err(invalid("base_url", "required for the custom provider"));
        }
        Ok(())
    }

    /// Endpoint base for the configured provider, with `base_url` taking precedence.
    pub fn resolved_base_url(&self) -> Result<String, ResponsesError> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
            .ok_or_else(|| invalid("base_url", "required for the custom provider"))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Options for [`crate::agent::Agent`] derived from this configuration.
    pub fn agent_options(&self) -> AgentOptions {
        let mut options = AgentOptions::new(self.model.clone())
            .with_reasoning_effort(self.reasoning_effort)
            .with_max_iterations(self.max_iterations)
            .with_parallel_tool_calls(self.parallel_tool_calls);
        if let Some(instructions) = &self.instructions {
            options = options.with_instructions(instructions.clone());
        }
        if let Some(max) = self.max_tool_calls {
            options = options.with_max_tool_calls(max);
        }
        if let Some(timeout) = self.timeout() {
            options = options.with_timeout(timeout);
        }
        options
    }
}

/// Builds the HTTP provider described by `config`.
///
/// The run-level timeout also bounds each HTTP request.
pub fn build_provider(
    config: &AgentConfig,
    transport: DynHttpTransport,
) -> Result<DynProvider, ResponsesError> {
    config.validate()?;
    let token = match &config.credential {
        Credential::Bearer { token } => token.clone(),
        Credential::None => {
            return Err(ResponsesError::Auth {
                message: format!(
                    "provider {} requires credential (set API_KEY or HF_TOKEN)",
                    config.provider.as_str()
                ),
            });
        }
    };

    let mut provider =
        OpenResponsesProvider::new(transport, token).with_base_url(config.resolved_base_url()?);
    if let Some(timeout) = config.timeout() {
        provider = provider.with_timeout(timeout);
    }
    Ok(Arc::new(provider))
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> Result<T, ResponsesError> {
    raw.trim()
        .parse()
        .map_err(|_| invalid(field, &format!("expected a non-negative integer, got `{raw}`")))
}

fn invalid(field: &str, reason: &str) -> ResponsesError {
    ResponsesError::InvalidConfig {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
