use serde::Deserialize;
use serde_json::Value;

use crate::types::OutputItem;

/// Non-streaming response body.
///
/// Only `output` is required; everything else degrades to a default so that a sparse
/// but well-formed reply still yields an aggregate.
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct WireResponse {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) model: String,
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) error: Option<Value>,
    pub(crate) output: Vec<OutputItem>,
    #[serde(default)]
    pub(crate) usage: Option<WireUsage>,
}

/// `usage` block; counts may be missing or null.
#[derive(Debug, Deserialize, Clone, Default)]
pub(crate) struct WireUsage {
    #[serde(default)]
    pub(crate) input_tokens: Option<u64>,
    #[serde(default)]
    pub(crate) output_tokens: Option<u64>,
}
