//! HTTP provider speaking the Open Responses wire format (`POST /v1/responses`).

mod error;
mod provider;
mod request;
mod response;
mod types;

pub use provider::{DEFAULT_BASE_URL, OpenResponsesProvider};
