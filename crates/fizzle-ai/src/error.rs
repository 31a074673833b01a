//! Error taxonomy for the design API client.

use fizzle_core::stream::StreamParseError;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    ClientBuild(String),

    /// The request failed in transport, before or during the body.
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    /// The streamed reply could not be parsed once complete.
    #[error(transparent)]
    Stream(#[from] StreamParseError),

    /// The generate endpoint answered, but without a usable design.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The caller aborted the request.
    #[error("request cancelled")]
    Cancelled,
}

impl AiError {
    /// Transport-level failures the caller may retry as-is.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { .. })
    }
}
