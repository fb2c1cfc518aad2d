/// Errors surfaced by [`TaskdeckClient`](crate::TaskdeckClient).
///
/// Nothing is retried; after an optimistic write is rolled back the error is
/// handed to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status and an error body.
    #[error("API error ({status} {code}): {message}")]
    Api {
        status: u16,
        /// Machine-readable code, e.g. `VALIDATION_ERROR`.
        code: String,
        message: String,
    },

    /// A response body did not have the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Request(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) => None,
        }
    }
}
