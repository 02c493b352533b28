use thiserror::Error;

/// Errors returned by the points backend client and relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL could not be parsed or joined.
    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    /// No auth token is stored; the backend requires one for every call.
    #[error("no auth token configured")]
    MissingToken,

    /// The event was tagged for a different associate ID.
    #[error("affiliate tag mismatch: expected {expected}, got {actual}")]
    TagMismatch { expected: String, actual: String },
}
