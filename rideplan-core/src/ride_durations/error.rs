use thiserror::Error;

/// Errors from [`crate::RideDurationProvider::ride_durations`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RideDurationError {
    /// No origins or no destinations were provided.
    ///
    /// The cache never issues such a request; other callers should filter
    /// their input first.
    #[error("at least one origin and one destination are required")]
    EmptyInput,

    /// The request did not reach the provider.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Endpoint that was contacted.
        url: String,
        /// Transport-level description.
        message: String,
    },

    /// The provider did not answer within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint that was contacted.
        url: String,
        /// Configured timeout in whole seconds.
        timeout_secs: u64,
    },

    /// The provider answered with a non-success status.
    #[error("{message}")]
    HttpError {
        /// Endpoint that was contacted.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error text reported by the provider.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("failed to parse ride durations: {message}")]
    ParseError {
        /// Decoder description.
        message: String,
    },

    /// The matrix does not line up with the request.
    #[error("ride duration matrix does not match a {expected_rows}x{expected_columns} request")]
    ShapeMismatch {
        /// Number of origins requested.
        expected_rows: usize,
        /// Number of destinations requested.
        expected_columns: usize,
    },
}

/// Errors from [`crate::RideDurations::refresh`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    /// Another refresh on the same cache has not finished yet.
    #[error("already processing")]
    Busy,
    /// The provider round trip failed; nothing was merged.
    #[error(transparent)]
    Provider(#[from] RideDurationError),
}
