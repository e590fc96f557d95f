use thiserror::Error;

/// Errors from [`crate::source::FootprintSource::fetch_by_bbox`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The request did not complete before the configured timeout.
    #[error("footprint request timed out")]
    Timeout,
    /// The remote service answered with a non-success status.
    #[error("footprint service returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },
    /// The connection failed before a response arrived.
    #[error("network error: {message}")]
    Network {
        /// Transport error text.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse footprint response: {message}")]
    Parse {
        /// Decoder error text.
        message: String,
    },
    /// The source could not service the request for another reason, such as
    /// a missing runtime.
    #[error("footprint service error: {message}")]
    ServiceError {
        /// Description of the failure.
        message: String,
    },
}
