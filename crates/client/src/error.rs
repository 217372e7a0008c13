//! Client error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connection, DNS, TLS, body decode).
    #[error("transport failure: {0}")]
    TransportFailure(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    ///
    /// `errors` holds the itemised problems of a failed registration and is
    /// empty for every other rejection.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        status: StatusCode,
        message: String,
        errors: Vec<String>,
    },

    /// The configured base URL cannot be used.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
