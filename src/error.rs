use std::sync::Arc;

use thiserror::Error;

/// Result type used throughout the SDK.
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in the Flagent SDK.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// Invalid base URL configuration.
    #[error("invalid base_url configuration")]
    InvalidBaseUrl(#[source] url::ParseError),

    /// The client has been disabled via [`crate::ClientConfig::enabled`].
    #[error("flagent client is disabled")]
    Disabled,

    /// The server returned a well-formed non-2xx response. `message` carries
    /// the response body as diagnostic detail.
    #[error("api error (status {status}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Response body text.
        message: String,
    },

    /// Network or transport-level error.
    #[error(transparent)]
    // reqwest::Error is not clonable, so we're wrapping it in an Arc.
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Network(Arc::new(value.without_url()))
    }
}
