//! Error types for remote catalog calls.

use thiserror::Error;

/// Errors that can occur while talking to the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Login was rejected or returned no token.
    #[error("authentication failed: {message}")]
    Auth {
        /// Server message or reason.
        message: String,
    },

    /// Transport-level failure (DNS, connect, TLS, timeout).
    #[error("network error calling {endpoint}: {source}")]
    Network {
        /// Endpoint path that failed.
        endpoint: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} calling {endpoint}")]
    HttpStatus {
        /// Endpoint path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// The response envelope carried a non-200 application code.
    #[error("API error {code} calling {endpoint}: {message}")]
    Api {
        /// Endpoint path that failed.
        endpoint: String,
        /// Application-level code from the envelope.
        code: i64,
        /// Application-level message from the envelope.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("unexpected response from {endpoint}: {source}")]
    Decode {
        /// Endpoint path that failed.
        endpoint: String,
        /// Decoder error, names the missing or mistyped field.
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL and endpoint could not be joined.
    #[error("invalid URL for {endpoint}: {source}")]
    InvalidUrl {
        /// Endpoint path that failed.
        endpoint: String,
        /// URL parse error.
        #[source]
        source: url::ParseError,
    },

    /// An episode's image listing never returned the empty terminating page.
    #[error("image listing for comic {comic_id} episode {order} did not end within {pages} pages")]
    UnboundedListing {
        comic_id: String,
        order: u32,
        pages: u32,
    },

    /// The configured signing secret was rejected by the MAC.
    #[error("invalid request signing key")]
    InvalidSigningKey,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

impl CatalogError {
    /// Returns true for authentication failures, the only run-fatal category.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_display_names_endpoint() {
        let error = CatalogError::HttpStatus {
            endpoint: "comics/c1/eps".to_string(),
            status: 502,
        };
        let msg = error.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("comics/c1/eps"));
    }

    #[test]
    fn test_is_auth() {
        assert!(
            CatalogError::Auth {
                message: "bad password".into()
            }
            .is_auth()
        );
        assert!(
            !CatalogError::Api {
                endpoint: "x".into(),
                code: 400,
                message: "nope".into()
            }
            .is_auth()
        );
    }
}
