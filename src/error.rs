//! Error taxonomy for token verification and profile resolution.
//!
//! Failures fall into four kinds:
//!
//! - [`AuthError::Configuration`] - a required setting is absent. Fatal to the
//!   operation that needed it, never to the process.
//! - [`AuthError::Unauthorized`] - the credential itself was rejected
//!   (malformed, bad signature, wrong issuer, expired, unknown key id).
//!   Always results in rejecting the request.
//! - [`AuthError::Transient`] - the key-set or resolution endpoint could not
//!   be reached. Distinguished from `Unauthorized` so callers may retry
//!   instead of treating it as a credential problem.
//! - [`AuthError::Upstream`] - a reachable endpoint answered with a
//!   non-success status during profile resolution. Surfaced to the calling
//!   tool as a value carrying the status code, never as a request rejection.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication and resolution errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required setting is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The bearer token was rejected.
    #[error("authentication failed: {0}")]
    Unauthorized(String),

    /// A network failure or timeout reaching a remote endpoint. Retryable.
    #[error("transient authentication failure: {0}")]
    Transient(String),

    /// A remote endpoint was reached but answered with a non-success status.
    #[error("upstream request failed with status {status}: {message}")]
    Upstream {
        /// HTTP status code returned by the endpoint.
        status: u16,
        /// Response body or reason phrase, developer-facing.
        message: String,
    },
}

impl AuthError {
    /// Create a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create an authentication-rejected error.
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Create a transient (retryable) error.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    /// Create an upstream-status error.
    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    /// Whether the caller may retry rather than reject the credential.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// HTTP status code, if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Map a `reqwest` transport error into the taxonomy.
///
/// Timeouts and connection failures are retryable; everything else on the
/// send path (TLS, protocol) is treated the same way since none of it says
/// anything about the credential.
pub(crate) fn transport_error(context: &str, err: &reqwest::Error) -> AuthError {
    if err.is_timeout() {
        AuthError::transient(format!("{context}: request timed out"))
    } else {
        AuthError::transient(format!("{context}: {err}"))
    }
}
