//! Bearer-token classification.
//!
//! A bearer token arrives as an opaque string; its kind is determined purely
//! by structure, never by configuration or caller-supplied hints. Structured
//! tokens (three base64url segments) can be verified locally against the
//! issuer's key set. Anything else is a reference token that only the issuing
//! provider can resolve.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::Value;

use crate::error::{AuthError, Result};

/// Structural kind of a bearer token.
///
/// Classification is a pure function of the token string and never changes
/// once determined for a given value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Three dot-separated base64url segments; self-describing and locally
    /// verifiable given the issuer's public keys.
    Structured,
    /// An unstructured reference token; must be resolved by calling the
    /// issuing provider.
    Opaque,
}

impl TokenKind {
    /// Classify a raw bearer token by shape alone.
    pub fn classify(token: &str) -> Self {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() == 3 && segments.iter().all(|s| !s.is_empty()) {
            Self::Structured
        } else {
            Self::Opaque
        }
    }
}

/// Decode the payload segment of a structured token without verifying it.
///
/// Enforces structural well-formedness only: exactly three segments and a
/// base64url-decodable JSON object payload. Callers that skip signature
/// verification still go through this check.
pub(crate) fn decode_payload(token: &str) -> Result<Value> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(AuthError::unauthorized(
            "token is not a structured token (expected three segments)",
        ));
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(segments[1])
        .map_err(|e| AuthError::unauthorized(format!("token payload is not base64url: {e}")))?;

    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::unauthorized(format!("token payload is not valid JSON: {e}")))?;

    if !payload.is_object() {
        return Err(AuthError::unauthorized("token payload is not a JSON object"));
    }

    Ok(payload)
}
