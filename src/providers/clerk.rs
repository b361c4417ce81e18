//! Clerk identity provider.
//!
//! Clerk issues two kinds of bearer credentials: structured session tokens
//! (RS256 JWTs signed against the instance's JWKS) and opaque OAuth access
//! tokens. Which resolution path a token takes is decided purely by its
//! shape:
//!
//! - structured tokens are verified locally against
//!   `{issuer}/.well-known/jwks.json`;
//! - opaque tokens are resolved by calling `{issuer}/oauth/userinfo` with the
//!   token as bearer credential.
//!
//! For tools that need a richer profile than the token payload carries,
//! [`ClerkProvider::fetch_profile`] additionally supports a Backend API
//! lookup (`{api_base}/v1/users/{user_id}`) authenticated with the configured
//! secret key — never with the end user's token.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::claims::{ClaimMap, RawClaims};
use crate::error::{transport_error, AuthError, Result};
use crate::identity::Identity;
use crate::provider::IdentityProvider;
use crate::token::TokenKind;
use crate::verify::SignatureVerifier;

/// Default Clerk Backend API host.
const DEFAULT_API_BASE: &str = "https://api.clerk.com";

/// Immutable configuration for a [`ClerkProvider`].
///
/// Set once at provider construction and never mutated afterward.
#[derive(Debug, Clone)]
pub struct ClerkConfig {
    /// Instance issuer domain, e.g. `https://clerk.example.com`. Matched
    /// exactly against structured-token `iss` claims.
    pub issuer: String,
    /// Whether structured tokens are signature-verified. `false` is a
    /// development-only downgrade; a warning is logged on every use.
    pub verify_signatures: bool,
    /// Secret key (`sk_...`) for Backend API profile lookups. Only used on
    /// the remote-resolution path, never sent to end users.
    pub secret_key: Option<String>,
    /// Backend API base for administrative lookups.
    pub api_base: String,
    /// JWKS cache lifetime.
    pub cache_ttl: Duration,
    /// Clock-skew tolerance in seconds for expiry checks.
    pub leeway_seconds: u64,
    /// Timeout applied to every remote call.
    pub http_timeout: Duration,
}

impl ClerkConfig {
    /// Create a configuration for the given issuer domain with signature
    /// verification enabled.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            verify_signatures: true,
            secret_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            cache_ttl: Duration::from_secs(3600),
            leeway_seconds: 0,
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Set the Backend API secret key.
    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = Some(secret_key.into());
        self
    }

    /// Enable or disable signature verification (development only when
    /// disabled).
    pub fn with_signature_verification(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// Override the Backend API base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set clock-skew tolerance in seconds.
    pub fn with_leeway(mut self, seconds: u64) -> Self {
        self.leeway_seconds = seconds;
        self
    }
}

/// Clerk identity provider.
///
/// # Example
///
/// ```rust,ignore
/// use mcp_identity::providers::{ClerkConfig, ClerkProvider};
///
/// let provider = ClerkProvider::new(
///     ClerkConfig::new("https://clerk.example.com").with_secret_key("sk_live_..."),
/// )?;
///
/// let ctx = provider.authenticate(&bearer_token).await?;
/// println!("user: {}", ctx.user_id());
/// ```
#[derive(Debug)]
pub struct ClerkProvider {
    config: ClerkConfig,
    verifier: SignatureVerifier,
    http_client: reqwest::Client,
    claim_map: ClaimMap,
}

impl ClerkProvider {
    /// Create a new Clerk provider.
    pub fn new(config: ClerkConfig) -> Result<Self> {
        if config.issuer.is_empty() {
            return Err(AuthError::configuration("Clerk issuer domain is required"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {e}")))?;

        let jwks_uri = format!(
            "{}/.well-known/jwks.json",
            config.issuer.trim_end_matches('/')
        );
        let verifier = SignatureVerifier::new(
            config.issuer.clone(),
            jwks_uri,
            http_client.clone(),
            config.cache_ttl,
        )
        .with_leeway(config.leeway_seconds)
        .with_signature_verification(config.verify_signatures);

        Ok(Self {
            config,
            verifier,
            http_client,
            claim_map: ClaimMap::clerk(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.issuer.trim_end_matches('/'))
    }

    /// Resolve an opaque token through the userinfo endpoint.
    ///
    /// Non-success statuses surface as [`AuthError::Upstream`]; the
    /// verification path downgrades that to a plain rejection.
    async fn fetch_userinfo(&self, token: &str) -> Result<RawClaims> {
        let url = self.endpoint("/oauth/userinfo");
        tracing::debug!(url = %url, "resolving opaque token via userinfo endpoint");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error("userinfo request failed", &e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AuthError::upstream(status.as_u16(), message));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AuthError::transient(format!("userinfo response is not valid JSON: {e}")))
    }

    /// Fetch the richest available profile for the given token.
    ///
    /// Opaque tokens go straight to the userinfo endpoint. Structured tokens
    /// are verified locally, then the subject is looked up through the
    /// Backend API with the configured secret key. Failures on this path are
    /// returned as error values for the calling tool; they never reject the
    /// enclosing request.
    pub async fn fetch_profile(&self, token: &str) -> Result<RawClaims> {
        match TokenKind::classify(token) {
            TokenKind::Opaque => self.fetch_userinfo(token).await,
            TokenKind::Structured => {
                // The secret-key check precedes everything else so a
                // misconfigured server fails fast without any network call.
                let secret_key = self.config.secret_key.as_deref().ok_or_else(|| {
                    AuthError::configuration(
                        "Clerk secret key is not configured; cannot resolve profiles for \
                         session tokens",
                    )
                })?;

                let claims = self.verifier.verify(token).await?;
                let user_id = claims
                    .get("sub")
                    .and_then(Value::as_str)
                    .ok_or_else(|| {
                        AuthError::unauthorized("verified token is missing a subject claim")
                    })?;

                let url = format!(
                    "{}/v1/users/{user_id}",
                    self.config.api_base.trim_end_matches('/')
                );
                tracing::debug!(url = %url, "resolving profile via Backend API");

                let response = self
                    .http_client
                    .get(&url)
                    .bearer_auth(secret_key)
                    .send()
                    .await
                    .map_err(|e| transport_error("Backend API request failed", &e))?;

                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(AuthError::upstream(status.as_u16(), message));
                }

                response.json::<Value>().await.map_err(|e| {
                    AuthError::transient(format!("Backend API response is not valid JSON: {e}"))
                })
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for ClerkProvider {
    fn id(&self) -> &'static str {
        "clerk"
    }

    fn issuer(&self) -> &str {
        &self.config.issuer
    }

    async fn verify(&self, token: &str) -> Result<RawClaims> {
        match TokenKind::classify(token) {
            TokenKind::Structured => self.verifier.verify(token).await,
            TokenKind::Opaque => match self.fetch_userinfo(token).await {
                // On the authentication path a rejected userinfo call means
                // the credential is bad, not that a tool call failed.
                Err(AuthError::Upstream { status, .. }) => Err(AuthError::unauthorized(format!(
                    "userinfo endpoint rejected token (status {status})"
                ))),
                other => other,
            },
        }
    }

    fn normalize(&self, claims: &RawClaims) -> Identity {
        self.claim_map.normalize(claims)
    }

    fn authorization_endpoint(&self) -> String {
        self.endpoint("/oauth/authorize")
    }

    fn token_endpoint(&self) -> String {
        self.endpoint("/oauth/token")
    }

    fn registration_endpoint(&self) -> Option<String> {
        Some(self.endpoint("/oauth/register"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_config_verifies_signatures() {
        // The development-only downgrade must never be reachable by default.
        let config = ClerkConfig::new("https://clerk.example.com");
        assert!(config.verify_signatures);

        let provider = ClerkProvider::new(config).unwrap();
        assert!(provider.verifier.is_enabled());
    }

    #[test]
    fn empty_issuer_is_a_configuration_error() {
        let err = ClerkProvider::new(ClerkConfig::new("")).unwrap_err();
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[test]
    fn endpoints_derive_from_issuer() {
        let provider = ClerkProvider::new(ClerkConfig::new("https://clerk.example.com")).unwrap();
        assert_eq!(provider.issuer(), "https://clerk.example.com");
        assert_eq!(
            provider.authorization_endpoint(),
            "https://clerk.example.com/oauth/authorize"
        );
        assert_eq!(
            provider.token_endpoint(),
            "https://clerk.example.com/oauth/token"
        );
        assert_eq!(
            provider.registration_endpoint().as_deref(),
            Some("https://clerk.example.com/oauth/register")
        );
        assert!(provider.uses_discovery());
    }

    #[test]
    fn normalize_uses_clerk_vocabulary() {
        let provider = ClerkProvider::new(ClerkConfig::new("https://clerk.example.com")).unwrap();
        let identity = provider.normalize(&serde_json::json!({
            "sub": "user_2",
            "first_name": "Jane",
            "last_name": "Doe",
            "image_url": "https://img.clerk.com/jane.png"
        }));
        assert_eq!(identity.user_id, "user_2");
        assert_eq!(identity.name.as_deref(), Some("Jane Doe"));
        assert_eq!(
            identity.picture.as_deref(),
            Some("https://img.clerk.com/jane.png")
        );
    }
}
