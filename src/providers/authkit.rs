//! WorkOS AuthKit identity provider.
//!
//! AuthKit access tokens are RS256 JWTs verified against
//! `{issuer}/oauth2/jwks`. Opaque tokens are resolved through
//! `{issuer}/oauth2/userinfo`, mirroring the Clerk integration's dual path.
//! Role and permission claims are flat (`role`, `permissions`) rather than
//! organization-scoped.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::claims::{ClaimMap, RawClaims};
use crate::error::{transport_error, AuthError, Result};
use crate::identity::Identity;
use crate::provider::IdentityProvider;
use crate::token::TokenKind;
use crate::verify::SignatureVerifier;

/// Immutable configuration for an [`AuthKitProvider`].
#[derive(Debug, Clone)]
pub struct AuthKitConfig {
    /// AuthKit issuer domain, e.g. `https://example.authkit.app`.
    pub issuer: String,
    /// Whether access tokens are signature-verified. Development-only when
    /// disabled.
    pub verify_signatures: bool,
    /// JWKS cache lifetime.
    pub cache_ttl: Duration,
    /// Clock-skew tolerance in seconds.
    pub leeway_seconds: u64,
    /// Timeout applied to every remote call.
    pub http_timeout: Duration,
}

impl AuthKitConfig {
    /// Create a configuration for the given issuer domain.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            verify_signatures: true,
            cache_ttl: Duration::from_secs(3600),
            leeway_seconds: 0,
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Enable or disable signature verification.
    pub fn with_signature_verification(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }
}

/// WorkOS AuthKit identity provider.
#[derive(Debug)]
pub struct AuthKitProvider {
    config: AuthKitConfig,
    verifier: SignatureVerifier,
    http_client: reqwest::Client,
    claim_map: ClaimMap,
}

impl AuthKitProvider {
    /// Create a new AuthKit provider.
    pub fn new(config: AuthKitConfig) -> Result<Self> {
        if config.issuer.is_empty() {
            return Err(AuthError::configuration(
                "AuthKit issuer domain is required",
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AuthError::configuration(format!("failed to build HTTP client: {e}")))?;

        let jwks_uri = format!("{}/oauth2/jwks", config.issuer.trim_end_matches('/'));
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
            claim_map: ClaimMap::authkit(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.issuer.trim_end_matches('/'))
    }

    async fn fetch_userinfo(&self, token: &str) -> Result<RawClaims> {
        let url = self.endpoint("/oauth2/userinfo");
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
            return Err(AuthError::unauthorized(format!(
                "userinfo endpoint rejected token (status {status})"
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AuthError::transient(format!("userinfo response is not valid JSON: {e}")))
    }
}

#[async_trait]
impl IdentityProvider for AuthKitProvider {
    fn id(&self) -> &'static str {
        "authkit"
    }

    fn issuer(&self) -> &str {
        &self.config.issuer
    }

    async fn verify(&self, token: &str) -> Result<RawClaims> {
        match TokenKind::classify(token) {
            TokenKind::Structured => self.verifier.verify(token).await,
            TokenKind::Opaque => self.fetch_userinfo(token).await,
        }
    }

    fn normalize(&self, claims: &RawClaims) -> Identity {
        self.claim_map.normalize(claims)
    }

    fn authorization_endpoint(&self) -> String {
        self.endpoint("/oauth2/authorize")
    }

    fn token_endpoint(&self) -> String {
        self.endpoint("/oauth2/token")
    }

    fn registration_endpoint(&self) -> Option<String> {
        Some(self.endpoint("/oauth2/register"))
    }
}
