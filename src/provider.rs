//! Identity provider contract and registry.
//!
//! The hosting server only ever talks to "a provider" through
//! [`IdentityProvider`]; it never inspects vendor-specific claims or token
//! shapes itself. One concrete type per vendor implements the trait and is
//! selected at server construction time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::claims::RawClaims;
use crate::error::{AuthError, Result};
use crate::identity::{AuthContext, Identity};

/// Uniform surface every identity-provider integration satisfies.
///
/// `verify` and `normalize` carry the protocol weight; the remaining methods
/// are pure metadata accessors the surrounding server uses to publish OAuth
/// discovery documents. None of the metadata accessors perform I/O.
#[async_trait]
pub trait IdentityProvider: Send + Sync + std::fmt::Debug {
    /// Short stable identifier for this provider (e.g. `"clerk"`).
    fn id(&self) -> &'static str;

    /// Issuer URL, matched exactly against structured-token `iss` claims.
    fn issuer(&self) -> &str;

    /// Validate a bearer token of unknown kind and return the provider's raw
    /// claims.
    ///
    /// Structured tokens are verified locally against the issuer's key set;
    /// opaque tokens are resolved through the provider's userinfo endpoint.
    /// Fails with [`AuthError`] on any rejection; never returns partial
    /// claims.
    async fn verify(&self, token: &str) -> Result<RawClaims>;

    /// Translate raw claims into the stable [`Identity`] shape.
    ///
    /// Total: absent claims map to absent fields, never to an error.
    fn normalize(&self, claims: &RawClaims) -> Identity;

    /// OAuth authorization endpoint.
    fn authorization_endpoint(&self) -> String;

    /// OAuth token endpoint.
    fn token_endpoint(&self) -> String;

    /// Dynamic client registration endpoint, when the provider offers one.
    fn registration_endpoint(&self) -> Option<String> {
        None
    }

    /// Scopes the provider supports.
    fn scopes_supported(&self) -> Vec<String> {
        vec![
            "openid".to_string(),
            "email".to_string(),
            "profile".to_string(),
        ]
    }

    /// Grant types the provider supports.
    fn grant_types_supported(&self) -> Vec<String> {
        vec![
            "authorization_code".to_string(),
            "refresh_token".to_string(),
        ]
    }

    /// Whether the provider publishes an OIDC discovery document.
    fn uses_discovery(&self) -> bool {
        true
    }

    /// Verify a token and assemble the per-request context handed to
    /// handlers.
    async fn authenticate(&self, token: &str) -> Result<AuthContext> {
        let claims = self.verify(token).await?;
        let identity = self.normalize(&claims);
        if identity.user_id.is_empty() {
            return Err(AuthError::unauthorized("token is missing a subject claim"));
        }
        Ok(AuthContext {
            scopes: identity.scopes.clone(),
            identity,
            access_token: token.to_string(),
        })
    }
}

/// Registry of providers keyed by id, for hosts serving more than one issuer.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own id.
    pub fn register<P: IdentityProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.id().to_string(), Arc::new(provider));
    }

    /// Look up a provider by id.
    pub fn get(&self, id: &str) -> Option<Arc<dyn IdentityProvider>> {
        self.providers.get(id).cloned()
    }

    /// All registered provider ids.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
