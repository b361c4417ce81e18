//! Normalized identity record and per-request context.
//!
//! Tool handlers never see provider-native claims. They see an [`Identity`]
//! with a stable shape, attached to the request inside an [`AuthContext`]
//! together with the raw access token and granted scopes.

use serde::{Deserialize, Serialize};

/// Provider-agnostic identity record produced by claim normalization.
///
/// `user_id` is always populated when verification succeeds; every other
/// field degrades gracefully to absent. Permission and scope lists default
/// to empty, never to absent, so downstream checks stay total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Stable, provider-namespaced user id (e.g. `user_2abc...`).
    pub user_id: String,

    /// Email address, when the provider exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Display name, possibly derived from given/family name claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,

    /// Organization id, present only when the user acts within an org.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// Role within the organization (or the provider's generic role claim).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_role: Option<String>,

    /// Granted permissions. Empty when none were asserted.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// OAuth scopes carried by the token, passed through uninterpreted.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Token expiry as Unix epoch seconds, when the token carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
}

impl Identity {
    /// Check whether a scope was granted.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    /// Check whether every listed scope was granted.
    pub fn has_all_scopes(&self, scopes: &[&str]) -> bool {
        scopes.iter().all(|s| self.has_scope(s))
    }

    /// Check whether a permission was asserted.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    /// Require a scope, returning an error message when missing.
    pub fn require_scope(&self, scope: &str) -> std::result::Result<(), &'static str> {
        if self.has_scope(scope) {
            Ok(())
        } else {
            Err("Insufficient scope")
        }
    }

    /// Whether the embedded expiry, if any, has passed.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => exp < crate::claims::unix_now(),
            None => false,
        }
    }
}

/// Per-request authentication context handed to tool handlers.
///
/// Created once per inbound request and discarded afterward. Handlers read
/// but never write this context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The normalized identity of the caller.
    pub identity: Identity,
    /// The raw bearer token, for forwarding to downstream services.
    pub access_token: String,
    /// Scopes granted to the token.
    pub scopes: Vec<String>,
}

impl AuthContext {
    /// The caller's stable user id.
    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    /// Check whether a scope was granted.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_with_scopes(scopes: &[&str]) -> Identity {
        Identity {
            user_id: "user_1".into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn scope_checks() {
        let id = identity_with_scopes(&["openid", "email"]);
        assert!(id.has_scope("email"));
        assert!(!id.has_scope("profile"));
        assert!(id.has_all_scopes(&["openid", "email"]));
        assert!(!id.has_all_scopes(&["openid", "profile"]));
        assert!(id.require_scope("openid").is_ok());
        assert!(id.require_scope("admin").is_err());
    }

    #[test]
    fn permission_checks() {
        let id = Identity {
            user_id: "user_1".into(),
            permissions: vec!["read".into()],
            ..Default::default()
        };
        assert!(id.has_permission("read"));
        assert!(!id.has_permission("write"));
    }

    #[test]
    fn expiry_defaults_to_not_expired() {
        assert!(!Identity::default().is_expired());

        let expired = Identity {
            expires_at: Some(1),
            ..Default::default()
        };
        assert!(expired.is_expired());
    }

    #[test]
    fn context_delegates_to_identity() {
        let ctx = AuthContext {
            identity: identity_with_scopes(&["openid"]),
            access_token: "tok".into(),
            scopes: vec!["openid".into()],
        };
        assert_eq!(ctx.user_id(), "user_1");
        assert!(ctx.has_scope("openid"));
    }
}
