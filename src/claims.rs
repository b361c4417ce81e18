//! Raw provider claims and the mapping that normalizes them.
//!
//! Every provider speaks its own claim vocabulary: one names the avatar claim
//! `image_url`, another `picture`; one nests role and permissions under
//! organization-scoped claims, another uses flat generic ones. A [`ClaimMap`]
//! captures that vocabulary per provider, so adding a vendor means supplying
//! a new mapping, never changing the normalizer contract.

use serde_json::Value;

use crate::identity::Identity;

/// Raw claims as returned by a verified token payload or a profile endpoint.
///
/// Always a JSON object on the success path; never handed to tool handlers
/// directly.
pub type RawClaims = Value;

/// Claim-name mapping from one provider's vocabulary to the stable
/// [`Identity`] shape.
#[derive(Debug, Clone)]
pub struct ClaimMap {
    /// Claim carrying the stable user id (default: `sub`).
    pub user_id: String,
    /// Claim carrying the email address.
    pub email: Option<String>,
    /// Claim carrying a ready-made display name, preferred when present.
    pub name: Option<String>,
    /// Claim carrying the given name, concatenated with `last_name`.
    pub first_name: Option<String>,
    /// Claim carrying the family name.
    pub last_name: Option<String>,
    /// Claim carrying the avatar URL.
    pub picture: Option<String>,
    /// Organization id claim.
    pub org_id: Option<String>,
    /// Organization-scoped role claim; takes precedence over `role`.
    pub org_role: Option<String>,
    /// Organization-scoped permissions claim; takes precedence over
    /// `permissions`.
    pub org_permissions: Option<String>,
    /// Generic role claim, used when no organization-scoped role exists.
    pub role: Option<String>,
    /// Generic permissions claim, used when no organization-scoped
    /// permissions exist.
    pub permissions: Option<String>,
}

impl Default for ClaimMap {
    fn default() -> Self {
        Self {
            user_id: "sub".to_string(),
            email: Some("email".to_string()),
            name: Some("name".to_string()),
            first_name: None,
            last_name: None,
            picture: Some("picture".to_string()),
            org_id: None,
            org_role: None,
            org_permissions: None,
            role: None,
            permissions: None,
        }
    }
}

impl ClaimMap {
    /// Claim mapping for Clerk session tokens and userinfo responses.
    pub fn clerk() -> Self {
        Self {
            user_id: "sub".to_string(),
            email: Some("email".to_string()),
            name: Some("name".to_string()),
            first_name: Some("first_name".to_string()),
            last_name: Some("last_name".to_string()),
            picture: Some("image_url".to_string()),
            org_id: Some("org_id".to_string()),
            org_role: Some("org_role".to_string()),
            org_permissions: Some("org_permissions".to_string()),
            role: Some("role".to_string()),
            permissions: Some("permissions".to_string()),
        }
    }

    /// Claim mapping for WorkOS AuthKit access tokens.
    pub fn authkit() -> Self {
        Self {
            user_id: "sub".to_string(),
            email: Some("email".to_string()),
            name: None,
            first_name: Some("first_name".to_string()),
            last_name: Some("last_name".to_string()),
            picture: Some("picture".to_string()),
            org_id: Some("org_id".to_string()),
            org_role: None,
            org_permissions: None,
            role: Some("role".to_string()),
            permissions: Some("permissions".to_string()),
        }
    }

    /// Translate raw claims into an [`Identity`].
    ///
    /// Total: absent or malformed optional claims produce absent output
    /// fields, never an error. The `user_id` field is left empty when the
    /// mapped claim is missing; callers on the verification path reject such
    /// claims before this record reaches a handler.
    pub fn normalize(&self, claims: &RawClaims) -> Identity {
        let obj = match claims.as_object() {
            Some(obj) => obj,
            None => return Identity::default(),
        };

        let get_str =
            |key: &Option<String>| key.as_ref().and_then(|k| obj.get(k)).and_then(Value::as_str);

        let name = get_str(&self.name).map(String::from).or_else(|| {
            let first = get_str(&self.first_name);
            let last = get_str(&self.last_name);
            match (first, last) {
                (None, None) => None,
                (first, last) => Some(
                    [first, last]
                        .into_iter()
                        .flatten()
                        .collect::<Vec<_>>()
                        .join(" "),
                ),
            }
        });

        // Organization-scoped claims win over generic ones when both exist;
        // a present-but-empty organization list still counts as present.
        let org_role = get_str(&self.org_role)
            .or_else(|| get_str(&self.role))
            .map(String::from);
        let permissions = self
            .org_permissions
            .as_ref()
            .and_then(|k| obj.get(k))
            .map(parse_string_list)
            .or_else(|| {
                self.permissions
                    .as_ref()
                    .and_then(|k| obj.get(k))
                    .map(parse_string_list)
            })
            .unwrap_or_default();

        Identity {
            user_id: obj
                .get(&self.user_id)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            email: get_str(&self.email).map(String::from),
            name,
            picture: get_str(&self.picture).map(String::from),
            org_id: get_str(&self.org_id).map(String::from),
            org_role,
            permissions,
            scopes: parse_scopes(claims),
            expires_at: obj.get("exp").and_then(Value::as_u64),
        }
    }
}

/// Parse OAuth scopes from token claims.
///
/// Handles both the space-separated `scope` string and array forms, plus the
/// `scp` variant some providers emit.
pub fn parse_scopes(claims: &Value) -> Vec<String> {
    for key in ["scope", "scp"] {
        if let Some(value) = claims.get(key) {
            let parsed = parse_string_list(value);
            if !parsed.is_empty() {
                return parsed;
            }
        }
    }
    Vec::new()
}

/// Parse a claim value that may be an array of strings or a space-separated
/// string into a list. Anything else yields an empty list.
fn parse_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => s.split_whitespace().map(String::from).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}

/// Current time as Unix epoch seconds.
pub(crate) fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
