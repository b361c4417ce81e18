//! Bearer-token verification and identity normalization for MCP tool servers.
//!
//! This crate authenticates requests to a tool-serving server with OAuth 2.1
//! bearer tokens issued by an external identity provider, and hands verified,
//! provider-agnostic identity to request handlers. The host extracts the
//! `Authorization: Bearer` value and selects a provider at construction time;
//! everything after that is this crate's job:
//!
//! ```text
//! bearer token -> TokenKind::classify -> {SignatureVerifier | userinfo call}
//!              -> raw claims -> ClaimMap::normalize -> Identity -> AuthContext
//! ```
//!
//! # Components
//!
//! - [`token`]: structural classification of tokens (structured vs. opaque).
//! - [`verify`]: local verification of structured tokens against the
//!   issuer's key set, with a development-only disabled mode.
//! - [`jwks`]: lazy, memoized key-set cache with a single in-flight fetch.
//! - [`claims`]: provider claim vocabularies and the total normalizer.
//! - [`provider`]: the uniform [`IdentityProvider`] contract and a registry.
//! - [`providers`]: concrete integrations (Clerk, WorkOS AuthKit).
//! - [`error`]: the failure taxonomy (configuration / unauthorized /
//!   transient / upstream).
//!
//! # Quick start
//!
//! ```rust,ignore
//! use mcp_identity::providers::{ClerkConfig, ClerkProvider};
//! use mcp_identity::IdentityProvider;
//!
//! let provider = ClerkProvider::new(
//!     ClerkConfig::new("https://clerk.example.com").with_secret_key("sk_live_..."),
//! )?;
//!
//! // Per inbound request:
//! let ctx = provider.authenticate(bearer_token).await?;
//! println!("{} ({:?})", ctx.user_id(), ctx.identity.email);
//! ```
//!
//! Verification failures are never swallowed: they propagate as
//! [`AuthError`] and the host rejects the request with a bare
//! "unauthorized". Profile-enrichment failures
//! ([`AuthError::Upstream`]) are returned to the calling tool as values and
//! never reject the enclosing request.

#![warn(missing_docs)]

pub mod claims;
pub mod error;
pub mod identity;
pub mod jwks;
pub mod provider;
pub mod providers;
pub mod token;
pub mod verify;

pub use claims::{parse_scopes, ClaimMap, RawClaims};
pub use error::{AuthError, Result};
pub use identity::{AuthContext, Identity};
pub use jwks::KeyStore;
pub use provider::{IdentityProvider, ProviderRegistry};
pub use providers::{AuthKitConfig, AuthKitProvider, ClerkConfig, ClerkProvider};
pub use token::TokenKind;
pub use verify::SignatureVerifier;
